// SPDX-License-Identifier: GPL-3.0-only

use smithay::{
    backend::renderer::{
        element::Kind,
        gles::{GlesPixelProgram, Uniform, element::PixelShaderElement},
    },
    utils::{Logical, Rectangle},
};

/// Four flat-color bands along the inside edges of the client box.
pub fn elements(
    shader: &GlesPixelProgram,
    win: Rectangle<i32, Logical>,
    border_width: i32,
    color: [f32; 4],
) -> Vec<PixelShaderElement> {
    let bw = border_width;
    let x = win.loc.x;
    let y = win.loc.y;
    let w = win.size.w;
    let h = win.size.h;

    #[rustfmt::skip]
    // (x, y, width, height)
    let rects: [(i32, i32, i32, i32); 4] = [
        (x,          y,              w,  bw),         // top
        (x,          y + h - bw,     w,  bw),         // bottom
        (x,          y + bw,         bw, h - 2 * bw), // left
        (x + w - bw, y + bw,         bw, h - 2 * bw), // right
    ];

    let mut elems = Vec::with_capacity(4);
    for (rx, ry, rw, rh) in rects {
        if rw <= 0 || rh <= 0 {
            continue;
        }
        let rect = Rectangle::<i32, Logical>::new((rx, ry).into(), (rw, rh).into());
        elems.push(PixelShaderElement::new(
            shader.clone(),
            rect,
            None,
            1.0,
            vec![Uniform::new("flat_color", color)],
            Kind::Unspecified,
        ));
    }
    elems
}
