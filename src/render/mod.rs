// SPDX-License-Identifier: GPL-3.0-only

mod border;
mod shaders;

use std::borrow::BorrowMut;

use smithay::{
    backend::renderer::{
        RendererSuper,
        damage::{OutputDamageTracker, RenderOutputResult},
        element::{
            Kind, render_elements,
            surface::{WaylandSurfaceRenderElement, render_elements_from_surface_tree},
        },
        gles::{
            GlesPixelProgram, GlesRenderer, GlesTarget, UniformName, UniformType,
            element::PixelShaderElement,
        },
        glow::GlowRenderer,
    },
    desktop::PopupManager,
    output::Output,
    reexports::wayland_server::protocol::wl_surface::WlSurface,
    utils::{Logical, Point, Scale},
};

use crate::{config::*, state::State};

type RenderResult<'a> = Result<
    RenderOutputResult<'a>,
    smithay::backend::renderer::damage::Error<<GlowRenderer as RendererSuper>::Error>,
>;

render_elements! {
    pub TimberElement<=GlowRenderer>;
    Surface=WaylandSurfaceRenderElement<GlowRenderer>,
    Border=PixelShaderElement,
}

#[derive(Debug)]
pub struct Shaders {
    pub flat: GlesPixelProgram,
}

pub fn compile_shaders(renderer: &mut GlowRenderer) -> Shaders {
    let gles: &mut GlesRenderer = renderer.borrow_mut();
    let flat = gles
        .compile_custom_pixel_shader(
            shaders::FLAT_FRAG,
            &[UniformName::new("flat_color", UniformType::_4f)],
        )
        .expect("flat color shader");
    Shaders { flat }
}

fn popup_elements(
    renderer: &mut GlowRenderer,
    surface: &WlSurface,
    origin: Point<i32, Logical>,
    scale: f64,
) -> Vec<TimberElement> {
    let mut elems = Vec::new();
    for (popup, offset) in PopupManager::popups_for_surface(surface) {
        let pos = origin + offset - popup.geometry().loc;
        let surfs = render_elements_from_surface_tree(
            renderer,
            popup.wl_surface(),
            pos.to_physical_precise_round(scale),
            Scale::from(scale),
            1.0,
            Kind::Unspecified,
        );
        elems.extend(surfs.into_iter().map(TimberElement::Surface));
    }
    elems
}

/// One damage pass over an output: client surfaces plus their borders, with
/// the active border color on the server focus. An empty desktop clears to
/// a neutral grey.
pub fn render_output<'a>(
    renderer: &mut GlowRenderer,
    target: &mut GlesTarget<'_>,
    tracker: &'a mut OutputDamageTracker,
    age: usize,
    state: &State,
    output: &Output,
    shaders: &Shaders,
) -> RenderResult<'a> {
    let scale = output.current_scale().fractional_scale();
    let Some(screen) = state.screen_by_output(output) else {
        let elems: [TimberElement; 0] = [];
        return tracker.render_output(renderer, target, age, &elems, EMPTY_COLOR);
    };
    let desktop = &state.desktops[state.screens[screen].active_desktop()];
    let focus = desktop.focus;
    let server_focus = screen == state.active_screen;

    let mut elems = Vec::new();
    for &id in state.visible_clients(screen).iter().rev() {
        let client = &state.clients[id];
        let Some(wl) = client.wl_surface() else {
            continue;
        };
        let inner = client.inner();
        let origin = inner.loc - client.window.geometry().loc;

        // popups draw unclipped on top of their parent
        elems.extend(popup_elements(renderer, &wl, origin, scale));

        let surfs = render_elements_from_surface_tree(
            renderer,
            &wl,
            origin.to_physical_precise_round(scale),
            Scale::from(scale),
            1.0,
            Kind::Unspecified,
        );
        elems.extend(surfs.into_iter().map(TimberElement::Surface));

        if client.border > 0 {
            let color = if server_focus && focus == Some(id) {
                FOCUS_COLOR
            } else {
                BORDER_COLOR
            };
            for piece in border::elements(&shaders.flat, client.rect, client.border, color) {
                elems.push(TimberElement::Border(piece));
            }
        }
    }

    let clear = if desktop.tree.is_empty() {
        EMPTY_COLOR
    } else {
        BG_COLOR
    };
    tracker.render_output(renderer, target, age, &elems, clear)
}
