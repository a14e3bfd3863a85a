#![allow(dead_code)]

// TODO: implement runtime config

const fn color(hex: u32) -> [f32; 4] {
    [
        ((hex >> 24) & 0xFF) as f32 / 255.0,
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

/// Appearance
pub const BORDER_WIDTH: i32 = 2;

pub const BG_COLOR: [f32; 4] = color(0x000000ff);
/// Shown when the focused desktop holds no clients.
pub const EMPTY_COLOR: [f32; 4] = color(0x7f7f7fff);
pub const BORDER_COLOR: [f32; 4] = color(0x444444ff);
pub const FOCUS_COLOR: [f32; 4] = color(0x458588ff);

/// Keyboard repeat rate and delay
pub const REPEAT_RATE: i32 = 30;
pub const REPEAT_DELAY: i32 = 300;

/// Control protocol limits
pub const MAX_SUBSCRIBERS: usize = 16;
pub const MAX_DATA_LEN: usize = 1024;

/// Seat name advertised to clients
pub const SEAT_NAME: &str = "seat0";
