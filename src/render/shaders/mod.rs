// SPDX-License-Identifier: GPL-3.0-only

pub const FLAT_FRAG: &str = include_str!("flat.frag");
