// SPDX-License-Identifier: GPL-3.0-only

pub mod winit;

use smithay::output::Output;
use winit::WinitState;

/// Enum over all supported backends
#[derive(Debug)]
pub enum Backend {
    Winit(WinitState),
    Unset,
}

impl Backend {
    pub fn schedule_render(&mut self, _output: &Output) {
        match self {
            Backend::Winit(_) => {
                // no-op: winit renders continuously via input/redraw events
            }
            Backend::Unset => {} // no-op (tests)
        }
    }

    pub fn winit(&mut self) -> &mut WinitState {
        match self {
            Backend::Winit(winit) => winit,
            _ => panic!("called winit() on non-winit backend"),
        }
    }
}
