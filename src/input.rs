// SPDX-License-Identifier: GPL-3.0-only

use crate::{control, state::Timber};
use serde::{Deserialize, Serialize};
use smithay::{
    backend::input::{
        AbsolutePositionEvent, Axis, AxisSource, ButtonState, Event, InputBackend, InputEvent,
        KeyState, KeyboardKeyEvent, PointerAxisEvent, PointerButtonEvent,
    },
    input::{
        keyboard::{FilterResult, ModifiersState},
        pointer::{AxisFrame, ButtonEvent, MotionEvent},
    },
    utils::{Logical, Point, SERIAL_COUNTER},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mods {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub logo: bool,
}

impl From<&ModifiersState> for Mods {
    fn from(state: &ModifiersState) -> Self {
        Self {
            shift: state.shift,
            ctrl: state.ctrl,
            alt: state.alt,
            logo: state.logo,
        }
    }
}

/// Key of the binding table: a modifier set plus one keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub mods: Mods,
    pub keysym: u32,
}

impl Timber {
    pub fn process_input_event<I: InputBackend>(&mut self, event: InputEvent<I>) {
        let pointer = self.state.seat.get_pointer().unwrap();
        let keyboard = self.state.seat.get_keyboard().unwrap();
        let serial = SERIAL_COUNTER.next_serial();
        let seat = self.state.seat.clone();
        self.state.idle_notifier_state.notify_activity(&seat);

        match event {
            InputEvent::Keyboard { event, .. } => {
                let time = Event::time_msec(&event);
                let key_code = event.key_code();
                let key_state = event.state();

                let command = keyboard.input(
                    self,
                    key_code,
                    key_state,
                    serial,
                    time,
                    |timber, modifiers, handle| {
                        // only presses trigger bindings; releases and
                        // modifier changes are forwarded
                        if key_state != KeyState::Pressed {
                            return FilterResult::Forward;
                        }
                        // a keycode may produce several keysyms at the
                        // current layout; any of them may match
                        let mods = Mods::from(modifiers);
                        for sym in handle.raw_syms() {
                            let key = Binding {
                                mods,
                                keysym: sym.raw(),
                            };
                            if let Some(command) = timber.state.bindings.get(&key) {
                                return FilterResult::Intercept(command.clone());
                            }
                        }
                        FilterResult::Forward
                    },
                );

                if let Some(command) = command {
                    control::spawn_shell(&command);
                }
            }
            // TODO: handle relative PointerMotion when a DRM backend lands
            InputEvent::PointerMotion { .. } => {}
            InputEvent::PointerMotionAbsolute { event, .. } => {
                let geo = self.state.screen().geometry();
                let pos = event.position_transformed(geo.size) + geo.loc.to_f64();

                self.pointer_focus(pos);
                let target = self.state.surface_under(pos);

                pointer.motion(
                    self,
                    target,
                    &MotionEvent {
                        location: pos,
                        serial,
                        time: event.time_msec(),
                    },
                );
                pointer.frame(self);
            }
            InputEvent::PointerButton { event, .. } => {
                let button = event.button_code();
                let button_state = event.state();

                if button_state == ButtonState::Pressed
                    && !pointer.is_grabbed()
                    && let Some(client) = self.state.client_at(pointer.current_location())
                {
                    self.set_focus(Some(client));
                }

                pointer.button(
                    self,
                    &ButtonEvent {
                        button,
                        state: button_state,
                        serial,
                        time: event.time_msec(),
                    },
                );
                pointer.frame(self);
            }
            InputEvent::PointerAxis { event, .. } => {
                let source = event.source();

                // pixel amount for each axis, falling back to v120 steps
                let horizontal_amount = event.amount(Axis::Horizontal).unwrap_or_else(|| {
                    event.amount_v120(Axis::Horizontal).unwrap_or(0.0) * 15.0 / 120.
                });
                let vertical_amount = event.amount(Axis::Vertical).unwrap_or_else(|| {
                    event.amount_v120(Axis::Vertical).unwrap_or(0.0) * 15.0 / 120.
                });

                let horizontal_amount_discrete = event.amount_v120(Axis::Horizontal);
                let vertical_amount_discrete = event.amount_v120(Axis::Vertical);

                let mut frame = AxisFrame::new(event.time_msec()).source(source);
                if horizontal_amount != 0.0 {
                    frame = frame.value(Axis::Horizontal, horizontal_amount);
                    if let Some(discrete) = horizontal_amount_discrete {
                        frame = frame.v120(Axis::Horizontal, discrete as i32);
                    }
                }
                if vertical_amount != 0.0 {
                    frame = frame.value(Axis::Vertical, vertical_amount);
                    if let Some(discrete) = vertical_amount_discrete {
                        frame = frame.v120(Axis::Vertical, discrete as i32);
                    }
                }

                // trackpad: stop when the finger lifted
                if source == AxisSource::Finger {
                    if event.amount(Axis::Horizontal) == Some(0.0) {
                        frame = frame.stop(Axis::Horizontal);
                    }
                    if event.amount(Axis::Vertical) == Some(0.0) {
                        frame = frame.stop(Axis::Vertical);
                    }
                }

                pointer.axis(self, frame);
                pointer.frame(self);
            }
            _ => {}
        }
    }

    /// Focus the screen under the cursor, then the client whose box holds
    /// it. A fullscreen desktop keeps its focus regardless of position.
    fn pointer_focus(&mut self, pos: Point<f64, Logical>) {
        let Some(screen) = self
            .state
            .screens
            .iter()
            .position(|s| s.geometry().to_f64().contains(pos))
        else {
            return;
        };
        if screen != self.state.active_screen {
            self.focus_screen(screen);
        }
        let desktop = self.state.focused_desktop();
        if self.state.desktops[desktop].fullscreen {
            self.set_focus(self.state.desktops[desktop].focus);
        } else if let Some(client) = self.state.client_at(pos) {
            self.set_focus(Some(client));
        }
    }
}
