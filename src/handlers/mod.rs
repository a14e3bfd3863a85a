// SPDX-License-Identifier: GPL-3.0-only
// Based on smithay's smallvil example (MIT licensed)

mod compositor;
mod xdg_shell;

use crate::Timber;
use smithay::{
    delegate_data_device, delegate_idle_inhibit, delegate_idle_notify, delegate_output,
    delegate_primary_selection, delegate_seat,
    input::{
        Seat, SeatHandler, SeatState,
        dnd::{DnDGrab, DndGrabHandler, GrabType, Source},
        pointer::Focus,
    },
    reexports::wayland_server::{Resource, protocol::wl_surface::WlSurface},
    utils::Serial,
    wayland::{
        idle_inhibit::IdleInhibitHandler,
        idle_notify::{IdleNotifierHandler, IdleNotifierState},
        output::OutputHandler,
        selection::{
            SelectionHandler,
            data_device::{
                DataDeviceHandler, DataDeviceState, WaylandDndGrabHandler, set_data_device_focus,
            },
            primary_selection::{
                PrimarySelectionHandler, PrimarySelectionState, set_primary_focus,
            },
        },
    },
};

impl SeatHandler for Timber {
    type KeyboardFocus = WlSurface;
    type PointerFocus = WlSurface;
    type TouchFocus = WlSurface;

    fn seat_state(&mut self) -> &mut SeatState<Timber> {
        &mut self.state.seat_state
    }

    fn cursor_image(
        &mut self,
        _seat: &Seat<Self>,
        _image: smithay::input::pointer::CursorImageStatus,
    ) {
        // cursor drawing is left to the backend
    }

    // update clipboard/primary selection access when the focus changes
    fn focus_changed(&mut self, seat: &Seat<Self>, focused: Option<&WlSurface>) {
        let dh = &self.state.display_handle;
        let client = focused.and_then(|s| dh.get_client(s.id()).ok());
        set_data_device_focus(dh, seat, client.clone());
        set_primary_focus(dh, seat, client);
    }
}
delegate_seat!(Timber);

impl SelectionHandler for Timber {
    type SelectionUserData = ();
}

impl DataDeviceHandler for Timber {
    fn data_device_state(&mut self) -> &mut DataDeviceState {
        &mut self.state.data_device_state
    }
}
delegate_data_device!(Timber);

impl PrimarySelectionHandler for Timber {
    fn primary_selection_state(&self) -> &PrimarySelectionState {
        &self.state.primary_selection_state
    }
}
delegate_primary_selection!(Timber);

impl DndGrabHandler for Timber {}
impl WaylandDndGrabHandler for Timber {
    fn dnd_requested<S: Source>(
        &mut self,
        source: S,
        _icon: Option<WlSurface>,
        seat: Seat<Self>,
        serial: Serial,
        type_: GrabType,
    ) {
        match type_ {
            GrabType::Pointer => {
                let ptr = seat.get_pointer().unwrap();
                let start_data = ptr.grab_start_data().unwrap();

                let grab =
                    DnDGrab::new_pointer(&self.state.display_handle, start_data, source, seat);
                ptr.set_grab(self, grab, serial, Focus::Keep);
            }
            GrabType::Touch => {
                // timber doesn't support touch
                source.cancel();
            }
        }
    }
}

impl IdleNotifierHandler for Timber {
    fn idle_notifier_state(&mut self) -> &mut IdleNotifierState<Self> {
        &mut self.state.idle_notifier_state
    }
}
delegate_idle_notify!(Timber);

// idle is inhibited while at least one inhibitor is alive
impl IdleInhibitHandler for Timber {
    fn inhibit(&mut self, _surface: WlSurface) {
        self.state.idle_inhibitors += 1;
        self.state.idle_notifier_state.set_is_inhibited(true);
    }

    fn uninhibit(&mut self, _surface: WlSurface) {
        self.state.idle_inhibitors = self.state.idle_inhibitors.saturating_sub(1);
        if self.state.idle_inhibitors == 0 {
            self.state.idle_notifier_state.set_is_inhibited(false);
        }
    }
}
delegate_idle_inhibit!(Timber);

impl OutputHandler for Timber {}
delegate_output!(Timber);
