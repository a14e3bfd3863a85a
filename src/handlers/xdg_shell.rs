// SPDX-License-Identifier: GPL-3.0-only

use crate::{Timber, shell::ClientId, state::State};
use smithay::{
    backend::renderer::utils::with_renderer_surface_state,
    delegate_xdg_decoration, delegate_xdg_shell,
    desktop::{PopupKind, Window, find_popup_root_surface, get_popup_toplevel_coords},
    reexports::{
        wayland_protocols::xdg::decoration::zv1::server::zxdg_toplevel_decoration_v1::Mode,
        wayland_protocols::xdg::shell::server::xdg_toplevel::ResizeEdge,
        wayland_server::protocol::{wl_output::WlOutput, wl_seat, wl_surface::WlSurface},
    },
    utils::Serial,
    wayland::{
        compositor::with_states,
        shell::xdg::{
            PopupSurface, PositionerState, ToplevelSurface, XdgShellHandler, XdgShellState,
            XdgToplevelSurfaceData, decoration::XdgDecorationHandler,
        },
    },
};

impl XdgShellHandler for Timber {
    fn xdg_shell_state(&mut self) -> &mut XdgShellState {
        &mut self.state.xdg_shell_state
    }

    fn new_toplevel(&mut self, surface: ToplevelSurface) {
        self.state.pending.push(Window::new_wayland_window(surface));
    }

    fn toplevel_destroyed(&mut self, surface: ToplevelSurface) {
        let wl = surface.wl_surface();
        self.state
            .pending
            .retain(|w| w.toplevel().is_none_or(|tl| tl.wl_surface() != wl));
        if let Some(client) = self.state.client_by_surface(wl) {
            self.state.unmap_client(client);
            self.update_focus();
            self.backend.schedule_render(&self.state.screen().output);
        }
    }

    fn new_popup(&mut self, surface: PopupSurface, _positioner: PositionerState) {
        self.unconstrain_popup(&surface);
        let _ = self.state.popups.track_popup(PopupKind::Xdg(surface));
    }

    fn reposition_request(
        &mut self,
        surface: PopupSurface,
        positioner: PositionerState,
        token: u32,
    ) {
        surface.with_pending_state(|state| {
            let geometry = positioner.get_geometry();
            state.geometry = geometry;
            state.positioner = positioner;
        });
        self.unconstrain_popup(&surface);
        surface.send_repositioned(token);
    }

    fn fullscreen_request(&mut self, surface: ToplevelSurface, _output: Option<WlOutput>) {
        if let Some(client) = self.state.client_by_surface(surface.wl_surface())
            && let Some(desktop) = self.state.clients[client].desktop
        {
            // fullscreen always applies to the desktop's focus
            self.state.focus_desktop_client(desktop, Some(client));
            self.state.set_fullscreen(desktop, true);
        }
        // the protocol expects a configure even when nothing changed
        surface.send_configure();
    }

    fn unfullscreen_request(&mut self, surface: ToplevelSurface) {
        if let Some(client) = self.state.client_by_surface(surface.wl_surface())
            && let Some(desktop) = self.state.clients[client].desktop
        {
            self.state.set_fullscreen(desktop, false);
        }
        surface.send_configure();
    }

    fn move_request(&mut self, _surface: ToplevelSurface, _seat: wl_seat::WlSeat, _serial: Serial) {
        // ignored, the tree controls window placement
    }

    fn resize_request(
        &mut self,
        _surface: ToplevelSurface,
        _seat: wl_seat::WlSeat,
        _serial: Serial,
        _edges: ResizeEdge,
    ) {
        // ignored, the tree controls window sizing
    }

    fn grab(&mut self, _surface: PopupSurface, _seat: wl_seat::WlSeat, _serial: Serial) {
        // TODO: implement popup grabs
    }
}

delegate_xdg_shell!(Timber);

// force server-side decorations
impl XdgDecorationHandler for Timber {
    fn new_decoration(&mut self, toplevel: ToplevelSurface) {
        Self::set_server_side_decoration(&toplevel, false);
    }

    fn request_mode(&mut self, toplevel: ToplevelSurface, _mode: Mode) {
        Self::set_server_side_decoration(&toplevel, true);
    }

    fn unset_mode(&mut self, toplevel: ToplevelSurface) {
        Self::set_server_side_decoration(&toplevel, true);
    }
}

delegate_xdg_decoration!(Timber);

/// called on `WlSurface::commit`.
/// returns the client id if a pending window just mapped.
pub fn handle_commit(state: &mut State, surface: &WlSurface) -> Option<ClientId> {
    let mut mapped = None;
    if let Some((idx, tl)) = state.find_pending(surface) {
        let sent = with_states(surface, |states| {
            let mutex = states.data_map.get::<XdgToplevelSurfaceData>().unwrap();
            mutex.lock().unwrap().initial_configure_sent
        });
        if !sent {
            // send initial configure with (0,0) to get the client's preferred size
            tl.send_configure();
        } else {
            let has_buffer =
                with_renderer_surface_state(surface, |s| s.buffer().is_some()).unwrap_or(false);
            if has_buffer {
                let window = state.pending.remove(idx);
                window.on_commit();
                mapped = Some(state.map_window(window));
            }
        }
    }

    state.popups.commit(surface);
    if let Some(popup) = state.popups.find_popup(surface) {
        match popup {
            PopupKind::Xdg(ref xdg) => {
                if !xdg.is_initial_configure_sent() {
                    // crash when a popup has no parent. should not happen,
                    // but if it does we want to notice it (crash)
                    xdg.send_configure().expect("initial configure");
                }
            }
            PopupKind::InputMethod(_) => {}
        }
    }

    mapped
}

impl Timber {
    fn set_server_side_decoration(toplevel: &ToplevelSurface, send_configure: bool) {
        toplevel.with_pending_state(|state| {
            state.decoration_mode = Some(Mode::ServerSide);
        });
        if send_configure && toplevel.is_initial_configure_sent() {
            toplevel.send_pending_configure();
        }
    }

    // reposition popup if it extends beyond the screen edge
    pub(crate) fn unconstrain_popup(&self, popup: &PopupSurface) {
        let kind = PopupKind::Xdg(popup.clone());
        let Ok(root) = find_popup_root_surface(&kind) else {
            return;
        };

        let popup_offset = get_popup_toplevel_coords(&kind);
        let Some(parent) = self.state.client_by_surface(&root) else {
            return;
        };
        let parent_loc = self.state.clients[parent].inner().loc;

        // convert the screen rect to popup-local coordinates
        let mut target = self.state.screen().geometry();
        target.loc -= parent_loc;
        target.loc -= popup_offset;

        popup.with_pending_state(|state| {
            state.geometry = state.positioner.get_unconstrained_geometry(target);
        });
    }
}
