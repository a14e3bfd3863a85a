// SPDX-License-Identifier: GPL-3.0-only
// Based on smithay's smallvil example (MIT licensed)

use super::xdg_shell;
use crate::{Timber, state::ClientState};
use smithay::{
    backend::renderer::utils::{on_commit_buffer_handler, with_renderer_surface_state},
    delegate_compositor, delegate_shm,
    reexports::wayland_server::{
        Client,
        protocol::{wl_buffer, wl_surface::WlSurface},
    },
    wayland::{
        buffer::BufferHandler,
        compositor::{
            CompositorClientState, CompositorHandler, CompositorState, get_parent,
            is_sync_subsurface,
        },
        shm::{ShmHandler, ShmState},
    },
};

impl CompositorHandler for Timber {
    fn compositor_state(&mut self) -> &mut CompositorState {
        &mut self.state.compositor_state
    }

    fn client_compositor_state<'a>(&self, client: &'a Client) -> &'a CompositorClientState {
        &client.get_data::<ClientState>().unwrap().compositor_state
    }

    fn commit(&mut self, surface: &WlSurface) {
        on_commit_buffer_handler::<Self>(surface);

        if !is_sync_subsurface(surface) {
            let mut root = surface.clone();
            while let Some(parent) = get_parent(&root) {
                root = parent;
            }
            if let Some(client) = self.state.client_by_surface(&root) {
                self.state.clients[client].window.on_commit();
            }
        };

        if let Some(mapped) = xdg_shell::handle_commit(&mut self.state, surface) {
            // a fresh map takes focus on the focused desktop
            self.set_focus(Some(mapped));
        }
        self.handle_unmap(surface);

        self.backend.schedule_render(&self.state.screen().output);
    }
}

impl Timber {
    /// A commit without a buffer unmaps the client: it leaves its desktop
    /// and goes back to the pending list until it maps again.
    fn handle_unmap(&mut self, surface: &WlSurface) {
        let Some(client) = self.state.client_by_surface(surface) else {
            return;
        };
        let has_buffer =
            with_renderer_surface_state(surface, |s| s.buffer().is_some()).unwrap_or(false);
        if has_buffer {
            return;
        }
        let window = self.state.unmap_client(client);
        self.state.pending.push(window);
        self.update_focus();
    }
}

impl BufferHandler for Timber {
    // No-op: smithay handles buffer cleanup via BufferHandler
    fn buffer_destroyed(&mut self, _buffer: &wl_buffer::WlBuffer) {}
}

impl ShmHandler for Timber {
    fn shm_state(&self) -> &ShmState {
        &self.state.shm_state
    }
}

delegate_compositor!(Timber);
delegate_shm!(Timber);
