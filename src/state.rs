// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    backend::Backend,
    config,
    input::Binding,
    shell::{Client, ClientId, Desktop, DesktopId, Screen},
};
use slotmap::SlotMap;
use smithay::{
    desktop::{PopupManager, Window},
    input::{Seat, SeatState},
    reexports::{
        calloop::{
            EventLoop, Interest, LoopHandle, LoopSignal, Mode as CalloopMode, PostAction,
            generic::Generic,
        },
        wayland_server::{
            Display, DisplayHandle,
            backend::{ClientData, ClientId as WlClientId, DisconnectReason},
            protocol::wl_surface::WlSurface,
        },
    },
    utils::SERIAL_COUNTER,
    wayland::{
        compositor::{CompositorClientState, CompositorState},
        idle_inhibit::IdleInhibitManagerState,
        idle_notify::IdleNotifierState,
        output::OutputManagerState,
        selection::{
            data_device::DataDeviceState, primary_selection::PrimarySelectionState,
        },
        shell::xdg::{ToplevelSurface, XdgShellState, decoration::XdgDecorationState},
        shm::ShmState,
        socket::ListeningSocketSource,
    },
};
use std::{
    collections::HashMap, ffi::OsString, os::unix::net::UnixStream, sync::Arc,
};

pub struct Timber {
    pub backend: Backend,
    pub state: State,
}

impl Timber {
    pub fn new() -> (EventLoop<'static, Timber>, Self) {
        let event_loop: EventLoop<Timber> = EventLoop::try_new().expect("event loop");
        let loop_handle = event_loop.handle();

        // insert event source to dispatch protocol messages from clients
        let display: Display<Timber> = Display::new().unwrap();
        let display_handle = display.handle();
        let display_source = Generic::new(display, Interest::READ, CalloopMode::Level);
        loop_handle
            .insert_source(display_source, |_, display, timber| {
                unsafe {
                    display.get_mut().dispatch_clients(timber).unwrap();
                }
                Ok(PostAction::Continue)
            })
            .unwrap();

        let mut state = State::new(display_handle, loop_handle.clone(), event_loop.get_signal());

        // insert event source to accept new client connections on the Wayland socket
        let socket = ListeningSocketSource::new_auto().unwrap();
        state.socket = socket.socket_name().to_os_string();
        loop_handle
            .insert_source(socket, |stream, _, tb| tb.state.insert_client(stream))
            .unwrap();

        (
            event_loop,
            Self {
                backend: Backend::Unset,
                state,
            },
        )
    }

    /// Sync input focus to the focused screen's focused desktop's focus.
    pub fn update_focus(&mut self) {
        self.set_focus(self.state.find_focus());
    }

    /// Make `client` the focus of the visible desktop and hand it keyboard
    /// focus. A focus change drops fullscreen.
    pub fn set_focus(&mut self, client: Option<ClientId>) {
        let desktop = self.state.focused_desktop();
        self.state.focus_desktop_client(desktop, client);
        if let Some(c) = client
            && self.state.clients.contains_key(c)
        {
            self.state.clients[c].set_activated(true);
        }

        let target = client
            .and_then(|c| self.state.clients.get(c))
            .and_then(Client::wl_surface);
        if let Some(keyboard) = self.state.seat.get_keyboard() {
            keyboard.set_focus(self, target, SERIAL_COUNTER.next_serial());
        }
    }

    /// Focus a desktop of `screen`; the screen becomes the server's focused
    /// screen and input focus follows the desktop's focus.
    pub fn focus_desktop(&mut self, screen: usize, desktop: DesktopId) {
        let pos = self.state.screens[screen]
            .desktops
            .iter()
            .position(|&d| d == desktop)
            .expect("desktop focus requires a desktop of the same screen");
        self.state.screens[screen].active = pos;
        self.state.active_screen = screen;
        self.set_focus(self.state.desktops[desktop].focus);
    }

    pub fn focus_screen(&mut self, screen: usize) {
        let desktop = self.state.screens[screen].active_desktop();
        self.focus_desktop(screen, desktop);
    }
}

/// Core compositor state (everything except backend)
pub struct State {
    pub start_time: std::time::Instant,
    pub socket: OsString,
    pub display_handle: DisplayHandle,
    pub loop_handle: LoopHandle<'static, Timber>,
    pub loop_signal: LoopSignal,
    pub compositor_state: CompositorState,
    pub xdg_shell_state: XdgShellState,
    pub xdg_decoration_state: XdgDecorationState,
    pub shm_state: ShmState,
    pub output_manager_state: OutputManagerState,
    pub seat_state: SeatState<Timber>,
    pub data_device_state: DataDeviceState,
    pub primary_selection_state: PrimarySelectionState,
    pub idle_notifier_state: IdleNotifierState<Timber>,
    pub idle_inhibit_state: IdleInhibitManagerState,
    pub idle_inhibitors: usize,
    pub popups: PopupManager,
    pub seat: Seat<Timber>,
    pub screens: Vec<Screen>,
    pub active_screen: usize,
    pub desktops: SlotMap<DesktopId, Desktop>,
    pub clients: SlotMap<ClientId, Client>,
    pub pending: Vec<Window>,
    pub bindings: HashMap<Binding, String>,
    pub subscribers: Vec<UnixStream>,
}

impl State {
    pub fn new(
        dh: DisplayHandle,
        loop_handle: LoopHandle<'static, Timber>,
        signal: LoopSignal,
    ) -> Self {
        let compositor_state = CompositorState::new::<Timber>(&dh);
        let xdg_shell_state = XdgShellState::new::<Timber>(&dh);
        let xdg_decoration_state = XdgDecorationState::new::<Timber>(&dh);
        let shm_state = ShmState::new::<Timber>(&dh, vec![]);
        let output_manager_state = OutputManagerState::new_with_xdg_output::<Timber>(&dh);
        let data_device_state = DataDeviceState::new::<Timber>(&dh);
        let primary_selection_state = PrimarySelectionState::new::<Timber>(&dh);
        let idle_notifier_state = IdleNotifierState::<Timber>::new(&dh, loop_handle.clone());
        let idle_inhibit_state = IdleInhibitManagerState::new::<Timber>(&dh);

        let mut seat_state = SeatState::new();
        let mut seat = seat_state.new_wl_seat(&dh, config::SEAT_NAME);
        seat.add_keyboard(
            Default::default(),
            config::REPEAT_DELAY,
            config::REPEAT_RATE,
        )
        .unwrap();
        seat.add_pointer();

        Self {
            start_time: std::time::Instant::now(),
            socket: OsString::new(),
            display_handle: dh,
            loop_handle,
            loop_signal: signal,
            compositor_state,
            xdg_shell_state,
            xdg_decoration_state,
            shm_state,
            output_manager_state,
            seat_state,
            data_device_state,
            primary_selection_state,
            idle_notifier_state,
            idle_inhibit_state,
            idle_inhibitors: 0,
            popups: PopupManager::default(),
            seat,
            screens: Vec::new(),
            active_screen: 0,
            desktops: SlotMap::with_key(),
            clients: SlotMap::with_key(),
            pending: Vec::new(),
            bindings: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn find_pending(&self, surface: &WlSurface) -> Option<(usize, ToplevelSurface)> {
        for (i, w) in self.pending.iter().enumerate() {
            if let Some(tl) = w.toplevel()
                && tl.wl_surface() == surface
            {
                return Some((i, tl.clone()));
            }
        }
        None
    }

    pub fn insert_client(&mut self, stream: UnixStream) {
        self.display_handle
            .insert_client(stream, Arc::new(ClientState::default()))
            .unwrap();
    }

    pub fn flush_clients(&mut self) {
        let _ = self.display_handle.flush_clients();
    }
}

/// Data associated with a wayland client.
#[derive(Default)]
pub struct ClientState {
    pub compositor_state: CompositorClientState,
}

impl ClientData for ClientState {
    fn initialized(&self, _client_id: WlClientId) {}
    fn disconnected(&self, _client_id: WlClientId, _reason: DisconnectReason) {}
}
