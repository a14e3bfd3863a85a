// SPDX-License-Identifier: GPL-3.0-only

//! The window-management core: the server owns screens, screens own an
//! ordered list of desktops, each desktop owns one tiling tree whose leaves
//! are the clients. All cross-references are generational slotmap keys, so
//! teardown order never matters.

pub mod tree;

use slotmap::new_key_type;
use smithay::{
    desktop::{Window, WindowSurfaceType},
    output::Output,
    reexports::{
        wayland_protocols::xdg::shell::server::xdg_toplevel,
        wayland_server::protocol::wl_surface::WlSurface,
    },
    utils::{Logical, Point, Rectangle, Size},
    wayland::{compositor::with_states, shell::xdg::XdgToplevelSurfaceData},
};

use crate::{config::BORDER_WIDTH, control::Error, state::State};
use tree::{Select, Split, Tree};

new_key_type! {
    pub struct ClientId;
    pub struct DesktopId;
}

/// One managed toplevel surface. Unmapped toplevels live in the server's
/// pending list instead; a `Client` always sits in a tree leaf.
#[derive(Debug)]
pub struct Client {
    pub window: Window,
    /// Last applied outer box, border included.
    pub rect: Rectangle<i32, Logical>,
    pub border: i32,
    pub desktop: Option<DesktopId>,
}

impl Client {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            rect: Rectangle::default(),
            border: 0,
            desktop: None,
        }
    }

    /// Area left for the surface once the border is subtracted.
    pub fn inner(&self) -> Rectangle<i32, Logical> {
        Rectangle::new(
            (self.rect.loc.x + self.border, self.rect.loc.y + self.border).into(),
            (
                self.rect.size.w - 2 * self.border,
                self.rect.size.h - 2 * self.border,
            )
                .into(),
        )
    }

    /// Apply a new outer box. The surface is asked to resize to the inner
    /// area whenever geometry or border changed.
    pub fn set_box(&mut self, rect: Rectangle<i32, Logical>, border: i32) {
        if self.rect == rect && self.border == border {
            return;
        }
        self.rect = rect;
        self.border = border;
        if let Some(tl) = self.window.toplevel() {
            tl.with_pending_state(|state| {
                state.size = Some((rect.size.w - 2 * border, rect.size.h - 2 * border).into());
            });
            tl.send_pending_configure();
        }
    }

    pub fn set_activated(&mut self, activated: bool) {
        self.window.set_activated(activated);
        if let Some(tl) = self.window.toplevel() {
            tl.send_pending_configure();
        }
    }

    fn set_fullscreen_state(&self, fullscreen: bool) {
        if let Some(tl) = self.window.toplevel() {
            tl.with_pending_state(|state| {
                if fullscreen {
                    state.states.set(xdg_toplevel::State::Fullscreen);
                } else {
                    state.states.unset(xdg_toplevel::State::Fullscreen);
                }
            });
            tl.send_pending_configure();
        }
    }

    /// Ask the client to close; unmap/destroy follow from the surface.
    pub fn kill(&self) {
        if let Some(tl) = self.window.toplevel() {
            tl.send_close();
        }
    }

    pub fn wl_surface(&self) -> Option<WlSurface> {
        self.window.toplevel().map(|tl| tl.wl_surface().clone())
    }

    pub fn title(&self) -> String {
        let Some(tl) = self.window.toplevel() else {
            return String::new();
        };
        with_states(tl.wl_surface(), |states| {
            states
                .data_map
                .get::<XdgToplevelSurfaceData>()
                .and_then(|data| data.lock().unwrap().title.clone())
                .unwrap_or_default()
        })
    }
}

/// A virtual workspace. `focus` is empty iff the tree is empty; fullscreen
/// implies a focus.
#[derive(Debug, Default)]
pub struct Desktop {
    pub tree: Tree,
    pub focus: Option<ClientId>,
    pub fullscreen: bool,
}

/// One physical output with its ordered desktops.
#[derive(Debug)]
pub struct Screen {
    pub output: Output,
    pub size: Size<i32, Logical>,
    pub desktops: Vec<DesktopId>,
    pub active: usize,
}

impl Screen {
    pub fn active_desktop(&self) -> DesktopId {
        self.desktops[self.active]
    }

    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        Rectangle::from_size(self.size)
    }

    fn effective_size(output: &Output) -> Size<i32, Logical> {
        let mode = output.current_mode().expect("output must have a mode");
        let scale = output.current_scale().fractional_scale();
        mode.size.to_f64().to_logical(scale).to_i32_round()
    }
}

impl State {
    // === Lookups ===

    pub fn screen(&self) -> &Screen {
        &self.screens[self.active_screen]
    }

    pub fn focused_desktop(&self) -> DesktopId {
        self.screen().active_desktop()
    }

    /// The focused screen's focused desktop's focused client.
    pub fn find_focus(&self) -> Option<ClientId> {
        self.desktops[self.focused_desktop()].focus
    }

    pub fn screen_of(&self, desktop: DesktopId) -> usize {
        self.screens
            .iter()
            .position(|s| s.desktops.contains(&desktop))
            .expect("desktop must belong to a screen")
    }

    pub fn screen_by_output(&self, output: &Output) -> Option<usize> {
        self.screens.iter().position(|s| &s.output == output)
    }

    pub fn screen_by_name(&self, name: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.output.name() == name)
    }

    pub fn client_by_surface(&self, surface: &WlSurface) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| {
                c.window
                    .toplevel()
                    .is_some_and(|tl| tl.wl_surface() == surface)
            })
            .map(|(id, _)| id)
    }

    /// First leaf of the focused desktop whose box contains `pos`.
    pub fn client_at(&self, pos: Point<f64, Logical>) -> Option<ClientId> {
        let desktop = &self.desktops[self.focused_desktop()];
        desktop
            .tree
            .clients()
            .find(|&c| self.clients[c].rect.to_f64().contains(pos))
    }

    /// Clients of a screen's visible desktop in draw order. Fullscreen
    /// shows only the focused client.
    pub fn visible_clients(&self, screen: usize) -> Vec<ClientId> {
        let desktop = &self.desktops[self.screens[screen].active_desktop()];
        if desktop.fullscreen {
            desktop.focus.into_iter().collect()
        } else {
            desktop.tree.clients().collect()
        }
    }

    pub fn surface_under(
        &self,
        pos: Point<f64, Logical>,
    ) -> Option<(WlSurface, Point<f64, Logical>)> {
        let desktop = &self.desktops[self.focused_desktop()];
        let client = if desktop.fullscreen {
            desktop.focus
        } else {
            self.client_at(pos)
        }?;
        let client = &self.clients[client];
        let loc = client.inner().loc - client.window.geometry().loc;
        let rel = pos - loc.to_f64();
        client
            .window
            .surface_under(rel, WindowSurfaceType::ALL)
            .map(|(surface, point)| (surface, (point + loc).to_f64()))
    }

    // === Screens ===

    pub fn add_screen(&mut self, output: Output) {
        let size = Screen::effective_size(&output);
        let desktop = self.desktops.insert(Desktop::default());
        self.screens.push(Screen {
            output,
            size,
            desktops: vec![desktop],
            active: 0,
        });
    }

    /// Tear down a screen whose output went away. Desktops migrate to a
    /// sibling screen; returns false when the last screen is gone and the
    /// event loop should stop.
    pub fn remove_screen(&mut self, idx: usize) -> bool {
        let screen = self.screens.remove(idx);
        if self.active_screen >= idx && self.active_screen > 0 {
            self.active_screen -= 1;
        }

        if self.screens.is_empty() {
            for &desktop in &screen.desktops {
                let clients: Vec<_> = self.desktops[desktop].tree.clients().collect();
                for client in clients {
                    self.desktops[desktop].tree.remove(client);
                    self.clients.remove(client);
                }
            }
            for desktop in screen.desktops {
                self.desktops.remove(desktop);
            }
            return false;
        }

        let target = self.active_screen;
        let migrated = screen.desktops.clone();
        self.screens[target].desktops.extend(screen.desktops);
        for desktop in migrated {
            self.recalculate(desktop);
        }
        true
    }

    // === Desktop list ===

    /// Insert a fresh desktop right after the focused one and focus it.
    pub fn add_desktop(&mut self, screen: usize) -> DesktopId {
        let id = self.desktops.insert(Desktop::default());
        let s = &mut self.screens[screen];
        let at = if s.desktops.is_empty() { 0 } else { s.active + 1 };
        s.desktops.insert(at, id);
        s.active = at;
        id
    }

    /// Unlink an empty desktop. Requires at least one sibling; the next
    /// sibling inherits focus if the desktop was focused.
    pub fn remove_desktop(&mut self, screen: usize, desktop: DesktopId) -> Result<(), Error> {
        let s = &self.screens[screen];
        let pos = s
            .desktops
            .iter()
            .position(|&d| d == desktop)
            .ok_or(Error::NotFound)?;
        if s.desktops.len() < 2 {
            return Err(Error::NotFound);
        }
        if !self.desktops[desktop].tree.is_empty() {
            return Err(Error::NotEmpty);
        }

        let s = &mut self.screens[screen];
        let mut active = if s.active == pos {
            (pos + 1) % s.desktops.len()
        } else {
            s.active
        };
        s.desktops.remove(pos);
        if active > pos {
            active -= 1;
        }
        s.active = active;
        self.desktops.remove(desktop);
        Ok(())
    }

    /// Exchange the list positions of two desktops of the same screen.
    pub fn swap_desktops(&mut self, screen: usize, a: DesktopId, b: DesktopId) {
        let s = &mut self.screens[screen];
        let find = |d| {
            s.desktops
                .iter()
                .position(|&x| x == d)
                .expect("desktop swap requires both desktops on the same screen")
        };
        let (pa, pb) = (find(a), find(b));
        s.desktops.swap(pa, pb);
        if s.active == pa {
            s.active = pb;
        } else if s.active == pb {
            s.active = pa;
        }
    }

    /// Cyclic sibling in a screen's desktop list; `None` without siblings.
    pub fn sibling_desktop(&self, screen: usize, which: Select) -> Option<DesktopId> {
        let s = &self.screens[screen];
        if s.desktops.len() < 2 {
            return None;
        }
        let step = match which {
            Select::Prev => -1,
            _ => 1,
        };
        let idx = (s.active as i32 + step).rem_euclid(s.desktops.len() as i32);
        Some(s.desktops[idx as usize])
    }

    /// Cyclic sibling in the screen list; `None` without siblings.
    pub fn sibling_screen(&self, which: Select) -> Option<usize> {
        if self.screens.len() < 2 {
            return None;
        }
        let step = match which {
            Select::Prev => -1,
            _ => 1,
        };
        Some((self.active_screen as i32 + step).rem_euclid(self.screens.len() as i32) as usize)
    }

    // === Client membership ===

    /// Insert a client into a desktop's tree at the focus leaf. Any new
    /// client exits fullscreen.
    pub fn attach_client(&mut self, desktop: DesktopId, client: ClientId) {
        let at = self.desktops[desktop].focus;
        let split = at
            .map(|focus| {
                let rect = self.clients[focus].rect;
                if rect.size.w < rect.size.h {
                    Split::Horizontal
                } else {
                    Split::Vertical
                }
            })
            .unwrap_or(Split::Vertical);
        self.desktops[desktop].tree.insert(client, at, split);
        self.clients[client].desktop = Some(desktop);
        self.set_fullscreen(desktop, false);
        self.recalculate(desktop);
    }

    /// Remove a client from its desktop. If it was the focus, the nearest
    /// sibling leaf inherits it.
    pub fn detach_client(&mut self, client: ClientId) {
        let Some(desktop) = self.clients[client].desktop else {
            return;
        };
        let d = &self.desktops[desktop];
        if d.focus == Some(client) {
            let next = d.tree.sibling_client(client, Select::Nearest);
            self.focus_desktop_client(desktop, next);
        }
        self.desktops[desktop].tree.remove(client);
        self.set_fullscreen(desktop, false);
        self.recalculate(desktop);
        self.clients[client].desktop = None;
    }

    /// Desktop-level focus bookkeeping: deactivate the old focus, record
    /// the new one, drop fullscreen on change. Input focus is handled by
    /// `Timber::set_focus`.
    pub fn focus_desktop_client(&mut self, desktop: DesktopId, client: Option<ClientId>) {
        let d = &self.desktops[desktop];
        if d.focus == client {
            return;
        }
        if let Some(old) = d.focus
            && self.clients.contains_key(old)
        {
            self.clients[old].set_activated(false);
        }
        self.desktops[desktop].focus = client;
        if self.desktops[desktop].fullscreen {
            self.set_fullscreen(desktop, false);
        }
    }

    pub fn map_window(&mut self, window: Window) -> ClientId {
        let client = self.clients.insert(Client::new(window));
        let desktop = self.focused_desktop();
        self.attach_client(desktop, client);
        client
    }

    /// Detach and free a client, handing its window back to the caller.
    pub fn unmap_client(&mut self, client: ClientId) -> Window {
        self.detach_client(client);
        self.clients.remove(client).expect("client must exist").window
    }

    // === Geometry ===

    /// Apply the tree layout of a desktop to its clients' boxes. A
    /// fullscreen desktop gives the focused client the whole screen,
    /// borderless.
    pub fn recalculate(&mut self, desktop: DesktopId) {
        let screen = self.screen_of(desktop);
        let area = self.screens[screen].geometry();
        let d = &self.desktops[desktop];
        if d.fullscreen {
            if let Some(focus) = d.focus {
                self.set_client_box(focus, area, 0);
            }
        } else {
            let rects = d.tree.layout(area);
            for (client, rect) in rects {
                self.set_client_box(client, rect, BORDER_WIDTH);
            }
        }
    }

    fn set_client_box(&mut self, client: ClientId, rect: Rectangle<i32, Logical>, border: i32) {
        self.clients[client].set_box(rect, border);
    }

    /// Toggle a desktop's fullscreen flag. Enabling requires a focus;
    /// disabling is always legal.
    pub fn set_fullscreen(&mut self, desktop: DesktopId, fullscreen: bool) {
        let d = &self.desktops[desktop];
        if d.fullscreen == fullscreen || (fullscreen && d.focus.is_none()) {
            return;
        }
        self.desktops[desktop].fullscreen = fullscreen;
        if let Some(focus) = self.desktops[desktop].focus
            && self.clients.contains_key(focus)
        {
            self.clients[focus].set_fullscreen_state(fullscreen);
        }
        self.recalculate(desktop);
    }

    // === Output events ===

    /// Mode or scale changed: recompute the effective size and relayout
    /// every desktop of the screen.
    pub fn output_resized(&mut self, output: &Output) {
        let Some(idx) = self.screen_by_output(output) else {
            return;
        };
        self.screens[idx].size = Screen::effective_size(output);
        let desktops = self.screens[idx].desktops.clone();
        for desktop in desktops {
            self.recalculate(desktop);
        }
    }

    /// Cross-checks the structural invariants of the hierarchy; test builds
    /// only.
    #[cfg(test)]
    pub(crate) fn verify(&self) {
        assert!(!self.screens.is_empty() || self.desktops.is_empty());
        for (idx, screen) in self.screens.iter().enumerate() {
            assert!(
                !screen.desktops.is_empty(),
                "screen {idx} must keep at least one desktop"
            );
            assert!(screen.active < screen.desktops.len());
            for &desktop in &screen.desktops {
                let d = &self.desktops[desktop];
                d.tree.verify();
                match d.focus {
                    Some(focus) => {
                        assert!(
                            d.tree.leaf(focus).is_some(),
                            "focus must be a leaf of the desktop's tree"
                        );
                        assert_eq!(self.clients[focus].desktop, Some(desktop));
                    }
                    None => {
                        assert!(d.tree.is_empty(), "focus may only be empty on an empty tree");
                        assert!(!d.fullscreen, "fullscreen requires a focus");
                    }
                }
                for client in d.tree.clients() {
                    assert_eq!(self.clients[client].desktop, Some(desktop));
                }
            }
        }
    }
}
