// SPDX-License-Identifier: GPL-3.0-only

//! The control channel: a local stream socket taking one command per
//! connection, plus the dispatcher that applies commands to the compositor
//! state. Subscribers keep their connection and receive one notification
//! per completed command.

pub mod command;
pub mod remote;
pub mod wire;

use std::{
    fmt, fs,
    io::{BufReader, ErrorKind},
    os::unix::{
        fs::DirBuilderExt,
        net::{UnixListener, UnixStream},
        process::CommandExt,
    },
    path::PathBuf,
};

use anyhow::Context;
use smithay::reexports::calloop::{
    Interest, LoopHandle, Mode as CalloopMode, PostAction,
    generic::Generic,
    signals::{Signal, Signals},
};
use tracing::{info, warn};

use crate::{
    config::MAX_SUBSCRIBERS,
    state::{State, Timber},
};
use self::command::Command;
use self::wire::Packet;

/// Errors surfaced to control clients, mapped onto errno values on the
/// wire and as process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NotFound,
    InvalidParam,
    NotEmpty,
    NoSpace,
    Io,
}

impl Error {
    pub fn errno(self) -> i32 {
        match self {
            Error::NotFound => libc::ENOENT,
            Error::InvalidParam => libc::EINVAL,
            Error::NotEmpty => libc::ENOTEMPTY,
            Error::NoSpace => libc::ENOSPC,
            Error::Io => libc::EIO,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::io::Error::from_raw_os_error(self.errno()))
    }
}

impl std::error::Error for Error {}

/// `$TMBR_CTRL_PATH`, else `<runtime_dir>/timber/<display>`.
pub fn socket_path(display: &str) -> PathBuf {
    if let Ok(path) = std::env::var("TMBR_CTRL_PATH") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("timber")
        .join(display)
}

/// Bind the control socket and register it with the event loop.
pub fn init(handle: &LoopHandle<'static, Timber>, display: &str) -> anyhow::Result<PathBuf> {
    let path = socket_path(display);
    if let Some(dir) = path.parent() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true).mode(0o700);
        builder
            .create(dir)
            .with_context(|| format!("creating control directory {}", dir.display()))?;
    }
    let _ = fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("binding control socket {}", path.display()))?;
    listener.set_nonblocking(true)?;

    handle
        .insert_source(
            Generic::new(listener, Interest::READ, CalloopMode::Level),
            |_, listener, timber| {
                loop {
                    match listener.accept() {
                        Ok((stream, _)) => handle_connection(timber, stream),
                        Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                        Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                        Err(err) => {
                            warn!(?err, "control socket accept failed");
                            break;
                        }
                    }
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|err| anyhow::anyhow!("registering control socket: {err}"))?;

    info!(path = %path.display(), "control socket ready");
    Ok(path)
}

/// SIGTERM/SIGINT stop the loop; SIGCHLD reaps spawned children.
pub fn init_signals(handle: &LoopHandle<'static, Timber>) -> anyhow::Result<()> {
    let term = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])?;
    handle
        .insert_source(term, |_, _, timber| timber.state.loop_signal.stop())
        .map_err(|err| anyhow::anyhow!("registering termination signals: {err}"))?;

    let child = Signals::new(&[Signal::SIGCHLD])?;
    handle
        .insert_source(child, |_, _, _| reap_children())
        .map_err(|err| anyhow::anyhow!("registering SIGCHLD: {err}"))?;
    Ok(())
}

fn reap_children() {
    loop {
        let pid = unsafe { libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
    }
}

pub fn handle_connection(timber: &mut Timber, stream: UnixStream) {
    if let Err(err) = serve(timber, stream) {
        warn!(?err, "control connection failed");
    }
}

fn serve(timber: &mut Timber, stream: UnixStream) -> anyhow::Result<()> {
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let Some(packet) = wire::read_packet(&mut reader)? else {
        return Ok(());
    };
    let Packet::Command(command) = packet else {
        anyhow::bail!("peer sent a non-command packet");
    };
    let mut stream = reader.into_inner();

    if command == Command::StateSubscribe {
        if timber.state.subscribers.len() >= MAX_SUBSCRIBERS {
            wire::write_packet(&mut stream, &Packet::Error(Error::NoSpace.errno()))?;
            return Ok(());
        }
        timber.state.subscribers.push(stream);
        return Ok(());
    }

    let result = execute(timber, &command);
    let errno = match &result {
        Ok(_) => 0,
        Err(err) => err.errno(),
    };
    if let Ok(lines) = &result {
        for line in lines {
            wire::write_packet(&mut stream, &Packet::Data(line.clone()))?;
        }
    }
    wire::write_packet(&mut stream, &Packet::Error(errno))?;
    Ok(())
}

/// Dispatch a command and, on success, notify every subscriber before the
/// next command can be processed.
pub fn execute(timber: &mut Timber, command: &Command) -> Result<Vec<String>, Error> {
    let result = dispatch(timber, command);
    if result.is_ok() {
        broadcast(&mut timber.state.subscribers, command);
    }
    result
}

fn broadcast(subscribers: &mut Vec<UnixStream>, command: &Command) {
    let line = format!("{{type: {}, error: 0}}", command.name());
    // a failed write closes the slot
    subscribers.retain_mut(|stream| {
        wire::write_packet(stream, &Packet::Data(line.clone())).is_ok()
    });
}

fn dispatch(timber: &mut Timber, command: &Command) -> Result<Vec<String>, Error> {
    let none = || Ok(Vec::new());
    match command {
        Command::ClientFocus(sel) => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let desktop = timber.state.focused_desktop();
            let sibling = timber.state.desktops[desktop]
                .tree
                .sibling_client(focus, *sel)
                .ok_or(Error::NotFound)?;
            timber.set_focus(Some(sibling));
            none()
        }
        Command::ClientFullscreen => {
            let desktop = timber.state.focused_desktop();
            let enable = !timber.state.desktops[desktop].fullscreen;
            if enable && timber.state.desktops[desktop].focus.is_none() {
                return Err(Error::NotFound);
            }
            timber.state.set_fullscreen(desktop, enable);
            none()
        }
        Command::ClientKill => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            timber.state.clients[focus].kill();
            none()
        }
        Command::ClientResize(dir, ratio) => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let desktop = timber.state.focused_desktop();
            timber.state.desktops[desktop].tree.resize(focus, *dir, *ratio)?;
            timber.state.recalculate(desktop);
            none()
        }
        Command::ClientSwap(sel) => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let desktop = timber.state.focused_desktop();
            let tree = &mut timber.state.desktops[desktop].tree;
            let leaf = tree.leaf(focus).ok_or(Error::NotFound)?;
            let sibling = tree.find_sibling(leaf, *sel).ok_or(Error::NotFound)?;
            tree.swap(leaf, sibling);
            timber.state.recalculate(desktop);
            none()
        }
        Command::ClientToDesktop(sel) => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let target = timber
                .state
                .sibling_desktop(timber.state.active_screen, *sel)
                .ok_or(Error::NotFound)?;
            timber.state.detach_client(focus);
            timber.state.attach_client(target, focus);
            timber.state.focus_desktop_client(target, Some(focus));
            timber.update_focus();
            none()
        }
        Command::ClientToScreen(sel) => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let screen = timber.state.sibling_screen(*sel).ok_or(Error::NotFound)?;
            let target = timber.state.screens[screen].active_desktop();
            timber.state.detach_client(focus);
            timber.state.attach_client(target, focus);
            timber.state.focus_desktop_client(target, Some(focus));
            timber.update_focus();
            none()
        }
        Command::DesktopFocus(sel) => {
            let screen = timber.state.active_screen;
            let target = timber
                .state
                .sibling_desktop(screen, *sel)
                .ok_or(Error::NotFound)?;
            timber.focus_desktop(screen, target);
            none()
        }
        Command::DesktopKill => {
            let screen = timber.state.active_screen;
            let desktop = timber.state.focused_desktop();
            timber.state.remove_desktop(screen, desktop)?;
            timber.update_focus();
            none()
        }
        Command::DesktopNew => {
            timber.state.add_desktop(timber.state.active_screen);
            timber.update_focus();
            none()
        }
        Command::DesktopSwap(sel) => {
            let screen = timber.state.active_screen;
            let desktop = timber.state.focused_desktop();
            let sibling = timber
                .state
                .sibling_desktop(screen, *sel)
                .ok_or(Error::NotFound)?;
            timber.state.swap_desktops(screen, desktop, sibling);
            none()
        }
        Command::ScreenFocus(sel) => {
            let screen = timber.state.sibling_screen(*sel).ok_or(Error::NotFound)?;
            timber.focus_screen(screen);
            none()
        }
        Command::ScreenMode {
            screen,
            width,
            height,
            refresh,
        } => {
            let idx = timber.state.screen_by_name(screen).ok_or(Error::NotFound)?;
            let output = timber.state.screens[idx].output.clone();
            let mode = output
                .modes()
                .into_iter()
                .find(|m| m.size.w == *width && m.size.h == *height && m.refresh == *refresh)
                .ok_or(Error::InvalidParam)?;
            output.change_current_state(Some(mode), None, None, None);
            timber.state.output_resized(&output);
            none()
        }
        Command::ScreenScale { screen, scale } => {
            if *scale == 0 || *scale >= 100 * 100 {
                return Err(Error::InvalidParam);
            }
            let idx = timber.state.screen_by_name(screen).ok_or(Error::NotFound)?;
            let output = timber.state.screens[idx].output.clone();
            let fractional = *scale as f64 / 100.0;
            output.change_current_state(
                None,
                None,
                Some(smithay::output::Scale::Fractional(fractional)),
                None,
            );
            timber.state.output_resized(&output);
            none()
        }
        Command::TreeRotate => {
            let focus = timber.state.find_focus().ok_or(Error::NotFound)?;
            let desktop = timber.state.focused_desktop();
            timber.state.desktops[desktop].tree.rotate(focus)?;
            timber.state.recalculate(desktop);
            none()
        }
        Command::StateQuery => Ok(snapshot(&timber.state)),
        // handled at the connection layer; dispatching it is a no-op
        Command::StateSubscribe => none(),
        Command::StateStop => {
            timber.state.loop_signal.stop();
            none()
        }
        Command::BindingAdd { binding, command } => {
            timber.state.bindings.insert(*binding, command.clone());
            none()
        }
    }
}

/// YAML-style state dump, one line per DATA packet.
fn snapshot(state: &State) -> Vec<String> {
    let mut lines = vec!["screens:".to_string()];
    for (i, screen) in state.screens.iter().enumerate() {
        lines.push(format!("- name: {}", screen.output.name()));
        lines.push(format!(
            "  geom: {{x: 0, y: 0, width: {}, height: {}}}",
            screen.size.w, screen.size.h
        ));
        lines.push(format!("  selected: {}", i == state.active_screen));
        lines.push("  desktops:".to_string());
        for (j, &desktop) in screen.desktops.iter().enumerate() {
            let d = &state.desktops[desktop];
            lines.push(format!("  - selected: {}", j == screen.active));
            lines.push(format!("    fullscreen: {}", d.fullscreen));
            if d.tree.is_empty() {
                continue;
            }
            lines.push("    clients:".to_string());
            for client in d.tree.clients() {
                let c = &state.clients[client];
                lines.push(format!("    - title: {}", c.title()));
                lines.push(format!(
                    "      geom: {{x: {}, y: {}, width: {}, height: {}}}",
                    c.rect.loc.x, c.rect.loc.y, c.rect.size.w, c.rect.size.h
                ));
                lines.push(format!("      selected: {}", d.focus == Some(client)));
            }
        }
    }
    lines
}

/// Run `command` through the shell, detached from the compositor.
pub fn spawn_shell(command: &str) {
    spawn("/bin/sh", &["-c", command]);
}

/// Double-fork `path` into its own session. The direct child exits at once
/// and is reaped here; the grandchild execs with a cleared signal mask.
pub fn spawn(path: &str, args: &[&str]) {
    let mut cmd = std::process::Command::new(path);
    cmd.args(args);
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() < 0 {
                return Err(std::io::Error::last_os_error());
            }
            match libc::fork() {
                -1 => return Err(std::io::Error::last_os_error()),
                0 => {}
                _ => libc::_exit(0),
            }
            let mut set: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigprocmask(libc::SIG_SETMASK, &set, std::ptr::null_mut());
            Ok(())
        });
    }
    match cmd.spawn() {
        Ok(mut child) => {
            let _ = child.wait();
        }
        Err(err) => warn!(?err, path, "failed to spawn"),
    }
}
