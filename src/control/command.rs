// SPDX-License-Identifier: GPL-3.0-only

use anyhow::{Context, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use smithay::input::keyboard::xkb;

use crate::{
    input::{Binding, Mods},
    shell::tree::{Direction, Select},
};

/// One control-channel request. Argument validation that needs server state
/// (advertised modes, ratio bounds) happens at dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    ClientFocus(Select),
    ClientFullscreen,
    ClientKill,
    ClientResize(Direction, u8),
    ClientSwap(Select),
    ClientToDesktop(Select),
    ClientToScreen(Select),
    DesktopFocus(Select),
    DesktopKill,
    DesktopNew,
    DesktopSwap(Select),
    ScreenFocus(Select),
    ScreenMode {
        screen: String,
        width: i32,
        height: i32,
        /// millihertz, matching the advertised mode refresh
        refresh: i32,
    },
    ScreenScale {
        screen: String,
        /// fractional scale multiplied by 100
        scale: u32,
    },
    TreeRotate,
    StateQuery,
    StateSubscribe,
    StateStop,
    BindingAdd {
        binding: Binding,
        command: String,
    },
}

impl Command {
    /// Stable name used in subscriber notifications.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ClientFocus(_) => "client_focus",
            Command::ClientFullscreen => "client_fullscreen",
            Command::ClientKill => "client_kill",
            Command::ClientResize(..) => "client_resize",
            Command::ClientSwap(_) => "client_swap",
            Command::ClientToDesktop(_) => "client_to_desktop",
            Command::ClientToScreen(_) => "client_to_screen",
            Command::DesktopFocus(_) => "desktop_focus",
            Command::DesktopKill => "desktop_kill",
            Command::DesktopNew => "desktop_new",
            Command::DesktopSwap(_) => "desktop_swap",
            Command::ScreenFocus(_) => "screen_focus",
            Command::ScreenMode { .. } => "screen_mode",
            Command::ScreenScale { .. } => "screen_scale",
            Command::TreeRotate => "tree_rotate",
            Command::StateQuery => "state_query",
            Command::StateSubscribe => "state_subscribe",
            Command::StateStop => "state_stop",
            Command::BindingAdd { .. } => "binding_add",
        }
    }
}

pub const USAGE: &str = "\
usage: timber run
       timber client focus <prev|next|nearest>
       timber client fullscreen
       timber client kill
       timber client resize <north|south|east|west> <1-99>
       timber client swap <prev|next|nearest>
       timber client to_desktop <prev|next>
       timber client to_screen <prev|next>
       timber desktop focus <prev|next>
       timber desktop kill
       timber desktop new
       timber desktop swap <prev|next>
       timber screen focus <prev|next>
       timber screen mode <name> <WxH@Hz>
       timber screen scale <name> <scale*100>
       timber tree rotate
       timber state <query|subscribe|stop>
       timber binding add <mods+key> <command>";

/// Parse a `<domain> <verb> [args..]` command line.
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let mut words = args.iter().map(String::as_str);
    let domain = words.next().context("missing command domain")?;
    let verb = words.next().context("missing command verb")?;
    let mut arg = move || words.next().context("missing argument");

    let command = match (domain, verb) {
        ("client", "focus") => Command::ClientFocus(parse_select(arg()?)?),
        ("client", "fullscreen") => Command::ClientFullscreen,
        ("client", "kill") => Command::ClientKill,
        ("client", "resize") => {
            let dir = parse_direction(arg()?)?;
            let ratio: u8 = arg()?.parse().context("ratio must be a number")?;
            if !(1..=99).contains(&ratio) {
                bail!("ratio must be within 1..99");
            }
            Command::ClientResize(dir, ratio)
        }
        ("client", "swap") => Command::ClientSwap(parse_select(arg()?)?),
        ("client", "to_desktop") => Command::ClientToDesktop(parse_select(arg()?)?),
        ("client", "to_screen") => Command::ClientToScreen(parse_select(arg()?)?),
        ("desktop", "focus") => Command::DesktopFocus(parse_select(arg()?)?),
        ("desktop", "kill") => Command::DesktopKill,
        ("desktop", "new") => Command::DesktopNew,
        ("desktop", "swap") => Command::DesktopSwap(parse_select(arg()?)?),
        ("screen", "focus") => Command::ScreenFocus(parse_select(arg()?)?),
        ("screen", "mode") => {
            let screen = arg()?.to_string();
            let (width, height, refresh) = parse_mode(arg()?)?;
            Command::ScreenMode {
                screen,
                width,
                height,
                refresh,
            }
        }
        ("screen", "scale") => {
            let screen = arg()?.to_string();
            let scale = arg()?.parse().context("scale must be a number")?;
            Command::ScreenScale { screen, scale }
        }
        ("tree", "rotate") => Command::TreeRotate,
        ("state", "query") => Command::StateQuery,
        ("state", "subscribe") => Command::StateSubscribe,
        ("state", "stop") => Command::StateStop,
        ("binding", "add") => {
            let binding = parse_binding(arg()?)?;
            let command = arg()?.to_string();
            Command::BindingAdd { binding, command }
        }
        _ => bail!("unknown command '{domain} {verb}'"),
    };
    Ok(command)
}

fn parse_select(word: &str) -> anyhow::Result<Select> {
    match word {
        "prev" => Ok(Select::Prev),
        "next" => Ok(Select::Next),
        "nearest" => Ok(Select::Nearest),
        _ => bail!("invalid selector '{word}'"),
    }
}

fn parse_direction(word: &str) -> anyhow::Result<Direction> {
    match word {
        "north" => Ok(Direction::North),
        "south" => Ok(Direction::South),
        "east" => Ok(Direction::East),
        "west" => Ok(Direction::West),
        _ => bail!("invalid direction '{word}'"),
    }
}

/// Parse `WxH@Hz` into logical size and millihertz refresh.
fn parse_mode(word: &str) -> anyhow::Result<(i32, i32, i32)> {
    let re = Regex::new(r"^(\d+)x(\d+)@(\d+)$").unwrap();
    let caps = re
        .captures(word)
        .with_context(|| format!("mode '{word}' does not match WxH@Hz"))?;
    let width = caps[1].parse()?;
    let height = caps[2].parse()?;
    let hz: i32 = caps[3].parse()?;
    Ok((width, height, hz * 1000))
}

/// Parse a `mod+mod+key` chord, e.g. `logo+shift+Return`.
fn parse_binding(chord: &str) -> anyhow::Result<Binding> {
    let mut mods = Mods::default();
    let mut keysym = None;
    for part in chord.split('+') {
        match part.to_ascii_lowercase().as_str() {
            "shift" => mods.shift = true,
            "ctrl" | "control" => mods.ctrl = true,
            "alt" | "mod1" => mods.alt = true,
            "logo" | "super" | "mod4" => mods.logo = true,
            _ => {
                let sym = xkb::keysym_from_name(part, xkb::KEYSYM_CASE_INSENSITIVE);
                if sym.raw() == xkb::keysyms::KEY_NoSymbol {
                    bail!("unknown key '{part}'");
                }
                if keysym.replace(sym.raw()).is_some() {
                    bail!("binding '{chord}' names more than one key");
                }
            }
        }
    }
    let keysym = keysym.with_context(|| format!("binding '{chord}' names no key"))?;
    Ok(Binding { mods, keysym })
}
