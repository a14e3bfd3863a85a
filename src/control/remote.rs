// SPDX-License-Identifier: GPL-3.0-only

//! The client side of the control channel: parse the command line, write
//! one COMMAND packet, print DATA lines, exit with the ERROR errno.

use std::io::BufReader;
use std::os::unix::net::UnixStream;

use super::command::{self, Command, USAGE};
use super::wire::{self, Packet};
use super::{Error, socket_path};

/// Entry point for every invocation that is not `timber run`. Returns the
/// process exit code.
pub fn run(args: &[String]) -> i32 {
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("{USAGE}");
        return libc::EINVAL;
    }
    let command = match command::parse(args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("timber: {err}");
            eprintln!("{USAGE}");
            return libc::EINVAL;
        }
    };
    match talk(&command) {
        Ok(()) => 0,
        Err(errno) => {
            eprintln!("timber: {}", std::io::Error::from_raw_os_error(errno));
            errno
        }
    }
}

fn talk(command: &Command) -> Result<(), i32> {
    let display = std::env::var("WAYLAND_DISPLAY").unwrap_or_else(|_| "wayland-0".to_string());
    let path = socket_path(&display);
    let mut stream = UnixStream::connect(&path).map_err(|_| Error::Io.errno())?;
    wire::write_packet(&mut stream, &Packet::Command(command.clone()))
        .map_err(|_| Error::Io.errno())?;

    let subscribed = *command == Command::StateSubscribe;
    let mut reader = BufReader::new(stream);
    loop {
        match wire::read_packet(&mut reader) {
            Ok(Some(Packet::Data(line))) => println!("{line}"),
            Ok(Some(Packet::Error(0))) => return Ok(()),
            Ok(Some(Packet::Error(errno))) => return Err(errno),
            Ok(Some(Packet::Command(_))) => {
                // a command packet from the server violates the protocol
                eprintln!("timber: protocol violation on control socket");
                std::process::exit(libc::EPROTO);
            }
            Ok(None) if subscribed => return Ok(()),
            Ok(None) => return Err(Error::Io.errno()),
            Err(_) => {
                eprintln!("timber: malformed packet on control socket");
                std::process::exit(libc::EPROTO);
            }
        }
    }
}
