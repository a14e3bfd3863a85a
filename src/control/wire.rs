// SPDX-License-Identifier: GPL-3.0-only

//! Packet framing for the control channel: one RON-encoded record per
//! newline-terminated line.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use super::command::Command;
use crate::config::MAX_DATA_LEN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Command(Command),
    Data(String),
    Error(i32),
}

pub fn write_packet(writer: &mut impl Write, packet: &Packet) -> io::Result<()> {
    if let Packet::Data(text) = packet
        && text.len() > MAX_DATA_LEN
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "data payload exceeds the packet limit",
        ));
    }
    let record = ron::to_string(packet)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    writer.write_all(record.as_bytes())?;
    writer.write_all(b"\n")
}

/// Read one framed packet; `None` on a clean end of stream. `read_line`
/// already retries short reads and EINTR.
pub fn read_packet(reader: &mut impl BufRead) -> io::Result<Option<Packet>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let packet = ron::from_str(line.trim_end())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(Some(packet))
}
