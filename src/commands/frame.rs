//! Offline frame tools.

use anyhow::Context;
use govee_ble::hex::{format_hex, parse_hex};
use govee_light::effect_names;
use govee_transport::frame::checksum;
use govee_transport::protocol::{cmd, color_mode, head};
use govee_transport::{decode, encode, LogicalPacket, PacketCmd};

use super::CommandResult;
use crate::cli::{CmdArg, HeadArg};

/// Decode a frame and print its fields
pub fn decode_frame(hex: &str) -> CommandResult {
    let bytes = parse_hex(hex)?;
    let packet = decode(&bytes).with_context(|| format!("cannot decode [{}]", format_hex(&bytes)))?;

    let head_byte = packet.head.to_byte();
    let cmd_byte = packet.cmd.to_byte();
    println!("Packet:   {packet}");
    println!("  Head:     0x{head_byte:02X} ({})", head::name(head_byte));
    println!("  Command:  0x{cmd_byte:02X} ({})", cmd::name(cmd_byte));
    if packet.cmd == PacketCmd::Color {
        let mode = packet.payload_byte(0);
        println!("  Mode:     0x{mode:02X} ({})", color_mode::name(mode));
    }
    println!("  Payload:  [{}]", format_hex(packet.trimmed_payload()));
    println!("  Checksum: 0x{:02X}", checksum(&bytes[..bytes.len() - 1]));
    Ok(())
}

/// Build a frame and print it as hex
pub fn encode_frame(head: HeadArg, cmd: CmdArg, payload: Option<&str>) -> CommandResult {
    let payload = payload.map(parse_hex).transpose()?.unwrap_or_default();
    let packet = LogicalPacket::new(head.into(), cmd.into(), payload);
    let frame = encode(&packet)?;
    println!("{frame}");
    Ok(())
}

/// List effect codes and names
pub fn effects() -> CommandResult {
    println!("Effects:");
    for (code, name) in effect_names().iter().enumerate() {
        println!("  {code:2}  {name}");
    }
    Ok(())
}
