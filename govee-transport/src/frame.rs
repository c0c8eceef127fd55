//! Frame codec for the 20-byte Govee wire format
//!
//! Every packet exchanged with the light, in either direction, is one frame:
//!
//! ```text
//! [head:1] [cmd:1] [payload:17, zero-padded] [checksum:1]
//! ```
//!
//! The checksum is the XOR of the 19 preceding bytes. The firmware silently
//! drops frames with any other checksum, so this must stay byte-exact.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::FrameError;
use crate::protocol::{cmd, color_mode, head, FRAME_SIZE, PAYLOAD_SIZE};

// =============================================================================
// Packet tags
// =============================================================================

/// Frame head: perform a change, or ask for state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketHead {
    Command,
    Request,
    /// Head byte this crate doesn't know about
    Other(u8),
}

impl PacketHead {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            head::COMMAND => Self::Command,
            head::REQUEST => Self::Request,
            other => Self::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Command => head::COMMAND,
            Self::Request => head::REQUEST,
            Self::Other(byte) => byte,
        }
    }
}

/// Frame command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketCmd {
    Power,
    Brightness,
    Color,
    Segment,
    /// Command byte this crate doesn't know about (kept for forward compatibility)
    Other(u8),
}

impl PacketCmd {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            cmd::POWER => Self::Power,
            cmd::BRIGHTNESS => Self::Brightness,
            cmd::COLOR => Self::Color,
            cmd::SEGMENT => Self::Segment,
            other => Self::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Power => cmd::POWER,
            Self::Brightness => cmd::BRIGHTNESS,
            Self::Color => cmd::COLOR,
            Self::Segment => cmd::SEGMENT,
            Self::Other(byte) => byte,
        }
    }
}

/// Color sub-type (first payload byte of COLOR commands)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorMode {
    Segments = color_mode::SEGMENTS,
    Single = color_mode::SINGLE,
    Legacy = color_mode::LEGACY,
    Effect = color_mode::EFFECT,
}

impl ColorMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            color_mode::SEGMENTS => Some(Self::Segments),
            color_mode::SINGLE => Some(Self::Single),
            color_mode::LEGACY => Some(Self::Legacy),
            color_mode::EFFECT => Some(Self::Effect),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// LogicalPacket
// =============================================================================

/// A packet before serialization / after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPacket {
    pub head: PacketHead,
    pub cmd: PacketCmd,
    /// Up to 17 bytes. Decoded packets always carry the full zero-padded payload.
    pub payload: Vec<u8>,
}

impl LogicalPacket {
    pub fn new(head: PacketHead, cmd: PacketCmd, payload: Vec<u8>) -> Self {
        Self {
            head,
            cmd,
            payload,
        }
    }

    /// COMMAND-head packet (fire-and-forget change)
    pub fn command(cmd: PacketCmd, payload: Vec<u8>) -> Self {
        Self::new(PacketHead::Command, cmd, payload)
    }

    /// REQUEST-head packet (state query, answered by a notification)
    pub fn request(cmd: PacketCmd, payload: Vec<u8>) -> Self {
        Self::new(PacketHead::Request, cmd, payload)
    }

    /// COMMAND-head COLOR packet: the sub-type byte followed by `body`
    pub fn color(mode: ColorMode, body: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(body.len() + 1);
        payload.push(mode.to_byte());
        payload.extend_from_slice(body);
        Self::command(PacketCmd::Color, payload)
    }

    pub fn is_request(&self) -> bool {
        self.head == PacketHead::Request
    }

    /// Sub-type of a COLOR packet, if it is one with a known sub-type
    pub fn color_mode(&self) -> Option<ColorMode> {
        if self.cmd != PacketCmd::Color {
            return None;
        }
        self.payload.first().copied().and_then(ColorMode::from_byte)
    }

    /// Payload byte at `index`, zero past the end (same as the wire padding)
    pub fn payload_byte(&self, index: usize) -> u8 {
        self.payload.get(index).copied().unwrap_or(0)
    }

    /// Payload with the zero padding stripped
    pub fn trimmed_payload(&self) -> &[u8] {
        let end = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        &self.payload[..end]
    }

    pub fn encode(&self) -> Result<Frame, FrameError> {
        encode(self)
    }
}

impl fmt::Display for LogicalPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head_byte = self.head.to_byte();
        let cmd_byte = self.cmd.to_byte();
        match self.head {
            PacketHead::Other(_) => write!(f, "HEAD(0x{head_byte:02X})")?,
            _ => f.write_str(head::name(head_byte))?,
        }
        match self.cmd {
            PacketCmd::Other(_) => write!(f, " CMD(0x{cmd_byte:02X})")?,
            _ => write!(f, " {}", cmd::name(cmd_byte))?,
        }
        if matches!(self.cmd, PacketCmd::Color) && self.head == PacketHead::Command {
            if let Some(mode) = self.payload.first() {
                write!(f, "/{}", color_mode::name(*mode))?;
            }
        }
        write!(f, " {:02X?}", self.trimmed_payload())
    }
}

// =============================================================================
// Frame
// =============================================================================

/// One 20-byte frame, laid out exactly as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct Frame {
    head: u8,
    cmd: u8,
    payload: [u8; PAYLOAD_SIZE],
    checksum: u8,
}

impl Frame {
    /// Raw wire bytes
    pub fn as_slice(&self) -> &[u8] {
        IntoBytes::as_bytes(self)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    pub fn checksum_byte(&self) -> u8 {
        self.checksum
    }

    /// XOR of the first 19 bytes
    pub fn expected_checksum(&self) -> u8 {
        checksum(&self.as_slice()[..FRAME_SIZE - 1])
    }

    pub fn verify(&self) -> Result<(), FrameError> {
        let expected = self.expected_checksum();
        if expected != self.checksum {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: self.checksum,
            });
        }
        Ok(())
    }

    /// Unpack into a logical packet (does not verify the checksum)
    pub fn packet(&self) -> LogicalPacket {
        LogicalPacket {
            head: PacketHead::from_byte(self.head),
            cmd: PacketCmd::from_byte(self.cmd),
            payload: self.payload.to_vec(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_slice() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Codec
// =============================================================================

/// XOR-fold of every byte, masked to 8 bits
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Check that the last byte of `frame` is the XOR of everything before it
pub fn verify_checksum(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&received, data)) => checksum(data) == received,
        None => false,
    }
}

/// Serialize a packet into a frame
pub fn encode(packet: &LogicalPacket) -> Result<Frame, FrameError> {
    if packet.payload.len() > PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLong {
            max: PAYLOAD_SIZE,
            got: packet.payload.len(),
        });
    }

    let mut payload = [0u8; PAYLOAD_SIZE];
    payload[..packet.payload.len()].copy_from_slice(&packet.payload);

    let mut frame = Frame {
        head: packet.head.to_byte(),
        cmd: packet.cmd.to_byte(),
        payload,
        checksum: 0,
    };
    frame.checksum = frame.expected_checksum();
    Ok(frame)
}

/// Validate and unpack a received frame
pub fn decode(bytes: &[u8]) -> Result<LogicalPacket, FrameError> {
    let frame = Frame::read_from_bytes(bytes).map_err(|_| FrameError::InvalidLength {
        expected: FRAME_SIZE,
        got: bytes.len(),
    })?;
    frame.verify()?;
    Ok(frame.packet())
}
