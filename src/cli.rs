// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use govee_light::{Effect, Rgb};
use govee_transport::{PacketCmd, PacketHead};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "govee-ble")]
#[command(author, version, about = "Control Govee Bluetooth LE lights")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/govee-ble/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bluetooth address of the light (overrides config)
    #[arg(short, long, global = true)]
    pub address: Option<String>,

    /// Treat the light as a segmented strip (overrides config)
    #[arg(long, global = true)]
    pub segmented: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Frame tools (offline) ===
    /// Decode a 20-byte frame given as hex
    #[command(visible_alias = "d")]
    Decode {
        /// Frame bytes, e.g. "aa 01 01 00 ... ab"
        hex: String,
    },

    /// Build a frame and print it as hex
    #[command(visible_alias = "e")]
    Encode {
        /// Frame head
        #[arg(long, value_enum, default_value_t = HeadArg::Command)]
        head: HeadArg,
        /// Command byte
        #[arg(long, value_enum)]
        cmd: CmdArg,
        /// Payload bytes as hex (max 17)
        payload: Option<String>,
    },

    /// List built-in effects
    Effects,

    // === Device commands ===
    /// Poll the light and print its state
    #[command(visible_alias = "s")]
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn the light on
    On {
        /// Brightness, 1-255
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=255))]
        brightness: Option<u8>,
        /// Color as RRGGBB hex
        #[arg(long)]
        color: Option<Rgb>,
        /// Effect name (see `effects`)
        #[arg(short, long)]
        effect: Option<Effect>,
    },

    /// Turn the light off
    Off,

    /// Set brightness, 0-255
    #[command(visible_alias = "b")]
    Brightness { value: u8 },

    /// Set a static color (RRGGBB hex)
    Color { color: Rgb },

    /// Start a built-in effect
    Effect { name: Effect },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum HeadArg {
    Command,
    Request,
}

impl From<HeadArg> for PacketHead {
    fn from(head: HeadArg) -> Self {
        match head {
            HeadArg::Command => PacketHead::Command,
            HeadArg::Request => PacketHead::Request,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CmdArg {
    Power,
    Brightness,
    Color,
    Segment,
}

impl From<CmdArg> for PacketCmd {
    fn from(cmd: CmdArg) -> Self {
        match cmd {
            CmdArg::Power => PacketCmd::Power,
            CmdArg::Brightness => PacketCmd::Brightness,
            CmdArg::Color => PacketCmd::Color,
            CmdArg::Segment => PacketCmd::Segment,
        }
    }
}
