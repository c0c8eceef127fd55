//! Cached device state, updated from the light's responses

use govee_transport::{LogicalPacket, PacketCmd};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Firmware family of the light.
///
/// Segmented strips take brightness as 0-100 and colors as segment-addressed
/// packets. Legacy bulbs take brightness as 0-255 and single-color packets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVariant {
    #[default]
    Legacy,
    Segmented,
}

impl DeviceVariant {
    pub fn from_segmented(segmented: bool) -> Self {
        if segmented {
            Self::Segmented
        } else {
            Self::Legacy
        }
    }

    /// Host brightness (0-255) to the byte the firmware expects
    pub fn brightness_to_wire(self, brightness: u8) -> u8 {
        match self {
            Self::Legacy => brightness,
            Self::Segmented => ((brightness as u16 * 100 + 127) / 255) as u8,
        }
    }

    /// Reported brightness byte back to the host 0-255 scale
    pub fn brightness_from_wire(self, value: u8) -> u8 {
        match self {
            Self::Legacy => value,
            Self::Segmented => (value as u16 * 255 / 100).min(255) as u8,
        }
    }
}

/// Last known state of the light. `None` means not reported yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub power: Option<bool>,
    /// Host scale, 0-255
    pub brightness: Option<u8>,
    pub color: Option<Rgb>,
    /// Last effect requested through this engine (the light never reports it)
    pub effect: Option<String>,
}

/// Applies decoded responses to a [`DeviceState`]
#[derive(Debug, Clone, Default)]
pub struct DeviceStateModel {
    variant: DeviceVariant,
    state: DeviceState,
}

impl DeviceStateModel {
    pub fn new(variant: DeviceVariant) -> Self {
        Self {
            variant,
            state: DeviceState::default(),
        }
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Apply a response packet. Returns false if the command isn't one the
    /// model tracks (state untouched).
    pub fn update(&mut self, packet: &LogicalPacket) -> bool {
        match packet.cmd {
            PacketCmd::Power => {
                self.state.power = Some(packet.payload_byte(0) == 0x01);
            }
            PacketCmd::Brightness => {
                let level = self.variant.brightness_from_wire(packet.payload_byte(0));
                self.state.brightness = Some(level);
            }
            // [mode, r, g, b]
            PacketCmd::Color => {
                self.state.color = Some(Rgb::new(
                    packet.payload_byte(1),
                    packet.payload_byte(2),
                    packet.payload_byte(3),
                ));
            }
            // [segment, mode, r, g, b]
            PacketCmd::Segment => {
                self.state.color = Some(Rgb::new(
                    packet.payload_byte(2),
                    packet.payload_byte(3),
                    packet.payload_byte(4),
                ));
            }
            PacketCmd::Other(_) => return false,
        }
        true
    }

    pub fn set_effect(&mut self, name: &str) {
        self.state.effect = Some(name.to_string());
    }

    pub fn clear_effect(&mut self) {
        self.state.effect = None;
    }
}
