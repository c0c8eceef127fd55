//! Protocol constants for Govee BLE light communication

/// Total frame size on the wire: head + cmd + payload + checksum
pub const FRAME_SIZE: usize = 20;

/// Payload bytes between the command byte and the checksum (zero-padded)
pub const PAYLOAD_SIZE: usize = 17;

/// GATT characteristics used by the light
pub mod gatt {
    use uuid::Uuid;

    /// Commands and requests are written here (write without response)
    pub const WRITE_CHARACTERISTIC: Uuid =
        Uuid::from_u128(0x00010203_0405_0607_0809_0a0b0c0d2b11);

    /// Responses arrive as notifications on this characteristic
    pub const READ_CHARACTERISTIC: Uuid =
        Uuid::from_u128(0x00010203_0405_0607_0809_0a0b0c0d2b10);
}

/// Frame head bytes
pub mod head {
    /// Perform a change, no response expected
    pub const COMMAND: u8 = 0x33;
    /// Ask for current state; the device answers with a REQUEST-head notification
    pub const REQUEST: u8 = 0xAA;

    /// Get human-readable name for head byte
    pub fn name(head: u8) -> &'static str {
        match head {
            COMMAND => "COMMAND",
            REQUEST => "REQUEST",
            _ => "UNKNOWN",
        }
    }
}

/// Frame command bytes
pub mod cmd {
    pub const POWER: u8 = 0x01;
    pub const BRIGHTNESS: u8 = 0x04;
    pub const COLOR: u8 = 0x05;
    /// Per-segment color (segmented strips)
    pub const SEGMENT: u8 = 0xA5;

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            POWER => "POWER",
            BRIGHTNESS => "BRIGHTNESS",
            COLOR => "COLOR",
            SEGMENT => "SEGMENT",
            _ => "UNKNOWN",
        }
    }
}

/// Color sub-type, the first payload byte of COLOR commands
pub mod color_mode {
    /// Segment-addressed color (segmented strips)
    pub const SEGMENTS: u8 = 0x15;
    /// Single color, newer legacy firmware
    pub const SINGLE: u8 = 0x02;
    /// Single color, older legacy firmware
    pub const LEGACY: u8 = 0x0D;
    /// Scene/effect mode
    pub const EFFECT: u8 = 0x04;

    /// Get human-readable name for color sub-type
    pub fn name(mode: u8) -> &'static str {
        match mode {
            SEGMENTS => "SEGMENTS",
            SINGLE => "SINGLE",
            LEGACY => "LEGACY",
            EFFECT => "EFFECT",
            _ => "UNKNOWN",
        }
    }
}

/// Segment addressing for segmented strips
pub mod segment {
    /// First segment index (1-based on the wire)
    pub const FIRST: u8 = 0x01;
    /// Segment mask selecting every segment
    pub const ALL_ON_MASK: [u8; 2] = [0xFF, 0xFF];
}

/// Connection timing defaults
pub mod timing {
    /// Connect attempts before giving up
    pub const CONNECT_ATTEMPTS: u32 = 4;
    /// Backoff after the first failed attempt (ms), doubled per failure
    pub const INITIAL_BACKOFF_MS: u64 = 250;
    /// Upper bound for the connect backoff (ms)
    pub const MAX_BACKOFF_MS: u64 = 4000;
}
