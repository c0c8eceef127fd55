//! High-level interface for Govee BLE lights
//!
//! [`GoveeLight`] turns intents (power, brightness, color, effect) into
//! buffered packets, flushes them over a [`ConnectionManager`] and keeps a
//! cached [`DeviceState`] up to date from the light's responses.
//!
//! Setters only queue packets. Nothing goes over the air until
//! [`GoveeLight::flush`] (or [`turn_on`](GoveeLight::turn_on) /
//! [`turn_off`](GoveeLight::turn_off), which flush themselves). Every change
//! is followed by a request for the same property, so the cached state only
//! reflects what the light reported back.

pub mod buffer;
pub mod color;
pub mod effect;
pub mod error;
pub mod observer;
pub mod state;

pub use buffer::{CommandBuffer, DEFAULT_REPEAT};
pub use color::{ParseRgbError, Rgb};
pub use effect::{effect_code_to_name, effect_name_to_code, effect_names, Effect};
pub use error::LightError;
pub use observer::StateObserver;
pub use state::{DeviceState, DeviceStateModel, DeviceVariant};

use std::ops::RangeInclusive;
use std::sync::Arc;

use govee_transport::protocol::segment;
use govee_transport::{
    decode, encode, ColorMode, ConnectionManager, GattConnector, LogicalPacket,
    NotificationHandler, PacketCmd, RetryPolicy,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Capacity of the state broadcast channel
const STATE_CHANNEL_CAPACITY: usize = 16;

/// Per-device settings
#[derive(Debug, Clone)]
pub struct LightConfig {
    /// Bluetooth address, e.g. `A4:C1:38:5E:00:01`
    pub address: String,
    pub variant: DeviceVariant,
    pub retry: RetryPolicy,
    /// Copies queued per packet
    pub repeat: usize,
}

impl LightConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            variant: DeviceVariant::default(),
            retry: RetryPolicy::default(),
            repeat: DEFAULT_REPEAT,
        }
    }

    pub fn variant(mut self, variant: DeviceVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Arguments for [`GoveeLight::turn_on`]
#[derive(Debug, Clone, Default)]
pub struct TurnOn {
    /// Host brightness, 1-255
    pub brightness: Option<u8>,
    pub color: Option<Rgb>,
    pub effect: Option<String>,
}

/// Linear map of `value` from one range onto another, rounded and clamped
pub fn map_range(value: u8, from: RangeInclusive<u8>, to: RangeInclusive<u8>) -> u8 {
    let (in_min, in_max) = (*from.start() as u32, *from.end() as u32);
    let (out_min, out_max) = (*to.start() as u32, *to.end() as u32);
    if in_max <= in_min {
        return out_min as u8;
    }
    let value = (value as u32).clamp(in_min, in_max);
    let in_span = in_max - in_min;
    let out_span = out_max.saturating_sub(out_min);
    (out_min + ((value - in_min) * out_span + in_span / 2) / in_span) as u8
}

/// Host brightness (1-255, 0 never sent by hosts) to the light's 0-255 level
pub fn host_brightness_to_level(brightness: u8) -> u8 {
    map_range(brightness, 1..=255, 0..=255)
}

// =============================================================================
// Inbound path
// =============================================================================

/// State shared with the notification reader task
struct Shared {
    model: RwLock<DeviceStateModel>,
    observer: RwLock<Option<Arc<dyn StateObserver>>>,
    state_tx: broadcast::Sender<DeviceState>,
}

impl Shared {
    fn dispatch(&self, bytes: &[u8]) {
        let packet = match decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Discarding notification {:02X?}: {}", bytes, e);
                return;
            }
        };

        if !packet.is_request() {
            trace!("Ignoring non-response frame: {}", packet);
            return;
        }
        debug!("Response: {}", packet);

        let state = {
            let mut model = self.model.write();
            if !model.update(&packet) {
                trace!("Response not tracked: {}", packet);
            }
            model.state().clone()
        };

        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_state_changed(&state);
        }
        // no subscribers is fine
        let _ = self.state_tx.send(state);
    }
}

// =============================================================================
// GoveeLight
// =============================================================================

/// Protocol engine for one light
pub struct GoveeLight {
    address: String,
    variant: DeviceVariant,
    repeat: usize,
    shared: Arc<Shared>,
    buffer: Mutex<CommandBuffer>,
    connection: ConnectionManager,
    /// One flush at a time per device
    flush_lock: tokio::sync::Mutex<()>,
}

impl GoveeLight {
    /// Create an engine. No connection is made until the first flush.
    pub fn new(connector: Arc<dyn GattConnector>, config: LightConfig) -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            model: RwLock::new(DeviceStateModel::new(config.variant)),
            observer: RwLock::new(None),
            state_tx,
        });

        let handler: NotificationHandler = {
            let shared = Arc::clone(&shared);
            Arc::new(move |bytes: &[u8]| shared.dispatch(bytes))
        };
        let connection =
            ConnectionManager::new(connector, config.address.clone(), config.retry, handler);

        Self {
            address: config.address,
            variant: config.variant,
            repeat: config.repeat,
            shared,
            buffer: Mutex::new(CommandBuffer::new()),
            connection,
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Register the observer called after every decoded response
    pub fn with_observer(self, observer: Arc<dyn StateObserver>) -> Self {
        *self.shared.observer.write() = Some(observer);
        self
    }

    // ---- Intents ----

    /// Queue a power change. Returns packets queued (0 if already in that state).
    pub fn set_power(&self, on: bool) -> usize {
        if self.power() == Some(on) {
            debug!("Power already {}, skipping", on_off(on));
            return 0;
        }
        self.enqueue([
            LogicalPacket::command(PacketCmd::Power, vec![on as u8]),
            Self::power_request(),
        ])
    }

    /// Queue a brightness change, `brightness` on the 0-255 scale
    pub fn set_brightness(&self, brightness: u8) -> usize {
        if self.brightness() == Some(brightness) {
            debug!("Brightness already {}, skipping", brightness);
            return 0;
        }
        let level = self.variant.brightness_to_wire(brightness);
        self.enqueue([
            LogicalPacket::command(PacketCmd::Brightness, vec![level]),
            Self::brightness_request(),
        ])
    }

    /// Queue a static color. Clears the remembered effect.
    pub fn set_color(&self, color: Rgb) -> usize {
        if self.color() == Some(color) {
            debug!("Color already {}, skipping", color);
            return 0;
        }
        let Rgb { r, g, b } = color;
        let queued = match self.variant {
            DeviceVariant::Segmented => {
                let [mask_lo, mask_hi] = segment::ALL_ON_MASK;
                self.enqueue([
                    LogicalPacket::color(
                        ColorMode::Segments,
                        &[segment::FIRST, r, g, b, 0, 0, 0, 0, 0, mask_lo, mask_hi],
                    ),
                    self.color_request(),
                ])
            }
            // Older firmware only understands one of the two sub-types; send both
            DeviceVariant::Legacy => self.enqueue([
                LogicalPacket::color(ColorMode::Single, &[r, g, b]),
                LogicalPacket::color(ColorMode::Legacy, &[r, g, b]),
                self.color_request(),
            ]),
        };
        self.shared.model.write().clear_effect();
        queued
    }

    /// Queue a built-in effect by exact name. Unknown names are logged and ignored.
    pub fn set_effect(&self, name: &str) -> usize {
        let Some(code) = effect_name_to_code(name) else {
            warn!("Unknown effect '{}', ignoring", name);
            return 0;
        };
        if self.effect().as_deref() == Some(name) {
            debug!("Effect already {}, skipping", name);
            return 0;
        }
        let queued = self.enqueue([LogicalPacket::color(ColorMode::Effect, &[code])]);
        self.shared.model.write().set_effect(name);
        queued
    }

    /// Power on with optional brightness (host 1-255 scale), color and effect,
    /// then flush.
    pub async fn turn_on(&self, args: TurnOn) -> Result<usize, LightError> {
        self.set_power(true);
        if let Some(brightness) = args.brightness {
            self.set_brightness(host_brightness_to_level(brightness));
        }
        if let Some(color) = args.color {
            self.set_color(color);
        }
        if let Some(effect) = args.effect.as_deref() {
            self.set_effect(effect);
        }
        self.flush().await
    }

    pub async fn turn_off(&self) -> Result<usize, LightError> {
        self.set_power(false);
        self.flush().await
    }

    // ---- Requests ----

    pub fn request_power(&self) -> usize {
        self.enqueue([Self::power_request()])
    }

    pub fn request_brightness(&self) -> usize {
        self.enqueue([Self::brightness_request()])
    }

    pub fn request_color(&self) -> usize {
        self.enqueue([self.color_request()])
    }

    fn power_request() -> LogicalPacket {
        LogicalPacket::request(PacketCmd::Power, Vec::new())
    }

    fn brightness_request() -> LogicalPacket {
        LogicalPacket::request(PacketCmd::Brightness, Vec::new())
    }

    fn color_request(&self) -> LogicalPacket {
        match self.variant {
            DeviceVariant::Segmented => {
                LogicalPacket::request(PacketCmd::Segment, vec![segment::FIRST])
            }
            DeviceVariant::Legacy => LogicalPacket::request(PacketCmd::Color, Vec::new()),
        }
    }

    /// Queue every packet `repeat` times, under one lock so concurrent
    /// intents don't interleave.
    fn enqueue<const N: usize>(&self, packets: [LogicalPacket; N]) -> usize {
        let mut buffer = self.buffer.lock();
        for packet in packets {
            trace!("Queue x{}: {}", self.repeat, packet);
            buffer.append(packet, self.repeat);
        }
        N * self.repeat
    }

    // ---- Transmission ----

    /// Write every queued packet in order. Returns frames written.
    ///
    /// On failure nothing is removed from the buffer, so the next flush
    /// starts over from the first queued packet.
    pub async fn flush(&self) -> Result<usize, LightError> {
        let _guard = self.flush_lock.lock().await;

        let snapshot = self.buffer.lock().snapshot();
        if snapshot.is_empty() {
            return Ok(0);
        }
        let frames = snapshot.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
        let total = frames.len();

        self.connection.ensure_connected().await?;

        for (sent, frame) in frames.iter().enumerate() {
            if let Err(source) = self.connection.write(frame).await {
                warn!(
                    "Flush to {} aborted after {}/{} frames: {}",
                    self.address, sent, total, source
                );
                return Err(LightError::PartialFlush {
                    sent,
                    total,
                    source,
                });
            }
        }

        self.buffer.lock().consume(total);
        debug!("Flushed {} frames to {}", total, self.address);
        Ok(total)
    }

    /// Poll step: request power, brightness and color, flush, and return the
    /// cached state. Answers land asynchronously; use [`subscribe`](Self::subscribe)
    /// to see them.
    pub async fn refresh(&self) -> Result<DeviceState, LightError> {
        self.request_power();
        self.request_brightness();
        self.request_color();
        self.flush().await?;
        Ok(self.state())
    }

    /// Stop any connect attempt, drop the session and discard queued packets
    pub async fn teardown(&self) {
        self.connection.teardown().await;
        self.buffer.lock().clear();
        info!("Light {} torn down", self.address);
    }

    /// Feed a raw notification through the inbound path
    pub fn dispatch(&self, bytes: &[u8]) {
        self.shared.dispatch(bytes);
    }

    // ---- Accessors ----

    pub fn state(&self) -> DeviceState {
        self.shared.model.read().state().clone()
    }

    pub fn power(&self) -> Option<bool> {
        self.shared.model.read().state().power
    }

    pub fn brightness(&self) -> Option<u8> {
        self.shared.model.read().state().brightness
    }

    pub fn color(&self) -> Option<Rgb> {
        self.shared.model.read().state().color
    }

    pub fn effect(&self) -> Option<String> {
        self.shared.model.read().state().effect.clone()
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Packets waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Receive a copy of the state after every decoded response
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceState> {
        self.shared.state_tx.subscribe()
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_brightness_mapping() {
        assert_eq!(host_brightness_to_level(1), 0);
        assert_eq!(host_brightness_to_level(255), 255);
        assert_eq!(host_brightness_to_level(128), 128);
        // 0 is outside the host range and clamps to the bottom
        assert_eq!(host_brightness_to_level(0), 0);
    }

    #[test]
    fn map_range_scales() {
        assert_eq!(map_range(50, 0..=100, 0..=255), 128);
        assert_eq!(map_range(255, 0..=255, 0..=100), 100);
        assert_eq!(map_range(7, 5..=5, 10..=20), 10);
    }
}
