//! Device command handlers.
//!
//! Every command queues its change, flushes, polls the light and prints
//! what it reports back.

use std::time::Duration;

use anyhow::Context;
use govee_ble::Config;
use govee_light::{DeviceState, Effect, GoveeLight, Rgb, TurnOn};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{open_light, CommandResult};

/// How long to wait for the light to answer a poll
const SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

/// What a device command does before the status poll
pub enum Action {
    Status,
    On(TurnOn),
    Off,
    Brightness(u8),
    Color(Rgb),
    Effect(Effect),
}

#[derive(Serialize)]
struct StatusReport<'a> {
    address: &'a str,
    #[serde(flatten)]
    state: &'a DeviceState,
}

pub async fn run(config: &Config, action: Action, json: bool) -> CommandResult {
    let light = open_light(config).await?;
    let result = apply(&light, action, json).await;
    light.teardown().await;
    result
}

async fn apply(light: &GoveeLight, action: Action, json: bool) -> CommandResult {
    let mut updates = light.subscribe();

    match action {
        Action::Status => {}
        Action::On(args) => {
            light.turn_on(args).await?;
        }
        Action::Off => {
            light.turn_off().await?;
        }
        Action::Brightness(value) => {
            light.set_brightness(value);
            light.flush().await?;
        }
        Action::Color(color) => {
            light.set_color(color);
            light.flush().await?;
        }
        Action::Effect(effect) => {
            light.set_effect(effect.name());
            light.flush().await?;
        }
    }

    light
        .refresh()
        .await
        .with_context(|| format!("failed to poll {}", light.address()))?;
    let state = settle(light, &mut updates).await;
    print_state(light.address(), &state, json)
}

/// Wait until power, brightness and color have all been reported, or time out
async fn settle(light: &GoveeLight, updates: &mut broadcast::Receiver<DeviceState>) -> DeviceState {
    let complete =
        |s: &DeviceState| s.power.is_some() && s.brightness.is_some() && s.color.is_some();

    let wait = async {
        loop {
            match updates.recv().await {
                Ok(state) if complete(&state) => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Skipped {} state updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    };

    if !complete(&light.state()) && tokio::time::timeout(SETTLE_TIMEOUT, wait).await.is_err() {
        warn!("Light {} did not report its full state in time", light.address());
    }
    light.state()
}

fn print_state(address: &str, state: &DeviceState, json: bool) -> CommandResult {
    if json {
        let report = StatusReport { address, state };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let unknown = || "unknown".to_string();
    println!("Light {address}:");
    println!(
        "  Power:      {}",
        state
            .power
            .map(|on| if on { "on" } else { "off" }.to_string())
            .unwrap_or_else(unknown)
    );
    println!(
        "  Brightness: {}",
        state
            .brightness
            .map(|b| format!("{b}/255"))
            .unwrap_or_else(unknown)
    );
    println!(
        "  Color:      {}",
        state
            .color
            .map(|c| format!("#{c}"))
            .unwrap_or_else(unknown)
    );
    println!(
        "  Effect:     {}",
        state.effect.clone().unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}
