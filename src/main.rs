//! Govee BLE Light CLI
//!
//! A command-line interface for driving Govee Bluetooth LE lights and
//! inspecting their 20-byte frames.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use govee_ble::Config;
use govee_light::TurnOn;
use tracing::debug;

use cli::{Cli, Commands};
use commands::light::Action;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(address) = cli.address.clone() {
        config.address = Some(address);
    }
    if cli.segmented {
        config.segmented = true;
    }

    // Initialize logging (stderr, so stdout stays clean for --json)
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    debug!("Loaded config from {:?}: {:?}", config_path, config);

    match cli.command {
        // === Frame tools ===
        Commands::Decode { hex } => commands::frame::decode_frame(&hex),
        Commands::Encode { head, cmd, payload } => {
            commands::frame::encode_frame(head, cmd, payload.as_deref())
        }
        Commands::Effects => commands::frame::effects(),

        // === Device commands ===
        Commands::Status { json } => commands::light::run(&config, Action::Status, json).await,
        Commands::On {
            brightness,
            color,
            effect,
        } => {
            let args = TurnOn {
                brightness,
                color,
                effect: effect.map(|e| e.name().to_string()),
            };
            commands::light::run(&config, Action::On(args), false).await
        }
        Commands::Off => commands::light::run(&config, Action::Off, false).await,
        Commands::Brightness { value } => {
            commands::light::run(&config, Action::Brightness(value), false).await
        }
        Commands::Color { color } => {
            commands::light::run(&config, Action::Color(color), false).await
        }
        Commands::Effect { name } => {
            commands::light::run(&config, Action::Effect(name), false).await
        }
    }
}
