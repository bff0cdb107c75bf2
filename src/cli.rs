use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use sqlbridge::SqlBridge;
use sqlbridge::services::database::traits::Dialect;

#[derive(Parser, Debug)]
#[command(name = "sqlbridge", version, about = "Multi-dialect SQL gateway")]
pub struct Args {
    /// Config file (default ~/.sqlbridge/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level (stderr). Overrides the config; RUST_LOG wins over both.
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered dialects and their capabilities
    Dialects,
    /// Manage connectivity drivers
    #[command(subcommand)]
    Drivers(DriversCommand),
}

#[derive(Subcommand, Debug)]
pub enum DriversCommand {
    /// Published driver versions, newest first
    Available { dialect: Dialect },
    /// Driver files in local storage
    Installed { dialect: Dialect },
    /// Download and validate a driver version
    Download { dialect: Dialect, version: String },
    /// Delete an installed driver version
    Delete { dialect: Dialect, version: String },
}

pub async fn run(command: Command, bridge: &SqlBridge) -> anyhow::Result<()> {
    match command {
        Command::Dialects => {
            let dialects: Vec<_> = bridge
                .registry()
                .descriptors()
                .await
                .iter()
                .map(|d| {
                    json!({
                        "code": d.dialect().code(),
                        "displayName": d.dialect().display_name(),
                        "plugin": d.id(),
                        "capabilities": d.capabilities(),
                        "driver": d.driver().map(|s| s.default_coordinates().to_coordinate_string()),
                    })
                })
                .collect();
            print_json(&dialects)
        }
        Command::Drivers(DriversCommand::Available { dialect }) => {
            print_json(&bridge.list_available_drivers(dialect).await?)
        }
        Command::Drivers(DriversCommand::Installed { dialect }) => {
            print_json(&bridge.list_installed_drivers(dialect).await?)
        }
        Command::Drivers(DriversCommand::Download { dialect, version }) => {
            print_json(&bridge.download_driver(dialect, &version).await?)
        }
        Command::Drivers(DriversCommand::Delete { dialect, version }) => {
            bridge.delete_driver(dialect, &version).await?;
            print_json(&json!({ "deleted": true, "dialect": dialect, "version": version }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
