//! # stride-sim
//!
//! Simulator for the stride-sync wrist/phone protocol.
//!
//! ## Commands
//!
//! - `sensor`: Feed heart-rate samples to a sensor-driven wrist
//! - `manual`: Press start/stop on the wrist
//!
//! ## Example
//!
//! ```bash
//! # Threshold crossing: three messages reach the phone
//! stride-sim sensor --samples 70,85,105,120,95
//!
//! # Phone goes out of range from the fourth sample on
//! stride-sim sensor --samples 70,85,105,120,95 --unreachable-from 3
//!
//! # Buttons, with a config file
//! stride-sim --config stride.toml manual --script start,stop,stop
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::manual::Step;
use commands::{manual, sensor};
use config::Config;

/// Simulator for the stride-sync wrist/phone protocol.
#[derive(Parser, Debug)]
#[command(name = "stride-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. "debug")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed heart-rate samples and print the phone state after each one
    Sensor {
        /// Comma-separated samples in beats per minute
        #[arg(long, value_delimiter = ',', required = true)]
        samples: Vec<f64>,

        /// Make the phone unreachable from this sample index on
        #[arg(long)]
        unreachable_from: Option<usize>,
    },

    /// Press start/stop and print the phone state after each press
    Manual {
        /// Comma-separated presses, e.g. start,stop,stop
        #[arg(long, value_delimiter = ',', required = true)]
        script: Vec<Step>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    tracing::debug!("Configuration: {:?}", config);

    let report = match cli.command {
        Commands::Sensor {
            samples,
            unreachable_from,
        } => sensor::run(&config, &samples, unreachable_from).await?,
        Commands::Manual { script } => manual::run(&config, &script).await?,
    };
    report.print();

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--log-level`.
fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level.unwrap_or("info"))
            .context("Invalid --log-level filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_sensor_samples() {
        let cli = Cli::try_parse_from([
            "stride-sim",
            "sensor",
            "--samples",
            "70,85,105",
            "--unreachable-from",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Sensor {
                samples,
                unreachable_from,
            } => {
                assert_eq!(samples, vec![70.0, 85.0, 105.0]);
                assert_eq!(unreachable_from, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_parses_manual_script_and_globals() {
        let cli = Cli::try_parse_from([
            "stride-sim",
            "manual",
            "--script",
            "start,stop,stop",
            "--config",
            "stride.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("stride.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Manual { script } => {
                assert_eq!(script, vec![Step::Start, Step::Stop, Step::Stop]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_rejects_unknown_step() {
        assert!(Cli::try_parse_from(["stride-sim", "manual", "--script", "jog"]).is_err());
    }

    #[test]
    fn cli_requires_samples() {
        assert!(Cli::try_parse_from(["stride-sim", "sensor"]).is_err());
    }
}
