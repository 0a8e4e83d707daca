//! `sensord` -- polls ADC value files and publishes them as bus properties.
//!
//! # Usage
//!
//! ```text
//! sensord [CONFIG]
//! sensord --version
//! ```
//!
//! | Source            | Default                      | Description               |
//! |-------------------|------------------------------|---------------------------|
//! | `CONFIG` argument | `SENSORD_CONFIG`             | Path to the sensor list   |
//! | `SENSORD_CONFIG`  | `/etc/sensord/sensors.json`  | Used when no argument     |
//! | `RUST_LOG`        | `info`                       | Log filter                |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sensord_bus::{LoggingPersister, MemoryBus};
use sensord_core::DaemonConfig;
use sensord_hardware::TokioScheduler;
use sensord_sensor::SensorManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "/etc/sensord/sensors.json";

/// Poll ADC value files and publish them as bus properties.
#[derive(Debug, Parser)]
#[command(name = "sensord", version)]
struct Cli {
    /// Sensor configuration file (JSON)
    #[arg(env = "SENSORD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = cli.config;
    let config = DaemonConfig::from_file(&path)
        .with_context(|| format!("failed to load sensor configuration from {}", path.display()))?;

    tracing::info!(
        version = sensord_core::VERSION,
        config = %path.display(),
        sensors = config.sensors.len(),
        "Starting sensord",
    );

    let bus = Arc::new(MemoryBus::new());
    let manager = SensorManager::load(&config, TokioScheduler, bus, Arc::new(LoggingPersister));
    let handle = manager.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!(sensors = handle.sensor_count(), "Shutting down");
    let report = handle.shutdown().await;
    if report.failed + report.panicked > 0 {
        anyhow::bail!(
            "{} of {} sensors did not run cleanly",
            report.failed + report.panicked,
            report.total()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_from_argument() {
        let cli = Cli::try_parse_from(["sensord", "/tmp/sensors.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/sensors.json"));
    }

    #[test]
    fn test_default_config_path() {
        if std::env::var_os("SENSORD_CONFIG").is_some() {
            return;
        }
        let cli = Cli::try_parse_from(["sensord"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_help_is_not_a_path() {
        let err = Cli::try_parse_from(["sensord", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["sensord", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["sensord", "--verbose"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
