use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{self, LoadOptions, LoadedConfig};

use super::env::CliArgs;

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Flags that override configuration keys.
pub fn cli_overrides(cli: &CliArgs) -> Vec<(String, Value)> {
    let mut overrides = Vec::new();
    if let Some(level) = &cli.log_level {
        overrides.push(("telemetry.log_level".to_string(), Value::from(level.clone())));
    }
    if cli.debug {
        overrides.push(("telemetry.log_level".to_string(), Value::from("debug")));
    }
    if let Some(port) = cli.metrics_port {
        overrides.push(("metrics.port".to_string(), Value::from(port)));
    }
    overrides
}

pub fn load_config(cli: &CliArgs) -> Result<LoadedConfig> {
    let path: Option<PathBuf> = cli.config.clone().or_else(config::default_config_path);
    let mut options = LoadOptions::from_process_env(path);
    options.cli = cli_overrides(cli);
    config::load(&options).context("Failed to load configuration")
}
