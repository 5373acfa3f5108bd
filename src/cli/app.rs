use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use crate::errors::FleetGuardError;
use crate::metrics;

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::output::{emit, OutputFormat};
use super::runtime::{init_logging, load_config};

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();
    let loaded = load_config(&cli)?;
    init_logging(
        &loaded.config.telemetry.log_level,
        cli.debug,
        loaded.config.telemetry.json,
    )?;
    match &loaded.path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    metrics::register_metrics();
    let _metrics_server = metrics::spawn_metrics_server(loaded.config.metrics.port);

    let ctx = CliContext::new(loaded, cli.output);
    match dispatch(&cli, &ctx).await {
        Ok(code) => Ok(code),
        Err(err) => {
            if let Some(domain) = err.downcast_ref::<FleetGuardError>() {
                error!(code = %domain.code().as_str(), "Command failed: {}", domain);
                if cli.output != OutputFormat::Human {
                    emit(cli.output, &domain.public_view(), String::new)?;
                    return Ok(ExitCode::FAILURE);
                }
            } else {
                error!("Command failed: {:#}", err);
            }
            Err(err)
        }
    }
}
