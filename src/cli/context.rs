use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;

use crate::app_context::AppContext;
use crate::config::{FleetGuardConfig, LoadedConfig};
use crate::errors::FleetGuardError;

use super::output::OutputFormat;

pub struct CliContext {
    loaded: LoadedConfig,
    output: OutputFormat,
    app_context: OnceCell<Arc<AppContext>>,
}

impl CliContext {
    pub fn new(loaded: LoadedConfig, output: OutputFormat) -> Self {
        Self {
            loaded,
            output,
            app_context: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &FleetGuardConfig {
        &self.loaded.config
    }

    pub fn loaded(&self) -> &LoadedConfig {
        &self.loaded
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Opens the ledger store on first use, so commands that never touch
    /// the ledger never create a database file.
    pub async fn app_context(&self) -> Result<Arc<AppContext>> {
        self.app_context
            .get_or_try_init(|| async {
                AppContext::from_config(self.config())
                    .await
                    .map(Arc::new)
                    .map_err(|err| FleetGuardError::from(err).into())
            })
            .await
            .map(Arc::clone)
    }
}
