//! Layered configuration for the `fleetguard` binary.
//!
//! Built-in defaults are overlaid, in order, by a YAML file, by
//! `FLEETGUARD__SECTION__KEY` environment variables and by command-line
//! flags. Every leaf key remembers which layer last set it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fleetguard_audit_ledger::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "FLEETGUARD__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("fleetguard-ledger.db"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub page_size: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            page_size: fleetguard_integrity::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 0 disables the `/metrics` listener.
    pub port: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetGuardConfig {
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
    pub verifier: VerifierConfig,
    pub telemetry: TelemetryConfig,
    pub metrics: MetricsConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Env,
    Cli,
}

#[derive(Clone, Debug)]
pub struct LoadedConfig {
    pub config: FleetGuardConfig,
    pub path: Option<PathBuf>,
    pub provenance: BTreeMap<String, ConfigSource>,
}

impl LoadedConfig {
    pub fn source_of(&self, key: &str) -> Option<ConfigSource> {
        self.provenance.get(key).copied()
    }
}

/// Where to read overlays from. Environment variables are passed in
/// explicitly so callers can choose between the process environment and a
/// fixed set.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub path: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub cli: Vec<(String, Value)>,
}

impl LoadOptions {
    pub fn from_process_env(path: Option<PathBuf>) -> Self {
        Self {
            path,
            env: std::env::vars().collect(),
            cli: Vec::new(),
        }
    }

    pub fn cli_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cli.push((key.into(), value.into()));
        self
    }
}

struct Overlay {
    key: String,
    value: Value,
    source: ConfigSource,
}

pub fn load(options: &LoadOptions) -> Result<LoadedConfig, ConfigError> {
    let mut tree = serde_json::to_value(FleetGuardConfig::default())
        .map_err(|err| ConfigError::Invalid(err.to_string()))?;
    let mut provenance = BTreeMap::new();
    for overlay in flatten(tree.clone(), None, ConfigSource::Default) {
        provenance.insert(overlay.key, overlay.source);
    }

    let mut path = None;
    if let Some(candidate) = &options.path {
        if candidate.exists() {
            apply(&mut tree, &mut provenance, overlays_from_file(candidate)?)?;
            path = Some(candidate.clone());
        } else {
            debug!(path = %candidate.display(), "config file not found, using defaults");
        }
    }
    apply(&mut tree, &mut provenance, overlays_from_env(&options.env))?;
    apply(
        &mut tree,
        &mut provenance,
        options
            .cli
            .iter()
            .map(|(key, value)| Overlay {
                key: key.clone(),
                value: value.clone(),
                source: ConfigSource::Cli,
            })
            .collect(),
    )?;

    let config: FleetGuardConfig =
        serde_json::from_value(tree).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    if config.verifier.page_size == 0 {
        return Err(ConfigError::Invalid("verifier.page_size must be positive".into()));
    }
    if config.ledger.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "ledger.retry.max_attempts must be positive".into(),
        ));
    }
    Ok(LoadedConfig {
        config,
        path,
        provenance,
    })
}

/// `./fleetguard.yaml` when present, otherwise the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("fleetguard.yaml");
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|dir| dir.join("fleetguard").join("config.yaml"))
}

fn overlays_from_file(path: &Path) -> Result<Vec<Overlay>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let json = serde_json::to_value(yaml).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(flatten(json, None, ConfigSource::File))
}

fn overlays_from_env(vars: &[(String, String)]) -> Vec<Overlay> {
    vars.iter()
        .filter_map(|(name, raw)| {
            let stripped = name.strip_prefix(ENV_PREFIX)?;
            let key = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            (!key.is_empty()).then(|| Overlay {
                key,
                value: parse_env_value(raw),
                source: ConfigSource::Env,
            })
        })
        .collect()
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn flatten(value: Value, prefix: Option<String>, source: ConfigSource) -> Vec<Overlay> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .flat_map(|(key, value)| {
                let segment = key.trim().to_ascii_lowercase();
                let next = match &prefix {
                    Some(prefix) => format!("{prefix}.{segment}"),
                    None => segment,
                };
                flatten(value, Some(next), source)
            })
            .collect(),
        other => prefix
            .map(|key| Overlay {
                key,
                value: other,
                source,
            })
            .into_iter()
            .collect(),
    }
}

fn apply(
    tree: &mut Value,
    provenance: &mut BTreeMap<String, ConfigSource>,
    overlays: Vec<Overlay>,
) -> Result<(), ConfigError> {
    for overlay in overlays {
        if !provenance.contains_key(&overlay.key) {
            return Err(ConfigError::UnknownKey(overlay.key));
        }
        set_path(tree, &overlay.key, overlay.value)?;
        provenance.insert(overlay.key, overlay.source);
    }
    Ok(())
}

fn set_path(tree: &mut Value, key: &str, value: Value) -> Result<(), ConfigError> {
    let mut segments = key.split('.').peekable();
    let mut cursor = tree;
    while let Some(segment) = segments.next() {
        let Value::Object(map) = cursor else {
            return Err(ConfigError::UnknownKey(key.to_string()));
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        cursor = map
            .get_mut(segment)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    }
    Err(ConfigError::UnknownKey(key.to_string()))
}
