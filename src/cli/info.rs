use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::Result;
use fleetguard_audit_ledger::AuditAction;
use fleetguard_core_types::Role;
use fleetguard_permissions::Permission;
use serde::Serialize;

use crate::config::{ConfigSource, StorageBackend};

use super::context::CliContext;
use super::output::emit;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfo {
    version: &'static str,
    build_date: &'static str,
    git_commit: &'static str,
    git_branch: &'static str,
    config_path: Option<String>,
    storage_backend: StorageBackend,
    storage_path: String,
    roles: usize,
    permissions: usize,
    audit_actions: usize,
    provenance: BTreeMap<String, ConfigSource>,
}

pub fn cmd_info(ctx: &CliContext) -> Result<ExitCode> {
    let loaded = ctx.loaded();
    let config = &loaded.config;
    let info = SystemInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        git_commit: option_env!("GIT_HASH").unwrap_or("unknown"),
        git_branch: option_env!("GIT_BRANCH").unwrap_or("unknown"),
        config_path: loaded.path.as_ref().map(|p| p.display().to_string()),
        storage_backend: config.storage.backend,
        storage_path: config.storage.path.display().to_string(),
        roles: Role::ALL.len(),
        permissions: Permission::ALL.len(),
        audit_actions: AuditAction::ALL.len(),
        provenance: loaded.provenance.clone(),
    };

    emit(ctx.output(), &info, || {
        let mut lines = vec![
            "FleetGuard System Information".to_string(),
            "=============================".to_string(),
            format!("Version: {}", info.version),
            format!("Build Date: {}", info.build_date),
            format!("Git Commit: {} ({})", info.git_commit, info.git_branch),
            String::new(),
            "Configuration:".to_string(),
            format!(
                "- File: {}",
                info.config_path.as_deref().unwrap_or("(defaults)")
            ),
            format!(
                "- Storage: {:?} at {}",
                info.storage_backend, info.storage_path
            ),
            format!("- Verifier page size: {}", config.verifier.page_size),
            format!("- Metrics port: {}", config.metrics.port),
        ];
        let overridden: Vec<_> = info
            .provenance
            .iter()
            .filter(|(_, source)| **source != ConfigSource::Default)
            .collect();
        if !overridden.is_empty() {
            lines.push("- Overrides:".to_string());
            lines.extend(
                overridden
                    .into_iter()
                    .map(|(key, source)| format!("  - {key} ({source:?})")),
            );
        }
        lines.push(String::new());
        lines.push(format!(
            "Catalog: {} roles, {} permissions, {} audit actions",
            info.roles, info.permissions, info.audit_actions
        ));
        lines.join("\n")
    })?;
    Ok(ExitCode::SUCCESS)
}
