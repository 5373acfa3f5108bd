use std::fmt;

use fleetguard_audit_ledger::ForkGroup;
use fleetguard_core_types::CompanyId;
use fleetguard_errors::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakReason {
    /// The stored hash does not match the recomputed one.
    HashMismatch,
    /// The stored previous hash does not point at the preceding entry.
    LinkMismatch,
}

/// One entry whose stored hash or link disagrees with the recomputed chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenChain {
    pub log_id: i64,
    pub expected_hash: String,
    pub actual_hash: String,
    pub reason: BreakReason,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub company_id: CompanyId,
    pub is_valid: bool,
    pub total_logs: u64,
    pub broken_chains: Vec<BrokenChain>,
    pub forks: Vec<ForkGroup>,
}

impl IntegrityReport {
    pub fn summary(&self) -> String {
        if self.is_valid {
            format!(
                "company {}: chain intact, {} entries",
                self.company_id, self.total_logs
            )
        } else {
            format!(
                "company {}: chain BROKEN, {} entries, {} broken link(s), {} fork(s)",
                self.company_id,
                self.total_logs,
                self.broken_chains.len(),
                self.forks.len()
            )
        }
    }

    /// The violation to surface for an invalid chain. Reports are never
    /// raised as errors by verification itself.
    pub fn violation(&self) -> Option<ErrorObj> {
        if self.is_valid {
            return None;
        }
        let first_broken = self.broken_chains.first().map(|b| b.log_id);
        Some(
            ErrorBuilder::new(codes::LEDGER_INTEGRITY_VIOLATION)
                .user_msg("Audit log integrity check failed.")
                .dev_msg(self.summary())
                .meta_kv("companyId", json!(self.company_id))
                .meta_kv("brokenChains", json!(self.broken_chains.len()))
                .meta_kv("forks", json!(self.forks.len()))
                .meta_kv("firstBrokenLogId", json!(first_broken))
                .build(),
        )
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for broken in &self.broken_chains {
            writeln!(
                f,
                "  log {} {:?}: expected {} actual {}",
                broken.log_id, broken.reason, broken.expected_hash, broken.actual_hash
            )?;
        }
        for fork in &self.forks {
            writeln!(
                f,
                "  fork after {}: logs {:?}",
                fork.previous_hash.as_deref().unwrap_or("<genesis>"),
                fork.log_ids
            )?;
        }
        Ok(())
    }
}
