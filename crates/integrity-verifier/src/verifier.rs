use std::collections::HashSet;
use std::sync::Arc;

use fleetguard_audit_ledger::{
    chain_hash, AuditLogEntry, ForkGroup, HashedFields, Ledger, LedgerStore,
};
use fleetguard_core_types::CompanyId;
use tracing::{info, instrument, warn};

use crate::errors::VerifyError;
use crate::report::{BreakReason, BrokenChain, IntegrityReport};

pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Walks a tenant's chain in id order and recomputes every link.
///
/// Each mismatch is reported once: after checking an entry the walk carries
/// on from that entry's stored hash, so an edited payload flags only the
/// edited entry while a rewritten hash flags the entry and its successor.
#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn LedgerStore>,
    page_size: usize,
}

impl Verifier {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn for_ledger(ledger: &Ledger) -> Self {
        Self::new(Arc::clone(ledger.store()))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[instrument(name = "integrity.verify", skip_all, fields(company = %company))]
    pub async fn verify(&self, company: CompanyId) -> Result<IntegrityReport, VerifyError> {
        let forks = self.store.fork_groups(company).await?;
        let shadowed = shadowed_fork_members(&forks);

        let mut walk = ChainWalk::default();
        let mut after_id = 0;
        loop {
            let page = self.store.page(company, after_id, self.page_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            for entry in &page {
                walk.check(entry, shadowed.contains(&entry.id))?;
            }
            if page.len() < self.page_size {
                break;
            }
        }

        for broken in &walk.broken {
            warn!(
                target: "integrity",
                log_id = broken.log_id,
                reason = ?broken.reason,
                expected = %broken.expected_hash,
                actual = %broken.actual_hash,
                "audit chain mismatch"
            );
        }
        for fork in &forks {
            warn!(target: "integrity", log_ids = ?fork.log_ids, "audit chain fork");
        }

        let report = IntegrityReport {
            company_id: company,
            is_valid: walk.broken.is_empty() && forks.is_empty(),
            total_logs: walk.total,
            broken_chains: walk.broken,
            forks,
        };
        info!(
            target: "integrity",
            valid = report.is_valid,
            total = report.total_logs,
            "verification finished"
        );
        Ok(report)
    }

    /// Service-facing name for [`Verifier::verify`].
    pub async fn verify_audit_log_integrity(
        &self,
        company: CompanyId,
    ) -> Result<IntegrityReport, VerifyError> {
        self.verify(company).await
    }

    /// Verifies each tenant in turn, stopping at the first read failure.
    pub async fn verify_all<I>(&self, companies: I) -> Result<Vec<IntegrityReport>, VerifyError>
    where
        I: IntoIterator<Item = CompanyId>,
    {
        let mut reports = Vec::new();
        for company in companies {
            reports.push(self.verify(company).await?);
        }
        Ok(reports)
    }
}

/// Fork members other than the lowest id of their group. Their link is
/// reported through the fork, not as a broken chain.
fn shadowed_fork_members(forks: &[ForkGroup]) -> HashSet<i64> {
    forks
        .iter()
        .flat_map(|fork| fork.log_ids.iter().skip(1).copied())
        .collect()
}

#[derive(Default)]
struct ChainWalk {
    previous: Option<String>,
    total: u64,
    broken: Vec<BrokenChain>,
}

impl ChainWalk {
    fn check(&mut self, entry: &AuditLogEntry, shadowed: bool) -> Result<(), VerifyError> {
        self.total += 1;
        let fields = HashedFields::from(entry);

        if shadowed {
            let expected = chain_hash(&fields, entry.previous_hash.as_deref())?;
            if expected != entry.current_hash {
                self.push(entry, expected, BreakReason::HashMismatch);
            }
        } else {
            let expected = chain_hash(&fields, self.previous.as_deref())?;
            if expected != entry.current_hash {
                self.push(entry, expected, BreakReason::HashMismatch);
            } else if entry.previous_hash != self.previous {
                self.push(entry, expected, BreakReason::LinkMismatch);
            }
        }

        self.previous = Some(entry.current_hash.clone());
        Ok(())
    }

    fn push(&mut self, entry: &AuditLogEntry, expected: String, reason: BreakReason) {
        self.broken.push(BrokenChain {
            log_id: entry.id,
            expected_hash: expected,
            actual_hash: entry.current_hash.clone(),
            reason,
        });
    }
}
