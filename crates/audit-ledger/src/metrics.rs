use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{core::Collector, Histogram, HistogramOpts, IntCounter, Registry};
use tracing::error;

static APPENDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fleetguard_ledger_appends_total",
        "Audit entries committed",
    )
    .expect("valid metric definition")
});

static APPEND_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fleetguard_ledger_append_conflicts_total",
        "Appends that lost a chain-tail race and were retried or abandoned",
    )
    .expect("valid metric definition")
});

static APPEND_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fleetguard_ledger_append_failures_total",
        "Appends that failed and rolled back their unit of work",
    )
    .expect("valid metric definition")
});

static APPEND_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fleetguard_ledger_append_seconds",
            "Wall time of a committed append, retries included",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
    )
    .expect("valid metric definition")
});

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register ledger metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, APPENDS_TOTAL.clone());
    register(registry, APPEND_CONFLICTS_TOTAL.clone());
    register(registry, APPEND_FAILURES_TOTAL.clone());
    register(registry, APPEND_SECONDS.clone());
}

pub(crate) fn record_append(elapsed: Duration) {
    APPENDS_TOTAL.inc();
    APPEND_SECONDS.observe(elapsed.as_secs_f64());
}

pub(crate) fn record_conflict() {
    APPEND_CONFLICTS_TOTAL.inc();
}

pub(crate) fn record_failure() {
    APPEND_FAILURES_TOTAL.inc();
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerMetricsSnapshot {
    pub appends: u64,
    pub conflicts: u64,
    pub failures: u64,
}

pub fn snapshot() -> LedgerMetricsSnapshot {
    LedgerMetricsSnapshot {
        appends: APPENDS_TOTAL.get(),
        conflicts: APPEND_CONFLICTS_TOTAL.get(),
        failures: APPEND_FAILURES_TOTAL.get(),
    }
}
