//! ---
//! pulse_section: "06-security-access-control"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Prometheus counters for permission evaluation and override storage."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Permission metrics exported via Prometheus.
#[derive(Clone)]
pub struct PermissionMetrics {
    registry: Arc<Registry>,
    evaluations_total: IntCounter,
    denials_total: IntCounter,
    override_writes_total: IntCounter,
    override_store_failures_total: IntCounter,
}

impl PermissionMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let evaluations_total = IntCounter::new(
            "permission_evaluations_total",
            "Effective permission sets resolved",
        )?;
        let denials_total = IntCounter::new(
            "permission_denials_total",
            "Permission checks that were denied",
        )?;
        let override_writes_total = IntCounter::new(
            "permission_override_writes_total",
            "Override maps written to the store",
        )?;
        let override_store_failures_total = IntCounter::new(
            "permission_override_store_failures_total",
            "Override writes that failed to persist",
        )?;

        registry.register(Box::new(evaluations_total.clone()))?;
        registry.register(Box::new(denials_total.clone()))?;
        registry.register(Box::new(override_writes_total.clone()))?;
        registry.register(Box::new(override_store_failures_total.clone()))?;

        Ok(Self {
            registry,
            evaluations_total,
            denials_total,
            override_writes_total,
            override_store_failures_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub(crate) fn inc_evaluation(&self) {
        self.evaluations_total.inc();
    }

    pub(crate) fn inc_denial(&self) {
        self.denials_total.inc();
    }

    pub(crate) fn inc_override_write(&self) {
        self.override_writes_total.inc();
    }

    pub(crate) fn inc_store_failure(&self) {
        self.override_store_failures_total.inc();
    }

    /// Current denial count.
    pub fn denials(&self) -> u64 {
        self.denials_total.get()
    }

    /// Current store failure count.
    pub fn store_failures(&self) -> u64 {
        self.override_store_failures_total.get()
    }
}

impl std::fmt::Debug for PermissionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionMetrics")
            .field("evaluations_total", &self.evaluations_total.get())
            .field("denials_total", &self.denials_total.get())
            .finish_non_exhaustive()
    }
}
