//! Provisioning Metrics
//!
//! Prometheus instruments for the provisioning engine. Each engine instance
//! owns its own [`Registry`] so that several engines (and tests) can coexist
//! in one process; the embedding operator decides how to expose it.

use crate::domain::ports::InterfaceRole;
use crate::error::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Counters and histograms recorded by the engine
pub struct EngineMetrics {
    registry: Registry,
    provisions: IntCounterVec,
    svms_created: IntCounter,
    readiness_attempts: Histogram,
    interfaces_created: IntCounterVec,
    credential_rotations: IntCounter,
}

impl EngineMetrics {
    /// Create metrics registered in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics registered in the given registry
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let provisions = IntCounterVec::new(
            Opts::new("svm_provision_total", "SVM provisioning runs by outcome"),
            &["outcome"],
        )?;
        let svms_created = IntCounter::new(
            "svm_created_total",
            "SVM create requests submitted to the storage controller",
        )?;
        let readiness_attempts = Histogram::with_opts(
            HistogramOpts::new(
                "svm_readiness_attempts",
                "Readiness probes needed before an SVM became usable",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 10.0, 20.0]),
        )?;
        let interfaces_created = IntCounterVec::new(
            Opts::new(
                "svm_interfaces_created_total",
                "Network interfaces created by role",
            ),
            &["role"],
        )?;
        let credential_rotations = IntCounter::new(
            "svm_credential_rotations_total",
            "Admin passwords rotated because the mirrored secret was missing",
        )?;

        registry.register(Box::new(provisions.clone()))?;
        registry.register(Box::new(svms_created.clone()))?;
        registry.register(Box::new(readiness_attempts.clone()))?;
        registry.register(Box::new(interfaces_created.clone()))?;
        registry.register(Box::new(credential_rotations.clone()))?;

        Ok(Self {
            registry,
            provisions,
            svms_created,
            readiness_attempts,
            interfaces_created,
            credential_rotations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn record_provision(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.provisions.with_label_values(&[outcome]).inc();
    }

    #[inline]
    pub fn record_svm_created(&self) {
        self.svms_created.inc();
    }

    #[inline]
    pub fn record_readiness_attempts(&self, attempts: u32) {
        self.readiness_attempts.observe(attempts as f64);
    }

    #[inline]
    pub fn record_interface_created(&self, role: InterfaceRole) {
        self.interfaces_created
            .with_label_values(&[&role.to_string()])
            .inc();
    }

    #[inline]
    pub fn record_credential_rotation(&self) {
        self.credential_rotations.inc();
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn provisions(&self, success: bool) -> u64 {
        let outcome = if success { "success" } else { "failure" };
        self.provisions.with_label_values(&[outcome]).get()
    }

    pub fn svms_created(&self) -> u64 {
        self.svms_created.get()
    }

    pub fn interfaces_created(&self, role: InterfaceRole) -> u64 {
        self.interfaces_created
            .with_label_values(&[&role.to_string()])
            .get()
    }

    pub fn credential_rotations(&self) -> u64 {
        self.credential_rotations.get()
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("svms_created", &self.svms_created.get())
            .field("credential_rotations", &self.credential_rotations.get())
            .finish()
    }
}
