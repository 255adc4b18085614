use exam_core::{MonitorObserver, ViolationType};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for what the integrity monitor detected and what failed while it
/// did. Registered on a private registry so several exam views can coexist.
pub struct IntegrityMetrics {
    registry: Registry,
    pub violations_total: IntCounterVec,
    pub probe_failures_total: IntCounterVec,
    pub transport_failures_total: IntCounter,
}

impl IntegrityMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let violations_total = IntCounterVec::new(
            Opts::new("exam_violations_total", "Integrity violations detected, by type"),
            &["type"],
        )?;
        registry.register(Box::new(violations_total.clone()))?;

        let probe_failures_total = IntCounterVec::new(
            Opts::new(
                "exam_probe_failures_total",
                "Detection probes that could not read the environment",
            ),
            &["probe"],
        )?;
        registry.register(Box::new(probe_failures_total.clone()))?;

        let transport_failures_total = IntCounter::new(
            "exam_violation_transport_failures_total",
            "Violation reports the live channel did not accept",
        )?;
        registry.register(Box::new(transport_failures_total.clone()))?;

        Ok(Self {
            registry,
            violations_total,
            probe_failures_total,
            transport_failures_total,
        })
    }

    pub fn violations(&self, kind: ViolationType) -> u64 {
        self.violations_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MonitorObserver for IntegrityMetrics {
    fn violation_reported(&self, kind: ViolationType) {
        self.violations_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    fn probe_failed(&self, probe: &str) {
        self.probe_failures_total.with_label_values(&[probe]).inc();
    }

    fn transport_failed(&self) {
        self.transport_failures_total.inc();
    }
}
