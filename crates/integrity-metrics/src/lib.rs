mod metrics;

pub use metrics::IntegrityMetrics;
