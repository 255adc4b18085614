use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    #[error("session token cannot be empty")]
    Empty,
}

/// Failure of the live channel. Never retried; enforcement proceeds regardless.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("live channel is not connected")]
    Disconnected,
    #[error("live channel rejected `{event}`: {reason}")]
    Rejected { event: String, reason: String },
    #[error("payload could not be encoded: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("probe element could not be injected: {0}")]
    ElementInjection(String),
    #[error("window metrics unavailable")]
    MetricsUnavailable,
    #[error("console timing side channel unavailable: {0}")]
    ConsoleUnavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid monitor config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("`{field}` must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}
