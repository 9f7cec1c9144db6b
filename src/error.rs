use thiserror::Error;

/// Errors returned by the visibility registry and its configuration types.
///
/// Callback panics are not represented here: they are isolated per record
/// and reported through `tracing` and the trace hook instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObserverError {
    #[error("Target is detached and cannot be observed: {target}")]
    InvalidTarget { target: String },

    #[error(
        "Per-call options conflict with the shared monitor \
         (monitor: threshold {monitor_threshold}, margin {monitor_margin}; \
         requested: threshold {requested_threshold}, margin {requested_margin})"
    )]
    ConflictingOptions {
        monitor_threshold: f64,
        monitor_margin: String,
        requested_threshold: f64,
        requested_margin: String,
    },

    #[error("Threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),

    #[error("Invalid margin: {0}")]
    InvalidMargin(String),

    #[error("Config parse error: {0}")]
    Config(String),
}
