//! Error taxonomy for the engine. Backend failures degrade locally and never
//! cross into the published view; only configuration problems abort startup.

use thiserror::Error;

/// Result alias for event store, game directory, and push channel operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by storage-facing backends regardless of the underlying service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend is unreachable or failed to answer the query.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The push channel refused to open a subscription.
    #[error("push subscription rejected: {0}")]
    SubscriptionRejected(String),
}

/// Configuration problems that abort startup. Everything else in the engine
/// degrades instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A store section was present but missing one half of the credential pair.
    #[error("store credentials incomplete: both `url` and `api_key` are required")]
    PartialStoreCredentials,
    /// A tuning knob was set to a value the engine cannot run with.
    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending configuration field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
