use thiserror::Error;

/// Errors produced while validating breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A breaker that opens after zero failures would never admit a call.
    #[error("max_failures must be at least 1")]
    ZeroMaxFailures,

    /// An open key must stay closed to traffic for some time.
    #[error("retry_timeout must be greater than zero")]
    ZeroRetryTimeout,
}
