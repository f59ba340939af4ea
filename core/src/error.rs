//! Failure taxonomy shared by every provider integration.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by embedding and language model providers.
///
/// Callers decide whether to retry with [`ProviderError::is_transient`]: rate limits,
/// transport hiccups, timeouts and temporary unavailability are transient; everything that
/// needs a human to fix configuration or credentials is fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider asked us to slow down.
    #[error("rate limited by provider")]
    RateLimited {
        /// Delay suggested by the provider (`Retry-After`), if any.
        retry_after: Option<Duration>,
    },

    /// Network or connection failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider is temporarily unable to serve requests (5xx, overloaded).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete before its deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider is misconfigured (unknown model, bad endpoint, invalid request).
    #[error("provider misconfigured: {0}")]
    Configuration(String),

    /// The provider answered, but not with what the contract promises.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Any other provider-specific failure. Treated as fatal.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport(_) | Self::Unavailable(_) | Self::Timeout(_) => {
                true
            }
            Self::Authentication(_)
            | Self::Configuration(_)
            | Self::InvalidResponse(_)
            | Self::Other(_) => false,
        }
    }

    /// Returns `true` for deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Delay suggested by the provider before the next attempt.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
