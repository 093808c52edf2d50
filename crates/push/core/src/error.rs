//! Error taxonomy for the dispatch engine.

use crate::Provider;

/// A payload field violating a provider constraint. Raised by the pure
/// payload builders before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("payload of {size} bytes exceeds the provider limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("silent notifications need content-available set")]
    SilentWithoutContentAvailable,

    #[error("exactly one of toast, tile, badge or raw content is required")]
    AmbiguousContent,

    #[error("invalid field: {0}")]
    InvalidField(String),
}

/// Connection, authentication or request-construction failure, distinct
/// from any per-device outcome.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct TransportError {
    pub reason: String,
}

impl TransportError {
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Non-device-specific failures surfaced through `DispatchResult::errors`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Missing or invalid credentials; aborts the group before any
    /// network call.
    #[error("configuration error for application {application_id:?} ({provider}): {reason}")]
    Configuration {
        application_id: String,
        provider: Provider,
        reason: String,
    },

    /// Connection or auth failure; aborts the remaining chunks of the
    /// group, already-applied device mutations stand.
    #[error("transport error ({provider}): {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: TransportError,
    },

    /// Provider-wide rejection surfaced after classification. Never
    /// deactivates a device by itself.
    #[error("provider error ({provider}): {reason}")]
    Provider { provider: Provider, reason: String },

    #[error("invalid payload: {0}")]
    Payload(#[from] ValidationError),

    /// The device store failed while applying a lifecycle mutation.
    #[error("device store error: {0}")]
    Store(String),
}

impl DispatchError {
    pub fn transport(provider: Provider, source: TransportError) -> Self {
        DispatchError::Transport { provider, source }
    }

    pub fn provider(provider: Provider, reason: impl Into<String>) -> Self {
        DispatchError::Provider {
            provider,
            reason: reason.into(),
        }
    }

    pub fn configuration(
        application_id: impl Into<String>,
        provider: Provider,
        reason: impl Into<String>,
    ) -> Self {
        DispatchError::Configuration {
            application_id: application_id.into(),
            provider,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::configuration("app-1", Provider::Fcm, "missing API key");
        assert_eq!(
            err.to_string(),
            "configuration error for application \"app-1\" (FCM): missing API key"
        );

        let err = DispatchError::transport(Provider::Wns, TransportError::new("connection refused"));
        assert_eq!(err.to_string(), "transport error (WNS): connection refused");
    }
}
