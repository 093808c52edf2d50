//! Transport traits and raw response shapes.

use push_core::{Message, ProviderConfig, TransportError};
use push_payload::fcm::FcmPayload;
use push_payload::wns::WnsPayload;

/// One entry of an FCM batch response, positionally aligned with the
/// submitted registration ids.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct FcmResult {
    pub message_id: Option<String>,
    /// Canonical id: the provider's replacement registration token.
    pub registration_id: Option<String>,
    pub error: Option<String>,
}

/// The FCM batch response body.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct FcmResponse {
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub failure: u64,
    #[serde(default)]
    pub canonical_ids: u64,
    #[serde(default)]
    pub results: Vec<FcmResult>,
}

/// Raw HTTP answer for providers classified purely by status code
/// (WNS, WebPush).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDelivery {
    pub status: u16,
    pub body: String,
}

/// How one APNs request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApnsStatus {
    /// Accepted by the provider.
    Delivered { apns_id: Option<String> },
    /// The provider answered with a rejection reason.
    Rejected { reason: String },
    /// The request never got a provider answer: timeout, connection
    /// failure or local error. Kept distinct from `Rejected` so a network
    /// hiccup is never mistaken for a dead device.
    Failed { reason: String },
}

/// Result of one APNs request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApnsDelivery {
    pub token: String,
    pub status: ApnsStatus,
}

impl ApnsDelivery {
    pub fn failed(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: ApnsStatus::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// FCM batch delivery.
#[trait_variant::make(Send)]
pub trait FcmTransport: Send + Sync {
    /// Send one payload to a chunk of registration ids, returning the
    /// parsed batch response.
    async fn send_batch(
        &self,
        cfg: &ProviderConfig,
        registration_ids: &[String],
        payload: &FcmPayload,
    ) -> Result<FcmResponse, TransportError>;
}

/// WNS delivery. WNS has no batch endpoint; callers loop `send_single`.
#[trait_variant::make(Send)]
pub trait WnsTransport: Send + Sync {
    async fn send_single(
        &self,
        cfg: &ProviderConfig,
        channel_uri: &str,
        payload: &WnsPayload,
    ) -> Result<HttpDelivery, TransportError>;
}

/// WebPush delivery to a subscription endpoint.
#[trait_variant::make(Send)]
pub trait WebPushTransport: Send + Sync {
    async fn send_single(
        &self,
        cfg: &ProviderConfig,
        endpoint: &str,
        body: &serde_json::Value,
        ttl: Option<u64>,
    ) -> Result<HttpDelivery, TransportError>;
}

/// APNs delivery, one asynchronous request per recipient.
#[trait_variant::make(Send)]
pub trait ApnsTransport: Send + Sync {
    /// Establish (and cache) the client for this configuration. Called
    /// once per dispatch group so credential problems surface as a
    /// transport error instead of one failure per recipient.
    async fn prepare(&self, cfg: &ProviderConfig) -> Result<(), TransportError>;

    /// Send to a single device token. Infallible by design: anything
    /// that goes wrong is folded into the delivery status.
    async fn send_one(&self, cfg: &ProviderConfig, token: &str, message: &Message)
    -> ApnsDelivery;
}
