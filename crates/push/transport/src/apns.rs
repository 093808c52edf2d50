//! APNs transport using the a2 crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use a2::request::payload::PayloadLike;
use push_core::{Credentials, Message, ProviderConfig, TransportError};

use crate::traits::{ApnsDelivery, ApnsStatus, ApnsTransport};

/// APNs transport multiplexing requests over one HTTP/2 client per
/// credential set. Clients are built lazily and cached, so repeated
/// dispatches to the same application reuse the connection.
#[derive(Default)]
pub struct A2ApnsTransport {
    clients: Mutex<HashMap<String, Arc<a2::Client>>>,
}

/// A pre-serialized APNs payload sent as-is, with token and options
/// supplied alongside. `PayloadLike` requires `Debug` alongside
/// `Serialize`.
#[derive(Debug, serde::Serialize)]
struct WirePayload<'a> {
    #[serde(flatten)]
    body: &'a serde_json::Value,
    #[serde(skip)]
    device_token: &'a str,
    #[serde(skip)]
    options: a2::NotificationOptions<'a>,
}

impl PayloadLike for WirePayload<'_> {
    fn get_device_token(&self) -> &str {
        self.device_token
    }

    fn get_options(&self) -> &a2::NotificationOptions<'_> {
        &self.options
    }
}

impl A2ApnsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, cfg: &ProviderConfig) -> Result<Arc<a2::Client>, TransportError> {
        let key = cache_key(cfg)?;

        let mut clients = self.clients.lock().expect("APNs client cache lock");
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = Arc::new(build_client(cfg)?);
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl ApnsTransport for A2ApnsTransport {
    async fn prepare(&self, cfg: &ProviderConfig) -> Result<(), TransportError> {
        self.client_for(cfg).map(|_| ())
    }

    async fn send_one(
        &self,
        cfg: &ProviderConfig,
        token: &str,
        message: &Message,
    ) -> ApnsDelivery {
        let client = match self.client_for(cfg) {
            Ok(client) => client,
            Err(e) => return ApnsDelivery::failed(token, e.reason),
        };

        let body = match push_payload::apns::build(message) {
            Ok(body) => body,
            Err(e) => return ApnsDelivery::failed(token, e.to_string()),
        };

        let topic = apns_topic(cfg);
        let collapse_id = message
            .collapse_key
            .as_deref()
            .and_then(|key| a2::CollapseId::new(key).ok());

        let payload = WirePayload {
            body: &body,
            device_token: token,
            options: a2::NotificationOptions {
                apns_topic: topic,
                apns_expiration: message.expiration,
                apns_priority: message.priority.map(|p| match p {
                    push_core::Priority::High => a2::Priority::High,
                    push_core::Priority::Normal => a2::Priority::Normal,
                }),
                apns_collapse_id: collapse_id,
                ..Default::default()
            },
        };

        match client.send(payload).await {
            Ok(response) => ApnsDelivery {
                token: token.to_string(),
                status: ApnsStatus::Delivered {
                    apns_id: response.apns_id,
                },
            },
            Err(a2::Error::ResponseError(response)) => {
                let reason = response
                    .error
                    .map(|body| format!("{:?}", body.reason))
                    .unwrap_or_else(|| format!("HTTP {}", response.code));
                ApnsDelivery {
                    token: token.to_string(),
                    status: ApnsStatus::Rejected { reason },
                }
            }
            Err(e) => ApnsDelivery::failed(token, e.to_string()),
        }
    }
}

fn apns_topic(cfg: &ProviderConfig) -> Option<&str> {
    match &cfg.credentials {
        Credentials::ApnsCertificate { topic, .. } | Credentials::ApnsToken { topic, .. } => {
            Some(topic.as_str())
        }
        _ => None,
    }
}

fn cache_key(cfg: &ProviderConfig) -> Result<String, TransportError> {
    match &cfg.credentials {
        Credentials::ApnsCertificate {
            certificate_path, ..
        } => Ok(format!("cert:{certificate_path}:{}", cfg.use_sandbox)),
        Credentials::ApnsToken {
            key_path, key_id, ..
        } => Ok(format!("token:{key_path}:{key_id}:{}", cfg.use_sandbox)),
        _ => Err(TransportError::new("APNs transport needs APNs credentials")),
    }
}

fn build_client(cfg: &ProviderConfig) -> Result<a2::Client, TransportError> {
    let endpoint = if cfg.use_sandbox {
        a2::Endpoint::Sandbox
    } else {
        a2::Endpoint::Production
    };
    let client_config = a2::ClientConfig::new(endpoint);

    match &cfg.credentials {
        Credentials::ApnsCertificate {
            certificate_path,
            password,
            ..
        } => {
            let mut file = std::fs::File::open(certificate_path).map_err(|e| {
                TransportError::new(format!("failed to open {certificate_path}: {e}"))
            })?;
            a2::Client::certificate(&mut file, password, client_config)
                .map_err(|e| TransportError::new(format!("failed to create APNs client: {e}")))
        }
        Credentials::ApnsToken {
            key_path,
            key_id,
            team_id,
            ..
        } => {
            let mut file = std::fs::File::open(key_path)
                .map_err(|e| TransportError::new(format!("failed to open {key_path}: {e}")))?;
            a2::Client::token(&mut file, key_id, team_id, client_config)
                .map_err(|e| TransportError::new(format!("failed to create APNs client: {e}")))
        }
        _ => Err(TransportError::new("APNs transport needs APNs credentials")),
    }
}
