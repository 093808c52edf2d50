//! WebPush transport with VAPID authentication.
//!
//! Posts the JSON body to the subscription endpoint. Payload encryption
//! (RFC 8291) is the subscriber agent's concern and not handled here.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use push_core::{Credentials, ProviderConfig, TransportError};

use crate::traits::{HttpDelivery, WebPushTransport};

const VAPID_TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

#[derive(Debug, serde::Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// WebPush transport backed by `reqwest`.
#[derive(Clone, Default)]
pub struct HttpWebPushTransport {
    client: reqwest::Client,
}

impl HttpWebPushTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WebPushTransport for HttpWebPushTransport {
    async fn send_single(
        &self,
        cfg: &ProviderConfig,
        endpoint: &str,
        body: &serde_json::Value,
        ttl: Option<u64>,
    ) -> Result<HttpDelivery, TransportError> {
        let Credentials::WebPush {
            vapid_private_key,
            vapid_public_key,
            vapid_subject,
        } = &cfg.credentials
        else {
            return Err(TransportError::new("WebPush transport needs VAPID keys"));
        };

        let audience = origin_of(endpoint)?;
        let token = sign_vapid(&audience, vapid_subject, vapid_private_key)?;

        tracing::debug!(endpoint, "sending WebPush notification");

        let response = self
            .client
            .post(endpoint)
            .header(
                "Authorization",
                format!("vapid t={token}, k={vapid_public_key}"),
            )
            .header("Content-Type", "application/json")
            .header("TTL", ttl.unwrap_or(0).to_string())
            .timeout(cfg.timeout())
            .json(body)
            .send()
            .await
            .map_err(TransportError::new)?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpDelivery { status, body })
    }
}

fn sign_vapid(
    audience: &str,
    subject: &str,
    private_key_pem: &str,
) -> Result<String, TransportError> {
    let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())
        .map_err(|e| TransportError::new(format!("invalid VAPID private key: {e}")))?;

    let claims = VapidClaims {
        aud: audience,
        exp: chrono::Utc::now().timestamp() + VAPID_TOKEN_LIFETIME_SECS,
        sub: subject,
    };

    jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &key)
        .map_err(|e| TransportError::new(format!("failed to sign VAPID claims: {e}")))
}

// The `aud` claim is the push service origin, scheme://host[:port].
fn origin_of(endpoint: &str) -> Result<String, TransportError> {
    let rest = endpoint
        .strip_prefix("https://")
        .ok_or_else(|| TransportError::new("subscription endpoint must be an https URL"))?;

    let host = rest.split('/').next().unwrap_or(rest);
    if host.is_empty() {
        return Err(TransportError::new("subscription endpoint has no host"));
    }
    Ok(format!("https://{host}"))
}
