//! WNS transport: OAuth bearer refresh plus per-channel POST.

use push_core::{Credentials, ProviderConfig, TransportError};
use push_payload::wns::WnsPayload;

use crate::traits::{HttpDelivery, WnsTransport};

const DEFAULT_ACCESS_URL: &str = "https://login.live.com/accesstoken.srf";
const SCOPE: &str = "notify.windows.com";

#[derive(Debug, serde::Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

/// WNS transport backed by `reqwest`.
#[derive(Clone, Default)]
pub struct HttpWnsTransport {
    client: reqwest::Client,
}

impl HttpWnsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an access token for WNS communication. WNS bearer tokens
    /// are short-lived, so this runs before every notification POST.
    async fn authenticate(&self, cfg: &ProviderConfig) -> Result<String, TransportError> {
        let Credentials::Wns {
            package_security_id,
            secret_key,
        } = &cfg.credentials
        else {
            return Err(TransportError::new("WNS transport needs OAuth credentials"));
        };

        let form = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}&scope={}",
            urlencoding::encode(package_security_id),
            urlencoding::encode(secret_key),
            urlencoding::encode(SCOPE),
        );

        let url = cfg.endpoint.as_deref().unwrap_or(DEFAULT_ACCESS_URL);
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .timeout(cfg.timeout())
            .body(form)
            .send()
            .await
            .map_err(TransportError::new)?;

        if response.status().as_u16() == 400 {
            return Err(TransportError::new(
                "WNS authentication failed, check package security id and secret key",
            ));
        }

        let parsed: AccessTokenResponse = response
            .json()
            .await
            .map_err(|_| TransportError::new("received invalid JSON data from WNS"))?;

        parsed
            .access_token
            .ok_or_else(|| TransportError::new("access token missing from WNS response"))
    }
}

impl WnsTransport for HttpWnsTransport {
    async fn send_single(
        &self,
        cfg: &ProviderConfig,
        channel_uri: &str,
        payload: &WnsPayload,
    ) -> Result<HttpDelivery, TransportError> {
        let access_token = self.authenticate(cfg).await?;

        tracing::debug!(
            channel_uri,
            wns_type = payload.kind.wns_type(),
            "sending WNS notification"
        );

        let response = self
            .client
            .post(channel_uri)
            .header("Content-Type", payload.kind.content_type())
            .header("Authorization", format!("Bearer {access_token}"))
            .header("X-WNS-Type", payload.kind.wns_type())
            .timeout(cfg.timeout())
            .body(payload.body.clone())
            .send()
            .await
            .map_err(TransportError::new)?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpDelivery { status, body })
    }
}
