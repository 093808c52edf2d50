//! FCM transport over the legacy HTTP API.

use push_core::{Credentials, ProviderConfig, TransportError};
use push_payload::fcm::FcmPayload;
use serde_json::Value;

use crate::traits::{FcmResponse, FcmTransport};

const DEFAULT_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM transport backed by `reqwest`.
#[derive(Clone, Default)]
pub struct HttpFcmTransport {
    client: reqwest::Client,
}

impl HttpFcmTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FcmTransport for HttpFcmTransport {
    async fn send_batch(
        &self,
        cfg: &ProviderConfig,
        registration_ids: &[String],
        payload: &FcmPayload,
    ) -> Result<FcmResponse, TransportError> {
        let Credentials::FcmApiKey { api_key } = &cfg.credentials else {
            return Err(TransportError::new("FCM transport needs an API key"));
        };

        let mut body = match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            _ => return Err(TransportError::new("failed to serialize FCM payload")),
        };
        match registration_ids {
            [single] => {
                body.insert("to".into(), Value::String(single.clone()));
            }
            many => {
                body.insert("registration_ids".into(), serde_json::json!(many));
            }
        }

        let url = cfg.endpoint.as_deref().unwrap_or(DEFAULT_SEND_URL);
        tracing::debug!(url, recipients = registration_ids.len(), "sending FCM batch");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("key={api_key}"))
            .timeout(cfg.timeout())
            .json(&Value::Object(body))
            .send()
            .await
            .map_err(TransportError::new)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(format!(
                "FCM returned HTTP {status}"
            )));
        }

        response
            .json::<FcmResponse>()
            .await
            .map_err(|e| TransportError::new(format!("invalid FCM response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wire-format fixtures matching the provider's documented responses.
    #[test]
    fn test_parse_canonical_id_response() {
        let raw = r#"{"failure":0,"canonical_ids":1,"success":1,"multicast_id":7173139966327257000,
            "results":[{"registration_id":"NEW_REGISTRATION_ID","message_id":"0:1440068396670935%6868637df9fd7ecd"}]}"#;
        let response: FcmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.canonical_ids, 1);
        assert_eq!(
            response.results[0].registration_id.as_deref(),
            Some("NEW_REGISTRATION_ID")
        );
        assert!(response.results[0].error.is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let raw = r#"{"success":1,"failure":2,"canonical_ids":0,"results":
            [{"error":"NotRegistered"},{"message_id":"0:1433830664381654%3449593ff9fd7ecd"},{"error":"InvalidRegistration"}]}"#;
        let response: FcmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.failure, 2);
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].error.as_deref(), Some("NotRegistered"));
        assert!(response.results[1].error.is_none());
    }

    #[test]
    fn test_missing_counts_default_to_zero() {
        let response: FcmResponse = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(response.success, 0);
        assert_eq!(response.canonical_ids, 0);
    }
}
