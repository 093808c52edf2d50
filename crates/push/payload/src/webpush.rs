//! WebPush payload construction and endpoint recovery.

use push_core::{Alert, Message, ValidationError};
use serde_json::{Map, Value};

/// Build the opaque JSON body posted to the push service.
///
/// WebPush has no schema of its own; the alert and extra data are merged
/// into one object the service worker unpacks.
pub fn build(message: &Message) -> Result<Value, ValidationError> {
    let mut body = Map::new();

    match &message.alert {
        Some(Alert::Plain(text)) => {
            body.insert("body".into(), Value::String(text.clone()));
        }
        Some(alert @ Alert::Structured { .. }) => {
            if let Some(title) = alert.title() {
                body.insert("title".into(), Value::String(title.into()));
            }
            if let Some(text) = alert.body() {
                body.insert("body".into(), Value::String(text.into()));
            }
        }
        None => {}
    }

    for (key, value) in &message.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

/// Recover the push service endpoint from a registration token.
///
/// Tokens issued by `pushManager.subscribe` are full endpoint URLs and
/// pass through unchanged. Bare tokens from old registrations are glued
/// onto the configured post URL; that path is deprecated and warns.
pub fn endpoint(
    registration_token: &str,
    post_url: Option<&str>,
) -> Result<String, ValidationError> {
    if registration_token.starts_with("https://") {
        return Ok(registration_token.to_string());
    }

    let post_url = post_url.ok_or_else(|| {
        ValidationError::InvalidField(
            "registration token is not an endpoint URL and no post URL is configured".into(),
        )
    })?;

    tracing::warn!(
        token = %registration_token,
        "registration token should be the full endpoint returned from pushManager.subscribe"
    );
    Ok(format!(
        "{}/{}",
        post_url.trim_end_matches('/'),
        registration_token
    ))
}
