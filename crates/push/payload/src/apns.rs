//! APNs payload construction.
//!
//! Produces the `aps` dictionary Apple expects:
//! <https://developer.apple.com/documentation/usernotifications/generating-a-remote-notification>

use push_core::{Alert, Message, ValidationError};
use serde_json::{Map, Value, json};

/// Total payload ceiling for regular remote notifications.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Build the APNs JSON payload for `message`.
///
/// The alert becomes a structured object only when a localization or
/// title field is present; a bare body stays a plain string. A message
/// with no alert must be a silent notification (`content-available`).
pub fn build(message: &Message) -> Result<Value, ValidationError> {
    let mut aps = Map::new();

    match &message.alert {
        Some(Alert::Plain(body)) => {
            aps.insert("alert".into(), Value::String(body.clone()));
        }
        Some(alert @ Alert::Structured { .. }) => {
            aps.insert("alert".into(), structured_alert(alert));
        }
        None => {
            if !message.content_available {
                return Err(ValidationError::SilentWithoutContentAvailable);
            }
        }
    }

    if let Some(badge) = message.badge {
        aps.insert("badge".into(), badge.into());
    }
    if let Some(sound) = &message.sound {
        aps.insert("sound".into(), Value::String(sound.clone()));
    }
    if let Some(category) = &message.category {
        aps.insert("category".into(), Value::String(category.clone()));
    }
    if let Some(thread_id) = &message.thread_id {
        aps.insert("thread-id".into(), Value::String(thread_id.clone()));
    }
    if message.content_available {
        aps.insert("content-available".into(), 1.into());
    }
    if message.mutable_content {
        aps.insert("mutable-content".into(), 1.into());
    }

    let mut root = Map::new();
    root.insert("aps".into(), Value::Object(aps));
    for (key, value) in &message.extra {
        if key == "aps" {
            return Err(ValidationError::InvalidField(
                "extra data must not shadow the aps dictionary".into(),
            ));
        }
        root.insert(key.clone(), value.clone());
    }

    let payload = Value::Object(root);
    let size = serde_json::to_vec(&payload).map(|b| b.len()).unwrap_or(0);
    if size > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadTooLarge {
            size,
            limit: MAX_PAYLOAD_BYTES,
        });
    }

    Ok(payload)
}

fn structured_alert(alert: &Alert) -> Value {
    let Alert::Structured {
        title,
        subtitle,
        body,
        loc_key,
        loc_args,
        title_loc_key,
        title_loc_args,
    } = alert
    else {
        unreachable!("caller matched the structured variant");
    };

    let mut obj = Map::new();
    if let Some(title) = title {
        obj.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(subtitle) = subtitle {
        obj.insert("subtitle".into(), Value::String(subtitle.clone()));
    }
    if let Some(body) = body {
        obj.insert("body".into(), Value::String(body.clone()));
    }
    if let Some(loc_key) = loc_key {
        obj.insert("loc-key".into(), Value::String(loc_key.clone()));
    }
    if !loc_args.is_empty() {
        obj.insert("loc-args".into(), json!(loc_args));
    }
    if let Some(key) = title_loc_key {
        obj.insert("title-loc-key".into(), Value::String(key.clone()));
    }
    if !title_loc_args.is_empty() {
        obj.insert("title-loc-args".into(), json!(title_loc_args));
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_core::Message;

    #[test]
    fn test_plain_alert_stays_a_string() {
        let payload = build(&Message::plain("Hello world")).unwrap();
        assert_eq!(payload["aps"]["alert"], "Hello world");
    }

    #[test]
    fn test_localized_alert_becomes_an_object() {
        let message = Message::builder()
            .alert("fallback")
            .loc_key("GAME_INVITE")
            .loc_args(["Jenna"])
            .build();
        let payload = build(&message).unwrap();
        assert_eq!(payload["aps"]["alert"]["body"], "fallback");
        assert_eq!(payload["aps"]["alert"]["loc-key"], "GAME_INVITE");
        assert_eq!(payload["aps"]["alert"]["loc-args"][0], "Jenna");
    }

    #[test]
    fn test_aps_field_names() {
        let message = Message::builder()
            .alert("hi")
            .badge(3)
            .sound("default")
            .category("INVITE")
            .thread_id("thread-1")
            .mutable_content()
            .build();
        let payload = build(&message).unwrap();
        let aps = &payload["aps"];
        assert_eq!(aps["badge"], 3);
        assert_eq!(aps["sound"], "default");
        assert_eq!(aps["category"], "INVITE");
        assert_eq!(aps["thread-id"], "thread-1");
        assert_eq!(aps["mutable-content"], 1);
    }

    #[test]
    fn test_silent_notification() {
        let message = Message::builder().content_available().build();
        let payload = build(&message).unwrap();
        assert!(payload["aps"].get("alert").is_none());
        assert_eq!(payload["aps"]["content-available"], 1);
    }

    #[test]
    fn test_silent_without_content_available_is_rejected() {
        let message = Message::builder().badge(1).build();
        assert_eq!(
            build(&message),
            Err(ValidationError::SilentWithoutContentAvailable)
        );
    }

    #[test]
    fn test_extra_data_merges_at_top_level() {
        let message = Message::builder().alert("hi").extra("deal_id", 42).build();
        let payload = build(&message).unwrap();
        assert_eq!(payload["deal_id"], 42);
    }

    #[test]
    fn test_extra_cannot_shadow_aps() {
        let message = Message::builder().alert("hi").extra("aps", "x").build();
        assert!(matches!(build(&message), Err(ValidationError::InvalidField(_))));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let message = Message::builder().alert("x".repeat(5000)).build();
        assert!(matches!(
            build(&message),
            Err(ValidationError::PayloadTooLarge { .. })
        ));
    }
}
