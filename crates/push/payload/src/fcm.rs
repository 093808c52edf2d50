//! FCM (legacy HTTP API) payload construction.
//!
//! Splits the generic message into FCM's `notification` object (the fixed
//! vocabulary of display fields) and its free-form `data` object:
//! <https://firebase.google.com/docs/cloud-messaging/http-server-ref>

use std::time::{SystemTime, UNIX_EPOCH};

use push_core::{Alert, Message, ValidationError};
use serde_json::{Map, Value};

/// Display-field vocabulary FCM recognizes inside `notification`. Extra
/// keys in this list migrate out of `data`; everything else stays there.
pub const NOTIFICATION_KEYS: &[&str] = &[
    "title",
    "body",
    "icon",
    "image",
    "sound",
    "badge",
    "color",
    "tag",
    "click_action",
    "body_loc_key",
    "body_loc_args",
    "title_loc_key",
    "title_loc_args",
    "android_channel_id",
];

// Top-level request fields; extra data must not collide with them.
const RESERVED_KEYS: &[&str] = &[
    "registration_ids",
    "to",
    "condition",
    "notification",
    "data",
    "collapse_key",
    "priority",
    "time_to_live",
];

/// The body of one FCM send call, minus the recipient list (the transport
/// fills in `registration_ids` per chunk).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FcmPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
}

/// Build the FCM payload for `message`.
pub fn build(message: &Message) -> Result<FcmPayload, ValidationError> {
    let mut data = Map::new();
    let mut notification = Map::new();
    let mut restricted_package_name = None;

    for (key, value) in &message.extra {
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(ValidationError::InvalidField(format!(
                "extra data key {key:?} collides with a reserved FCM field"
            )));
        }
        if key == "restricted_package_name" {
            restricted_package_name = value.as_str().map(str::to_owned);
            continue;
        }
        if NOTIFICATION_KEYS.contains(&key.as_str()) {
            notification.insert(remap(key).into(), value.clone());
        } else {
            data.insert(key.clone(), value.clone());
        }
    }

    match &message.alert {
        Some(Alert::Plain(body)) => {
            notification.insert("body".into(), Value::String(body.clone()));
        }
        Some(Alert::Structured {
            title,
            body,
            loc_key,
            loc_args,
            title_loc_key,
            title_loc_args,
            subtitle: _,
        }) => {
            if let Some(body) = body {
                notification.insert("body".into(), Value::String(body.clone()));
            }
            if let Some(title) = title {
                notification.insert("title".into(), Value::String(title.clone()));
            }
            if let Some(key) = loc_key {
                notification.insert("body_loc_key".into(), Value::String(key.clone()));
            }
            if !loc_args.is_empty() {
                notification.insert("body_loc_args".into(), serde_json::json!(loc_args));
            }
            if let Some(key) = title_loc_key {
                notification.insert("title_loc_key".into(), Value::String(key.clone()));
            }
            if !title_loc_args.is_empty() {
                notification.insert("title_loc_args".into(), serde_json::json!(title_loc_args));
            }
        }
        None => {}
    }

    if let Some(sound) = &message.sound {
        notification.insert("sound".into(), Value::String(sound.clone()));
    }
    if let Some(badge) = message.badge {
        notification.insert("notification_count".into(), badge.into());
    }

    Ok(FcmPayload {
        notification: (!notification.is_empty()).then_some(notification),
        data,
        collapse_key: message.collapse_key.clone(),
        priority: message.priority.map(|p| p.fcm_value()),
        time_to_live: message.expiration.map(|exp| exp.saturating_sub(unix_now())),
        restricted_package_name,
    })
}

// Keys whose wire name differs between the extra vocabulary and the
// notification object.
fn remap(key: &str) -> &str {
    match key {
        "android_channel_id" => "channel_id",
        "badge" => "notification_count",
        other => other,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
