//! Provider-agnostic notification content.

use serde_json::Value;

/// The alert content of a notification.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Alert {
    /// A bare body string, displayed as-is.
    Plain(String),
    /// Structured alert with localization support. Providers that only
    /// understand flat strings fall back to `body`.
    Structured {
        title: Option<String>,
        subtitle: Option<String>,
        body: Option<String>,
        loc_key: Option<String>,
        loc_args: Vec<String>,
        title_loc_key: Option<String>,
        title_loc_args: Vec<String>,
    },
}

impl Alert {
    /// The plain body text, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Alert::Plain(s) => Some(s),
            Alert::Structured { body, .. } => body.as_deref(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Alert::Plain(_) => None,
            Alert::Structured { title, .. } => title.as_deref(),
        }
    }
}

/// Relative delivery urgency, mapped onto each provider's own scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

impl Priority {
    /// APNs `apns-priority` header value.
    pub fn apns_value(self) -> u8 {
        match self {
            Priority::Normal => 5,
            Priority::High => 10,
        }
    }

    /// FCM `priority` field value.
    pub fn fcm_value(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

/// The content fanned out to every device of a single send call.
///
/// Immutable once built; construct through [`Message::builder`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub alert: Option<Alert>,
    pub badge: Option<u32>,
    pub sound: Option<String>,
    /// Free-form key/value data carried alongside the notification.
    pub extra: serde_json::Map<String, Value>,
    pub collapse_key: Option<String>,
    pub priority: Option<Priority>,
    /// Absolute expiration as unix seconds.
    pub expiration: Option<u64>,
    pub content_available: bool,
    pub mutable_content: bool,
    pub category: Option<String>,
    pub thread_id: Option<String>,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Shorthand for a plain alert-only message.
    pub fn plain(alert: impl Into<String>) -> Self {
        Self::builder().alert(alert).build()
    }

    /// Whether any localization or title field is set, forcing providers
    /// with a string-or-object alert to use the structured form.
    pub fn has_structured_alert(&self) -> bool {
        match &self.alert {
            Some(Alert::Structured { .. }) => true,
            _ => false,
        }
    }
}

/// Builder over the full caller-facing option surface.
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    alert_body: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    loc_key: Option<String>,
    loc_args: Vec<String>,
    title_loc_key: Option<String>,
    title_loc_args: Vec<String>,
    badge: Option<u32>,
    sound: Option<String>,
    extra: serde_json::Map<String, Value>,
    collapse_key: Option<String>,
    priority: Option<Priority>,
    expiration: Option<u64>,
    content_available: bool,
    mutable_content: bool,
    category: Option<String>,
    thread_id: Option<String>,
}

impl MessageBuilder {
    pub fn alert(mut self, body: impl Into<String>) -> Self {
        self.alert_body = Some(body.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn loc_key(mut self, key: impl Into<String>) -> Self {
        self.loc_key = Some(key.into());
        self
    }

    pub fn loc_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.loc_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn title_loc_key(mut self, key: impl Into<String>) -> Self {
        self.title_loc_key = Some(key.into());
        self
    }

    pub fn title_loc_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.title_loc_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }

    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn expiration(mut self, unix_seconds: u64) -> Self {
        self.expiration = Some(unix_seconds);
        self
    }

    pub fn content_available(mut self) -> Self {
        self.content_available = true;
        self
    }

    pub fn mutable_content(mut self) -> Self {
        self.mutable_content = true;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn build(self) -> Message {
        let structured = self.title.is_some()
            || self.subtitle.is_some()
            || self.loc_key.is_some()
            || !self.loc_args.is_empty()
            || self.title_loc_key.is_some()
            || !self.title_loc_args.is_empty();

        let alert = if structured {
            Some(Alert::Structured {
                title: self.title,
                subtitle: self.subtitle,
                body: self.alert_body,
                loc_key: self.loc_key,
                loc_args: self.loc_args,
                title_loc_key: self.title_loc_key,
                title_loc_args: self.title_loc_args,
            })
        } else {
            self.alert_body.map(Alert::Plain)
        };

        Message {
            alert,
            badge: self.badge,
            sound: self.sound,
            extra: self.extra,
            collapse_key: self.collapse_key,
            priority: self.priority,
            expiration: self.expiration,
            content_available: self.content_available,
            mutable_content: self.mutable_content,
            category: self.category,
            thread_id: self.thread_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_alert() {
        let message = Message::plain("Hello world");
        assert_eq!(message.alert, Some(Alert::Plain("Hello world".into())));
        assert!(!message.has_structured_alert());
    }

    #[test]
    fn test_loc_key_forces_structured_alert() {
        let message = Message::builder()
            .alert("fallback")
            .loc_key("GAME_INVITE")
            .loc_args(["Jenna", "Frank"])
            .build();
        match message.alert {
            Some(Alert::Structured { body, loc_key, loc_args, .. }) => {
                assert_eq!(body.as_deref(), Some("fallback"));
                assert_eq!(loc_key.as_deref(), Some("GAME_INVITE"));
                assert_eq!(loc_args, vec!["Jenna", "Frank"]);
            }
            other => panic!("expected structured alert, got {other:?}"),
        }
    }

    #[test]
    fn test_silent_message_has_no_alert() {
        let message = Message::builder().content_available().build();
        assert!(message.alert.is_none());
        assert!(message.content_available);
    }
}
