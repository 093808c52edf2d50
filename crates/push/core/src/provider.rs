//! Push provider tags.

/// The wire-level services a notification can be delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Provider {
    /// Apple Push Notification service.
    #[serde(rename = "APNS")]
    Apns,
    /// Firebase Cloud Messaging.
    #[serde(rename = "FCM")]
    Fcm,
    /// Legacy Google Cloud Messaging. Kept so existing device rows keep
    /// deserializing; sends are refused.
    #[serde(rename = "GCM")]
    Gcm,
    /// Windows Notification Service.
    #[serde(rename = "WNS")]
    Wns,
    /// W3C WebPush via a browser push service.
    #[serde(rename = "WP")]
    WebPush,
}

impl Provider {
    /// Whether the provider is still accepted for delivery.
    pub fn is_deprecated(self) -> bool {
        matches!(self, Provider::Gcm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Apns => "APNS",
            Provider::Fcm => "FCM",
            Provider::Gcm => "GCM",
            Provider::Wns => "WNS",
            Provider::WebPush => "WP",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APNS" => Ok(Provider::Apns),
            "FCM" => Ok(Provider::Fcm),
            "GCM" => Ok(Provider::Gcm),
            "WNS" => Ok(Provider::Wns),
            "WP" => Ok(Provider::WebPush),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        for p in [
            Provider::Apns,
            Provider::Fcm,
            Provider::Gcm,
            Provider::Wns,
            Provider::WebPush,
        ] {
            assert_eq!(p.as_str().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn test_only_gcm_is_deprecated() {
        assert!(Provider::Gcm.is_deprecated());
        assert!(!Provider::Fcm.is_deprecated());
        assert!(!Provider::Apns.is_deprecated());
    }
}
