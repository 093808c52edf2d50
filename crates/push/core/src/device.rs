//! Device records.

use crate::Provider;

/// A registered push target.
///
/// Identity is the registration token scoped to the provider. The dispatch
/// engine never deletes a device; delivery failures only deactivate it or
/// rotate its token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Device {
    pub id: uuid::Uuid,
    /// Provider-issued recipient address: APNs device token, FCM
    /// registration id, WNS channel URI or WebPush subscription endpoint.
    pub registration_token: String,
    /// Opaque application identity used to resolve credentials when one
    /// process serves multiple applications. Empty for the default app.
    pub application_id: String,
    pub provider: Provider,
    /// Inactive devices are skipped entirely by the engine.
    pub active: bool,
}

impl Device {
    pub fn new(
        provider: Provider,
        registration_token: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            registration_token: registration_token.into(),
            application_id: application_id.into(),
            provider,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_is_active() {
        let device = Device::new(Provider::Fcm, "abc", "app-1");
        assert!(device.active);
        assert_eq!(device.registration_token, "abc");
        assert_eq!(device.application_id, "app-1");
    }
}
