//! Storage traits.

use push_core::{Device, Provider};

/// Device persistence operations the dispatch engine relies on.
///
/// The engine only ever issues single-row writes (`deactivate`,
/// `update_token`), both idempotent, so at-least-once application of the
/// same mutation is safe without extra locking.
pub trait DeviceStore: Send + Sync {
    /// Insert a device, or update the existing row with the same
    /// (provider, registration token) identity.
    fn register(&self, device: &Device) -> color_eyre::eyre::Result<()>;

    /// List active devices for an (provider, application) pair.
    fn active_devices(
        &self,
        provider: Provider,
        application_id: &str,
    ) -> color_eyre::eyre::Result<Vec<Device>>;

    /// Look up a device by its registration token.
    fn find_by_token(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<Option<Device>>;

    /// Set `active = false` for the device with this token, if any.
    fn deactivate(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<()>;

    /// Rewrite a device's registration token in place.
    fn update_token(
        &self,
        device_id: uuid::Uuid,
        new_token: &str,
    ) -> color_eyre::eyre::Result<()>;
}
