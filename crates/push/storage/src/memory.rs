//! In-memory device store.

use std::sync::{Arc, Mutex};

use push_core::{Device, Provider};

use crate::traits::DeviceStore;

/// Thread-safe in-memory device store. Clones share the same backing
/// list, which is how tests keep a handle on a store owned by the engine.
#[derive(Debug, Default, Clone)]
pub struct MemoryDeviceStore {
    devices: Arc<Mutex<Vec<Device>>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored device, active or not.
    pub fn all(&self) -> Vec<Device> {
        self.devices.lock().expect("device store lock").clone()
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn register(&self, device: &Device) -> color_eyre::eyre::Result<()> {
        let mut devices = self.devices.lock().expect("device store lock");
        match devices.iter_mut().find(|d| {
            d.provider == device.provider && d.registration_token == device.registration_token
        }) {
            Some(existing) => {
                existing.application_id = device.application_id.clone();
                existing.active = device.active;
            }
            None => devices.push(device.clone()),
        }
        Ok(())
    }

    fn active_devices(
        &self,
        provider: Provider,
        application_id: &str,
    ) -> color_eyre::eyre::Result<Vec<Device>> {
        let devices = self.devices.lock().expect("device store lock");
        Ok(devices
            .iter()
            .filter(|d| d.provider == provider && d.application_id == application_id && d.active)
            .cloned()
            .collect())
    }

    fn find_by_token(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<Option<Device>> {
        let devices = self.devices.lock().expect("device store lock");
        Ok(devices
            .iter()
            .find(|d| d.provider == provider && d.registration_token == registration_token)
            .cloned())
    }

    fn deactivate(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<()> {
        let mut devices = self.devices.lock().expect("device store lock");
        if let Some(device) = devices
            .iter_mut()
            .find(|d| d.provider == provider && d.registration_token == registration_token)
        {
            device.active = false;
        }
        Ok(())
    }

    fn update_token(
        &self,
        device_id: uuid::Uuid,
        new_token: &str,
    ) -> color_eyre::eyre::Result<()> {
        let mut devices = self.devices.lock().expect("device store lock");
        if let Some(device) = devices.iter_mut().find(|d| d.id == device_id) {
            device.registration_token = new_token.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let store = MemoryDeviceStore::new();
        let handle = store.clone();

        store
            .register(&Device::new(Provider::Fcm, "abc", "app-1"))
            .unwrap();
        handle.deactivate(Provider::Fcm, "abc").unwrap();

        assert!(store.active_devices(Provider::Fcm, "app-1").unwrap().is_empty());
        assert!(!store.all()[0].active);
    }

    #[test]
    fn test_update_token_keeps_identity() {
        let store = MemoryDeviceStore::new();
        let device = Device::new(Provider::Fcm, "old", "app-1");
        store.register(&device).unwrap();

        store.update_token(device.id, "new").unwrap();

        let found = store.find_by_token(Provider::Fcm, "new").unwrap().unwrap();
        assert_eq!(found.id, device.id);
        assert!(found.active);
    }
}
