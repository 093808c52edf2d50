//! Device lifecycle policy.

use push_core::{Outcome, Provider, RecipientOutcome};
use push_storage::DeviceStore;

/// Applies classified outcomes to the device store.
///
/// The policy is deterministic and idempotent: applying the same outcome
/// twice leaves the store in the same end state, so at-least-once
/// delivery of outcomes is safe.
pub struct DeviceLifecycle<S> {
    store: S,
}

impl<S: DeviceStore> DeviceLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one recipient outcome.
    ///
    /// Only `PermanentFailure` and `Rotate` mutate anything; transient
    /// and unknown outcomes are explicitly not deactivation signals.
    pub fn apply(
        &self,
        provider: Provider,
        recipient: &RecipientOutcome,
    ) -> color_eyre::eyre::Result<()> {
        let token = &recipient.registration_token;

        match &recipient.outcome {
            Outcome::Success | Outcome::TransientFailure(_) | Outcome::Unknown(_) => Ok(()),

            Outcome::PermanentFailure(reason) => {
                tracing::info!(%provider, token = %token, reason = %reason, "deactivating device");
                self.store.deactivate(provider, token)
            }

            Outcome::Rotate { new_token } => {
                if new_token == token {
                    // Self-rotation is a provider no-op, not a duplicate.
                    return Ok(());
                }

                match self.store.find_by_token(provider, new_token)? {
                    Some(survivor) if survivor.active => {
                        // The new token already belongs to a live device:
                        // merge by retiring the old row.
                        tracing::info!(
                            %provider,
                            old_token = %token,
                            new_token = %new_token,
                            "canonical token already registered, deactivating duplicate"
                        );
                        self.store.deactivate(provider, token)
                    }
                    _ => {
                        let Some(device) = self.store.find_by_token(provider, token)? else {
                            return Ok(());
                        };
                        tracing::info!(
                            %provider,
                            old_token = %token,
                            new_token = %new_token,
                            "rotating registration token"
                        );
                        self.store.update_token(device.id, new_token)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_core::Device;
    use push_storage::MemoryDeviceStore;

    fn setup(tokens: &[&str]) -> (DeviceLifecycle<MemoryDeviceStore>, MemoryDeviceStore) {
        let store = MemoryDeviceStore::new();
        for token in tokens {
            store
                .register(&Device::new(Provider::Fcm, *token, "app-1"))
                .unwrap();
        }
        (DeviceLifecycle::new(store.clone()), store)
    }

    fn outcome(token: &str, outcome: Outcome) -> RecipientOutcome {
        RecipientOutcome::new(token, outcome)
    }

    #[test]
    fn test_success_and_transient_do_not_mutate() {
        let (lifecycle, store) = setup(&["abc"]);
        for o in [
            Outcome::Success,
            Outcome::TransientFailure("QuotaExceeded".into()),
            Outcome::Unknown("???".into()),
        ] {
            lifecycle.apply(Provider::Fcm, &outcome("abc", o)).unwrap();
        }
        assert!(store.find_by_token(Provider::Fcm, "abc").unwrap().unwrap().active);
    }

    #[test]
    fn test_permanent_failure_deactivates() {
        let (lifecycle, store) = setup(&["abc"]);
        let o = outcome("abc", Outcome::PermanentFailure("NotRegistered".into()));
        lifecycle.apply(Provider::Fcm, &o).unwrap();
        assert!(!store.find_by_token(Provider::Fcm, "abc").unwrap().unwrap().active);

        // idempotent
        lifecycle.apply(Provider::Fcm, &o).unwrap();
        assert!(!store.find_by_token(Provider::Fcm, "abc").unwrap().unwrap().active);
    }

    #[test]
    fn test_rotate_to_fresh_token_updates_in_place() {
        let (lifecycle, store) = setup(&["foo"]);
        let before = store.find_by_token(Provider::Fcm, "foo").unwrap().unwrap();

        let o = outcome("foo", Outcome::Rotate { new_token: "NEW".into() });
        lifecycle.apply(Provider::Fcm, &o).unwrap();

        let after = store.find_by_token(Provider::Fcm, "NEW").unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert!(after.active);
        assert!(store.find_by_token(Provider::Fcm, "foo").unwrap().is_none());
    }

    #[test]
    fn test_rotate_onto_existing_active_device_merges() {
        let (lifecycle, store) = setup(&["old", "NEW"]);

        let o = outcome("old", Outcome::Rotate { new_token: "NEW".into() });
        lifecycle.apply(Provider::Fcm, &o).unwrap();

        assert!(!store.find_by_token(Provider::Fcm, "old").unwrap().unwrap().active);
        assert!(store.find_by_token(Provider::Fcm, "NEW").unwrap().unwrap().active);

        // applying again is a no-op: the old row is already retired
        lifecycle.apply(Provider::Fcm, &o).unwrap();
        assert!(!store.find_by_token(Provider::Fcm, "old").unwrap().unwrap().active);
    }

    #[test]
    fn test_rotate_applied_twice_converges() {
        let (lifecycle, store) = setup(&["foo"]);
        let o = outcome("foo", Outcome::Rotate { new_token: "NEW".into() });

        lifecycle.apply(Provider::Fcm, &o).unwrap();
        lifecycle.apply(Provider::Fcm, &o).unwrap();

        // exactly one device, carrying the new token, still active
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].registration_token, "NEW");
        assert!(all[0].active);
    }

    #[test]
    fn test_self_rotation_is_a_no_op() {
        let (lifecycle, store) = setup(&["bar"]);
        let o = outcome("bar", Outcome::Rotate { new_token: "bar".into() });
        lifecycle.apply(Provider::Fcm, &o).unwrap();

        let device = store.find_by_token(Provider::Fcm, "bar").unwrap().unwrap();
        assert!(device.active);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_rotate_for_unknown_token_is_ignored() {
        let (lifecycle, store) = setup(&[]);
        let o = outcome("ghost", Outcome::Rotate { new_token: "NEW".into() });
        lifecycle.apply(Provider::Fcm, &o).unwrap();
        assert!(store.all().is_empty());
    }
}
