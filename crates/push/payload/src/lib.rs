//! Per-provider payload construction.
//!
//! Pure transformations from a [`push_core::Message`] into each provider's
//! wire form. No I/O; the only failure mode is a
//! [`push_core::ValidationError`] when a field violates a provider
//! constraint.

pub mod apns;
pub mod fcm;
pub mod webpush;
pub mod wns;
