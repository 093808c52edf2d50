//! Push Dispatch Engine
//!
//! Orchestrates a send call end to end: group recipients per (provider,
//! application), resolve credentials, build payloads, issue provider
//! calls with chunking and timeouts, classify responses into
//! per-recipient outcomes and apply the device lifecycle.
//!
//! Everything stateful is behind traits so the whole pipeline runs
//! against in-memory fakes in tests; the real wiring is
//! [`DispatchEngine::new`] over the HTTP transports from
//! `push-transport` and a `push-storage` device store.

mod chunk;
mod classify;
mod concurrent;
mod engine;
mod lifecycle;

pub use chunk::chunk;
pub use classify::{
    classify_apns, classify_fcm, classify_webpush, classify_wns, Classification,
    APNS_PERMANENT_REASONS, FCM_PERMANENT_ERRORS,
};
pub use concurrent::send_concurrent;
pub use engine::{DispatchEngine, DispatchOptions};
pub use lifecycle::DeviceLifecycle;
