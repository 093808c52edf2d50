//! Push Core Types
//!
//! Provider-agnostic data model for the push dispatch engine: devices,
//! messages, per-recipient outcomes and the credential resolution seam.

mod config;
mod device;
mod error;
mod message;
mod outcome;
mod provider;

pub use config::*;
pub use device::*;
pub use error::*;
pub use message::*;
pub use outcome::*;
pub use provider::*;
