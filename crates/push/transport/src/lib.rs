//! Provider Transports
//!
//! One network call per method, nothing else: no device mutation, no
//! response interpretation beyond parsing the wire shape. Classification
//! of responses into per-recipient outcomes lives in `push-engine`.

mod apns;
mod fcm;
mod traits;
mod webpush;
mod wns;

pub use apns::*;
pub use fcm::*;
pub use traits::*;
pub use webpush::*;
pub use wns::*;
