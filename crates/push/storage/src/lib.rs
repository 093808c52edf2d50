//! Device Storage Layer
//!
//! Diesel-based persistence for registered devices, plus an in-memory
//! store for tests and embedders without a database.

mod memory;
mod models;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryDeviceStore;
pub use models::*;
pub use sqlite::SqliteDeviceStore;
pub use traits::*;

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
