//! Storage layer - SQLite
//!
//! # Architecture
//!
//! - `database`: Migrated connection pool (file or in-memory)
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use vibecap_core::storage::Database;
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//! ```

pub mod database;
pub mod migrations;

pub use database::Database;
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
