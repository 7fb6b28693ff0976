//! Storage module for the Job registry
//!
//! This module provides:
//! - The `JobRegistry` trait with compare-and-set transitions
//! - A SQLite-backed implementation shared by every worker
//! - Schema definitions for Jobs and artifacts

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteJobRegistry;
pub use traits::{JobRegistry, StorageError, StorageResult};
