//! Revisal Store - SQLite persistence for the version schema
//!
//! Provides:
//! - Connection management and pragmas
//! - Checksummed, idempotent embedded migrations (numeric and UUID
//!   identity variants, configurable user foreign key)
//! - `SqliteVersionRepo` implementing the core `VersionRepository` trait

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteVersionRepo;
