//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums and idempotent application
//! - Embedded SQL migrations in numeric and UUID identity variants
//! - Configurable user-foreign-key column name

mod checksums;
mod embedded;
mod runner;

pub use runner::apply_migrations;
