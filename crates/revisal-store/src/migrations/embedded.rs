//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!. The versions
//! table DDL comes in two variants selected by the deployment's identity
//! style; the `{{user_fk}}` placeholder is substituted by the runner.

use revisal_core::IdentityStyle;

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Get all embedded migrations in order for the given identity style
pub fn get_migrations(identity: IdentityStyle) -> Vec<Migration> {
    match identity {
        IdentityStyle::Numeric => vec![Migration {
            id: "001_create_versions",
            sql: include_str!("../../migrations/001_create_versions.sql"),
        }],
        IdentityStyle::Uuid => vec![Migration {
            id: "001_create_versions_uuid",
            sql: include_str!("../../migrations/001_create_versions_uuid.sql"),
        }],
    }
}
