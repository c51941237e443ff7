//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RevisalError};

/// Version identity style for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStyle {
    /// Monotonic numeric ids assigned by the storage layer
    #[default]
    Numeric,
    /// Time-ordered UUID v7 ids generated at append
    Uuid,
}

/// Deployment configuration shaping engine behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisalConfig {
    /// Live versions kept per owner; 0 keeps all
    pub keep_versions: u32,

    /// Column name of the nullable user foreign key on the versions table
    pub user_foreign_key: String,

    /// Identity style for version ids (also selects the table DDL variant)
    pub identity: IdentityStyle,
}

impl Default for RevisalConfig {
    fn default() -> Self {
        Self {
            keep_versions: 0,
            user_foreign_key: "user_id".to_string(),
            identity: IdentityStyle::Numeric,
        }
    }
}

impl RevisalConfig {
    /// Parse configuration from a TOML document
    ///
    /// Unset keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the document is not valid TOML or a key
    /// has the wrong shape.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RevisalError::Configuration {
            reason: format!("invalid configuration: {}", e),
        })
    }
}
