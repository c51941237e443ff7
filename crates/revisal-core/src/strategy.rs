use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RevisalError;

/// Capture mode governing which attributes a version stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStrategy {
    /// Only attributes changed since the entity was last freshly loaded
    #[default]
    Diff,
    /// All attributes of a freshly re-fetched copy of the entity
    Snapshot,
}

impl fmt::Display for VersionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStrategy::Diff => write!(f, "DIFF"),
            VersionStrategy::Snapshot => write!(f, "SNAPSHOT"),
        }
    }
}

impl FromStr for VersionStrategy {
    type Err = RevisalError;

    /// Parse a capture-mode token, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `InvalidStrategy` for unrecognized tokens. This surfaces at
    /// configuration time; capture itself never sees an invalid mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DIFF" => Ok(VersionStrategy::Diff),
            "SNAPSHOT" => Ok(VersionStrategy::Snapshot),
            _ => Err(RevisalError::InvalidStrategy {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("diff".parse::<VersionStrategy>().unwrap(), VersionStrategy::Diff);
        assert_eq!(
            "Snapshot".parse::<VersionStrategy>().unwrap(),
            VersionStrategy::Snapshot
        );
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let err = "INCREMENTAL".parse::<VersionStrategy>().unwrap_err();
        assert!(matches!(err, RevisalError::InvalidStrategy { .. }));
    }

    #[test]
    fn test_display_round_trip() {
        for strategy in [VersionStrategy::Diff, VersionStrategy::Snapshot] {
            assert_eq!(strategy.to_string().parse::<VersionStrategy>().unwrap(), strategy);
        }
    }
}
