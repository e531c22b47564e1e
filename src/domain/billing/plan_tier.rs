//! Plan tier definitions.
//!
//! Internal enumeration governing feature access for an account.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Internal plan tier of an account.
///
/// Ordered by rank; the resolver relies on `rank()` to break ties when a
/// price id is configured for more than one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanTier {
    /// Lowest tier, the default when nothing matches.
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    /// All tiers, lowest rank first.
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Enterprise];

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more features.
    pub fn rank(&self) -> u8 {
        match self {
            PlanTier::Free => 0,
            PlanTier::Pro => 1,
            PlanTier::Enterprise => 2,
        }
    }

    /// Storage representation (`FREE`, `PRO`, `ENTERPRISE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Pro => "PRO",
            PlanTier::Enterprise => "ENTERPRISE",
        }
    }

    /// Lower-cased name written to user records (`"pro"`).
    pub fn as_user_plan(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(PlanTier::Free),
            "PRO" => Ok(PlanTier::Pro),
            "ENTERPRISE" => Ok(PlanTier::Enterprise),
            other => Err(ValidationError::invalid_format(
                "plan",
                format!("unknown plan tier '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tier_is_free() {
        assert_eq!(PlanTier::default(), PlanTier::Free);
    }

    #[test]
    fn rank_orders_tiers() {
        assert!(PlanTier::Free.rank() < PlanTier::Pro.rank());
        assert!(PlanTier::Pro.rank() < PlanTier::Enterprise.rank());
    }

    #[test]
    fn user_plan_is_lowercase() {
        assert_eq!(PlanTier::Pro.as_user_plan(), "pro");
        assert_eq!(PlanTier::Enterprise.as_user_plan(), "enterprise");
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("pro".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert_eq!("ENTERPRISE".parse::<PlanTier>().unwrap(), PlanTier::Enterprise);
        assert!("gold".parse::<PlanTier>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&PlanTier::Pro).unwrap();
        assert_eq!(json, "\"PRO\"");
    }
}
