//! Deployment choices that change purchase semantics.
//!
//! The storefront historically shipped as two diverging apps. Their
//! behavioural differences are explicit settings here rather than two code
//! paths.

use serde::{Deserialize, Serialize};

/// Who may buy, and whether a purchase is credited to a game account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMode {
    /// Buyers must log in with a game account; the item is granted to the
    /// account's first character after checkout.
    Account,
    /// Anyone may buy; nothing is credited.
    Anonymous,
}

impl PurchaseMode {
    /// Whether buying requires an account session.
    #[must_use]
    pub const fn requires_account(&self) -> bool {
        matches!(self, Self::Account)
    }
}

impl std::fmt::Display for PurchaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

impl std::str::FromStr for PurchaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account" => Ok(Self::Account),
            "anonymous" => Ok(Self::Anonymous),
            _ => Err(format!("invalid purchase mode: {s} (expected account or anonymous)")),
        }
    }
}

/// What the buyer sees when payment succeeded but the grant did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrantFailurePolicy {
    /// Always show the generic success page.
    #[default]
    Open,
    /// Show a distinct "not delivered" notice.
    Closed,
}

impl std::str::FromStr for GrantFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid grant failure policy: {s} (expected open or closed)")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_mode_parse() {
        assert_eq!("account".parse::<PurchaseMode>().unwrap(), PurchaseMode::Account);
        assert_eq!(" Anonymous ".parse::<PurchaseMode>().unwrap(), PurchaseMode::Anonymous);
        assert!("both".parse::<PurchaseMode>().is_err());
        assert!("".parse::<PurchaseMode>().is_err());
    }

    #[test]
    fn test_requires_account() {
        assert!(PurchaseMode::Account.requires_account());
        assert!(!PurchaseMode::Anonymous.requires_account());
    }

    #[test]
    fn test_grant_failure_policy_parse() {
        assert_eq!("open".parse::<GrantFailurePolicy>().unwrap(), GrantFailurePolicy::Open);
        assert_eq!("CLOSED".parse::<GrantFailurePolicy>().unwrap(), GrantFailurePolicy::Closed);
        assert!("ajar".parse::<GrantFailurePolicy>().is_err());
        assert_eq!(GrantFailurePolicy::default(), GrantFailurePolicy::Open);
    }
}
