//! Status enums for purchase records.

use serde::{Deserialize, Serialize};

/// Lifecycle of a locally recorded purchase.
///
/// A record is written as `Confirmed` once the buyer returns from checkout,
/// before the grant is attempted, and then moved to exactly one of the
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Payment confirmed, grant not yet attempted (or interrupted).
    #[default]
    Confirmed,
    /// Item was written to the character's inventory.
    Granted,
    /// The account has no character; nothing was granted.
    NoCharacter,
    /// The grant raised an error.
    GrantFailed,
}

impl PurchaseStatus {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Granted => "granted",
            Self::NoCharacter => "no_character",
            Self::GrantFailed => "grant_failed",
        }
    }

    /// Whether no further transition is expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Confirmed)
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "granted" => Ok(Self::Granted),
            "no_character" => Ok(Self::NoCharacter),
            "grant_failed" => Ok(Self::GrantFailed),
            _ => Err(format!("invalid purchase status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            PurchaseStatus::Confirmed,
            PurchaseStatus::Granted,
            PurchaseStatus::NoCharacter,
            PurchaseStatus::GrantFailed,
        ] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("paid".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PurchaseStatus::Confirmed.is_terminal());
        assert!(PurchaseStatus::Granted.is_terminal());
        assert!(PurchaseStatus::GrantFailed.is_terminal());
    }
}
