//! Catalog item identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ItemId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemIdError {
    /// The input string is empty (after trimming).
    #[error("item id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("item id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that cannot appear in a URL path segment.
    #[error("item id cannot contain {0:?}")]
    InvalidCharacter(char),
}

/// An opaque catalog item identifier.
///
/// Item ids are chosen by the admin and double as the `vnum` of the item
/// granted in the game database, so they are kept verbatim apart from
/// surrounding whitespace.
///
/// ## Constraints
///
/// - Length: 1-64 characters after trimming
/// - No `/`, `?`, `#` or control characters (ids appear in `/buy/{id}` paths)
///
/// ## Examples
///
/// ```
/// use ishop_core::ItemId;
///
/// assert!(ItemId::parse("sword1").is_ok());
/// assert!(ItemId::parse("  27001 ").is_ok());
///
/// assert!(ItemId::parse("").is_err());
/// assert!(ItemId::parse("a/b").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct ItemId(String);

impl ItemId {
    /// Maximum length of an item id.
    pub const MAX_LENGTH: usize = 64;

    /// Parse an `ItemId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input:
    /// - Is empty
    /// - Is longer than 64 characters
    /// - Contains `/`, `?`, `#` or a control character
    pub fn parse(s: &str) -> Result<Self, ItemIdError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(ItemIdError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(ItemIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#') || c.is_control())
        {
            return Err(ItemIdError::InvalidCharacter(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ItemId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = ItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ItemIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert!(ItemId::parse("sword1").is_ok());
        assert!(ItemId::parse("27001").is_ok());
        assert!(ItemId::parse("potion-red_large").is_ok());
        assert!(ItemId::parse("Mantel des Drachen").is_ok());
    }

    #[test]
    fn test_parse_trims() {
        assert_eq!(ItemId::parse("  sword1\t").unwrap().as_str(), "sword1");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ItemId::parse(""), Err(ItemIdError::Empty));
        assert_eq!(ItemId::parse("   "), Err(ItemIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(65);
        assert!(matches!(
            ItemId::parse(&long),
            Err(ItemIdError::TooLong { .. })
        ));
        assert!(ItemId::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        assert_eq!(
            ItemId::parse("a/b"),
            Err(ItemIdError::InvalidCharacter('/'))
        );
        assert_eq!(
            ItemId::parse("a?b"),
            Err(ItemIdError::InvalidCharacter('?'))
        );
        assert!(ItemId::parse("a\nb").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: ItemId = serde_json::from_str("\"sword1\"").unwrap();
        assert_eq!(id.as_str(), "sword1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sword1\"");

        assert!(serde_json::from_str::<ItemId>("\"\"").is_err());
    }
}
