//! Advertising account identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix the ads provider puts in front of numeric account ids.
pub const ACCOUNT_PREFIX: &str = "act_";

/// Identifier of an advertising account.
///
/// Rules may store either the bare numeric id (`"1234"`) or the prefixed
/// form (`"act_1234"`); both refer to the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self(id.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id with the provider prefix ensured.
    #[must_use]
    pub fn normalized(&self) -> Self {
        if self.0.starts_with(ACCOUNT_PREFIX) {
            self.clone()
        } else {
            Self(format!("{ACCOUNT_PREFIX}{}", self.0))
        }
    }

    /// Whether two ids name the same account once normalized.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_add_prefix_when_normalizing_bare_id() {
        assert_eq!(AccountId::new("1234").normalized().as_str(), "act_1234");
    }

    #[test]
    fn should_keep_prefixed_id_when_normalizing() {
        assert_eq!(AccountId::new("act_1234").normalized().as_str(), "act_1234");
    }

    #[test]
    fn should_match_bare_and_prefixed_forms() {
        assert!(AccountId::new("1234").matches(&AccountId::new("act_1234")));
        assert!(!AccountId::new("1234").matches(&AccountId::new("act_9999")));
    }

    #[test]
    fn should_trim_whitespace() {
        assert_eq!(AccountId::new("  act_1 ").as_str(), "act_1");
    }
}
