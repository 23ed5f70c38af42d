//! Account search filter built from a `%s` template.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

const PLACEHOLDER: &str = "%s";

/// Filter used when none is configured.
pub const DEFAULT_ACCOUNT_FILTER: &str = "(uid=%s)";

/// Search filter with a single placeholder for the escaped username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    prefix: String,
    suffix: String,
}

impl AccountFilter {
    /// Parse a template such as `(&(objectClass=person)(uid=%s))`.
    ///
    /// # Errors
    ///
    /// Returns `Err` unless the template holds exactly one `%s`.
    pub fn parse(template: &str) -> Result<Self> {
        let placeholders = template.matches(PLACEHOLDER).count();
        let Some((prefix, suffix)) = template.split_once(PLACEHOLDER) else {
            return Err(Error::InvalidAccountFilter { placeholders });
        };

        if placeholders != 1 {
            return Err(Error::InvalidAccountFilter { placeholders });
        }

        Ok(Self {
            prefix: prefix.to_owned(),
            suffix: suffix.to_owned(),
        })
    }

    /// Escape `username` then substitute it into the template.
    pub fn build(&self, username: &str) -> String {
        let escaped = escape_ldap(username);
        let mut filter = String::with_capacity(
            self.prefix.len() + escaped.len() + self.suffix.len(),
        );
        filter.push_str(&self.prefix);
        filter.push_str(&escaped);
        filter.push_str(&self.suffix);
        filter
    }
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self {
            prefix: "(uid=".to_owned(),
            suffix: ")".to_owned(),
        }
    }
}

impl fmt::Display for AccountFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PLACEHOLDER}{}", self.prefix, self.suffix)
    }
}

impl<'de> Deserialize<'de> for AccountFilter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let template = String::deserialize(deserializer)?;
        Self::parse(&template).map_err(serde::de::Error::custom)
    }
}

/// Escape RFC 4515 filter metacharacters.
pub fn escape_ldap(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '*' => out.push_str(r"\2a"),
            '(' => out.push_str(r"\28"),
            ')' => out.push_str(r"\29"),
            '\\' => out.push_str(r"\5c"),
            '\0' => out.push_str(r"\00"),
            c => out.push(c),
        }
    }
    out
}
