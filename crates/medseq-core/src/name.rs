//! Sequence name handling.
//!
//! A sequence name identifies one counter (`opdNumber`, `ipdNumber`, ...).
//! Names are validated once at the edge and carried as [`SequenceName`]
//! everywhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum accepted length of a sequence name.
pub const MAX_NAME_LEN: usize = 64;

/// Validated name of a sequence counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SequenceName(String);

impl SequenceName {
    /// Validates and wraps a sequence name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Checks that a name is non-empty, bounded and made of ASCII alphanumerics,
/// `_`, `-` or `.`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CoreError::invalid_sequence_name("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::invalid_sequence_name(format!(
            "name '{name}' exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(CoreError::invalid_sequence_name(format!(
            "name '{name}' contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SequenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SequenceName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SequenceName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SequenceName {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SequenceName> for String {
    fn from(name: SequenceName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["opdNumber", "ipdNumber", "dialysis_session", "claim-no", "ward.a"] {
            let parsed = SequenceName::new(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            SequenceName::new(""),
            Err(CoreError::InvalidSequenceName(_))
        ));
        assert!(SequenceName::new("   ").is_err());
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert!(SequenceName::new("opd number").is_err());
        assert!(SequenceName::new("opd/number").is_err());
        assert!(SequenceName::new("opd'; DROP TABLE").is_err());
    }

    #[test]
    fn test_length_limit() {
        let at_limit = "a".repeat(MAX_NAME_LEN);
        assert!(SequenceName::new(at_limit).is_ok());
        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(SequenceName::new(too_long).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let name: SequenceName = serde_json::from_str("\"opdNumber\"").unwrap();
        assert_eq!(name.to_string(), "opdNumber");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"opdNumber\"");
        assert!(serde_json::from_str::<SequenceName>("\"\"").is_err());
    }
}
