//! Commodity codes and prefix matching.
//!
//! Codes are positions in the HS hierarchy written as plain digit strings.
//! A shorter code is the ancestor of every code that starts with it, so all
//! membership tests reduce to a string prefix check.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commodity code: {0:?}")]
pub struct InvalidCode(pub String);

/// A digit-only commodity code such as `"19"`, `"1905"` or `"190531"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "CodeRepr", into = "String")]
pub struct CommodityCode(String);

impl CommodityCode {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidCode> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidCode(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` lies under `prefix` in the hierarchy.
    pub fn matches(&self, prefix: &CommodityCode) -> bool {
        matches(self, prefix)
    }
}

/// Prefix membership: `code` belongs to `prefix` iff it starts with it.
///
/// `"100199"` matches `"1"`, `"10"` and itself, but `"19"` never matches
/// `"1905"` because a longer prefix cannot fit inside a shorter code.
pub fn matches(code: &CommodityCode, prefix: &CommodityCode) -> bool {
    code.0.starts_with(prefix.0.as_str())
}

impl fmt::Display for CommodityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for CommodityCode {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<CommodityCode> for String {
    fn from(code: CommodityCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CommodityCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Config files list codes both as `190531` and `"190531"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<CodeRepr> for CommodityCode {
    type Error = InvalidCode;

    fn try_from(value: CodeRepr) -> Result<Self, Self::Error> {
        match value {
            CodeRepr::Text(text) => Self::new(text),
            CodeRepr::Number(number) => Self::new(number.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> CommodityCode {
        raw.parse().unwrap()
    }

    #[test]
    fn prefix_matches_descendants() {
        assert!(code("100199").matches(&code("1")));
        assert!(code("19").matches(&code("1")));
        assert!(code("190531").matches(&code("1905")));
        assert!(!code("190110").matches(&code("1905")));
    }

    #[test]
    fn code_always_matches_itself() {
        for raw in ["10", "1905", "230990"] {
            assert!(matches(&code(raw), &code(raw)));
        }
    }

    #[test]
    fn longer_prefix_never_matches() {
        assert!(!code("19").matches(&code("1905")));
        assert!(!code("1").matches(&code("19")));
    }

    #[test]
    fn no_numeric_normalisation() {
        assert!(!code("0190").matches(&code("19")));
        assert!(!code("190").matches(&code("0190")));
    }

    #[test]
    fn rejects_non_digit_codes() {
        assert!(CommodityCode::new("").is_err());
        assert!(CommodityCode::new("AG6").is_err());
        assert!(CommodityCode::new("19 05").is_err());
        assert_eq!(CommodityCode::new(" 1905 ").unwrap().as_str(), "1905");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let codes: Vec<CommodityCode> = serde_json::from_str(r#"[190531, "1905"]"#).unwrap();
        assert_eq!(codes, vec![code("190531"), code("1905")]);
        assert!(serde_json::from_str::<CommodityCode>(r#""x1""#).is_err());
    }
}
