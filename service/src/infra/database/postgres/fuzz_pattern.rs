//! [`FuzzPattern`] definition.

use derive_more::Display;
use postgres_types::{FromSql, ToSql};

/// SQL `LIKE` pattern matching any text containing the given input.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(String);

impl FuzzPattern {
    /// Creates a new [`FuzzPattern`] out of the given `input`, lowercased
    /// and trimmed.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self(format!(
            "%{}%",
            input
                .trim()
                .to_lowercase()
                .replace('\\', r"\\")
                .replace('%', r"\%")
                .replace('_', r"\_"),
        ))
    }
}

#[cfg(test)]
mod spec {
    use super::FuzzPattern;

    #[test]
    fn escapes_wildcards() {
        assert_eq!(
            FuzzPattern::new("  RSV-2025_0001 ").to_string(),
            r"%rsv-2025\_0001%",
        );
        assert_eq!(FuzzPattern::new(r"50%\off").to_string(), r"%50\%\\off%");
    }
}
