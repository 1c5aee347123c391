//! Reservation [`Number`] definitions.

use std::str::FromStr;

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Human-readable number of a [`Reservation`], unique per tenant.
///
/// Formatted as `RES-{year}-{sequence}`, with the sequence restarting every
/// calendar year and padded to at least 4 digits.
///
/// [`Reservation`]: super::Reservation
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Prefix of every [`Number`].
    const PREFIX: &'static str = "RES";

    /// Creates a new [`Number`] out of the provided `year` and `sequence`.
    #[must_use]
    pub fn new(year: i32, sequence: u32) -> Self {
        Self(format!("{}-{year}-{sequence:04}", Self::PREFIX))
    }

    /// Returns the year this [`Number`] was allocated in.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.parts().map_or(0, |(year, _)| year)
    }

    /// Returns the yearly sequence of this [`Number`].
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.parts().map_or(0, |(_, seq)| seq)
    }

    /// Parses the provided `number` into its year and sequence.
    fn parse(number: &str) -> Option<(i32, u32)> {
        let mut parts = number.splitn(3, '-');
        if parts.next()? != Self::PREFIX {
            return None;
        }
        let year = parts.next()?;
        let seq = parts.next()?;
        if year.len() != 4 || seq.len() < 4 {
            return None;
        }
        Some((year.parse().ok()?, seq.parse().ok()?))
    }

    /// Returns year and sequence of this [`Number`].
    fn parts(&self) -> Option<(i32, u32)> {
        Self::parse(&self.0)
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, seq) = Self::parse(s).ok_or("invalid reservation `Number`")?;
        Ok(Self::new(year, seq))
    }
}

#[cfg(test)]
mod spec {
    use super::Number;

    #[test]
    fn formats() {
        assert_eq!(Number::new(2025, 1).to_string(), "RES-2025-0001");
        assert_eq!(Number::new(2025, 42).to_string(), "RES-2025-0042");
        assert_eq!(Number::new(2025, 12345).to_string(), "RES-2025-12345");
    }

    #[test]
    fn parses() {
        let n: Number = "RES-2025-0042".parse().unwrap();
        assert_eq!(n.year(), 2025);
        assert_eq!(n.sequence(), 42);

        assert!("RES-2025-42".parse::<Number>().is_err());
        assert!("INV-2025-0042".parse::<Number>().is_err());
        assert!("RES-25-0042".parse::<Number>().is_err());
        assert!("RES-2025-00a2".parse::<Number>().is_err());
    }
}
