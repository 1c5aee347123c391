//! [`Period`] definitions.

use std::time::Duration;

use common::DateTime;
use derive_more::{Display, Error};

/// Seconds in an hour.
const HOUR_SECS: u64 = 60 * 60;

/// Hours in a day.
const DAY_HOURS: u64 = 24;

/// Rental period between two moments in time, both ends inclusive.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Period {
    /// [`DateTime`] this [`Period`] starts at.
    start: DateTime,

    /// [`DateTime`] this [`Period`] ends at.
    end: DateTime,
}

impl Period {
    /// Creates a new [`Period`] between the provided `start` and `end`.
    ///
    /// # Errors
    ///
    /// If `end` is not strictly after `start`.
    pub fn new(start: DateTime, end: DateTime) -> Result<Self, InvalidPeriod> {
        if end <= start {
            return Err(InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the UTC calendar month the provided [`DateTime`] falls into.
    #[must_use]
    pub fn month_of(at: DateTime) -> Self {
        Self {
            start: at.start_of_month(),
            end: at.start_of_next_month() - Duration::from_secs(1),
        }
    }

    /// Returns the [`DateTime`] this [`Period`] starts at.
    #[must_use]
    pub const fn start(&self) -> DateTime {
        self.start
    }

    /// Returns the [`DateTime`] this [`Period`] ends at.
    #[must_use]
    pub const fn end(&self) -> DateTime {
        self.end
    }

    /// Indicates whether this [`Period`] overlaps the `other` one.
    ///
    /// Both ends are inclusive, so periods touching at a single instant
    /// overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Indicates whether this [`Period`] lies within the `outer` one.
    #[must_use]
    pub fn is_within(&self, outer: &Self) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }

    /// Returns the exact [`Duration`] of this [`Period`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start).unwrap_or_default()
    }

    /// Returns the number of started hours in this [`Period`].
    ///
    /// Never less than `1`.
    #[must_use]
    pub fn hours(&self) -> u64 {
        let hour = u128::from(HOUR_SECS) * 1_000_000_000;
        u64::try_from(self.duration().as_nanos().div_ceil(hour))
            .unwrap_or(u64::MAX)
            .max(1)
    }

    /// Returns the number of started days in this [`Period`].
    ///
    /// Never less than `1`.
    #[must_use]
    pub fn days(&self) -> u64 {
        self.hours().div_ceil(DAY_HOURS).max(1)
    }
}

/// Error of creating a [`Period`] with its end not after its start.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display(
    "`Period` end `{}` must be after its start `{}`",
    end.to_rfc3339(),
    start.to_rfc3339(),
)]
pub struct InvalidPeriod {
    /// Requested start of the [`Period`].
    pub start: DateTime,

    /// Requested end of the [`Period`].
    pub end: DateTime,
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::Period;

    fn period(start: &str, end: &str) -> Period {
        Period::new(
            DateTime::from_rfc3339(start).unwrap(),
            DateTime::from_rfc3339(end).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted() {
        let at = DateTime::from_rfc3339("2025-10-20T00:00:00Z").unwrap();
        let later = DateTime::from_rfc3339("2025-10-21T00:00:00Z").unwrap();

        assert!(Period::new(at, at).is_err());
        assert!(Period::new(later, at).is_err());
        assert!(Period::new(at, later).is_ok());
    }

    #[test]
    fn overlap_is_inclusive() {
        let existing = period("2025-10-20T00:00:00Z", "2025-10-25T00:00:00Z");

        assert!(existing.overlaps(&period(
            "2025-10-24T00:00:00Z",
            "2025-10-28T00:00:00Z",
        )));
        assert!(!existing.overlaps(&period(
            "2025-10-26T00:00:00Z",
            "2025-10-30T00:00:00Z",
        )));
        assert!(existing.overlaps(&period(
            "2025-10-25T00:00:00Z",
            "2025-10-30T00:00:00Z",
        )));
        assert!(existing.overlaps(&period(
            "2025-10-10T00:00:00Z",
            "2025-10-30T00:00:00Z",
        )));
    }

    #[test]
    fn month_ends_at_its_last_second() {
        let at = DateTime::from_rfc3339("2025-11-17T08:30:00Z").unwrap();

        assert_eq!(
            Period::month_of(at),
            period("2025-11-01T00:00:00Z", "2025-11-30T23:59:59Z"),
        );
        assert_eq!(Period::month_of(at).days(), 30);
    }

    #[test]
    fn durations_are_ceiled() {
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");
        assert_eq!(p.hours(), 96);
        assert_eq!(p.days(), 4);

        let p = period("2025-11-01T09:00:00Z", "2025-11-01T09:30:00Z");
        assert_eq!(p.hours(), 1);
        assert_eq!(p.days(), 1);

        let p = period("2025-11-01T09:00:00Z", "2025-11-02T10:00:00Z");
        assert_eq!(p.hours(), 25);
        assert_eq!(p.days(), 2);

        let p = period("2025-11-01T09:00:00Z", "2025-11-01T09:00:00.5Z");
        assert_eq!(p.hours(), 1);
    }
}
