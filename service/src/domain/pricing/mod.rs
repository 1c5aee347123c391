//! Pricing definitions.

pub mod discount_code;
pub mod quote;
pub mod rule;

pub use self::{
    discount_code::DiscountCode,
    quote::{Breakdown, Quote},
    rule::PricingRule,
};

/// Usage counter with an optional cap.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Usage {
    /// Number of times the counted entity has been used.
    pub current: u32,

    /// Maximum number of allowed usages, if limited.
    pub max: Option<u32>,
}

impl Usage {
    /// Indicates whether no more usages are allowed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max.is_some_and(|max| self.current >= max)
    }

    /// Gives back a single usage, so it may be consumed again.
    pub fn release(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

/// Inclusive bounds of some count, each side optional.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Bounds {
    /// Lower bound, if any.
    pub min: Option<u32>,

    /// Upper bound, if any.
    pub max: Option<u32>,
}

impl Bounds {
    /// Indicates whether the provided `value` lies within these [`Bounds`].
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        self.min.map_or(true, |min| value >= u64::from(min))
            && self.max.map_or(true, |max| value <= u64::from(max))
    }
}

#[cfg(test)]
mod spec {
    use super::{Bounds, Usage};

    #[test]
    fn usage_exhaustion() {
        assert!(!Usage::default().is_exhausted());
        assert!(!Usage {
            current: 4,
            max: Some(5)
        }
        .is_exhausted());
        assert!(Usage {
            current: 5,
            max: Some(5)
        }
        .is_exhausted());
    }

    #[test]
    fn released_usage_is_available_again() {
        let mut usage = Usage {
            current: 1,
            max: Some(1),
        };
        assert!(usage.is_exhausted());

        usage.release();
        assert!(!usage.is_exhausted());

        usage.release();
        assert_eq!(usage.current, 0);
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = Bounds {
            min: Some(5),
            max: Some(10),
        };

        assert!(!bounds.contains(4));
        assert!(bounds.contains(5));
        assert!(bounds.contains(10));
        assert!(!bounds.contains(11));
        assert!(Bounds::default().contains(0));
    }
}
