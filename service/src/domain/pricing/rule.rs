//! [`PricingRule`] definitions.

use common::{define_kind, unit, DateTimeOf, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{equipment, Period};

use super::{Bounds, Usage};

/// Discount rule attached to a single [`Equipment`].
///
/// [`Equipment`]: crate::domain::Equipment
#[derive(Clone, Debug, PartialEq)]
pub struct PricingRule {
    /// ID of this [`PricingRule`].
    pub id: Id,

    /// ID of the [`Equipment`] this [`PricingRule`] belongs to.
    ///
    /// [`Equipment`]: crate::domain::Equipment
    pub equipment_id: equipment::Id,

    /// [`Name`] of this [`PricingRule`].
    pub name: Name,

    /// [`Kind`] of this [`PricingRule`].
    pub kind: Kind,

    /// Rental duration [`Bounds`] in days.
    pub duration: Bounds,

    /// Rented quantity [`Bounds`].
    pub quantity: Bounds,

    /// [`Discount`] provided by this [`PricingRule`].
    pub discount: Discount,

    /// Priority of this [`PricingRule`].
    ///
    /// Rules with a higher priority are evaluated first.
    pub priority: i32,

    /// Indicator whether this [`PricingRule`] may be applied at all.
    pub is_active: bool,

    /// [`Period`] the rented [`Period`] must lie within for this
    /// [`PricingRule`] to apply, if restricted.
    pub validity: Option<Period>,

    /// [`Usage`] of this [`PricingRule`].
    pub usage: Usage,

    /// [`DateTime`] when this [`PricingRule`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

impl PricingRule {
    /// Calculates the discount this [`PricingRule`] provides in the provided
    /// [`Context`].
    ///
    /// [`None`] is returned if this [`PricingRule`] doesn't apply, or its
    /// discount is not positive.
    #[must_use]
    pub fn discount_for(&self, ctx: &Context) -> Option<Decimal> {
        if !self.is_active || self.usage.is_exhausted() {
            return None;
        }
        if self.validity.is_some_and(|v| !ctx.period.is_within(&v)) {
            return None;
        }
        if !self.duration.contains(ctx.days)
            || !self.quantity.contains(u64::from(ctx.quantity))
        {
            return None;
        }

        let amount = match self.discount {
            Discount::Percentage(percent) => percent.of(ctx.subtotal),
            Discount::FixedAmount(amount) => amount,
            Discount::SpecialRate(price_per_unit) => {
                ctx.subtotal
                    - price_per_unit
                        * Decimal::from(ctx.days)
                        * Decimal::from(ctx.quantity)
            }
        };
        (amount > Decimal::ZERO).then_some(amount)
    }
}

/// Rental parameters a [`PricingRule`] is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct Context {
    /// Rented [`Period`].
    pub period: Period,

    /// Number of started days in the rented [`Period`].
    pub days: u64,

    /// Rented quantity.
    pub quantity: u32,

    /// Subtotal before any discounts.
    pub subtotal: Decimal,
}

/// ID of a [`PricingRule`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`PricingRule`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let name = name.trim();
        (!name.is_empty() && name.len() <= 128).then(|| Self(name.to_owned()))
    }
}

define_kind! {
    #[doc = "Kind of a [`PricingRule`]."]
    enum Kind {
        #[doc = "Discount for long rentals."]
        Duration = 1,

        #[doc = "Discount for bulk rentals."]
        Quantity = 2,

        #[doc = "Special per-unit daily price."]
        SpecialRate = 3,
    }
}

/// Discount provided by a [`PricingRule`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Discount {
    /// [`Percent`] of the subtotal.
    Percentage(Percent),

    /// Fixed amount.
    FixedAmount(Decimal),

    /// Difference between the subtotal and the provided price per unit per
    /// day.
    SpecialRate(Decimal),
}

impl Discount {
    /// Creates a new [`Discount`] out of its persisted parts.
    ///
    /// [`None`] is returned if the `value` doesn't suit the `kind`.
    #[must_use]
    pub fn from_parts(kind: DiscountKind, value: Decimal) -> Option<Self> {
        match kind {
            DiscountKind::Percentage => Percent::new(value).map(Self::Percentage),
            DiscountKind::FixedAmount => (value >= Decimal::ZERO)
                .then_some(Self::FixedAmount(value)),
            DiscountKind::SpecialRate => (value >= Decimal::ZERO)
                .then_some(Self::SpecialRate(value)),
        }
    }

    /// Returns [`DiscountKind`] of this [`Discount`].
    #[must_use]
    pub const fn kind(&self) -> DiscountKind {
        match self {
            Self::Percentage(_) => DiscountKind::Percentage,
            Self::FixedAmount(_) => DiscountKind::FixedAmount,
            Self::SpecialRate(_) => DiscountKind::SpecialRate,
        }
    }

    /// Returns the raw value of this [`Discount`].
    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::Percentage(p) => p.value(),
            Self::FixedAmount(v) | Self::SpecialRate(v) => *v,
        }
    }
}

define_kind! {
    #[doc = "Kind of a [`Discount`]."]
    enum DiscountKind {
        #[doc = "[`Discount::Percentage`]."]
        Percentage = 1,

        #[doc = "[`Discount::FixedAmount`]."]
        FixedAmount = 2,

        #[doc = "[`Discount::SpecialRate`]."]
        SpecialRate = 3,
    }
}

/// [`DateTime`] when a [`PricingRule`] was created.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(PricingRule, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Percent};
    use rust_decimal::Decimal;

    use crate::domain::{
        equipment,
        pricing::{Bounds, Usage},
        Period,
    };

    use super::{Context, Discount, Id, Kind, Name, PricingRule};

    fn period(start: &str, end: &str) -> Period {
        Period::new(
            DateTime::from_rfc3339(start).unwrap(),
            DateTime::from_rfc3339(end).unwrap(),
        )
        .unwrap()
    }

    fn rule(discount: Discount) -> PricingRule {
        PricingRule {
            id: Id::new(),
            equipment_id: equipment::Id::new(),
            name: Name::new("Long rental").unwrap(),
            kind: Kind::Duration,
            duration: Bounds::default(),
            quantity: Bounds::default(),
            discount,
            priority: 1,
            is_active: true,
            validity: None,
            usage: Usage::default(),
            created_at: DateTime::now().coerce(),
        }
    }

    fn ctx(days: u64, quantity: u32, subtotal: i64) -> Context {
        Context {
            period: period("2025-11-01T00:00:00Z", "2025-11-11T00:00:00Z"),
            days,
            quantity,
            subtotal: Decimal::from(subtotal),
        }
    }

    fn percent(v: i64) -> Discount {
        Discount::Percentage(Percent::new(Decimal::from(v)).unwrap())
    }

    #[test]
    fn calculates_discounts() {
        assert_eq!(
            rule(percent(10)).discount_for(&ctx(10, 1, 900)),
            Some(Decimal::from(90)),
        );
        assert_eq!(
            rule(Discount::FixedAmount(Decimal::from(50)))
                .discount_for(&ctx(10, 1, 900)),
            Some(Decimal::from(50)),
        );
        assert_eq!(
            rule(Discount::SpecialRate(Decimal::from(80)))
                .discount_for(&ctx(10, 1, 900)),
            Some(Decimal::from(100)),
        );
    }

    #[test]
    fn clamps_special_rate_surcharge() {
        assert_eq!(
            rule(Discount::SpecialRate(Decimal::from(120)))
                .discount_for(&ctx(10, 1, 900)),
            None,
        );
    }

    #[test]
    fn respects_bounds() {
        let mut r = rule(percent(10));
        r.duration = Bounds {
            min: Some(7),
            max: Some(14),
        };
        r.quantity = Bounds {
            min: Some(2),
            max: None,
        };

        assert!(r.discount_for(&ctx(10, 2, 900)).is_some());
        assert!(r.discount_for(&ctx(6, 2, 900)).is_none());
        assert!(r.discount_for(&ctx(15, 2, 900)).is_none());
        assert!(r.discount_for(&ctx(10, 1, 900)).is_none());
    }

    #[test]
    fn respects_usage_and_activity() {
        let mut r = rule(percent(10));
        r.usage = Usage {
            current: 3,
            max: Some(3),
        };
        assert!(r.discount_for(&ctx(10, 1, 900)).is_none());

        let mut r = rule(percent(10));
        r.is_active = false;
        assert!(r.discount_for(&ctx(10, 1, 900)).is_none());
    }

    #[test]
    fn respects_validity_window() {
        let mut r = rule(percent(10));

        r.validity =
            Some(period("2025-10-01T00:00:00Z", "2025-12-01T00:00:00Z"));
        assert!(r.discount_for(&ctx(10, 1, 900)).is_some());

        r.validity =
            Some(period("2025-11-05T00:00:00Z", "2025-12-01T00:00:00Z"));
        assert!(r.discount_for(&ctx(10, 1, 900)).is_none());
    }
}
