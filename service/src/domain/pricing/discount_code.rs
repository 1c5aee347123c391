//! [`DiscountCode`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf, Percent};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{equipment, Period};

use super::Usage;

/// Global promo code granting a discount on a whole order.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscountCode {
    /// ID of this [`DiscountCode`].
    pub id: Id,

    /// Unique [`Code`] of this [`DiscountCode`].
    pub code: Code,

    /// [`Discount`] granted by this [`DiscountCode`].
    pub discount: Discount,

    /// Minimal order subtotal this [`DiscountCode`] applies to, if any.
    pub min_order_amount: Option<Decimal>,

    /// [`Scope`] of this [`DiscountCode`].
    pub scope: Scope,

    /// [`Period`] this [`DiscountCode`] may be used within.
    pub validity: Period,

    /// [`Usage`] of this [`DiscountCode`].
    pub usage: Usage,

    /// Indicator whether this [`DiscountCode`] may be used at all.
    pub is_active: bool,

    /// [`DateTime`] when this [`DiscountCode`] was created.
    pub created_at: CreationDateTime,
}

impl DiscountCode {
    /// Checks whether this [`DiscountCode`] may be used at the provided
    /// moment, regardless of an order.
    ///
    /// # Errors
    ///
    /// With a [`Rejection`] describing why this [`DiscountCode`] is unusable.
    pub fn validate(&self, now: DateTime) -> Result<(), Rejection> {
        if !self.is_active {
            return Err(Rejection::Inactive);
        }
        if now < self.validity.start() {
            return Err(Rejection::NotYetValid);
        }
        if now > self.validity.end() {
            return Err(Rejection::Expired);
        }
        if self.usage.is_exhausted() {
            return Err(Rejection::UsageExhausted);
        }
        Ok(())
    }

    /// Indicates whether this [`DiscountCode`] covers the provided
    /// [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    #[must_use]
    pub fn covers(&self, equipment_id: equipment::Id) -> bool {
        match &self.scope {
            Scope::All => true,
            Scope::Equipment(ids) => ids.contains(&equipment_id),
        }
    }

    /// Calculates the discount this [`DiscountCode`] grants at the provided
    /// moment.
    ///
    /// The minimal order amount is checked against the `order` subtotal,
    /// while the discount itself is calculated upon the `eligible` subtotal
    /// (the part of the order covered by the [`Scope`]).
    ///
    /// # Errors
    ///
    /// With a [`Rejection`] if this [`DiscountCode`] grants nothing.
    pub fn discount_on(
        &self,
        order: Decimal,
        eligible: Decimal,
        now: DateTime,
    ) -> Result<Decimal, Rejection> {
        self.validate(now)?;

        if let Some(min) = self.min_order_amount {
            if order < min {
                return Err(Rejection::BelowMinimumOrder(min));
            }
        }

        let amount = match self.discount {
            Discount::Percentage { percent, max } => {
                let amount = percent.of(eligible);
                max.map_or(amount, |max| amount.min(max))
            }
            Discount::FixedAmount(amount) => amount,
        };
        if eligible <= Decimal::ZERO || amount <= Decimal::ZERO {
            return Err(Rejection::NotApplicable);
        }
        Ok(amount)
    }
}

/// ID of a [`DiscountCode`].
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

/// Case-insensitive code of a [`DiscountCode`], stored upper-cased.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Creates a new normalized [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim();
        (!code.is_empty()
            && code.len() <= 64
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .then(|| Self(code.to_ascii_uppercase()))
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

/// Discount granted by a [`DiscountCode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Discount {
    /// [`Percent`] of the eligible subtotal, optionally capped.
    Percentage {
        /// [`Percent`] of the eligible subtotal.
        percent: Percent,

        /// Maximum discount amount, if capped.
        max: Option<Decimal>,
    },

    /// Fixed amount.
    FixedAmount(Decimal),
}

impl Discount {
    /// Creates a new [`Discount`] out of its persisted parts.
    ///
    /// [`None`] is returned if the `value` doesn't suit the `kind`. The `max`
    /// cap is ignored for a [`Discount::FixedAmount`].
    #[must_use]
    pub fn from_parts(
        kind: DiscountKind,
        value: Decimal,
        max: Option<Decimal>,
    ) -> Option<Self> {
        match kind {
            DiscountKind::Percentage => Percent::new(value)
                .map(|percent| Self::Percentage { percent, max }),
            DiscountKind::FixedAmount => (value >= Decimal::ZERO)
                .then_some(Self::FixedAmount(value)),
        }
    }

    /// Returns the maximum amount of this [`Discount`], if capped.
    #[must_use]
    pub const fn max(&self) -> Option<Decimal> {
        match self {
            Self::Percentage { max, .. } => *max,
            Self::FixedAmount(_) => None,
        }
    }

    /// Returns [`DiscountKind`] of this [`Discount`].
    #[must_use]
    pub const fn kind(&self) -> DiscountKind {
        match self {
            Self::Percentage { .. } => DiscountKind::Percentage,
            Self::FixedAmount(_) => DiscountKind::FixedAmount,
        }
    }

    /// Returns the raw value of this [`Discount`].
    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::Percentage { percent, .. } => percent.value(),
            Self::FixedAmount(v) => *v,
        }
    }
}

define_kind! {
    #[doc = "Kind of a [`DiscountCode`] [`Discount`]."]
    enum DiscountKind {
        #[doc = "[`Discount::Percentage`]."]
        Percentage = 1,

        #[doc = "[`Discount::FixedAmount`]."]
        FixedAmount = 2,
    }
}

/// Scope of a [`DiscountCode`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Scope {
    /// Applies to any [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    All,

    /// Applies only to the listed [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    Equipment(Vec<equipment::Id>),
}

/// Reason of a [`DiscountCode`] being unusable.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum Rejection {
    /// [`DiscountCode`] does not exist.
    #[display("Code not found")]
    NotFound,

    /// [`DiscountCode`] is deactivated.
    #[display("Code is not active")]
    Inactive,

    /// [`DiscountCode`] validity hasn't started yet.
    #[display("Code is not valid yet")]
    NotYetValid,

    /// [`DiscountCode`] validity has ended.
    #[display("Code has expired")]
    Expired,

    /// [`DiscountCode`] usage limit is reached.
    #[display("Code usage limit is reached")]
    UsageExhausted,

    /// Order subtotal is below the required minimum.
    #[display("Order subtotal is below the required minimum of {_0}")]
    BelowMinimumOrder(#[error(not(source))] Decimal),

    /// [`DiscountCode`] grants nothing for the order.
    #[display("Code is not applicable to the order")]
    NotApplicable,
}

/// [`DateTime`] when a [`DiscountCode`] was created.
pub type CreationDateTime = DateTimeOf<(DiscountCode, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Percent};
    use rust_decimal::Decimal;

    use crate::domain::{equipment, pricing::Usage, Period};

    use super::{Code, Discount, DiscountCode, Id, Rejection, Scope};

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn code(discount: Discount) -> DiscountCode {
        DiscountCode {
            id: Id::new(),
            code: Code::new("welcome10").unwrap(),
            discount,
            min_order_amount: None,
            scope: Scope::All,
            validity: Period::new(
                at("2025-01-01T00:00:00Z"),
                at("2025-12-31T23:59:59Z"),
            )
            .unwrap(),
            usage: Usage::default(),
            is_active: true,
            created_at: DateTime::now().coerce(),
        }
    }

    fn percent(v: i64, max: Option<i64>) -> Discount {
        Discount::Percentage {
            percent: Percent::new(Decimal::from(v)).unwrap(),
            max: max.map(Decimal::from),
        }
    }

    #[test]
    fn normalizes_code() {
        assert_eq!(Code::new(" welcome10 ").unwrap().to_string(), "WELCOME10");
        assert!(Code::new("").is_none());
        assert!(Code::new("two words").is_none());
    }

    #[test]
    fn validates() {
        let now = at("2025-06-01T00:00:00Z");

        assert_eq!(code(percent(10, None)).validate(now), Ok(()));

        let mut c = code(percent(10, None));
        c.is_active = false;
        assert_eq!(c.validate(now), Err(Rejection::Inactive));

        let c = code(percent(10, None));
        assert_eq!(
            c.validate(at("2024-12-01T00:00:00Z")),
            Err(Rejection::NotYetValid),
        );
        assert_eq!(
            c.validate(at("2026-01-02T00:00:00Z")),
            Err(Rejection::Expired),
        );

        let mut c = code(percent(10, None));
        c.usage = Usage {
            current: 100,
            max: Some(100),
        };
        assert_eq!(c.validate(now), Err(Rejection::UsageExhausted));
        assert_eq!(c.validate(now), Err(Rejection::UsageExhausted));
        assert_eq!(c.usage.current, 100);
    }

    #[test]
    fn caps_percentage() {
        let now = at("2025-06-01T00:00:00Z");
        let hundred = Decimal::from(100);
        let thousand = Decimal::from(1000);

        assert_eq!(
            code(percent(10, Some(50))).discount_on(thousand, thousand, now),
            Ok(Decimal::from(50)),
        );
        assert_eq!(
            code(percent(10, Some(500))).discount_on(thousand, thousand, now),
            Ok(hundred),
        );
        assert_eq!(
            code(Discount::FixedAmount(Decimal::from(25)))
                .discount_on(thousand, hundred, now),
            Ok(Decimal::from(25)),
        );
    }

    #[test]
    fn checks_minimum_order_and_scope() {
        let now = at("2025-06-01T00:00:00Z");

        let mut c = code(percent(10, None));
        c.min_order_amount = Some(Decimal::from(500));
        assert_eq!(
            c.discount_on(Decimal::from(499), Decimal::from(499), now),
            Err(Rejection::BelowMinimumOrder(Decimal::from(500))),
        );

        let covered = equipment::Id::new();
        let mut c = code(percent(10, None));
        c.scope = Scope::Equipment(vec![covered]);
        assert!(c.covers(covered));
        assert!(!c.covers(equipment::Id::new()));
        assert_eq!(
            c.discount_on(Decimal::from(800), Decimal::ZERO, now),
            Err(Rejection::NotApplicable),
        );
    }
}
