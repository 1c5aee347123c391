//! [`Equipment`] definitions.

use common::{define_kind, Currency};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{tenant, Period};

/// Rentable equipment.
///
/// Equipment is maintained outside of the reservation workflows, which only
/// read it.
#[derive(Clone, Debug, PartialEq)]
pub struct Equipment {
    /// ID of this [`Equipment`].
    pub id: Id,

    /// ID of the tenant owning this [`Equipment`].
    pub tenant_id: tenant::Id,

    /// [`Name`] of this [`Equipment`].
    pub name: Name,

    /// Inventory [`Code`] of this [`Equipment`].
    pub code: Code,

    /// [`Category`] of this [`Equipment`], if any.
    pub category: Option<Category>,

    /// Total number of units in the inventory.
    pub quantity: u32,

    /// Base [`Rates`] of this [`Equipment`].
    pub rates: Rates,
}

/// ID of an [`Equipment`].
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
    Ord,
    PartialEq,
    PartialOrd,
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

/// Name of an [`Equipment`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

/// Inventory code of an [`Equipment`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

/// Category of an [`Equipment`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Category(String);

/// Base rental rates of an [`Equipment`] per unit.
///
/// Any of the rates may be absent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rates {
    /// [`Currency`] of the rates.
    pub currency: Currency,

    /// Price of a single hour.
    pub hourly: Option<Decimal>,

    /// Price of a single day.
    pub daily: Option<Decimal>,

    /// Price of a single week.
    pub weekly: Option<Decimal>,

    /// Price of a single 30-day month.
    pub monthly: Option<Decimal>,
}

impl Rates {
    /// Days in a week of the [`Tier::Weekly`].
    const WEEK_DAYS: u64 = 7;

    /// Days in a month of the [`Tier::Monthly`].
    const MONTH_DAYS: u64 = 30;

    /// Hours below which the [`Tier::Hourly`] applies.
    const DAY_HOURS: u64 = 24;

    /// Calculates the [`BasePrice`] of a single unit for the provided
    /// [`Period`].
    ///
    /// Tiers are tried in a fixed order, and the first matching one wins:
    /// 1. [`Tier::Hourly`], if the [`Period`] is shorter than a day and an
    ///    hourly rate exists;
    /// 2. [`Tier::Monthly`], if the [`Period`] spans at least 30 days and a
    ///    monthly rate exists, with the remaining days charged daily;
    /// 3. [`Tier::Weekly`], if the [`Period`] spans at least 7 days and a
    ///    weekly rate exists, with the remaining days charged daily;
    /// 4. [`Tier::Daily`] otherwise.
    ///
    /// A missing daily rate is charged as zero.
    #[must_use]
    pub fn base_price(&self, period: &Period) -> BasePrice {
        let (hours, days) = (period.hours(), period.days());
        let daily = self.daily.unwrap_or_default();

        if let Some(hourly) = self.hourly.filter(|_| hours < Self::DAY_HOURS) {
            return BasePrice {
                tier: Tier::Hourly,
                amount: hourly * Decimal::from(hours),
            };
        }
        if let Some(monthly) =
            self.monthly.filter(|_| days >= Self::MONTH_DAYS)
        {
            return BasePrice {
                tier: Tier::Monthly,
                amount: monthly * Decimal::from(days / Self::MONTH_DAYS)
                    + daily * Decimal::from(days % Self::MONTH_DAYS),
            };
        }
        if let Some(weekly) = self.weekly.filter(|_| days >= Self::WEEK_DAYS) {
            return BasePrice {
                tier: Tier::Weekly,
                amount: weekly * Decimal::from(days / Self::WEEK_DAYS)
                    + daily * Decimal::from(days % Self::WEEK_DAYS),
            };
        }
        BasePrice {
            tier: Tier::Daily,
            amount: daily * Decimal::from(days),
        }
    }
}

/// Price of a single unit of an [`Equipment`] for some [`Period`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasePrice {
    /// [`Tier`] the price was calculated with.
    pub tier: Tier,

    /// Price amount.
    pub amount: Decimal,
}

define_kind! {
    #[doc = "Pricing tier of a [`BasePrice`]."]
    enum Tier {
        #[doc = "Charged per started hour."]
        Hourly = 1,

        #[doc = "Charged per started day."]
        Daily = 2,

        #[doc = "Charged per whole week plus remaining days."]
        Weekly = 3,

        #[doc = "Charged per whole 30-day month plus remaining days."]
        Monthly = 4,
    }
}

#[cfg(test)]
mod spec {
    use common::{Currency, DateTime};
    use rust_decimal::Decimal;

    use crate::domain::Period;

    use super::{Rates, Tier};

    fn rates() -> Rates {
        Rates {
            currency: Currency::Try,
            hourly: None,
            daily: Some(Decimal::from(100)),
            weekly: Some(Decimal::from(600)),
            monthly: Some(Decimal::from(2000)),
        }
    }

    fn days(n: u64) -> Period {
        let start = DateTime::from_rfc3339("2025-11-01T00:00:00Z").unwrap();
        Period::new(
            start,
            start + std::time::Duration::from_secs(n * 24 * 60 * 60),
        )
        .unwrap()
    }

    fn hours(n: u64) -> Period {
        let start = DateTime::from_rfc3339("2025-11-01T09:00:00Z").unwrap();
        Period::new(start, start + std::time::Duration::from_secs(n * 60 * 60))
            .unwrap()
    }

    #[test]
    fn tier_boundaries() {
        for (n, tier, amount) in [
            (6, Tier::Daily, 600),
            (7, Tier::Weekly, 600),
            (10, Tier::Weekly, 900),
            (29, Tier::Weekly, 2500),
            (30, Tier::Monthly, 2000),
            (35, Tier::Monthly, 2500),
        ] {
            let price = rates().base_price(&days(n));
            assert_eq!(price.tier, tier, "{n} days");
            assert_eq!(price.amount, Decimal::from(amount), "{n} days");
        }
    }

    #[test]
    fn hourly_only_below_a_day() {
        let hourly = Rates {
            hourly: Some(Decimal::from(15)),
            ..rates()
        };

        let price = hourly.base_price(&hours(5));
        assert_eq!(price.tier, Tier::Hourly);
        assert_eq!(price.amount, Decimal::from(75));

        let price = hourly.base_price(&hours(24));
        assert_eq!(price.tier, Tier::Daily);
        assert_eq!(price.amount, Decimal::from(100));

        let price = rates().base_price(&hours(5));
        assert_eq!(price.tier, Tier::Daily);
        assert_eq!(price.amount, Decimal::from(100));
    }

    #[test]
    fn missing_daily_rate_charges_zero() {
        let weekly_only = Rates {
            daily: None,
            ..rates()
        };

        assert_eq!(
            weekly_only.base_price(&days(10)).amount,
            Decimal::from(600),
        );
        assert_eq!(weekly_only.base_price(&days(3)).amount, Decimal::ZERO);
    }
}
