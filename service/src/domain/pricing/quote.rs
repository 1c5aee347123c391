//! Side-effect free price quotes.
//!
//! Quoting never touches usage counters of the applied [`PricingRule`]s and
//! [`DiscountCode`]s: those are committed separately, once a reservation
//! is persisted.

use std::cmp::Reverse;

use common::{Currency, DateTime, Money, Percent};
use derive_more::{Display, Error};
use rust_decimal::Decimal;

use crate::domain::{
    equipment::{self, Tier},
    Equipment, Period,
};

use super::{discount_code, rule, DiscountCode, PricingRule};

/// Price breakdown of a single rented [`Equipment`].
#[derive(Clone, Debug, PartialEq)]
pub struct Breakdown {
    /// ID of the priced [`Equipment`].
    pub equipment_id: equipment::Id,

    /// [`Currency`] of the amounts.
    pub currency: Currency,

    /// Rented [`Period`].
    pub period: Period,

    /// Pricing [`Tier`] of the base price.
    pub tier: Tier,

    /// Number of started hours in the rented [`Period`].
    pub hours: u64,

    /// Number of started days in the rented [`Period`].
    pub days: u64,

    /// Rented quantity.
    pub quantity: u32,

    /// Base price of a single unit.
    pub base_price: Decimal,

    /// Base price of all the units.
    pub subtotal: Decimal,

    /// [`AppliedDiscount`]s in the order they were applied.
    pub discounts: Vec<AppliedDiscount>,

    /// Sum of all the [`AppliedDiscount`]s.
    pub total_discount: Decimal,

    /// Final price, never negative.
    pub final_price: Decimal,

    /// Final price per a single day.
    pub price_per_day: Decimal,
}

impl Breakdown {
    /// Quotes the provided [`Equipment`] rented for the provided [`Period`].
    ///
    /// Every applicable [`PricingRule`] of the [`Equipment`] stacks, being
    /// evaluated in the descending priority order.
    #[must_use]
    pub fn new(
        equipment: &Equipment,
        rules: &[PricingRule],
        period: Period,
        quantity: u32,
    ) -> Self {
        let base = equipment.rates.base_price(&period);
        let subtotal = base.amount * Decimal::from(quantity);
        let days = period.days();

        let mut rules = rules
            .iter()
            .filter(|r| r.equipment_id == equipment.id)
            .collect::<Vec<_>>();
        rules.sort_by_key(|r| Reverse(r.priority));

        let ctx = rule::Context {
            period,
            days,
            quantity,
            subtotal,
        };
        let discounts = rules
            .into_iter()
            .filter_map(|r| {
                r.discount_for(&ctx).map(|amount| AppliedDiscount {
                    source: Source::Rule(r.id),
                    name: r.name.to_string(),
                    amount: Money::round(amount),
                })
            })
            .collect();

        let mut this = Self {
            equipment_id: equipment.id,
            currency: equipment.rates.currency,
            period,
            tier: base.tier,
            hours: period.hours(),
            days,
            quantity,
            base_price: base.amount,
            subtotal,
            discounts,
            total_discount: Decimal::ZERO,
            final_price: Decimal::ZERO,
            price_per_day: Decimal::ZERO,
        };
        this.settle();
        this
    }

    /// Applies the provided [`DiscountCode`] to this [`Breakdown`] alone.
    ///
    /// # Errors
    ///
    /// With a [`discount_code::Rejection`] if the [`DiscountCode`] grants
    /// nothing for this [`Breakdown`], leaving it untouched.
    pub fn apply_code(
        &mut self,
        code: &DiscountCode,
        now: DateTime,
    ) -> Result<(), discount_code::Rejection> {
        if !code.covers(self.equipment_id) {
            return Err(discount_code::Rejection::NotApplicable);
        }
        let amount = code.discount_on(self.subtotal, self.subtotal, now)?;
        self.discounts.push(AppliedDiscount {
            source: Source::Code(code.id),
            name: format!("Promo code: {}", code.code),
            amount: Money::round(amount),
        });
        self.settle();
        Ok(())
    }

    /// Returns IDs of the [`PricingRule`]s applied in this [`Breakdown`].
    pub fn applied_rules(&self) -> impl Iterator<Item = rule::Id> + '_ {
        self.discounts.iter().filter_map(|d| match d.source {
            Source::Rule(id) => Some(id),
            Source::Code(_) => None,
        })
    }

    /// Returns the part of the subtotal taken off by the discounts.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.subtotal - self.final_price
    }

    /// Recalculates the totals of this [`Breakdown`] out of its discounts.
    fn settle(&mut self) {
        self.total_discount = self.discounts.iter().map(|d| d.amount).sum();
        self.final_price = Money::round(
            (self.subtotal - self.total_discount).max(Decimal::ZERO),
        );
        self.price_per_day = if self.days == 0 {
            self.final_price
        } else {
            Money::round(self.final_price / Decimal::from(self.days))
        };
    }
}

/// Discount applied in a [`Breakdown`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppliedDiscount {
    /// [`Source`] of this discount.
    pub source: Source,

    /// Human-readable name of this discount.
    pub name: String,

    /// Discounted amount.
    pub amount: Decimal,
}

/// Source of an [`AppliedDiscount`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    /// [`PricingRule`] with the provided ID.
    Rule(rule::Id),

    /// [`DiscountCode`] with the provided ID.
    Code(discount_code::Id),
}

/// Percentages charged on top of a [`Quote`].
#[derive(Clone, Copy, Debug)]
pub struct Charges {
    /// Tax rate applied to the discounted subtotal.
    pub tax_rate: Percent,

    /// Share of the total to be paid as a deposit.
    pub deposit_rate: Percent,
}

/// Price quote of a whole reservation.
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    /// [`Currency`] of the amounts.
    pub currency: Currency,

    /// [`Breakdown`]s of every reserved item.
    pub items: Vec<Breakdown>,

    /// Sum of the items subtotals.
    pub subtotal: Decimal,

    /// Overall discount, never exceeding the [`Quote::subtotal`].
    pub discount: Decimal,

    /// [`DiscountCode`] applied to the whole order, if any.
    pub code: Option<AppliedCode>,

    /// Applied tax rate.
    pub tax_rate: Percent,

    /// Tax amount.
    pub tax: Decimal,

    /// Total amount to be paid.
    pub total: Decimal,

    /// Part of the total to be paid as a deposit.
    pub deposit: Decimal,

    /// Part of the total remaining after the deposit.
    pub remaining: Decimal,

    /// Applied deposit rate.
    deposit_rate: Percent,
}

impl Quote {
    /// Aggregates the provided [`Breakdown`]s into a [`Quote`].
    ///
    /// # Errors
    ///
    /// If no [`Breakdown`]s are provided, or they are priced in different
    /// [`Currency`]s.
    pub fn new(
        items: Vec<Breakdown>,
        charges: Charges,
    ) -> Result<Self, QuoteError> {
        let currency = items.first().ok_or(QuoteError::NoItems)?.currency;
        if items.iter().any(|i| i.currency != currency) {
            return Err(QuoteError::MixedCurrencies);
        }

        let mut this = Self {
            currency,
            subtotal: Money::round(items.iter().map(|i| i.subtotal).sum()),
            items,
            discount: Decimal::ZERO,
            code: None,
            tax_rate: charges.tax_rate,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            deposit: Decimal::ZERO,
            remaining: Decimal::ZERO,
            deposit_rate: charges.deposit_rate,
        };
        this.settle();
        Ok(this)
    }

    /// Applies the provided [`DiscountCode`] once upon the whole order.
    ///
    /// The minimal order amount is checked against the whole subtotal, while
    /// the discount is calculated upon the subtotal of the items covered by
    /// the [`DiscountCode`].
    ///
    /// # Errors
    ///
    /// With a [`discount_code::Rejection`] if the [`DiscountCode`] grants
    /// nothing for this [`Quote`], leaving it untouched.
    pub fn apply_code(
        &mut self,
        code: &DiscountCode,
        now: DateTime,
    ) -> Result<(), discount_code::Rejection> {
        let eligible = self
            .items
            .iter()
            .filter(|i| code.covers(i.equipment_id))
            .map(|i| i.subtotal)
            .sum();
        let amount = code.discount_on(self.subtotal, eligible, now)?;
        self.code = Some(AppliedCode {
            id: code.id,
            code: code.code.clone(),
            amount: Money::round(amount),
        });
        self.settle();
        Ok(())
    }

    /// Returns IDs of all the [`PricingRule`]s applied in this [`Quote`].
    pub fn applied_rules(&self) -> impl Iterator<Item = rule::Id> + '_ {
        self.items.iter().flat_map(Breakdown::applied_rules)
    }

    /// Recalculates the totals of this [`Quote`].
    fn settle(&mut self) {
        let items_discount: Decimal =
            self.items.iter().map(Breakdown::discount).sum();
        let code_discount = self.code.as_ref().map_or(Decimal::ZERO, |c| c.amount);

        self.discount = Money::round(
            (items_discount + code_discount).min(self.subtotal),
        );
        let taxable = self.subtotal - self.discount;
        self.tax = Money::round(self.tax_rate.of(taxable));
        self.total = taxable + self.tax;
        self.deposit = Money::round(self.deposit_rate.of(self.total));
        self.remaining = self.total - self.deposit;
    }
}

/// [`DiscountCode`] applied to a [`Quote`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppliedCode {
    /// ID of the applied [`DiscountCode`].
    pub id: discount_code::Id,

    /// [`discount_code::Code`] of the applied [`DiscountCode`].
    pub code: discount_code::Code,

    /// Discounted amount.
    pub amount: Decimal,
}

/// Error of creating a [`Quote`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum QuoteError {
    /// No items to quote.
    #[display("No items to quote")]
    NoItems,

    /// Items are priced in different [`Currency`]s.
    #[display("Items are priced in different currencies")]
    MixedCurrencies,
}

#[cfg(test)]
mod spec {
    use common::{Currency, DateTime, Percent};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use crate::domain::{
        equipment::{self, Rates},
        pricing::{
            discount_code::{self, Code, Scope},
            rule::{self, Discount, Kind},
            Bounds, DiscountCode, PricingRule, Usage,
        },
        tenant, Equipment, Period,
    };

    use super::{Breakdown, Charges, Quote, Source};

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn period(start: &str, end: &str) -> Period {
        Period::new(at(start), at(end)).unwrap()
    }

    fn percent(v: i64) -> Percent {
        Percent::new(Decimal::from(v)).unwrap()
    }

    fn equipment(daily: i64) -> Equipment {
        Equipment {
            id: equipment::Id::new(),
            tenant_id: tenant::Id::new(),
            name: "Excavator".into(),
            code: "EXC-01".into(),
            category: None,
            quantity: 2,
            rates: Rates {
                currency: Currency::Try,
                hourly: None,
                daily: Some(Decimal::from(daily)),
                weekly: Some(Decimal::from(600)),
                monthly: None,
            },
        }
    }

    fn rule(
        equipment_id: equipment::Id,
        priority: i32,
        min_days: u32,
        discount: Discount,
    ) -> PricingRule {
        PricingRule {
            id: rule::Id::new(),
            equipment_id,
            name: rule::Name::new(format!("Rule {priority}")).unwrap(),
            kind: Kind::Duration,
            duration: Bounds {
                min: Some(min_days),
                max: None,
            },
            quantity: Bounds::default(),
            discount,
            priority,
            is_active: true,
            validity: None,
            usage: Usage::default(),
            created_at: DateTime::now().coerce(),
        }
    }

    fn code(discount: discount_code::Discount) -> DiscountCode {
        DiscountCode {
            id: discount_code::Id::new(),
            code: Code::new("SAVE").unwrap(),
            discount,
            min_order_amount: None,
            scope: Scope::All,
            validity: period("2025-01-01T00:00:00Z", "2026-01-01T00:00:00Z"),
            usage: Usage::default(),
            is_active: true,
            created_at: DateTime::now().coerce(),
        }
    }

    fn charges() -> Charges {
        Charges {
            tax_rate: percent(20),
            deposit_rate: percent(30),
        }
    }

    #[test]
    fn stacks_rules_regardless_of_order() {
        let eq = equipment(100);
        let ten_percent = rule(eq.id, 2, 7, Discount::Percentage(percent(10)));
        let fifty_off =
            rule(eq.id, 1, 5, Discount::FixedAmount(Decimal::from(50)));
        let p = period("2025-11-01T00:00:00Z", "2025-11-11T00:00:00Z");

        let a = Breakdown::new(
            &eq,
            &[fifty_off.clone(), ten_percent.clone()],
            p,
            1,
        );
        let b = Breakdown::new(&eq, &[ten_percent.clone(), fifty_off], p, 1);

        assert_eq!(a.subtotal, Decimal::from(900));
        assert_eq!(a.total_discount, Decimal::from(140));
        assert_eq!(a.final_price, Decimal::from(760));
        assert_eq!(a, b);
        assert_eq!(a.applied_rules().next(), Some(ten_percent.id));
        assert_eq!(a.price_per_day, Decimal::from(76));
    }

    #[test]
    fn ignores_foreign_rules() {
        let eq = equipment(100);
        let foreign = rule(
            equipment::Id::new(),
            1,
            1,
            Discount::FixedAmount(Decimal::from(50)),
        );
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");

        let b = Breakdown::new(&eq, &[foreign], p, 2);

        assert_eq!(b.subtotal, Decimal::from(800));
        assert!(b.discounts.is_empty());
    }

    #[test]
    fn never_goes_negative() {
        let eq = equipment(100);
        let huge = rule(eq.id, 1, 1, Discount::FixedAmount(Decimal::from(5000)));
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");

        let b = Breakdown::new(&eq, &[huge], p, 1);

        assert_eq!(b.final_price, Decimal::ZERO);
        assert_eq!(b.discount(), Decimal::from(400));
    }

    #[test]
    fn applies_code_to_single_item() {
        let eq = equipment(100);
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");
        let now = at("2025-10-01T00:00:00Z");

        let mut b = Breakdown::new(&eq, &[], p, 2);
        let c = code(discount_code::Discount::Percentage {
            percent: percent(10),
            max: None,
        });
        b.apply_code(&c, now).unwrap();
        assert_eq!(b.final_price, Decimal::from(720));
        assert_eq!(b.discounts[0].source, Source::Code(c.id));

        let mut scoped = c.clone();
        scoped.scope = Scope::Equipment(vec![equipment::Id::new()]);
        let mut b = Breakdown::new(&eq, &[], p, 2);
        assert!(b.apply_code(&scoped, now).is_err());
        assert_eq!(b.final_price, Decimal::from(800));
    }

    #[test]
    fn totals_reservation() {
        let eq = equipment(100);
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");

        let q = Quote::new(vec![Breakdown::new(&eq, &[], p, 2)], charges())
            .unwrap();

        assert_eq!(q.subtotal, Decimal::from(800));
        assert_eq!(q.discount, Decimal::ZERO);
        assert_eq!(q.tax, Decimal::from(160));
        assert_eq!(q.total, Decimal::from(960));
        assert_eq!(q.deposit, Decimal::from(288));
        assert_eq!(q.remaining, Decimal::from(672));
    }

    #[test]
    fn applies_code_once_per_order() {
        let (a, b) = (equipment(100), equipment(50));
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");
        let now = at("2025-10-01T00:00:00Z");
        let items =
            vec![Breakdown::new(&a, &[], p, 1), Breakdown::new(&b, &[], p, 1)];

        let mut c = code(discount_code::Discount::FixedAmount(Decimal::from(
            100,
        )));
        c.min_order_amount = Some(Decimal::from(500));

        let mut q = Quote::new(items.clone(), charges()).unwrap();
        q.apply_code(&c, now).unwrap();
        assert_eq!(q.subtotal, Decimal::from(600));
        assert_eq!(q.discount, Decimal::from(100));
        assert_eq!(q.tax, Decimal::from(100));
        assert_eq!(q.total, Decimal::from(600));
        assert_eq!(q.deposit + q.remaining, q.total);

        let mut scoped = code(discount_code::Discount::Percentage {
            percent: percent(50),
            max: None,
        });
        scoped.scope = Scope::Equipment(vec![b.id]);
        let mut q = Quote::new(items, charges()).unwrap();
        q.apply_code(&scoped, now).unwrap();
        assert_eq!(q.discount, Decimal::from(100));
    }

    #[test]
    fn rejects_mixed_currencies() {
        let a = equipment(100);
        let mut b = equipment(100);
        b.rates.currency = Currency::Eur;
        let p = period("2025-11-01T00:00:00Z", "2025-11-05T00:00:00Z");

        assert!(Quote::new(
            vec![Breakdown::new(&a, &[], p, 1), Breakdown::new(&b, &[], p, 1)],
            charges(),
        )
        .is_err());
        assert!(Quote::new(vec![], charges()).is_err());
    }

    proptest! {
        #[test]
        fn totals_stay_consistent(
            daily in 1i64..10_000,
            days in 1i64..60,
            quantity in 1u32..20,
            fixed_off in 0i64..50_000,
            tax in 0i64..=100,
            deposit in 0i64..=100,
        ) {
            let eq = equipment(daily);
            let start = at("2025-11-01T00:00:00Z");
            let end = DateTime::from_unix_timestamp(
                start.unix_timestamp() + days * 86_400,
            ).unwrap();
            let p = Period::new(start, end).unwrap();
            let off = rule(eq.id, 1, 1, Discount::FixedAmount(fixed_off.into()));

            let q = Quote::new(
                vec![Breakdown::new(&eq, &[off], p, quantity)],
                Charges {
                    tax_rate: percent(tax),
                    deposit_rate: percent(deposit),
                },
            ).unwrap();

            prop_assert!(q.discount >= Decimal::ZERO);
            prop_assert!(q.discount <= q.subtotal);
            prop_assert_eq!(q.total, q.subtotal - q.discount + q.tax);
            prop_assert_eq!(q.deposit + q.remaining, q.total);
            prop_assert!(q.remaining >= Decimal::ZERO);
        }
    }
}
