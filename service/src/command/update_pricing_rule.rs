//! [`Command`] for updating an existing [`PricingRule`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        equipment,
        pricing::rule::{self, Discount, DiscountKind},
        tenant, Equipment, Period, PricingRule,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating an existing [`PricingRule`].
///
/// Only the provided fields are changed, while its usage counter is kept
/// intact.
#[derive(Clone, Debug)]
pub struct UpdatePricingRule {
    /// ID of the tenant owning the [`PricingRule`].
    pub tenant_id: tenant::Id,

    /// ID of the [`PricingRule`] to update.
    pub rule_id: rule::Id,

    /// New [`rule::Name`].
    pub name: Option<rule::Name>,

    /// New [`rule::Kind`].
    pub kind: Option<rule::Kind>,

    /// New lower bound of the rental duration in days, or [`None`]
    /// inside to lift it.
    pub min_duration: Option<Option<u32>>,

    /// New upper bound of the rental duration in days, or [`None`]
    /// inside to lift it.
    pub max_duration: Option<Option<u32>>,

    /// New lower bound of the rented quantity, or [`None`] inside to
    /// lift it.
    pub min_quantity: Option<Option<u32>>,

    /// New upper bound of the rented quantity, or [`None`] inside to
    /// lift it.
    pub max_quantity: Option<Option<u32>>,

    /// New [`DiscountKind`] of the [`Discount`].
    pub discount_kind: Option<DiscountKind>,

    /// New raw value of the [`Discount`].
    pub discount_value: Option<Decimal>,

    /// New priority.
    pub priority: Option<i32>,

    /// New validity [`Period`], or [`None`] inside to lift the restriction.
    pub validity: Option<Option<Period>>,

    /// New maximum number of usages, or [`None`] inside to lift the limit.
    pub max_usage: Option<Option<u32>>,

    /// New activity indicator.
    pub is_active: Option<bool>,
}

impl UpdatePricingRule {
    /// Applies this [`UpdatePricingRule`] to the provided [`PricingRule`].
    ///
    /// # Errors
    ///
    /// If the resulting [`PricingRule`] is invalid.
    fn apply(self, rule: &mut PricingRule) -> Result<(), ExecutionError> {
        use ExecutionError as E;

        let Self {
            tenant_id: _,
            rule_id: _,
            name,
            kind,
            min_duration,
            max_duration,
            min_quantity,
            max_quantity,
            discount_kind,
            discount_value,
            priority,
            validity,
            max_usage,
            is_active,
        } = self;

        if let Some(name) = name {
            rule.name = name;
        }
        if let Some(kind) = kind {
            rule.kind = kind;
        }
        for (bound, new) in [
            (&mut rule.duration.min, min_duration),
            (&mut rule.duration.max, max_duration),
            (&mut rule.quantity.min, min_quantity),
            (&mut rule.quantity.max, max_quantity),
        ] {
            if let Some(new) = new {
                *bound = new;
            }
        }
        if discount_kind.is_some() || discount_value.is_some() {
            let kind = discount_kind.unwrap_or(rule.discount.kind());
            let value = discount_value.unwrap_or(rule.discount.value());
            rule.discount = Discount::from_parts(kind, value)
                .ok_or(E::InvalidDiscount(kind, value))?;
        }
        if let Some(priority) = priority {
            rule.priority = priority;
        }
        if let Some(validity) = validity {
            rule.validity = validity;
        }
        if let Some(max) = max_usage {
            rule.usage.max = max;
        }
        if let Some(is_active) = is_active {
            rule.is_active = is_active;
        }

        for bounds in [rule.duration, rule.quantity] {
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(E::InvertedBounds(min, max));
                }
            }
        }
        Ok(())
    }
}

impl<Db> Command<UpdatePricingRule> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<PricingRule>, rule::Id>>,
            Ok = Option<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<PricingRule>, rule::Id>>,
            Ok = Option<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<Insert<PricingRule>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = PricingRule;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdatePricingRule,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let (tenant_id, rule_id) = (cmd.tenant_id, cmd.rule_id);

        let rule = self
            .database()
            .execute(Select(By::<Option<PricingRule>, _>::new(rule_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())?;
        self.database()
            .execute(Select(By::<Option<Equipment>, _>::new(
                rule.equipment_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut rule = tx
            .execute(Select(By::<Option<PricingRule>, _>::new(rule_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())?;
        cmd.apply(&mut rule).map_err(|e| tracerr::new!(e))?;

        tx.execute(Insert(rule.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(rule)
    }
}

/// Error of [`UpdatePricingRule`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`PricingRule`] with the provided ID does not exist.
    #[display("`PricingRule(id: {_0})` does not exist")]
    RuleNotExists(#[error(not(source))] rule::Id),

    /// Lower [`Bounds`] exceed the upper ones.
    ///
    /// [`Bounds`]: crate::domain::pricing::Bounds
    #[display("Lower bound {_0} exceeds upper bound {_1}")]
    InvertedBounds(u32, u32),

    /// [`Discount`] value doesn't suit its [`DiscountKind`].
    #[display("`{_1}` is not a valid `{_0}` discount")]
    InvalidDiscount(DiscountKind, Decimal),
}
