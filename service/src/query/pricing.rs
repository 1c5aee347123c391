//! [`Query`] collection related to pricing.
//!
//! Every [`Query`] here is a pure quote: no usage counters are touched until
//! a reservation is actually committed.

use std::collections::{HashMap, HashSet};

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        equipment,
        pricing::{
            discount_code::{self, Rejection},
            quote::{Charges, QuoteError},
            rule, Breakdown, Quote,
        },
        reservation::item,
        tenant, DiscountCode, Equipment, Period, PricingRule, Reservation,
    },
    infra::{database, Database},
    read::pricing::{codes, rules},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries [`DiscountCode`]s passing a [`codes::Filter`], the most recently
/// created first.
pub type ListDiscountCodes =
    DatabaseQuery<By<Vec<DiscountCode>, codes::Filter>>;

/// [`Query`] for listing all the [`PricingRule`]s of an [`Equipment`],
/// inactive ones included.
#[derive(Clone, Copy, Debug)]
pub struct ListPricingRules {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Equipment`] to list [`PricingRule`]s of.
    pub equipment_id: equipment::Id,
}

impl<Db> Query<ListPricingRules> for Service<Db>
where
    Db: Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<PricingRule>, rules::Selector>>,
            Ok = Vec<PricingRule>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<PricingRule>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: ListPricingRules,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ListPricingRules {
            tenant_id,
            equipment_id,
        } = query;

        self.database()
            .execute(Select(By::<Option<Equipment>, _>::new(equipment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(E::EquipmentNotExists(equipment_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        self.database()
            .execute(Select(By::<Vec<PricingRule>, _>::new(rules::Selector {
                equipment_id,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// [`Query`] for calculating a price [`Breakdown`] of a single
/// [`Equipment`].
#[derive(Clone, Debug)]
pub struct CalculatePrice {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// Requested [`Equipment`] quantity.
    pub item: item::Request,

    /// Requested [`Period`].
    pub period: Period,

    /// [`discount_code::Code`] to apply, if any.
    ///
    /// Silently ignored if not applicable.
    pub code: Option<discount_code::Code>,
}

impl<Db> Query<CalculatePrice> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<equipment::Id, Equipment>, Vec<equipment::Id>>>,
            Ok = HashMap<equipment::Id, Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<PricingRule>, equipment::Id>>,
            Ok = Vec<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount_code::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Breakdown;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CalculatePrice,
    ) -> Result<Self::Ok, Self::Err> {
        let CalculatePrice {
            tenant_id,
            item,
            period,
            code,
        } = query;

        let (mut breakdowns, _) =
            breakdowns(
                self.database(),
                tenant_id,
                &[item],
                period,
                &Held::default(),
            )
                .await
                .map_err(tracerr::wrap!())?;
        let mut breakdown = breakdowns
            .pop()
            .ok_or(ExecutionError::NoItems)
            .map_err(|e| tracerr::new!(e))?;

        if let Some(code) = select_code(self.database(), code)
            .await
            .map_err(tracerr::map_from_and_wrap!())?
        {
            _ = breakdown.apply_code(&code, DateTime::now()).map_err(|e| {
                log::debug!("`{}` code is not applied: {e}", code.code);
            });
        }

        Ok(breakdown)
    }
}

/// [`Query`] for quoting a whole reservation.
#[derive(Clone, Debug)]
pub struct QuoteReservation {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// Requested [`Equipment`] quantities.
    pub items: Vec<item::Request>,

    /// Requested [`Period`].
    pub period: Period,

    /// [`discount_code::Code`] to apply once upon the whole order, if any.
    ///
    /// Silently ignored if not applicable.
    pub code: Option<discount_code::Code>,
}

impl<Db> Query<QuoteReservation> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<equipment::Id, Equipment>, Vec<equipment::Id>>>,
            Ok = HashMap<equipment::Id, Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<PricingRule>, equipment::Id>>,
            Ok = Vec<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount_code::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Quote;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: QuoteReservation,
    ) -> Result<Self::Ok, Self::Err> {
        quote(
            self.database(),
            &query,
            &Held::default(),
            self.config().charges(),
            DateTime::now(),
        )
        .await
        .map(|q| q.quote)
        .map_err(tracerr::wrap!())
    }
}

/// [`Quote`] along with the data it was calculated upon.
#[derive(Clone, Debug)]
pub(crate) struct Quoted {
    /// Calculated [`Quote`].
    pub(crate) quote: Quote,

    /// Quoted [`Equipment`].
    pub(crate) equipment: HashMap<equipment::Id, Equipment>,
}

/// Usages of [`PricingRule`]s and a [`DiscountCode`] already consumed by a
/// [`Reservation`] being repriced.
///
/// Held usages don't count towards the usage limits, so repricing a
/// [`Reservation`] keeps the discounts it has already been granted.
#[derive(Clone, Debug, Default)]
pub(crate) struct Held {
    /// IDs of the held [`PricingRule`]s.
    rules: HashSet<rule::Id>,

    /// Held [`discount_code::Code`], if any.
    code: Option<discount_code::Code>,
}

impl Held {
    /// Collects the usages held by the provided [`Reservation`].
    pub(crate) fn by(reservation: &Reservation) -> Self {
        Self {
            rules: reservation.applied_rules().collect(),
            code: reservation.totals.discount_code.clone(),
        }
    }

    /// Indicates whether the [`PricingRule`] with the provided ID is held.
    pub(crate) fn holds_rule(&self, id: rule::Id) -> bool {
        self.rules.contains(&id)
    }

    /// Indicates whether the provided [`discount_code::Code`] is held.
    pub(crate) fn holds_code(&self, code: &discount_code::Code) -> bool {
        self.code.as_ref() == Some(code)
    }
}

/// Quotes the provided [`QuoteReservation`] upon the data stored in the `db`.
///
/// # Errors
///
/// If the requested items are invalid, or the [`Database`] fails.
pub(crate) async fn quote<Db>(
    db: &Db,
    query: &QuoteReservation,
    held: &Held,
    charges: Charges,
    now: DateTime,
) -> Result<Quoted, Traced<ExecutionError>>
where
    Db: Database<
            Select<By<HashMap<equipment::Id, Equipment>, Vec<equipment::Id>>>,
            Ok = HashMap<equipment::Id, Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<PricingRule>, equipment::Id>>,
            Ok = Vec<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount_code::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        >,
{
    use ExecutionError as E;

    let (items, equipment) =
        breakdowns(db, query.tenant_id, &query.items, query.period, held)
            .await
            .map_err(tracerr::wrap!())?;

    let mut quote = Quote::new(items, charges)
        .map_err(E::from)
        .map_err(tracerr::wrap!())?;

    if let Some(mut code) = select_code(db, query.code.clone())
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
    {
        if held.holds_code(&code.code) {
            code.usage.release();
        }
        _ = quote.apply_code(&code, now).map_err(|e| {
            log::debug!("`{}` code is not applied: {e}", code.code);
        });
    }

    Ok(Quoted { quote, equipment })
}

/// Calculates [`Breakdown`]s of the provided items.
///
/// # Errors
///
/// If the requested items are invalid, or the [`Database`] fails.
async fn breakdowns<Db>(
    db: &Db,
    tenant_id: tenant::Id,
    items: &[item::Request],
    period: Period,
    held: &Held,
) -> Result<
    (Vec<Breakdown>, HashMap<equipment::Id, Equipment>),
    Traced<ExecutionError>,
>
where
    Db: Database<
            Select<By<HashMap<equipment::Id, Equipment>, Vec<equipment::Id>>>,
            Ok = HashMap<equipment::Id, Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<PricingRule>, equipment::Id>>,
            Ok = Vec<PricingRule>,
            Err = Traced<database::Error>,
        >,
{
    use ExecutionError as E;

    if items.is_empty() {
        return Err(tracerr::new!(E::NoItems));
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(tracerr::new!(E::ZeroQuantity(item.equipment_id)));
        }
        if !seen.insert(item.equipment_id) {
            return Err(tracerr::new!(E::DuplicateEquipment(
                item.equipment_id
            )));
        }
    }

    let ids = items.iter().map(|i| i.equipment_id).collect::<Vec<_>>();
    let mut equipment = db
        .execute(Select(By::new(ids)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;
    equipment.retain(|_, e| e.tenant_id == tenant_id);

    let mut breakdowns = Vec::with_capacity(items.len());
    for item in items {
        let e = equipment
            .get(&item.equipment_id)
            .ok_or(E::EquipmentNotExists(item.equipment_id))
            .map_err(tracerr::wrap!())?;
        let mut rules = db
            .execute(Select(By::<Vec<PricingRule>, _>::new(e.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for r in rules.iter_mut().filter(|r| held.holds_rule(r.id)) {
            r.usage.release();
        }
        breakdowns.push(Breakdown::new(e, &rules, period, item.quantity));
    }

    Ok((breakdowns, equipment))
}

/// Selects a [`DiscountCode`] by the provided [`discount_code::Code`], if
/// any.
///
/// # Errors
///
/// If the [`Database`] fails.
async fn select_code<Db>(
    db: &Db,
    code: Option<discount_code::Code>,
) -> Result<Option<DiscountCode>, Traced<database::Error>>
where
    Db: Database<
        Select<By<Option<DiscountCode>, discount_code::Code>>,
        Ok = Option<DiscountCode>,
        Err = Traced<database::Error>,
    >,
{
    let Some(code) = code else {
        return Ok(None);
    };
    db.execute(Select(By::new(code)))
        .await
        .map_err(tracerr::wrap!())
}

/// Error of a pricing [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No items are requested.
    #[display("No items are requested")]
    NoItems,

    /// Zero quantity of an [`Equipment`] is requested.
    #[display("Zero quantity of `Equipment(id: {_0})` is requested")]
    ZeroQuantity(#[error(not(source))] equipment::Id),

    /// [`Equipment`] is requested more than once.
    #[display("`Equipment(id: {_0})` is requested more than once")]
    DuplicateEquipment(#[error(not(source))] equipment::Id),

    /// [`Equipment`] with the provided ID does not exist.
    #[display("`Equipment(id: {_0})` does not exist")]
    EquipmentNotExists(#[error(not(source))] equipment::Id),

    /// Requested [`Equipment`] is priced in different currencies.
    #[display("Requested `Equipment` is priced in different currencies")]
    MixedCurrencies,
}

impl From<QuoteError> for ExecutionError {
    fn from(e: QuoteError) -> Self {
        match e {
            QuoteError::NoItems => Self::NoItems,
            QuoteError::MixedCurrencies => Self::MixedCurrencies,
        }
    }
}

/// [`Query`] for validating a [`DiscountCode`] without using it.
#[derive(Clone, Debug)]
pub struct ValidateDiscountCode {
    /// [`discount_code::Code`] to validate.
    pub code: discount_code::Code,
}

/// Result of a [`ValidateDiscountCode`] [`Query`].
#[derive(Clone, Debug, PartialEq)]
pub enum Validity {
    /// [`DiscountCode`] may be used.
    Valid(DiscountCode),

    /// [`DiscountCode`] may not be used for the provided [`Rejection`].
    Invalid(Rejection),
}

impl<Db> Query<ValidateDiscountCode> for Service<Db>
where
    Db: Database<
        Select<By<Option<DiscountCode>, discount_code::Code>>,
        Ok = Option<DiscountCode>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Validity;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        ValidateDiscountCode { code }: ValidateDiscountCode,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(code) = select_code(self.database(), Some(code))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(Validity::Invalid(Rejection::NotFound));
        };
        Ok(match code.validate(DateTime::now()) {
            Ok(()) => Validity::Valid(code),
            Err(reason) => Validity::Invalid(reason),
        })
    }
}
