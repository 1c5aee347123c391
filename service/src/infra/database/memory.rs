//! In-memory [`Database`] implementation.
//!
//! Transactions are serialized: a [`Tx`] holds the whole [`State`] locked
//! until committed or dropped, working upon its own copy which is written
//! back on [`Commit`] only.

use std::{collections::HashMap, future::Future, sync::Arc};

use common::{
    operations::{
        By, Commit, Delete, Increment, Insert, Lock, Select, Transact,
    },
    pagination::Page,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        equipment,
        pricing::{discount_code, rule},
        reservation::{self, HistoryEntry, Payment},
        tenant, DiscountCode, Equipment, PricingRule, Reservation,
    },
    infra::{
        database::{
            self, DISCOUNT_CODE_CONSTRAINT, RESERVATION_NUMBER_CONSTRAINT,
        },
        Database,
    },
    read,
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Non-transactional [`Memory`] client, committing every operation at once.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<TxState>>);

/// State of a [`Tx`] client.
#[derive(Debug)]
struct TxState {
    /// Guard of the shared [`State`], released once committed.
    guard: Option<OwnedMutexGuard<State>>,

    /// [`State`] being modified by the transaction.
    work: State,
}

/// Whole data stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Equipment`].
    equipment: HashMap<equipment::Id, Equipment>,

    /// Stored [`PricingRule`]s.
    rules: HashMap<rule::Id, PricingRule>,

    /// Stored [`DiscountCode`]s.
    codes: HashMap<discount_code::Id, DiscountCode>,

    /// Stored [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Stored [`HistoryEntry`]s, in insertion order.
    history: Vec<HistoryEntry>,

    /// Stored [`Payment`]s, in insertion order.
    payments: Vec<Payment>,

    /// Last allocated [`reservation::Number`] sequences per tenant and year.
    sequences: HashMap<(tenant::Id, i32), u32>,
}

/// Access to the [`State`] of a [`Memory`] client.
pub trait Access {
    /// Runs the provided function upon the accessible [`State`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Access for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.0.lock().await))
    }
}

impl Access for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut tx = self.0.lock().await;
        if tx.guard.is_none() {
            return Err(tracerr::new!(database::Error::from(
                Error::TxFinished
            )));
        }
        Ok(f(&mut tx.work))
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction has been committed already.
    #[display("Transaction is finished already")]
    TxFinished,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::TxFinished => false,
        }
    }
}

/// Creates a new [`Traced`] unique violation of the provided constraint.
fn unique_violation(constraint: &'static str) -> Traced<database::Error> {
    tracerr::new!(database::Error::from(Error::UniqueViolation(constraint)))
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.0 .0).lock_owned().await;
        let work = guard.clone();
        Ok(Memory(Tx(Arc::new(Mutex::new(TxState {
            guard: Some(guard),
            work,
        })))))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let mut tx = self.0 .0.lock().await;
        let TxState { guard, work } = &mut *tx;
        let Some(mut guard) = guard.take() else {
            return Err(tracerr::new!(database::Error::from(
                Error::TxFinished
            )));
        };
        *guard = work.clone();
        Ok(())
    }
}

impl<C: Access> Database<Insert<Equipment>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(equipment): Insert<Equipment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| drop(s.equipment.insert(equipment.id, equipment)))
            .await
    }
}

impl<C, IDs> Database<Select<By<HashMap<equipment::Id, Equipment>, IDs>>>
    for Memory<C>
where
    C: Access,
    IDs: AsRef<[equipment::Id]>,
{
    type Ok = HashMap<equipment::Id, Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<equipment::Id, Equipment>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        self.0
            .with(|s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| {
                        s.equipment.get(id).map(|e| (*id, e.clone()))
                    })
                    .collect()
            })
            .await
    }
}

impl<C: Access> Database<Select<By<Option<Equipment>, equipment::Id>>>
    for Memory<C>
{
    type Ok = Option<Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Equipment>, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.with(|s| s.equipment.get(&id).cloned()).await
    }
}

impl<C: Access> Database<Lock<By<Equipment, equipment::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Equipment, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions are serialized already.
        Ok(())
    }
}

impl<C: Access>
    Database<
        Select<
            By<Vec<read::availability::Conflict>, read::availability::Selector>,
        >,
    > for Memory<C>
{
    type Ok = Vec<read::availability::Conflict>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::availability::Conflict>, read::availability::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        self.0
            .with(|s| {
                let mut conflicts = s
                    .reservations
                    .values()
                    .filter(|r| sel.matches(r.id, &r.period, r.status))
                    .filter_map(|r| {
                        let quantity = r
                            .items
                            .iter()
                            .filter(|i| i.equipment_id == sel.equipment_id)
                            .map(|i| i.quantity)
                            .sum::<u32>();
                        (quantity > 0).then(|| read::availability::Conflict {
                            reservation_id: r.id,
                            number: r.number.clone(),
                            customer_name: r.customer.name.clone(),
                            period: r.period,
                            status: r.status,
                            quantity,
                        })
                    })
                    .collect::<Vec<_>>();
                conflicts.sort_by_key(|c| c.period.start());
                conflicts
            })
            .await
    }
}

impl<C: Access> Database<Select<By<Vec<PricingRule>, equipment::Id>>>
    for Memory<C>
{
    type Ok = Vec<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<PricingRule>, equipment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let equipment_id = by.into_inner();
        self.0
            .with(|s| {
                let mut rules = s
                    .rules
                    .values()
                    .filter(|r| r.equipment_id == equipment_id && r.is_active)
                    .cloned()
                    .collect::<Vec<_>>();
                rules.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then(a.created_at.cmp(&b.created_at))
                });
                rules
            })
            .await
    }
}

impl<C: Access>
    Database<Select<By<Vec<PricingRule>, read::pricing::rules::Selector>>>
    for Memory<C>
{
    type Ok = Vec<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<PricingRule>, read::pricing::rules::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        self.0
            .with(|s| {
                let mut rules = s
                    .rules
                    .values()
                    .filter(|r| sel.matches(r))
                    .cloned()
                    .collect::<Vec<_>>();
                rules.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then(a.created_at.cmp(&b.created_at))
                });
                rules
            })
            .await
    }
}

impl<C: Access> Database<Select<By<Option<PricingRule>, rule::Id>>>
    for Memory<C>
{
    type Ok = Option<PricingRule>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PricingRule>, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.with(|s| s.rules.get(&id).cloned()).await
    }
}

impl<C: Access> Database<Insert<PricingRule>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(rule): Insert<PricingRule>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.with(|s| drop(s.rules.insert(rule.id, rule))).await
    }
}

impl<C: Access> Database<Delete<By<PricingRule, rule::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<PricingRule, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.with(|s| drop(s.rules.remove(&id))).await
    }
}

impl<C: Access> Database<Increment<By<PricingRule, rule::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<PricingRule, rule::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                if let Some(r) = s.rules.get_mut(&id) {
                    r.usage.current += 1;
                }
            })
            .await
    }
}

impl<C: Access>
    Database<Select<By<Option<DiscountCode>, discount_code::Code>>>
    for Memory<C>
{
    type Ok = Option<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<DiscountCode>, discount_code::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();
        self.0
            .with(|s| s.codes.values().find(|c| c.code == code).cloned())
            .await
    }
}

impl<C: Access>
    Database<Select<By<Vec<DiscountCode>, read::pricing::codes::Filter>>>
    for Memory<C>
{
    type Ok = Vec<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<DiscountCode>, read::pricing::codes::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.0
            .with(|s| {
                let mut codes = s
                    .codes
                    .values()
                    .filter(|c| filter.matches(c))
                    .cloned()
                    .collect::<Vec<_>>();
                codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                codes
            })
            .await
    }
}

impl<C: Access> Database<Insert<DiscountCode>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(code): Insert<DiscountCode>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                if s.codes.values().any(|c| c.code == code.code && c.id != code.id)
                {
                    return Err(unique_violation(DISCOUNT_CODE_CONSTRAINT));
                }
                drop(s.codes.insert(code.id, code));
                Ok(())
            })
            .await?
    }
}

impl<C: Access> Database<Lock<By<DiscountCode, discount_code::Code>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<DiscountCode, discount_code::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions are serialized already.
        Ok(())
    }
}

impl<C: Access> Database<Increment<By<DiscountCode, discount_code::Id>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<DiscountCode, discount_code::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                if let Some(c) = s.codes.get_mut(&id) {
                    c.usage.current += 1;
                }
            })
            .await
    }
}

impl<C: Access>
    Database<Increment<By<reservation::Number, (tenant::Id, i32)>>>
    for Memory<C>
{
    type Ok = reservation::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<By<reservation::Number, (tenant::Id, i32)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, year) = by.into_inner();
        self.0
            .with(|s| {
                let highest = s
                    .reservations
                    .values()
                    .filter(|r| {
                        r.tenant_id == tenant_id && r.number.year() == year
                    })
                    .map(|r| r.number.sequence())
                    .max()
                    .unwrap_or_default();
                let seq = s.sequences.entry((tenant_id, year)).or_default();
                *seq = (*seq).max(highest) + 1;
                reservation::Number::new(year, *seq)
            })
            .await
    }
}

impl<C: Access> Database<Insert<Reservation>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                if s.reservations.values().any(|r| {
                    r.tenant_id == reservation.tenant_id
                        && r.number == reservation.number
                        && r.id != reservation.id
                }) {
                    return Err(unique_violation(
                        RESERVATION_NUMBER_CONSTRAINT,
                    ));
                }
                drop(s.reservations.insert(reservation.id, reservation));
                Ok(())
            })
            .await?
    }
}

impl<C: Access> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Memory<C>
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.with(|s| s.reservations.get(&id).cloned()).await
    }
}

impl<C: Access> Database<Lock<By<Reservation, reservation::Id>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions are serialized already.
        Ok(())
    }
}

impl<C: Access>
    Database<
        Select<
            By<read::reservation::list::Page, read::reservation::list::Selector>,
        >,
    > for Memory<C>
{
    type Ok = read::reservation::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::reservation::list::Page, read::reservation::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::list::Selector { arguments, filter } =
            by.into_inner();
        self.0
            .with(|s| {
                let mut matched = s
                    .reservations
                    .values()
                    .filter(|r| filter.matches(r))
                    .collect::<Vec<_>>();
                matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

                let offset =
                    usize::try_from(arguments.offset()).unwrap_or(usize::MAX);
                Page {
                    total: matched.len() as u64,
                    items: matched
                        .into_iter()
                        .skip(offset)
                        .take(arguments.limit() as usize)
                        .cloned()
                        .collect(),
                    arguments,
                }
            })
            .await
    }
}

impl<C: Access>
    Database<
        Select<
            By<
                read::reservation::stats::Stats,
                read::reservation::stats::Selector,
            >,
        >,
    > for Memory<C>
{
    type Ok = read::reservation::stats::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::reservation::stats::Stats,
                read::reservation::stats::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        self.0
            .with(|s| {
                let mut stats = read::reservation::stats::Stats::default();
                for r in s.reservations.values().filter(|r| sel.matches(r)) {
                    stats.account(r);
                }
                stats
            })
            .await
    }
}

impl<C: Access>
    Database<Select<By<Vec<Equipment>, read::timeline::Selector>>>
    for Memory<C>
{
    type Ok = Vec<Equipment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Equipment>, read::timeline::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        self.0
            .with(|s| {
                let mut equipment = s
                    .equipment
                    .values()
                    .filter(|e| sel.covers(e))
                    .cloned()
                    .collect::<Vec<_>>();
                // Uncategorized last.
                equipment.sort_by_key(|e| {
                    (
                        e.category.is_none(),
                        e.category.as_ref().map(ToString::to_string),
                        e.name.to_string(),
                    )
                });
                equipment
            })
            .await
    }
}

impl<C: Access>
    Database<Select<By<Vec<Reservation>, read::timeline::Selector>>>
    for Memory<C>
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::timeline::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        self.0
            .with(|s| {
                let mut reservations = s
                    .reservations
                    .values()
                    .filter(|r| sel.matches(r))
                    .cloned()
                    .collect::<Vec<_>>();
                reservations.sort_by_key(|r| r.period.start());
                reservations
            })
            .await
    }
}

impl<C: Access> Database<Insert<HistoryEntry>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<HistoryEntry>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.with(|s| s.history.push(entry)).await
    }
}

impl<C: Access> Database<Select<By<Vec<HistoryEntry>, reservation::Id>>>
    for Memory<C>
{
    type Ok = Vec<HistoryEntry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<HistoryEntry>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                s.history
                    .iter()
                    .rev()
                    .filter(|e| e.reservation_id == id)
                    .cloned()
                    .collect()
            })
            .await
    }
}

impl<C: Access> Database<Insert<Payment>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.with(|s| s.payments.push(payment)).await
    }
}

impl<C: Access> Database<Select<By<Vec<Payment>, reservation::Id>>>
    for Memory<C>
{
    type Ok = Vec<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Payment>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                s.payments
                    .iter()
                    .rev()
                    .filter(|p| p.reservation_id == id)
                    .cloned()
                    .collect()
            })
            .await
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::{equipment, tenant, Equipment},
        infra::Database,
    };

    use super::Memory;

    fn equipment() -> Equipment {
        Equipment {
            id: equipment::Id::new(),
            tenant_id: tenant::Id::new(),
            name: "Scaffold".into(),
            code: "SC-1".into(),
            category: None,
            quantity: 2,
            rates: equipment::Rates {
                currency: common::Currency::Try,
                hourly: None,
                daily: Some(100.into()),
                weekly: None,
                monthly: None,
            },
        }
    }

    #[tokio::test]
    async fn commits_transaction() {
        let db = Memory::new();
        let e = equipment();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(e.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();
        drop(tx);

        let found = db
            .execute(Select(By::<Option<Equipment>, _>::new(e.id)))
            .await
            .unwrap();
        assert_eq!(found, Some(e));
    }

    #[tokio::test]
    async fn rolls_back_dropped_transaction() {
        let db = Memory::new();
        let e = equipment();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(e.clone())).await.unwrap();
        drop(tx);

        let found = db
            .execute(Select(By::<Option<Equipment>, _>::new(e.id)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn fails_after_commit() {
        let db = Memory::new();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Commit).await.unwrap();

        assert!(tx.execute(Insert(equipment())).await.is_err());
        assert!(tx.execute(Commit).await.is_err());
    }
}
