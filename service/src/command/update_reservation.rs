//! [`Command`] for updating an existing [`Reservation`].

use std::collections::HashMap;

use common::{
    operations::{
        By, Commit, Increment, Insert, Lock, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        equipment,
        pricing::{discount_code, rule},
        reservation::{
            self, item, Delivery, Item, Location, Note, Status, TimeOfDay,
        },
        tenant, Customer, DiscountCode, Equipment, Period, PricingRule,
        Reservation,
    },
    infra::{database, Database},
    query::{
        availability::availability_of,
        pricing::{self, QuoteReservation},
    },
    read::availability::{Conflict, ItemAvailability, Selector},
    Service,
};

use super::Command;

/// [`Command`] for updating an existing [`Reservation`].
///
/// Every [`None`] field is left unchanged. Changing the [`Period`] or the
/// items re-checks availability and reprices the [`Reservation`].
#[derive(Clone, Debug, Default)]
pub struct UpdateReservation {
    /// ID of the tenant owning the [`Reservation`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Reservation`] to update.
    pub reservation_id: reservation::Id,

    /// New [`Customer`].
    pub customer: Option<Customer>,

    /// New [`Period`].
    pub period: Option<Period>,

    /// New pickup [`TimeOfDay`].
    pub pickup_time: Option<TimeOfDay>,

    /// New return [`TimeOfDay`].
    pub return_time: Option<TimeOfDay>,

    /// New pickup [`Location`].
    pub pickup_location: Option<Location>,

    /// New return [`Location`].
    pub return_location: Option<Location>,

    /// New [`Delivery`].
    pub delivery: Option<Delivery>,

    /// New requested [`Equipment`] quantities.
    pub items: Option<Vec<item::Request>>,

    /// [`discount_code::Code`] to apply when repricing.
    ///
    /// The currently applied one is kept if [`None`].
    pub code: Option<discount_code::Code>,

    /// New customer-facing [`Note`].
    pub notes: Option<Note>,

    /// New staff-only [`Note`].
    pub internal_notes: Option<Note>,

    /// New special requests of the [`Customer`].
    pub special_requests: Option<Note>,
}

impl UpdateReservation {
    /// Indicates whether this [`UpdateReservation`] requires repricing.
    fn reprices(&self) -> bool {
        self.period.is_some() || self.items.is_some() || self.code.is_some()
    }
}

impl<Db> Command<UpdateReservation> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Reservation, reservation::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Equipment, equipment::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<DiscountCode, discount_code::Code>>,
            Err = Traced<database::Error>,
        > + Database<
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
        > + Database<
            Select<By<Vec<Conflict>, Selector>>,
            Ok = Vec<Conflict>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<
            Increment<By<PricingRule, rule::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Increment<By<DiscountCode, discount_code::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let id = cmd.reservation_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent modifications of the same `Reservation`.
        tx.execute(Lock(By::<Reservation, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|r| r.tenant_id == cmd.tenant_id)
            .ok_or(E::ReservationNotExists(id))
            .map_err(tracerr::wrap!())?;

        if cmd.reprices() {
            if !reservation.status.holds_inventory() {
                return Err(tracerr::new!(E::ReservationClosed(
                    id,
                    reservation.status,
                )));
            }

            let period = cmd.period.unwrap_or(reservation.period);
            let requests = cmd.items.clone().unwrap_or_else(|| {
                reservation
                    .items
                    .iter()
                    .map(|i| item::Request {
                        equipment_id: i.equipment_id,
                        quantity: i.quantity,
                    })
                    .collect()
            });
            let code = cmd
                .code
                .clone()
                .or_else(|| reservation.totals.discount_code.clone());

            // Avoid concurrent bookings of the same `Equipment`.
            let mut ids =
                requests.iter().map(|i| i.equipment_id).collect::<Vec<_>>();
            ids.sort_unstable();
            ids.dedup();
            for equipment_id in ids {
                tx.execute(Lock(By::<Equipment, _>::new(equipment_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
            if let Some(code) = &code {
                // Avoid exceeding the `DiscountCode` usage concurrently.
                tx.execute(Lock(By::<DiscountCode, _>::new(code.clone())))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }

            let held = pricing::Held::by(&reservation);
            let pricing::Quoted { quote, equipment } = pricing::quote(
                &tx,
                &QuoteReservation {
                    tenant_id: reservation.tenant_id,
                    items: requests.clone(),
                    period,
                    code,
                },
                &held,
                self.config().charges(),
                now,
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let mut shortages = vec![];
            for req in &requests {
                let e = equipment
                    .get(&req.equipment_id)
                    .ok_or(E::EquipmentNotExists(req.equipment_id))
                    .map_err(tracerr::wrap!())?;
                let availability = availability_of(&tx, e, period, Some(id))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                let checked = ItemAvailability {
                    requested: req.quantity,
                    availability,
                };
                if !checked.is_available() {
                    shortages.push(checked);
                }
            }
            if !shortages.is_empty() {
                return Err(tracerr::new!(E::Unavailable(shortages)));
            }

            // Held usages are counted already.
            let fresh_rules = quote
                .applied_rules()
                .filter(|id| !held.holds_rule(*id))
                .collect::<Vec<_>>();
            for rule_id in fresh_rules {
                tx.execute(Increment(By::<PricingRule, _>::new(rule_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
            if let Some(applied) =
                quote.code.as_ref().filter(|c| !held.holds_code(&c.code))
            {
                tx.execute(Increment(By::<DiscountCode, _>::new(applied.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }

            let items = quote
                .items
                .iter()
                .filter_map(|b| {
                    equipment.get(&b.equipment_id).map(|e| Item::new(e, b))
                })
                .collect();
            reservation.period = period;
            reservation.reprice(items, &quote);
        }

        let UpdateReservation {
            customer,
            pickup_time,
            return_time,
            pickup_location,
            return_location,
            delivery,
            notes,
            internal_notes,
            special_requests,
            ..
        } = cmd;
        if let Some(customer) = customer {
            reservation.customer = customer;
        }
        if let Some(time) = pickup_time {
            reservation.pickup_time = time;
        }
        if let Some(time) = return_time {
            reservation.return_time = time;
        }
        if let Some(location) = pickup_location {
            reservation.pickup_location = Some(location);
        }
        if let Some(location) = return_location {
            reservation.return_location = Some(location);
        }
        if let Some(delivery) = delivery {
            reservation.delivery = Some(delivery);
        }
        if let Some(notes) = notes {
            reservation.notes = Some(notes);
        }
        if let Some(notes) = internal_notes {
            reservation.internal_notes = Some(notes);
        }
        if let Some(requests) = special_requests {
            reservation.special_requests = Some(requests);
        }
        reservation.updated_at = now.coerce();

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(number = %reservation.number, "reservation updated");

        Ok(reservation)
    }
}

/// Error of [`UpdateReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Requested [`Equipment`] is requested more than once.
    #[display("`Equipment(id: {_0})` is requested more than once")]
    DuplicateEquipment(#[error(not(source))] equipment::Id),

    /// [`Equipment`] with the provided ID does not exist.
    #[display("`Equipment(id: {_0})` does not exist")]
    EquipmentNotExists(#[error(not(source))] equipment::Id),

    /// Requested [`Equipment`] is priced in different currencies.
    #[display("Requested `Equipment` is priced in different currencies")]
    MixedCurrencies,

    /// No items are requested.
    #[display("No items are requested")]
    NoItems,

    /// [`Reservation`] no longer holds any equipment, so cannot be
    /// rebooked.
    #[display("`Reservation(id: {_0})` is {_1} and cannot be rebooked")]
    ReservationClosed(reservation::Id, Status),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Some requested [`Equipment`] is not available in the requested
    /// quantity.
    #[display("{} requested item(s) are not available", _0.len())]
    Unavailable(#[error(not(source))] Vec<ItemAvailability>),

    /// Zero quantity of an [`Equipment`] is requested.
    #[display("Zero quantity of `Equipment(id: {_0})` is requested")]
    ZeroQuantity(#[error(not(source))] equipment::Id),
}

impl From<pricing::ExecutionError> for ExecutionError {
    fn from(e: pricing::ExecutionError) -> Self {
        use pricing::ExecutionError as E;

        match e {
            E::Db(e) => Self::Db(e),
            E::NoItems => Self::NoItems,
            E::ZeroQuantity(id) => Self::ZeroQuantity(id),
            E::DuplicateEquipment(id) => Self::DuplicateEquipment(id),
            E::EquipmentNotExists(id) => Self::EquipmentNotExists(id),
            E::MixedCurrencies => Self::MixedCurrencies,
        }
    }
}
