//! [`Command`] for creating a new [`Reservation`].

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
        notification::Content,
        pricing::{discount_code, rule},
        reservation::{
            self, item, Delivery, HistoryEntry, Item, Location, Note,
            Status, TimeOfDay, Totals,
        },
        tenant, user, Customer, DiscountCode, Equipment, Notification,
        Period, PricingRule, Reservation,
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

/// [`Command`] for creating a new [`Reservation`].
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// ID of the tenant the new [`Reservation`] belongs to.
    pub tenant_id: tenant::Id,

    /// [`Customer`] making the new [`Reservation`].
    pub customer: Customer,

    /// Reserved [`Period`].
    pub period: Period,

    /// Pickup [`TimeOfDay`], if not the default one.
    pub pickup_time: Option<TimeOfDay>,

    /// Return [`TimeOfDay`], if not the default one.
    pub return_time: Option<TimeOfDay>,

    /// Pickup [`Location`], if any.
    pub pickup_location: Option<Location>,

    /// Return [`Location`], if any.
    pub return_location: Option<Location>,

    /// [`Delivery`] of the equipment, if requested.
    pub delivery: Option<Delivery>,

    /// Requested [`Equipment`] quantities.
    pub items: Vec<item::Request>,

    /// [`discount_code::Code`] to apply, if any.
    pub code: Option<discount_code::Code>,

    /// Customer-facing [`Note`].
    pub notes: Option<Note>,

    /// Staff-only [`Note`].
    pub internal_notes: Option<Note>,

    /// Special requests of the [`Customer`].
    pub special_requests: Option<Note>,

    /// Indicator whether the new [`Reservation`] is confirmed right away.
    pub auto_approve: bool,

    /// ID of the [`User`] creating the [`Reservation`], if any.
    ///
    /// [`User`]: crate::domain::user
    pub created_by: Option<user::Id>,
}

impl<Db> Command<CreateReservation> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
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
        > + Database<
            Increment<By<reservation::Number, (tenant::Id, i32)>>,
            Ok = reservation::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Insert<HistoryEntry>, Err = Traced<database::Error>>
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
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let attempts = self.config().number_allocation_attempts.max(1);

        let mut attempt = 1;
        let reservation = loop {
            match self.book(&cmd).await {
                Ok(r) => break r,
                Err(e)
                    if attempt < attempts
                        && matches!(
                            e.as_ref(),
                            E::Db(db) if db.is_unique_violation(Some(
                                database::RESERVATION_NUMBER_CONSTRAINT,
                            )),
                        ) =>
                {
                    log::warn!(
                        "reservation number is taken concurrently, \
                         retrying (attempt {attempt} of {attempts})",
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let content = Content::created(&reservation);
        self.outbox()
            .enqueue(Notification::in_app(&reservation, content.clone()));
        self.outbox()
            .enqueue(Notification::email(&reservation, content));

        Ok(reservation)
    }
}

impl<Db> Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
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
        > + Database<
            Increment<By<reservation::Number, (tenant::Id, i32)>>,
            Ok = reservation::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Insert<HistoryEntry>, Err = Traced<database::Error>>
        + Database<
            Increment<By<PricingRule, rule::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Increment<By<DiscountCode, discount_code::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    /// Performs a single attempt of booking the provided
    /// [`CreateReservation`] within one transaction.
    async fn book(
        &self,
        cmd: &CreateReservation,
    ) -> Result<Reservation, Traced<ExecutionError>> {
        use ExecutionError as E;

        let now = DateTime::now();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent bookings of the same `Equipment`.
        let mut ids =
            cmd.items.iter().map(|i| i.equipment_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            tx.execute(Lock(By::<Equipment, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        if let Some(code) = &cmd.code {
            // Avoid exceeding the `DiscountCode` usage concurrently.
            tx.execute(Lock(By::<DiscountCode, _>::new(code.clone())))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let pricing::Quoted { quote, equipment } = pricing::quote(
            &tx,
            &QuoteReservation {
                tenant_id: cmd.tenant_id,
                items: cmd.items.clone(),
                period: cmd.period,
                code: cmd.code.clone(),
            },
            &pricing::Held::default(),
            self.config().charges(),
            now,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut shortages = vec![];
        for req in &cmd.items {
            let e = equipment
                .get(&req.equipment_id)
                .ok_or(E::EquipmentNotExists(req.equipment_id))
                .map_err(tracerr::wrap!())?;
            let availability = availability_of(&tx, e, cmd.period, None)
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

        let number = tx
            .execute(Increment(By::<reservation::Number, _>::new((
                cmd.tenant_id,
                now.year(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let items = quote
            .items
            .iter()
            .filter_map(|b| {
                equipment.get(&b.equipment_id).map(|e| Item::new(e, b))
            })
            .collect();

        let mut reservation = Reservation {
            id: reservation::Id::new(),
            tenant_id: cmd.tenant_id,
            number,
            customer: cmd.customer.clone(),
            period: cmd.period,
            pickup_time: cmd
                .pickup_time
                .clone()
                .unwrap_or_else(TimeOfDay::default_pickup),
            return_time: cmd
                .return_time
                .clone()
                .unwrap_or_else(TimeOfDay::default_return),
            pickup_location: cmd.pickup_location.clone(),
            return_location: cmd.return_location.clone(),
            delivery: cmd.delivery.clone(),
            items,
            totals: Totals::from(&quote),
            status: Status::Pending,
            previous_status: None,
            approval: None,
            rejection: None,
            deposit_payment: None,
            full_payment: None,
            notes: cmd.notes.clone(),
            internal_notes: cmd.internal_notes.clone(),
            special_requests: cmd.special_requests.clone(),
            created_by: cmd.created_by,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        let history = if cmd.auto_approve {
            reservation.status = Status::Confirmed;
            reservation.approval = Some(reservation::Approval {
                by: cmd.created_by,
                at: now.coerce(),
            });
            reservation.creation_entry(Note::new("Auto-approved reservation"))
        } else {
            reservation.creation_entry(Note::new("New reservation created"))
        };

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(history))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        for rule_id in quote.applied_rules() {
            tx.execute(Increment(By::<PricingRule, _>::new(rule_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        if let Some(code) = &quote.code {
            tx.execute(Increment(By::<DiscountCode, _>::new(code.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            number = %reservation.number,
            tenant = %reservation.tenant_id,
            status = %reservation.status,
            "reservation created",
        );

        Ok(reservation)
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
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
