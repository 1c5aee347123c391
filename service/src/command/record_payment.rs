//! [`Command`] for recording a [`Payment`] of a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        notification::Content,
        reservation::{self, payment, Note, Payment},
        tenant, user, Notification, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a [`Payment`] of a [`Reservation`].
#[derive(Clone, Debug)]
pub struct RecordPayment {
    /// ID of the tenant owning the [`Reservation`].
    pub tenant_id: tenant::Id,

    /// ID of the paid [`Reservation`].
    pub reservation_id: reservation::Id,

    /// Paid amount.
    pub amount: Decimal,

    /// [`payment::Kind`] of the [`Payment`].
    pub kind: payment::Kind,

    /// [`payment::Method`] of the [`Payment`].
    pub method: payment::Method,

    /// [`payment::Details`] of the [`Payment`].
    pub details: payment::Details,

    /// [`payment::Party`] who paid, if known.
    pub paid_by: Option<payment::Party>,

    /// ID of the [`User`] who received the [`Payment`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub received_by: Option<user::Id>,

    /// Free-form [`Note`] on the [`Payment`].
    pub notes: Option<Note>,
}

impl<Db> Command<RecordPayment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Reservation, reservation::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Insert<Payment>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Payment;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RecordPayment) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RecordPayment {
            tenant_id,
            reservation_id: id,
            amount,
            kind,
            method,
            details,
            paid_by,
            received_by,
            notes,
        } = cmd;

        if amount <= Decimal::ZERO {
            return Err(tracerr::new!(E::NonPositiveAmount(amount)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid losing concurrent settlements.
        tx.execute(Lock(By::<Reservation, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or(E::ReservationNotExists(id))
            .map_err(tracerr::wrap!())?;

        let payment = Payment {
            id: payment::Id::new(),
            reservation_id: id,
            amount,
            kind,
            method,
            details,
            paid_by,
            received_by,
            notes,
            status: payment::Status::Completed,
            paid_at: DateTime::now().coerce(),
        };
        reservation.settle(&payment);

        tx.execute(Insert(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            number = %reservation.number,
            %kind,
            %amount,
            "payment recorded",
        );

        self.outbox().enqueue(Notification::in_app(
            &reservation,
            Content::payment_received(&reservation, &payment),
        ));

        Ok(payment)
    }
}

/// Error of [`RecordPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Payment`] amount is not positive.
    #[display("`Payment` amount must be positive, got {_0}")]
    NonPositiveAmount(#[error(not(source))] Decimal),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}
