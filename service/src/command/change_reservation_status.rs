//! [`Command`] for changing [`Status`] of a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        notification::Content,
        reservation::{
            self, HistoryEntry, IllegalTransition, Note, Reason, Status,
            StatusChange,
        },
        tenant, user, Notification, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for changing [`Status`] of a [`Reservation`].
#[derive(Clone, Debug)]
pub struct ChangeReservationStatus {
    /// ID of the tenant owning the [`Reservation`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Reservation`] to change [`Status`] of.
    pub reservation_id: reservation::Id,

    /// New [`Status`] of the [`Reservation`].
    pub status: Status,

    /// ID of the [`User`] changing the [`Status`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub actor: Option<user::Id>,

    /// [`Reason`] of the change.
    ///
    /// Required for [`Status::Rejected`].
    pub reason: Option<Reason>,

    /// Free-form [`Note`] on the change.
    pub notes: Option<Note>,
}

impl<Db> Command<ChangeReservationStatus> for Service<Db>
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
        + Database<Insert<HistoryEntry>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ChangeReservationStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ChangeReservationStatus {
            tenant_id,
            reservation_id: id,
            status,
            actor,
            reason,
            notes,
        } = cmd;

        if status == Status::Rejected && reason.is_none() {
            return Err(tracerr::new!(E::ReasonRequired));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent transitions of the same `Reservation`.
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

        let from = reservation.status;
        let entry = reservation
            .transition(
                status,
                StatusChange {
                    actor,
                    reason: reason.clone(),
                    notes,
                    at: DateTime::now(),
                },
            )
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(entry))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            number = %reservation.number,
            %from,
            to = %reservation.status,
            "reservation status changed",
        );

        self.outbox().enqueue(Notification::in_app(
            &reservation,
            Content::status_changed(&reservation, from, reason.as_ref()),
        ));

        Ok(reservation)
    }
}

/// Error of [`ChangeReservationStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Status`] cannot be changed as requested.
    #[display("{_0}")]
    #[from]
    IllegalTransition(IllegalTransition),

    /// [`Reason`] is required for the requested [`Status`].
    #[display("`Reason` is required for rejecting a `Reservation`")]
    ReasonRequired,

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}
