//! [`Query`] collection related to a single [`Reservation`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, HistoryEntry, Payment},
        tenant, Reservation,
    },
    infra::{database, Database},
    read,
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Reservation`] by its ID.
pub type ById = DatabaseQuery<By<Option<Reservation>, reservation::Id>>;

/// Queries status history of a [`Reservation`], newest first.
pub type History = DatabaseQuery<By<Vec<HistoryEntry>, reservation::Id>>;

/// Queries [`Payment`]s of a [`Reservation`], newest first.
pub type Payments = DatabaseQuery<By<Vec<Payment>, reservation::Id>>;

/// [`Query`] for retrieving [`read::reservation::Details`] of a
/// [`Reservation`].
#[derive(Clone, Copy, Debug)]
pub struct Details {
    /// ID of the tenant owning the [`Reservation`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Reservation`] to retrieve the details of.
    pub reservation_id: reservation::Id,
}

impl<Db> Query<Details> for Service<Db>
where
    Db: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<HistoryEntry>, reservation::Id>>,
            Ok = Vec<HistoryEntry>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Payment>, reservation::Id>>,
            Ok = Vec<Payment>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = read::reservation::Details;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: Details) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Details {
            tenant_id,
            reservation_id: id,
        } = query;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or(E::ReservationNotExists(id))
            .map_err(tracerr::wrap!())?;
        let history = self
            .database()
            .execute(Select(By::<Vec<HistoryEntry>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let payments = self
            .database()
            .execute(Select(By::<Vec<Payment>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(read::reservation::Details {
            reservation,
            history,
            payments,
        })
    }
}

/// Error of [`Details`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}
