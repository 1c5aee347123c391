//! [`Query`] collection related to multiple [`Reservation`]s.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{
        equipment, reservation::Status, tenant, Equipment, Period, Reservation,
    },
    infra::{database, Database},
    read::{
        self,
        reservation::{list, stats},
        timeline::Selector,
    },
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`list::Page`] of [`Reservation`]s, the most recently created
/// first.
pub type List = DatabaseQuery<By<list::Page, list::Selector>>;

/// Queries aggregated [`stats::Stats`] of [`Reservation`]s.
pub type Stats = DatabaseQuery<By<stats::Stats, stats::Selector>>;

/// [`Query`] for laying out [`Reservation`]s per [`Equipment`] over some
/// [`Period`].
#[derive(Clone, Debug)]
pub struct Timeline {
    /// ID of the tenant to lay out the [`read::Timeline`] for.
    pub tenant_id: tenant::Id,

    /// Covered [`Period`], or the current UTC calendar month if [`None`].
    pub period: Option<Period>,

    /// IDs of the [`Equipment`] to lay out, or all of it if empty.
    pub equipment_ids: Vec<equipment::Id>,

    /// [`Status`] of the laid out [`Reservation`]s, if restricted.
    pub status: Option<Status>,
}

impl<Db> Query<Timeline> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Equipment>, Selector>>,
            Ok = Vec<Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, Selector>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = read::Timeline;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Timeline) -> Result<Self::Ok, Self::Err> {
        let Timeline {
            tenant_id,
            period,
            equipment_ids,
            status,
        } = query;
        let selector = Selector {
            tenant_id,
            period: period.unwrap_or_else(|| Period::month_of(DateTime::now())),
            equipment_ids,
            status,
        };

        let equipment = self
            .database()
            .execute(Select(By::<Vec<Equipment>, _>::new(selector.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let period = selector.period;
        let reservations = self
            .database()
            .execute(Select(By::<Vec<Reservation>, _>::new(selector)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::Timeline::new(period, equipment, &reservations))
    }
}
