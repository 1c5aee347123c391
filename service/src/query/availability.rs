//! [`Query`] collection checking availability of [`Equipment`].

use std::collections::HashMap;

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        equipment,
        reservation::{self, item},
        tenant, Equipment, Period,
    },
    infra::{database, Database},
    read::{
        availability::{Conflict, ItemAvailability, Selector},
        Availability, BulkAvailability,
    },
    Query, Service,
};

/// [`Query`] for checking availability of an [`Equipment`] within a
/// [`Period`].
#[derive(Clone, Copy, Debug)]
pub struct CheckAvailability {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Equipment`] to check.
    pub equipment_id: equipment::Id,

    /// Requested [`Period`].
    pub period: Period,

    /// ID of the [`Reservation`] to leave out of the check, if any.
    ///
    /// [`Reservation`]: crate::domain::Reservation
    pub exclude: Option<reservation::Id>,
}

impl<Db> Query<CheckAvailability> for Service<Db>
where
    Db: Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Conflict>, Selector>>,
            Ok = Vec<Conflict>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Availability;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CheckAvailability,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckAvailability {
            tenant_id,
            equipment_id,
            period,
            exclude,
        } = query;

        let equipment = self
            .database()
            .execute(Select(By::<Option<Equipment>, _>::new(equipment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(E::EquipmentNotExists(equipment_id))
            .map_err(tracerr::wrap!())?;

        availability_of(self.database(), &equipment, period, exclude)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// [`Query`] for checking availability of multiple [`Equipment`] within the
/// same [`Period`].
#[derive(Clone, Debug)]
pub struct CheckBulkAvailability {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// Requested [`Equipment`] quantities.
    pub items: Vec<item::Request>,

    /// Requested [`Period`].
    pub period: Period,

    /// ID of the [`Reservation`] to leave out of the check, if any.
    ///
    /// [`Reservation`]: crate::domain::Reservation
    pub exclude: Option<reservation::Id>,
}

impl<Db> Query<CheckBulkAvailability> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<equipment::Id, Equipment>, Vec<equipment::Id>>>,
            Ok = HashMap<equipment::Id, Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Conflict>, Selector>>,
            Ok = Vec<Conflict>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = BulkAvailability;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CheckBulkAvailability,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckBulkAvailability {
            tenant_id,
            items,
            period,
            exclude,
        } = query;

        let ids = items.iter().map(|i| i.equipment_id).collect::<Vec<_>>();
        let equipment = self
            .database()
            .execute(Select(By::new(ids)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut checked = Vec::with_capacity(items.len());
        for item in items {
            let equipment = equipment
                .get(&item.equipment_id)
                .filter(|e| e.tenant_id == tenant_id)
                .ok_or(E::EquipmentNotExists(item.equipment_id))
                .map_err(tracerr::wrap!())?;
            checked.push(ItemAvailability {
                requested: item.quantity,
                availability: availability_of(
                    self.database(),
                    equipment,
                    period,
                    exclude,
                )
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            });
        }

        Ok(BulkAvailability { items: checked })
    }
}

/// Calculates [`Availability`] of the provided [`Equipment`] within the
/// provided [`Period`] out of the [`Conflict`]s stored in the `db`.
///
/// # Errors
///
/// If failed to select [`Conflict`]s from the [`Database`].
pub(crate) async fn availability_of<Db>(
    db: &Db,
    equipment: &Equipment,
    period: Period,
    exclude: Option<reservation::Id>,
) -> Result<Availability, Traced<database::Error>>
where
    Db: Database<
        Select<By<Vec<Conflict>, Selector>>,
        Ok = Vec<Conflict>,
        Err = Traced<database::Error>,
    >,
{
    let conflicts = db
        .execute(Select(By::new(Selector {
            equipment_id: equipment.id,
            period,
            exclude,
        })))
        .await
        .map_err(tracerr::wrap!())?;
    Ok(Availability::new(equipment.id, equipment.quantity, conflicts))
}

/// Error of [`CheckAvailability`] or [`CheckBulkAvailability`] [`Query`]
/// execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Equipment`] with the provided ID does not exist.
    #[display("`Equipment(id: {_0})` does not exist")]
    EquipmentNotExists(#[error(not(source))] equipment::Id),
}
