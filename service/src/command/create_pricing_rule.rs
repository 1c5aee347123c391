//! [`Command`] for creating a new [`PricingRule`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        equipment,
        pricing::{
            rule::{self, Discount},
            Bounds, Usage,
        },
        tenant, Equipment, Period, PricingRule,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`PricingRule`].
#[derive(Clone, Debug)]
pub struct CreatePricingRule {
    /// ID of the tenant owning the [`Equipment`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Equipment`] the new [`PricingRule`] belongs to.
    pub equipment_id: equipment::Id,

    /// [`rule::Name`] of the new [`PricingRule`].
    pub name: rule::Name,

    /// [`rule::Kind`] of the new [`PricingRule`].
    pub kind: rule::Kind,

    /// Rental duration [`Bounds`] in days.
    pub duration: Bounds,

    /// Rented quantity [`Bounds`].
    pub quantity: Bounds,

    /// [`Discount`] provided by the new [`PricingRule`].
    pub discount: Discount,

    /// Priority of the new [`PricingRule`].
    pub priority: i32,

    /// [`Period`] the new [`PricingRule`] is restricted to, if any.
    pub validity: Option<Period>,

    /// Maximum number of usages, if limited.
    pub max_usage: Option<u32>,
}

impl<Db> Command<CreatePricingRule> for Service<Db>
where
    Db: Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        > + Database<Insert<PricingRule>, Err = Traced<database::Error>>,
{
    type Ok = PricingRule;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreatePricingRule,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePricingRule {
            tenant_id,
            equipment_id,
            name,
            kind,
            duration,
            quantity,
            discount,
            priority,
            validity,
            max_usage,
        } = cmd;

        let equipment = self
            .database()
            .execute(Select(By::<Option<Equipment>, _>::new(equipment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(E::EquipmentNotExists(equipment_id))
            .map_err(tracerr::wrap!())?;

        for bounds in [duration, quantity] {
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(tracerr::new!(E::InvertedBounds(min, max)));
                }
            }
        }

        let rule = PricingRule {
            id: rule::Id::new(),
            equipment_id: equipment.id,
            name,
            kind,
            duration,
            quantity,
            discount,
            priority,
            is_active: true,
            validity,
            usage: Usage {
                current: 0,
                max: max_usage,
            },
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(rule.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(rule)
    }
}

/// Error of [`CreatePricingRule`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Equipment`] with the provided ID does not exist.
    #[display("`Equipment(id: {_0})` does not exist")]
    EquipmentNotExists(#[error(not(source))] equipment::Id),

    /// Lower [`Bounds`] exceed the upper ones.
    #[display("Lower bound {_0} exceeds upper bound {_1}")]
    InvertedBounds(u32, u32),
}
