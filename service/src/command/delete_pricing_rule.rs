//! [`Command`] for deleting a [`PricingRule`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{equipment, pricing::rule, tenant, Equipment, PricingRule},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`PricingRule`].
///
/// [`Reservation`]s priced with the [`PricingRule`] keep their discounts.
///
/// [`Reservation`]: crate::domain::Reservation
#[derive(Clone, Copy, Debug)]
pub struct DeletePricingRule {
    /// ID of the tenant owning the [`PricingRule`].
    pub tenant_id: tenant::Id,

    /// ID of the [`PricingRule`] to delete.
    pub rule_id: rule::Id,
}

impl<Db> Command<DeletePricingRule> for Service<Db>
where
    Db: Database<
            Select<By<Option<PricingRule>, rule::Id>>,
            Ok = Option<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<PricingRule, rule::Id>>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeletePricingRule,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeletePricingRule { tenant_id, rule_id } = cmd;

        let rule = self
            .database()
            .execute(Select(By::<Option<PricingRule>, _>::new(rule_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())?;
        self.database()
            .execute(Select(By::<Option<Equipment>, _>::new(
                rule.equipment_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.tenant_id == tenant_id)
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        self.database()
            .execute(Delete(By::<PricingRule, _>::new(rule_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeletePricingRule`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`PricingRule`] with the provided ID does not exist.
    #[display("`PricingRule(id: {_0})` does not exist")]
    RuleNotExists(#[error(not(source))] rule::Id),
}
