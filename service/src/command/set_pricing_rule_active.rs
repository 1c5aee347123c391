//! [`Command`] for (de)activating a [`PricingRule`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{equipment, pricing::rule, tenant, Equipment, PricingRule},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for (de)activating a [`PricingRule`].
#[derive(Clone, Copy, Debug)]
pub struct SetPricingRuleActive {
    /// ID of the tenant owning the [`PricingRule`].
    pub tenant_id: tenant::Id,

    /// ID of the [`PricingRule`] to (de)activate.
    pub rule_id: rule::Id,

    /// Indicator whether the [`PricingRule`] should be active.
    pub is_active: bool,
}

impl<Db> Command<SetPricingRuleActive> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<PricingRule>, rule::Id>>,
            Ok = Option<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Equipment>, equipment::Id>>,
            Ok = Option<Equipment>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<PricingRule>, rule::Id>>,
            Ok = Option<PricingRule>,
            Err = Traced<database::Error>,
        > + Database<Insert<PricingRule>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = PricingRule;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SetPricingRuleActive,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SetPricingRuleActive {
            tenant_id,
            rule_id,
            is_active,
        } = cmd;

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

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut rule = tx
            .execute(Select(By::<Option<PricingRule>, _>::new(rule_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RuleNotExists(rule_id))
            .map_err(tracerr::wrap!())?;
        if rule.is_active == is_active {
            return Ok(rule);
        }
        rule.is_active = is_active;

        tx.execute(Insert(rule.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(rule)
    }
}

/// Error of [`SetPricingRuleActive`] [`Command`] execution.
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
