//! [`Command`] for creating a new [`DiscountCode`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        pricing::{
            discount_code::{self, Discount, Scope},
            Usage,
        },
        DiscountCode, Period,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`DiscountCode`].
#[derive(Clone, Debug)]
pub struct CreateDiscountCode {
    /// Unique [`discount_code::Code`] of the new [`DiscountCode`].
    pub code: discount_code::Code,

    /// [`Discount`] granted by the new [`DiscountCode`].
    pub discount: Discount,

    /// Minimal order subtotal, if any.
    pub min_order_amount: Option<Decimal>,

    /// [`Scope`] of the new [`DiscountCode`].
    pub scope: Scope,

    /// [`Period`] the new [`DiscountCode`] may be used within.
    pub validity: Period,

    /// Maximum number of usages, if limited.
    pub max_usage: Option<u32>,
}

impl<Db> Command<CreateDiscountCode> for Service<Db>
where
    Db: Database<Insert<DiscountCode>, Err = Traced<database::Error>>,
{
    type Ok = DiscountCode;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateDiscountCode,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateDiscountCode {
            code,
            discount,
            min_order_amount,
            scope,
            validity,
            max_usage,
        } = cmd;

        if matches!(&scope, Scope::Equipment(ids) if ids.is_empty()) {
            return Err(tracerr::new!(E::EmptyScope));
        }

        let code = DiscountCode {
            id: discount_code::Id::new(),
            code,
            discount,
            min_order_amount,
            scope,
            validity,
            usage: Usage {
                current: 0,
                max: max_usage,
            },
            is_active: true,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(code.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(
                    database::DISCOUNT_CODE_CONSTRAINT,
                )) {
                    tracerr::new!(E::CodeOccupied(code.code.clone()))
                } else {
                    (tracerr::map_from_and_wrap!(=> E))(e)
                }
            })
            .map(drop)?;

        Ok(code)
    }
}

/// Error of [`CreateDiscountCode`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`discount_code::Code`] is occupied already.
    #[display("`{_0}` code is occupied already")]
    CodeOccupied(#[error(not(source))] discount_code::Code),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Scope`] lists no [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    #[display("Scope of a code must list at least one `Equipment`")]
    EmptyScope,
}
