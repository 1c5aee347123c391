//! [`DiscountCode`]-related REST API definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};
use common::{DateTime, Handler as _};
use http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{
        self,
        equipment,
        pricing::discount_code::{self, DiscountKind, Rejection, Scope},
    },
    query::{self, pricing::Validity},
    read::pricing::codes,
};

use crate::{api, define_error, AsError, Context, Error};

/// Body of a [`DiscountCode`] creation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Code to be entered by customers.
    code: String,

    /// Kind of the discount.
    discount_type: DiscountKind,

    /// Percentage or fixed amount of the discount.
    discount_value: Decimal,

    /// Maximum discounted amount of a percentage discount.
    max_discount: Option<Decimal>,

    /// Minimum order subtotal the code applies to.
    min_order_amount: Option<Decimal>,

    /// IDs of the [`Equipment`] the code is limited to.
    ///
    /// The code applies to any [`Equipment`] if omitted.
    ///
    /// [`Equipment`]: domain::Equipment
    equipment_ids: Option<Vec<equipment::Id>>,

    /// Start of the code validity.
    valid_from: DateTime,

    /// End of the code validity.
    valid_until: DateTime,

    /// Maximum number of uses.
    max_usage: Option<u32>,
}

/// Body of a [`DiscountCode`] validation.
#[derive(Clone, Debug, Deserialize)]
pub struct ValidateRequest {
    /// Code to validate.
    code: String,
}

/// Query parameters of a [`DiscountCode`]s listing.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Required activity of the listed codes.
    is_active: Option<bool>,

    /// Indicator whether only the codes valid right now are listed.
    #[serde(default)]
    valid_now: bool,
}

/// Code granting a discount on a reservation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    id: discount_code::Id,
    code: String,
    discount_type: DiscountKind,
    discount_value: Decimal,
    max_discount: Option<Decimal>,
    min_order_amount: Option<Decimal>,
    equipment_ids: Option<Vec<equipment::Id>>,
    valid_from: DateTime,
    valid_until: DateTime,
    current_usage: u32,
    max_usage: Option<u32>,
    is_active: bool,
    created_at: DateTime,
}

impl From<domain::DiscountCode> for DiscountCode {
    fn from(c: domain::DiscountCode) -> Self {
        Self {
            id: c.id,
            code: c.code.to_string(),
            discount_type: c.discount.kind(),
            discount_value: c.discount.value(),
            max_discount: c.discount.max(),
            min_order_amount: c.min_order_amount,
            equipment_ids: match c.scope {
                Scope::All => None,
                Scope::Equipment(ids) => Some(ids),
            },
            valid_from: c.validity.start(),
            valid_until: c.validity.end(),
            current_usage: c.usage.current,
            max_usage: c.usage.max,
            is_active: c.is_active,
            created_at: c.created_at.coerce(),
        }
    }
}

/// Result of a [`DiscountCode`] validation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Indicator whether the code may be used.
    valid: bool,

    /// Reason of the code being unusable.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,

    /// Validated [`DiscountCode`], if usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_code: Option<DiscountCode>,
}

impl From<Validity> for ValidationResult {
    fn from(v: Validity) -> Self {
        match v {
            Validity::Valid(code) => Self {
                valid: true,
                reason: None,
                discount_code: Some(code.into()),
            },
            Validity::Invalid(reason) => Self {
                valid: false,
                reason: Some(reason.to_string()),
                discount_code: None,
            },
        }
    }
}

/// Creates a new [`DiscountCode`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - some field is missing or invalid;
/// - `CODE_OCCUPIED` - the code is already taken;
/// - `EMPTY_SCOPE` - listed `equipmentIds` are empty.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "createDiscountCode"),
)]
pub async fn create(
    ctx: Context,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, api::Success<DiscountCode>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let discount = api::parse(
        "discountValue",
        (req.discount_type, req.discount_value, req.max_discount),
        |(kind, value, max)| {
            max.map_or(true, |m| m > Decimal::ZERO)
                .then(|| discount_code::Discount::from_parts(kind, value, max))
                .flatten()
        },
    )?;
    let cmd = command::CreateDiscountCode {
        code: api::parse("code", req.code, discount_code::Code::new)?,
        discount,
        min_order_amount: api::parse_opt(
            "minOrderAmount",
            req.min_order_amount,
            |v| (v >= Decimal::ZERO).then_some(v),
        )?,
        scope: req.equipment_ids.map_or(Scope::All, Scope::Equipment),
        validity: api::period(req.valid_from, req.valid_until)?,
        max_usage: req.max_usage,
    };

    let code = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((
        StatusCode::CREATED,
        api::Success::new(code.into())
            .with_message("Discount code created successfully"),
    ))
}

/// Lists [`DiscountCode`]s, the most recently created first.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "listDiscountCodes"),
)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<api::Success<Vec<DiscountCode>>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    ctx.service()
        .execute(query::pricing::ListDiscountCodes::by(codes::Filter {
            is_active: params.is_active,
            valid_at: params.valid_now.then(DateTime::now),
        }))
        .await
        .map_err(AsError::into_error)
        .map(|codes| {
            api::Success::new(codes.into_iter().map(Into::into).collect())
        })
}

/// Checks whether a [`DiscountCode`] may be used right now, without using
/// it.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "validateDiscountCode"),
)]
pub async fn validate(
    ctx: Context,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<api::Success<ValidationResult>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let Some(code) = discount_code::Code::new(req.code) else {
        return Ok(api::Success::new(
            Validity::Invalid(Rejection::NotFound).into(),
        ));
    };

    ctx.service()
        .execute(query::ValidateDiscountCode { code })
        .await
        .map_err(AsError::into_error)
        .map(|v| api::Success::new(v.into()))
}

impl AsError for command::create_discount_code::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CODE_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Discount code is already taken"]
                CodeOccupied,

                #[code = "EMPTY_SCOPE"]
                #[status = BAD_REQUEST]
                #[message = "`equipmentIds` must not be empty"]
                EmptyScope,
            }
        }

        match self {
            Self::CodeOccupied(_) => Some(Error::CodeOccupied.into()),
            Self::Db(e) => e.try_as_error(),
            Self::EmptyScope => Some(Error::EmptyScope.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        domain::pricing::discount_code::Rejection, query::pricing::Validity,
    };

    use super::ValidationResult;

    #[test]
    fn explains_invalid_codes() {
        let result = ValidationResult::from(Validity::Invalid(
            Rejection::UsageExhausted,
        ));

        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("Code usage limit is reached"));
        assert!(result.discount_code.is_none());
    }
}
