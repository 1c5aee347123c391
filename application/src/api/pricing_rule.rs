//! [`PricingRule`]-related REST API definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
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
        self, equipment,
        pricing::{
            rule::{self, DiscountKind},
            Bounds,
        },
    },
    query,
};

use crate::{api, define_error, AsError, Context, Error};

/// Body of a [`PricingRule`] creation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID of the [`Equipment`] the rule belongs to.
    ///
    /// [`Equipment`]: domain::Equipment
    equipment_id: equipment::Id,

    /// Human-readable name of the rule.
    name: String,

    /// Kind of the rule.
    rule_type: rule::Kind,

    /// Minimum rental days the rule applies to.
    min_days: Option<u32>,

    /// Maximum rental days the rule applies to.
    max_days: Option<u32>,

    /// Minimum quantity the rule applies to.
    min_quantity: Option<u32>,

    /// Maximum quantity the rule applies to.
    max_quantity: Option<u32>,

    /// Kind of the discount.
    discount_type: DiscountKind,

    /// Percentage, fixed amount, or special daily rate of the discount.
    discount_value: Decimal,

    /// Priority of the rule, higher goes first.
    #[serde(default)]
    priority: i32,

    /// Start of the rule validity.
    valid_from: Option<DateTime>,

    /// End of the rule validity.
    valid_until: Option<DateTime>,

    /// Maximum number of uses.
    max_usage: Option<u32>,
}

/// Body of a [`PricingRule`] update.
///
/// Omitted fields are left untouched, while `null` lifts an optional
/// restriction.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// New name of the rule.
    name: Option<String>,

    /// New kind of the rule.
    rule_type: Option<rule::Kind>,

    /// New minimum rental days.
    #[serde(default, deserialize_with = "api::nullable")]
    min_days: Option<Option<u32>>,

    /// New maximum rental days.
    #[serde(default, deserialize_with = "api::nullable")]
    max_days: Option<Option<u32>>,

    /// New minimum quantity.
    #[serde(default, deserialize_with = "api::nullable")]
    min_quantity: Option<Option<u32>>,

    /// New maximum quantity.
    #[serde(default, deserialize_with = "api::nullable")]
    max_quantity: Option<Option<u32>>,

    /// New kind of the discount.
    discount_type: Option<DiscountKind>,

    /// New value of the discount.
    discount_value: Option<Decimal>,

    /// New priority.
    priority: Option<i32>,

    /// New start of the rule validity.
    #[serde(default, deserialize_with = "api::nullable")]
    valid_from: Option<Option<DateTime>>,

    /// New end of the rule validity.
    #[serde(default, deserialize_with = "api::nullable")]
    valid_until: Option<Option<DateTime>>,

    /// New maximum number of uses.
    #[serde(default, deserialize_with = "api::nullable")]
    max_usage: Option<Option<u32>>,

    /// New indicator whether the rule should be applied.
    is_active: Option<bool>,
}

/// Query parameters of a [`PricingRule`]s listing.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// ID of the [`Equipment`] to list rules of.
    ///
    /// [`Equipment`]: domain::Equipment
    equipment_id: equipment::Id,
}

/// Body of a [`PricingRule`] (de)activation.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    /// Indicator whether the rule should be applied.
    is_active: bool,
}

/// Rule discounting rentals of some [`Equipment`].
///
/// [`Equipment`]: domain::Equipment
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    id: rule::Id,
    equipment_id: equipment::Id,
    name: String,
    rule_type: rule::Kind,
    min_days: Option<u32>,
    max_days: Option<u32>,
    min_quantity: Option<u32>,
    max_quantity: Option<u32>,
    discount_type: DiscountKind,
    discount_value: Decimal,
    priority: i32,
    is_active: bool,
    valid_from: Option<DateTime>,
    valid_until: Option<DateTime>,
    current_usage: u32,
    max_usage: Option<u32>,
    created_at: DateTime,
}

impl From<domain::PricingRule> for PricingRule {
    fn from(r: domain::PricingRule) -> Self {
        Self {
            id: r.id,
            equipment_id: r.equipment_id,
            name: r.name.to_string(),
            rule_type: r.kind,
            min_days: r.duration.min,
            max_days: r.duration.max,
            min_quantity: r.quantity.min,
            max_quantity: r.quantity.max,
            discount_type: r.discount.kind(),
            discount_value: r.discount.value(),
            priority: r.priority,
            is_active: r.is_active,
            valid_from: r.validity.map(|p| p.start()),
            valid_until: r.validity.map(|p| p.end()),
            current_usage: r.usage.current,
            max_usage: r.usage.max,
            created_at: r.created_at.coerce(),
        }
    }
}

/// Creates a new [`PricingRule`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - some field is missing or invalid;
/// - `EQUIPMENT_NOT_FOUND` - the equipment doesn't exist;
/// - `INVERTED_BOUNDS` - some minimum exceeds its maximum.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "createPricingRule", tenant = %ctx.tenant_id()),
)]
pub async fn create(
    ctx: Context,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, api::Success<PricingRule>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;

    let validity = match (req.valid_from, req.valid_until) {
        (None, None) => None,
        (Some(from), Some(until)) => Some(api::period(from, until)?),
        (Some(_), None) => return Err(Error::invalid("validUntil")),
        (None, Some(_)) => return Err(Error::invalid("validFrom")),
    };
    let cmd = command::CreatePricingRule {
        tenant_id: ctx.tenant_id(),
        equipment_id: req.equipment_id,
        name: api::parse("name", req.name, rule::Name::new)?,
        kind: req.rule_type,
        duration: Bounds {
            min: req.min_days,
            max: req.max_days,
        },
        quantity: Bounds {
            min: req.min_quantity,
            max: req.max_quantity,
        },
        discount: api::parse(
            "discountValue",
            (req.discount_type, req.discount_value),
            |(kind, value)| rule::Discount::from_parts(kind, value),
        )?,
        priority: req.priority,
        validity,
        max_usage: req.max_usage,
    };

    let rule = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((
        StatusCode::CREATED,
        api::Success::new(rule.into())
            .with_message("Pricing rule created successfully"),
    ))
}

/// Lists all the [`PricingRule`]s of some [`Equipment`], the highest
/// priority first.
///
/// [`Equipment`]: domain::Equipment
#[tracing::instrument(
    skip_all,
    fields(http.handler = "listPricingRules", tenant = %ctx.tenant_id()),
)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<api::Success<Vec<PricingRule>>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    ctx.service()
        .execute(query::ListPricingRules {
            tenant_id: ctx.tenant_id(),
            equipment_id: params.equipment_id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|rules| {
            api::Success::new(rules.into_iter().map(Into::into).collect())
        })
}

/// Updates an existing [`PricingRule`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - some field is invalid;
/// - `PRICING_RULE_NOT_FOUND` - the rule doesn't exist;
/// - `INVERTED_BOUNDS` - some minimum exceeds its maximum.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "updatePricingRule", tenant = %ctx.tenant_id()),
)]
pub async fn update(
    ctx: Context,
    id: Result<Path<rule::Id>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<api::Success<PricingRule>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    let validity = match (req.valid_from, req.valid_until) {
        (None, None) => None,
        (Some(None), Some(None)) => Some(None),
        (Some(Some(from)), Some(Some(until))) => {
            Some(Some(api::period(from, until)?))
        }
        (_, Some(_)) => return Err(Error::invalid("validFrom")),
        (Some(_), None) => return Err(Error::invalid("validUntil")),
    };
    let cmd = command::UpdatePricingRule {
        tenant_id: ctx.tenant_id(),
        rule_id: id,
        name: api::parse_opt("name", req.name, rule::Name::new)?,
        kind: req.rule_type,
        min_duration: req.min_days,
        max_duration: req.max_days,
        min_quantity: req.min_quantity,
        max_quantity: req.max_quantity,
        discount_kind: req.discount_type,
        discount_value: req.discount_value,
        priority: req.priority,
        validity,
        max_usage: req.max_usage,
        is_active: req.is_active,
    };

    ctx.service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)
        .map(|r| {
            api::Success::new(r.into())
                .with_message("Pricing rule updated successfully")
        })
}

/// Deletes a [`PricingRule`].
#[tracing::instrument(
    skip_all,
    fields(http.handler = "deletePricingRule", tenant = %ctx.tenant_id()),
)]
pub async fn delete(
    ctx: Context,
    id: Result<Path<rule::Id>, PathRejection>,
) -> Result<api::Success<()>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::DeletePricingRule {
            tenant_id: ctx.tenant_id(),
            rule_id: id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|()| {
            api::Success::new(())
                .with_message("Pricing rule deleted successfully")
        })
}

/// Turns a [`PricingRule`] on or off.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "setPricingRuleActive", tenant = %ctx.tenant_id()),
)]
pub async fn set_active(
    ctx: Context,
    id: Result<Path<rule::Id>, PathRejection>,
    body: Result<Json<ActiveRequest>, JsonRejection>,
) -> Result<api::Success<PricingRule>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    ctx.service()
        .execute(command::SetPricingRuleActive {
            tenant_id: ctx.tenant_id(),
            rule_id: id,
            is_active: req.is_active,
        })
        .await
        .map_err(AsError::into_error)
        .map(|r| api::Success::new(r.into()))
}

define_error! {
    enum RuleError {
        #[code = "PRICING_RULE_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`PricingRule` does not exist"]
        NotExists,

        #[code = "INVERTED_BOUNDS"]
        #[status = BAD_REQUEST]
        #[message = "Minimum of a pricing rule must not exceed its maximum"]
        InvertedBounds,
    }
}

impl AsError for command::create_pricing_rule::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EquipmentNotExists(_) => {
                Some(api::availability::EquipmentError::NotExists.into())
            }
            Self::InvertedBounds(..) => Some(RuleError::InvertedBounds.into()),
        }
    }
}

impl AsError for command::update_pricing_rule::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::RuleNotExists(_) => Some(RuleError::NotExists.into()),
            Self::InvertedBounds(..) => Some(RuleError::InvertedBounds.into()),
            Self::InvalidDiscount(..) => Some(Error::invalid("discountValue")),
        }
    }
}

impl AsError for command::delete_pricing_rule::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::RuleNotExists(_) => Some(RuleError::NotExists.into()),
        }
    }
}

impl AsError for command::set_pricing_rule_active::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::RuleNotExists(_) => Some(RuleError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::UpdateRequest;

    #[test]
    fn distinguishes_null_from_omitted() {
        let req: UpdateRequest = serde_json::from_str(
            r#"{"maxDays": null, "minDays": 3, "priority": 5}"#,
        )
        .unwrap();

        assert_eq!(req.max_days, Some(None));
        assert_eq!(req.min_days, Some(Some(3)));
        assert_eq!(req.max_quantity, None);
        assert_eq!(req.max_usage, None);
        assert_eq!(req.priority, Some(5));
    }
}
