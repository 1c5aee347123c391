//! Pricing-related REST API definitions.

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse as _, Response},
    Json,
};
use common::{Currency, DateTime, Handler as _, Percent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    domain::{
        equipment::{self, Tier},
        pricing::{self, discount_code, quote::Source},
    },
    query,
};

use crate::{api, define_error, AsError, Context, Error};

/// Body of a price calculation.
///
/// A body listing `items` is quoted as a whole reservation, otherwise a
/// single [`Equipment`] is priced.
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum CalculateRequest {
    /// Whole reservation quote.
    Quote(QuoteRequest),

    /// Single [`Equipment`] price.
    ///
    /// [`Equipment`]: service::domain::Equipment
    Single(SingleRequest),
}

/// Body of a whole reservation quote.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Quoted items.
    items: Vec<api::reservation::ItemInput>,

    /// Start of the quoted period.
    start_date: DateTime,

    /// End of the quoted period.
    end_date: DateTime,

    /// Discount code to apply once upon the whole order.
    discount_code: Option<String>,
}

/// Body of a single [`Equipment`] price calculation.
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRequest {
    /// ID of the priced [`Equipment`].
    ///
    /// [`Equipment`]: service::domain::Equipment
    equipment_id: equipment::Id,

    /// Priced quantity.
    #[serde(default = "one")]
    quantity: u32,

    /// Start of the priced period.
    start_date: DateTime,

    /// End of the priced period.
    end_date: DateTime,

    /// Discount code to apply.
    discount_code: Option<String>,
}

/// Default priced quantity.
const fn one() -> u32 {
    1
}

/// Price breakdown of a single [`Equipment`].
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    equipment_id: equipment::Id,
    currency: Currency,
    start_date: DateTime,
    end_date: DateTime,
    pricing_tier: Tier,
    hours: u64,
    days: u64,
    quantity: u32,
    base_price: Decimal,
    subtotal: Decimal,
    discounts: Vec<Discount>,
    total_discount: Decimal,
    final_price: Decimal,
    price_per_day: Decimal,
}

impl From<pricing::Breakdown> for Breakdown {
    fn from(b: pricing::Breakdown) -> Self {
        Self {
            equipment_id: b.equipment_id,
            currency: b.currency,
            start_date: b.period.start(),
            end_date: b.period.end(),
            pricing_tier: b.tier,
            hours: b.hours,
            days: b.days,
            quantity: b.quantity,
            base_price: b.base_price,
            subtotal: b.subtotal,
            discounts: b.discounts.into_iter().map(Into::into).collect(),
            total_discount: b.total_discount,
            final_price: b.final_price,
            price_per_day: b.price_per_day,
        }
    }
}

/// Discount applied to a [`Breakdown`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    /// Kind of the discount source: either `RULE` or `CODE`.
    source: &'static str,

    /// ID of the discount source.
    source_id: String,

    /// Human-readable name of the discount.
    name: String,

    /// Discounted amount.
    amount: Decimal,
}

impl From<pricing::quote::AppliedDiscount> for Discount {
    fn from(d: pricing::quote::AppliedDiscount) -> Self {
        let (source, source_id) = match d.source {
            Source::Rule(id) => ("RULE", id.to_string()),
            Source::Code(id) => ("CODE", id.to_string()),
        };
        Self {
            source,
            source_id,
            name: d.name,
            amount: d.amount,
        }
    }
}

/// Quote of a whole reservation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    currency: Currency,
    items: Vec<Breakdown>,
    subtotal: Decimal,
    discount_amount: Decimal,
    discount_code: Option<AppliedCode>,
    tax_rate: Percent,
    tax_amount: Decimal,
    total_amount: Decimal,
    deposit_amount: Decimal,
    remaining_amount: Decimal,
}

impl From<pricing::Quote> for Quote {
    fn from(q: pricing::Quote) -> Self {
        Self {
            currency: q.currency,
            items: q.items.into_iter().map(Into::into).collect(),
            subtotal: q.subtotal,
            discount_amount: q.discount,
            discount_code: q.code.map(|c| AppliedCode {
                id: c.id,
                code: c.code.to_string(),
                amount: c.amount,
            }),
            tax_rate: q.tax_rate,
            tax_amount: q.tax,
            total_amount: q.total,
            deposit_amount: q.deposit,
            remaining_amount: q.remaining,
        }
    }
}

/// Discount code applied to a [`Quote`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCode {
    id: discount_code::Id,
    code: String,
    amount: Decimal,
}

/// Calculates a price without booking anything.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_DATE_RANGE` - end date doesn't follow the start date;
/// - `NO_ITEMS` - no items are requested;
/// - `DUPLICATE_EQUIPMENT` - same equipment is requested more than once;
/// - `EQUIPMENT_NOT_FOUND` - requested equipment doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "calculatePrice", tenant = %ctx.tenant_id()),
)]
pub async fn calculate(
    ctx: Context,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;

    Ok(match req {
        CalculateRequest::Quote(req) => {
            let quote = ctx
                .service()
                .execute(query::QuoteReservation {
                    tenant_id: ctx.tenant_id(),
                    items: api::reservation::requests(req.items)?,
                    period: api::period(req.start_date, req.end_date)?,
                    code: api::parse_opt(
                        "discountCode",
                        req.discount_code,
                        discount_code::Code::new,
                    )?,
                })
                .await
                .map_err(AsError::into_error)?;
            api::Success::new(Quote::from(quote)).into_response()
        }
        CalculateRequest::Single(req) => {
            let breakdown = ctx
                .service()
                .execute(query::CalculatePrice {
                    tenant_id: ctx.tenant_id(),
                    item: service::domain::reservation::item::Request {
                        equipment_id: req.equipment_id,
                        quantity: api::parse("quantity", req.quantity, |q| {
                            (q > 0).then_some(q)
                        })?,
                    },
                    period: api::period(req.start_date, req.end_date)?,
                    code: api::parse_opt(
                        "discountCode",
                        req.discount_code,
                        discount_code::Code::new,
                    )?,
                })
                .await
                .map_err(AsError::into_error)?;
            api::Success::new(Breakdown::from(breakdown)).into_response()
        }
    })
}

define_error! {
    enum ItemsError {
        #[code = "NO_ITEMS"]
        #[status = BAD_REQUEST]
        #[message = "At least one item must be requested"]
        NoItems,

        #[code = "ZERO_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Requested quantity must be positive"]
        ZeroQuantity,

        #[code = "DUPLICATE_EQUIPMENT"]
        #[status = BAD_REQUEST]
        #[message = "Same `Equipment` is requested more than once"]
        DuplicateEquipment,

        #[code = "MIXED_CURRENCIES"]
        #[status = BAD_REQUEST]
        #[message = "Requested `Equipment` is priced in different currencies"]
        MixedCurrencies,
    }
}

impl AsError for query::pricing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NoItems => Some(ItemsError::NoItems.into()),
            Self::ZeroQuantity(_) => Some(ItemsError::ZeroQuantity.into()),
            Self::DuplicateEquipment(_) => {
                Some(ItemsError::DuplicateEquipment.into())
            }
            Self::EquipmentNotExists(_) => {
                Some(api::availability::EquipmentError::NotExists.into())
            }
            Self::MixedCurrencies => Some(ItemsError::MixedCurrencies.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::CalculateRequest;

    #[test]
    fn distinguishes_quotes_from_single_prices() {
        let quote: CalculateRequest = serde_json::from_str(
            r#"{
                "items": [{
                    "equipmentId": "7e7f1f52-2b0b-4a8e-9d3c-0c6a7b7a1e11",
                    "quantity": 2
                }],
                "startDate": "2025-11-01T00:00:00Z",
                "endDate": "2025-11-05T00:00:00Z",
                "discountCode": "SUMMER10"
            }"#,
        )
        .unwrap();
        assert!(matches!(quote, CalculateRequest::Quote(_)));

        let single: CalculateRequest = serde_json::from_str(
            r#"{
                "equipmentId": "7e7f1f52-2b0b-4a8e-9d3c-0c6a7b7a1e11",
                "startDate": "2025-11-01T00:00:00Z",
                "endDate": "2025-11-05T00:00:00Z"
            }"#,
        )
        .unwrap();
        let CalculateRequest::Single(single) = single else {
            panic!("expected single price request");
        };
        assert_eq!(single.quantity, 1);
    }
}
