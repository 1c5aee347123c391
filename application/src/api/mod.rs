//! REST API definitions.

pub mod availability;
pub mod discount_code;
pub mod pricing;
pub mod pricing_rule;
pub mod reservation;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use common::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use service::domain::Period;

use crate::{define_error, Error};

/// Builds the [`Router`] of the whole REST API.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route(
            "/reservations",
            post(reservation::create).get(reservation::list),
        )
        .route(
            "/reservations/check-availability",
            post(availability::check),
        )
        .route(
            "/reservations/check-bulk-availability",
            post(availability::check_bulk),
        )
        .route("/reservations/calculate-price", post(pricing::calculate))
        .route("/reservations/stats/summary", get(reservation::stats))
        .route("/reservations/timeline", get(reservation::timeline))
        .route(
            "/reservations/:id",
            get(reservation::details).put(reservation::update),
        )
        .route("/reservations/:id/status", post(reservation::change_status))
        .route("/reservations/:id/approve", post(reservation::approve))
        .route("/reservations/:id/reject", post(reservation::reject))
        .route("/reservations/:id/cancel", post(reservation::cancel))
        .route(
            "/reservations/:id/payments",
            post(reservation::record_payment).get(reservation::payments),
        )
        .route(
            "/discount-codes",
            post(discount_code::create).get(discount_code::list),
        )
        .route("/discount-codes/validate", post(discount_code::validate))
        .route(
            "/pricing-rules",
            post(pricing_rule::create).get(pricing_rule::list),
        )
        .route(
            "/pricing-rules/:id",
            put(pricing_rule::update).delete(pricing_rule::delete),
        )
        .route("/pricing-rules/:id/active", put(pricing_rule::set_active))
}

/// Body of a successful response.
#[derive(Clone, Debug, Serialize)]
pub struct Success<T> {
    /// Always `true`.
    success: bool,

    /// Human-readable message describing the outcome, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,

    /// Payload of the response.
    data: T,
}

impl<T> Success<T> {
    /// Wraps the provided `data` into a [`Success`] response.
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Attaches the provided `message` to this [`Success`] response.
    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Validates the provided raw `value` of the named input `field` with the
/// given constructor.
///
/// # Errors
///
/// With [`Error::invalid()`] if the constructor rejects the `value`.
pub fn parse<R, T>(
    field: &str,
    value: R,
    new: impl FnOnce(R) -> Option<T>,
) -> Result<T, Error> {
    new(value).ok_or_else(|| Error::invalid(field))
}

/// Validates the provided optional raw `value` of the named input `field`
/// with the given constructor.
///
/// # Errors
///
/// With [`Error::invalid()`] if the constructor rejects the provided `value`.
pub fn parse_opt<R, T>(
    field: &str,
    value: Option<R>,
    new: impl FnOnce(R) -> Option<T>,
) -> Result<Option<T>, Error> {
    value.map(|v| parse(field, v, new)).transpose()
}

/// Deserializes an optional field distinguishing an explicit `null` from an
/// omitted value.
///
/// Must be used along with `#[serde(default)]`.
///
/// # Errors
///
/// If the present value cannot be deserialized.
pub fn nullable<'de, D, T>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Builds a [`Period`] out of the provided `start` and `end`.
///
/// # Errors
///
/// With [`PeriodError::Inverted`] if the `end` doesn't follow the `start`.
pub fn period(start: DateTime, end: DateTime) -> Result<Period, Error> {
    Period::new(start, end).map_err(|_| PeriodError::Inverted.into())
}

define_error! {
    enum PeriodError {
        #[code = "INVALID_DATE_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "End date must be after start date"]
        Inverted,
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "`page` and `limit` must be positive, and `limit` must \
                     not exceed 100"]
        Invalid,
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{parse, parse_opt, period};

    #[test]
    fn parses_fields() {
        assert_eq!(parse("quantity", 2_u32, |q| (q > 0).then_some(q)).ok(), Some(2));

        let err = parse("quantity", 0_u32, |q| (q > 0).then_some(q))
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("`quantity`"));

        assert_eq!(
            parse_opt("notes", None::<String>, |_| Some(())).ok(),
            Some(None),
        );
    }

    #[test]
    fn rejects_inverted_period() {
        let start = DateTime::from_rfc3339("2025-11-05T00:00:00Z").unwrap();
        let end = DateTime::from_rfc3339("2025-11-01T00:00:00Z").unwrap();

        let err = period(start, end).unwrap_err();
        assert_eq!(err.code, "INVALID_DATE_RANGE");
        assert!(period(end, start).is_ok());
    }
}
