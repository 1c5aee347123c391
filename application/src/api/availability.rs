//! Availability-related REST API definitions.

use axum::{extract::rejection::JsonRejection, Json};
use common::{DateTime, Handler as _};
use serde::{Deserialize, Serialize};
use service::{
    domain::{equipment, reservation},
    query, read,
};

use crate::{api, define_error, AsError, Context, Error};

/// Body of a single [`Equipment`] availability check.
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// ID of the checked [`Equipment`].
    ///
    /// [`Equipment`]: service::domain::Equipment
    equipment_id: equipment::Id,

    /// Start of the checked period.
    start_date: DateTime,

    /// End of the checked period.
    end_date: DateTime,

    /// Quantity to check availability for.
    #[serde(default = "one")]
    quantity: u32,

    /// ID of a reservation to ignore, when rebooking it.
    exclude_reservation_id: Option<reservation::Id>,
}

/// Body of a bulk availability check.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBulkRequest {
    /// Checked items.
    items: Vec<api::reservation::ItemInput>,

    /// Start of the checked period.
    start_date: DateTime,

    /// End of the checked period.
    end_date: DateTime,

    /// ID of a reservation to ignore, when rebooking it.
    exclude_reservation_id: Option<reservation::Id>,
}

/// Default quantity of a checked [`Equipment`].
///
/// [`Equipment`]: service::domain::Equipment
const fn one() -> u32 {
    1
}

/// Availability of some [`Equipment`] over a period.
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// ID of the [`Equipment`].
    ///
    /// [`Equipment`]: service::domain::Equipment
    equipment_id: equipment::Id,

    /// Owned quantity of the [`Equipment`].
    ///
    /// [`Equipment`]: service::domain::Equipment
    total_quantity: u32,

    /// Quantity left over by the overlapping reservations.
    ///
    /// Negative if the [`Equipment`] is already overbooked.
    ///
    /// [`Equipment`]: service::domain::Equipment
    available_quantity: i64,

    /// Requested quantity.
    requested_quantity: u32,

    /// Indicator whether the requested quantity may be booked.
    is_available: bool,

    /// Overlapping reservations holding the [`Equipment`].
    ///
    /// [`Equipment`]: service::domain::Equipment
    conflicts: Vec<Conflict>,
}

impl From<read::availability::ItemAvailability> for Availability {
    fn from(item: read::availability::ItemAvailability) -> Self {
        let is_available = item.is_available();
        let read::availability::ItemAvailability {
            requested,
            availability:
                read::availability::Availability {
                    equipment_id,
                    total,
                    available,
                    conflicts,
                },
        } = item;
        Self {
            equipment_id,
            total_quantity: total,
            available_quantity: available,
            requested_quantity: requested,
            is_available,
            conflicts: conflicts.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reservation holding some [`Equipment`] over an overlapping period.
///
/// [`Equipment`]: service::domain::Equipment
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// ID of the reservation.
    reservation_id: reservation::Id,

    /// Number of the reservation.
    reservation_number: String,

    /// Name of the customer.
    customer_name: String,

    /// Start of the reservation.
    start_date: DateTime,

    /// End of the reservation.
    end_date: DateTime,

    /// Status of the reservation.
    status: reservation::Status,

    /// Held quantity.
    quantity: u32,
}

impl From<read::availability::Conflict> for Conflict {
    fn from(c: read::availability::Conflict) -> Self {
        Self {
            reservation_id: c.reservation_id,
            reservation_number: c.number.to_string(),
            customer_name: c.customer_name.to_string(),
            start_date: c.period.start(),
            end_date: c.period.end(),
            status: c.status,
            quantity: c.quantity,
        }
    }
}

/// Result of a bulk availability check.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailability {
    /// Indicator whether every item may be booked.
    all_available: bool,

    /// [`Availability`] of every checked item.
    items: Vec<Availability>,
}

/// Checks availability of a single [`Equipment`].
///
/// [`Equipment`]: service::domain::Equipment
#[tracing::instrument(
    skip_all,
    fields(http.handler = "checkAvailability", tenant = %ctx.tenant_id()),
)]
pub async fn check(
    ctx: Context,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<api::Success<Availability>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let quantity = api::parse("quantity", req.quantity, |q| {
        (q > 0).then_some(q)
    })?;

    let availability = ctx
        .service()
        .execute(query::CheckAvailability {
            tenant_id: ctx.tenant_id(),
            equipment_id: req.equipment_id,
            period: api::period(req.start_date, req.end_date)?,
            exclude: req.exclude_reservation_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::Success::new(
        read::availability::ItemAvailability {
            requested: quantity,
            availability,
        }
        .into(),
    ))
}

/// Checks availability of multiple [`Equipment`] at once.
///
/// [`Equipment`]: service::domain::Equipment
#[tracing::instrument(
    skip_all,
    fields(http.handler = "checkBulkAvailability", tenant = %ctx.tenant_id()),
)]
pub async fn check_bulk(
    ctx: Context,
    body: Result<Json<CheckBulkRequest>, JsonRejection>,
) -> Result<api::Success<BulkAvailability>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;

    let bulk = ctx
        .service()
        .execute(query::CheckBulkAvailability {
            tenant_id: ctx.tenant_id(),
            items: api::reservation::requests(req.items)?,
            period: api::period(req.start_date, req.end_date)?,
            exclude: req.exclude_reservation_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::Success::new(BulkAvailability {
        all_available: bulk.all_available(),
        items: bulk.items.into_iter().map(Into::into).collect(),
    }))
}

/// Builds an [`Error`] describing the provided shortages.
#[must_use]
pub fn unavailable(shortages: &[read::availability::ItemAvailability]) -> Error {
    let details = shortages
        .iter()
        .map(|s| {
            format!(
                "`Equipment(id: {})`: {} requested, {} available",
                s.availability.equipment_id,
                s.requested,
                s.availability.available.max(0),
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    Error::new(
        "EQUIPMENT_UNAVAILABLE",
        http::StatusCode::CONFLICT,
        &format!("Requested equipment is not available: {details}"),
    )
}

define_error! {
    enum EquipmentError {
        #[code = "EQUIPMENT_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Requested `Equipment` does not exist"]
        NotExists,
    }
}

impl AsError for query::availability::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EquipmentNotExists(_) => Some(EquipmentError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::{
        domain::{customer, equipment, reservation, Period},
        read::availability::{Availability, Conflict, ItemAvailability},
    };

    use super::unavailable;

    #[test]
    fn describes_shortages() {
        let id = equipment::Id::new();
        let period = Period::new(
            DateTime::from_rfc3339("2025-11-01T00:00:00Z").unwrap(),
            DateTime::from_rfc3339("2025-11-05T00:00:00Z").unwrap(),
        )
        .unwrap();
        let shortage = ItemAvailability {
            requested: 2,
            availability: Availability::new(
                id,
                2,
                vec![Conflict {
                    reservation_id: reservation::Id::new(),
                    number: reservation::Number::new(2025, 1),
                    customer_name: customer::Name::new("Ayşe Yılmaz").unwrap(),
                    period,
                    status: reservation::Status::Confirmed,
                    quantity: 1,
                }],
            ),
        };

        let err = unavailable(&[shortage]);

        assert_eq!(err.code, "EQUIPMENT_UNAVAILABLE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert!(err.message.contains(&format!(
            "`Equipment(id: {id})`: 2 requested, 1 available",
        )));
    }
}
