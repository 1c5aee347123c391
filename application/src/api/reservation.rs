//! [`Reservation`]-related REST API definitions.

use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use common::{Currency, DateTime, Handler as _, Percent};
use futures::TryFutureExt as _;
use http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{
        self, customer,
        equipment::{self, Tier},
        pricing::{discount_code, rule},
        reservation::{
            self, item, payment, Delivery, Location, Note, Reason, Status,
            TimeOfDay,
        },
        user, Customer,
    },
    query,
    read::{
        self,
        reservation::{list, stats},
    },
};

use crate::{api, define_error, AsError, Context, Error};

/// Requested quantity of some [`Equipment`].
///
/// [`Equipment`]: domain::Equipment
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    /// ID of the requested [`Equipment`].
    ///
    /// [`Equipment`]: domain::Equipment
    equipment_id: equipment::Id,

    /// Requested number of units.
    quantity: u32,
}

/// Converts the provided [`ItemInput`]s into [`item::Request`]s.
///
/// # Errors
///
/// If any of the quantities is zero.
pub fn requests(items: Vec<ItemInput>) -> Result<Vec<item::Request>, Error> {
    items
        .into_iter()
        .map(|i| {
            let quantity =
                api::parse("items.quantity", i.quantity, |q| (q > 0).then_some(q))?;
            Ok(item::Request {
                equipment_id: i.equipment_id,
                quantity,
            })
        })
        .collect()
}

/// Body of a [`Reservation`] creation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID of a registered customer, if any.
    customer_id: Option<customer::Id>,

    /// Full name of the customer.
    customer_name: String,

    /// Email of the customer.
    customer_email: String,

    /// Phone of the customer.
    customer_phone: String,

    /// Postal address of the customer.
    customer_address: Option<String>,

    /// Requested items.
    items: Vec<ItemInput>,

    /// Start of the reserved period.
    start_date: DateTime,

    /// End of the reserved period.
    end_date: DateTime,

    /// Pickup time in `HH:MM` format.
    pickup_time: Option<String>,

    /// Return time in `HH:MM` format.
    return_time: Option<String>,

    /// Pickup location.
    pickup_location: Option<String>,

    /// Return location.
    return_location: Option<String>,

    /// Address to deliver the equipment to.
    delivery_address: Option<String>,

    /// Fee charged for the delivery.
    delivery_fee: Option<Decimal>,

    /// Discount code to apply.
    discount_code: Option<String>,

    /// Customer-facing notes.
    notes: Option<String>,

    /// Staff-only notes.
    internal_notes: Option<String>,

    /// Special requests of the customer.
    special_requests: Option<String>,

    /// Indicator whether the reservation should be confirmed right away.
    #[serde(default)]
    auto_approve: bool,
}

impl CreateRequest {
    /// Validates this [`CreateRequest`] into a
    /// [`command::CreateReservation`].
    fn into_command(
        self,
        ctx: &Context,
    ) -> Result<command::CreateReservation, Error> {
        let delivery = delivery(self.delivery_address, self.delivery_fee)?;
        Ok(command::CreateReservation {
            tenant_id: ctx.tenant_id(),
            customer: Customer {
                id: self.customer_id,
                name: api::parse("customerName", self.customer_name, name)?,
                email: api::parse("customerEmail", self.customer_email, email)?,
                phone: api::parse("customerPhone", self.customer_phone, phone)?,
                address: api::parse_opt(
                    "customerAddress",
                    self.customer_address,
                    customer::Address::new,
                )?,
            },
            period: api::period(self.start_date, self.end_date)?,
            pickup_time: api::parse_opt(
                "pickupTime",
                self.pickup_time,
                TimeOfDay::new,
            )?,
            return_time: api::parse_opt(
                "returnTime",
                self.return_time,
                TimeOfDay::new,
            )?,
            pickup_location: api::parse_opt(
                "pickupLocation",
                self.pickup_location,
                Location::new,
            )?,
            return_location: api::parse_opt(
                "returnLocation",
                self.return_location,
                Location::new,
            )?,
            delivery,
            items: requests(self.items)?,
            code: api::parse_opt(
                "discountCode",
                self.discount_code,
                discount_code::Code::new,
            )?,
            notes: api::parse_opt("notes", self.notes, Note::new)?,
            internal_notes: api::parse_opt(
                "internalNotes",
                self.internal_notes,
                Note::new,
            )?,
            special_requests: api::parse_opt(
                "specialRequests",
                self.special_requests,
                Note::new,
            )?,
            auto_approve: self.auto_approve,
            created_by: ctx.user_id(),
        })
    }
}

/// Validates a [`customer::Name`], ignoring surrounding whitespace.
fn name(v: String) -> Option<customer::Name> {
    customer::Name::new(v.trim())
}

/// Validates a [`customer::Email`], ignoring surrounding whitespace.
fn email(v: String) -> Option<customer::Email> {
    customer::Email::new(v.trim())
}

/// Validates a [`customer::Phone`], ignoring surrounding whitespace.
fn phone(v: String) -> Option<customer::Phone> {
    customer::Phone::new(v.trim())
}

/// Validates the provided [`Delivery`] parts.
fn delivery(
    address: Option<String>,
    fee: Option<Decimal>,
) -> Result<Option<Delivery>, Error> {
    let fee = api::parse_opt("deliveryFee", fee, |f| {
        (f >= Decimal::ZERO).then_some(f)
    })?;
    match api::parse_opt("deliveryAddress", address, customer::Address::new)? {
        Some(address) => Ok(Some(Delivery { address, fee })),
        None if fee.is_some() => Err(Error::invalid("deliveryAddress")),
        None => Ok(None),
    }
}

/// Body of a [`Reservation`] update.
///
/// Every missing field is left unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// New full name of the customer.
    customer_name: Option<String>,

    /// New email of the customer.
    customer_email: Option<String>,

    /// New phone of the customer.
    customer_phone: Option<String>,

    /// New postal address of the customer.
    customer_address: Option<String>,

    /// New requested items.
    items: Option<Vec<ItemInput>>,

    /// New start of the reserved period.
    start_date: Option<DateTime>,

    /// New end of the reserved period.
    end_date: Option<DateTime>,

    /// New pickup time in `HH:MM` format.
    pickup_time: Option<String>,

    /// New return time in `HH:MM` format.
    return_time: Option<String>,

    /// New pickup location.
    pickup_location: Option<String>,

    /// New return location.
    return_location: Option<String>,

    /// New delivery address.
    delivery_address: Option<String>,

    /// New delivery fee.
    delivery_fee: Option<Decimal>,

    /// Discount code to apply when repricing.
    discount_code: Option<String>,

    /// New customer-facing notes.
    notes: Option<String>,

    /// New staff-only notes.
    internal_notes: Option<String>,

    /// New special requests of the customer.
    special_requests: Option<String>,
}

impl UpdateRequest {
    /// Indicates whether the current [`domain::Reservation`] is required to
    /// complete this [`UpdateRequest`].
    fn merges(&self) -> bool {
        self.customer_name.is_some()
            || self.customer_email.is_some()
            || self.customer_phone.is_some()
            || self.customer_address.is_some()
            || self.start_date.is_some() != self.end_date.is_some()
            || self.delivery_fee.is_some() && self.delivery_address.is_none()
    }

    /// Validates this [`UpdateRequest`] into a
    /// [`command::UpdateReservation`], completing partial values from the
    /// `current` [`domain::Reservation`].
    fn into_command(
        self,
        ctx: &Context,
        id: reservation::Id,
        current: Option<&domain::Reservation>,
    ) -> Result<command::UpdateReservation, Error> {
        let customer = match current {
            Some(cur)
                if self.customer_name.is_some()
                    || self.customer_email.is_some()
                    || self.customer_phone.is_some()
                    || self.customer_address.is_some() =>
            {
                let cur = cur.customer.clone();
                Some(Customer {
                    id: cur.id,
                    name: api::parse_opt("customerName", self.customer_name, name)?
                        .unwrap_or(cur.name),
                    email: api::parse_opt(
                        "customerEmail",
                        self.customer_email,
                        email,
                    )?
                    .unwrap_or(cur.email),
                    phone: api::parse_opt(
                        "customerPhone",
                        self.customer_phone,
                        phone,
                    )?
                    .unwrap_or(cur.phone),
                    address: api::parse_opt(
                        "customerAddress",
                        self.customer_address,
                        customer::Address::new,
                    )?
                    .or(cur.address),
                })
            }
            Some(_) | None => None,
        };

        let period = match (self.start_date, self.end_date, current) {
            (None, None, _) => None,
            (Some(start), Some(end), _) => Some(api::period(start, end)?),
            (start, end, Some(cur)) => Some(api::period(
                start.unwrap_or_else(|| cur.period.start()),
                end.unwrap_or_else(|| cur.period.end()),
            )?),
            (Some(_), None, None) => return Err(Error::invalid("endDate")),
            (None, Some(_), None) => return Err(Error::invalid("startDate")),
        };

        let delivery = match (self.delivery_address, self.delivery_fee) {
            (None, None) => None,
            (None, fee @ Some(_)) => {
                let address = current
                    .and_then(|r| r.delivery.as_ref())
                    .map(|d| d.address.to_string());
                delivery(address, fee)?
            }
            (address, fee) => delivery(address, fee)?,
        };

        Ok(command::UpdateReservation {
            tenant_id: ctx.tenant_id(),
            reservation_id: id,
            customer,
            period,
            pickup_time: api::parse_opt(
                "pickupTime",
                self.pickup_time,
                TimeOfDay::new,
            )?,
            return_time: api::parse_opt(
                "returnTime",
                self.return_time,
                TimeOfDay::new,
            )?,
            pickup_location: api::parse_opt(
                "pickupLocation",
                self.pickup_location,
                Location::new,
            )?,
            return_location: api::parse_opt(
                "returnLocation",
                self.return_location,
                Location::new,
            )?,
            delivery,
            items: self.items.map(requests).transpose()?,
            code: api::parse_opt(
                "discountCode",
                self.discount_code,
                discount_code::Code::new,
            )?,
            notes: api::parse_opt("notes", self.notes, Note::new)?,
            internal_notes: api::parse_opt(
                "internalNotes",
                self.internal_notes,
                Note::new,
            )?,
            special_requests: api::parse_opt(
                "specialRequests",
                self.special_requests,
                Note::new,
            )?,
        })
    }
}

/// Body of a [`Status`] change.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    /// New [`Status`].
    status: Status,

    /// Reason of the change.
    reason: Option<String>,

    /// Notes on the change.
    notes: Option<String>,
}

/// Body of a shortcut [`Status`] change.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Reason of the change.
    reason: Option<String>,

    /// Notes on the change.
    notes: Option<String>,
}

/// Body of a [`Payment`] recording.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Paid amount.
    amount: Decimal,

    /// Kind of the payment.
    payment_type: payment::Kind,

    /// Method of the payment.
    payment_method: payment::Method,

    /// Last four digits of the paying card.
    card_last_four: Option<String>,

    /// Brand of the paying card.
    card_brand: Option<String>,

    /// Reference of the bank transfer.
    transfer_ref: Option<String>,

    /// Name of the bank.
    bank_name: Option<String>,

    /// Name of the paying party.
    paid_by: Option<String>,

    /// ID of the staff member who received the payment.
    received_by: Option<user::Id>,

    /// Number of the issued receipt.
    receipt_number: Option<String>,

    /// Notes on the payment.
    notes: Option<String>,
}

/// Query parameters of a [`Reservation`]s listing.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// ID of the customer to list reservations of.
    customer_id: Option<customer::Id>,

    /// [`Status`] to list reservations in.
    status: Option<Status>,

    /// Earliest start of the listed reservations.
    start_date: Option<DateTime>,

    /// Latest end of the listed reservations.
    end_date: Option<DateTime>,

    /// Substring to search in the numbers and customer contacts.
    search: Option<String>,

    /// One-based number of the page.
    page: Option<u32>,

    /// Maximum number of reservations on the page.
    limit: Option<u32>,
}

/// Query parameters of the [`Stats`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
    /// Earliest creation moment of the accounted reservations.
    start_date: Option<DateTime>,

    /// Latest creation moment of the accounted reservations.
    end_date: Option<DateTime>,
}

/// Query parameters of a [`Timeline`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineParams {
    /// Start of the covered period, the current month if omitted.
    start_date: Option<DateTime>,

    /// End of the covered period, the current month if omitted.
    end_date: Option<DateTime>,

    /// Comma-separated IDs of the equipment to lay out.
    equipment_ids: Option<String>,

    /// [`Status`] of the laid out reservations.
    status: Option<Status>,
}

/// A booking of some equipment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    id: reservation::Id,
    reservation_number: String,
    status: Status,
    previous_status: Option<Status>,
    customer_id: Option<customer::Id>,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    customer_address: Option<String>,
    start_date: DateTime,
    end_date: DateTime,
    pickup_time: String,
    return_time: String,
    pickup_location: Option<String>,
    return_location: Option<String>,
    delivery_address: Option<String>,
    delivery_fee: Option<Decimal>,
    items: Vec<Item>,
    currency: Currency,
    subtotal: Decimal,
    discount_amount: Decimal,
    discount_code: Option<String>,
    tax_rate: Percent,
    tax_amount: Decimal,
    total_amount: Decimal,
    deposit_amount: Decimal,
    remaining_amount: Decimal,
    approved_by: Option<user::Id>,
    approved_at: Option<DateTime>,
    rejected_by: Option<user::Id>,
    rejected_at: Option<DateTime>,
    rejection_reason: Option<String>,
    deposit_paid: bool,
    deposit_paid_at: Option<DateTime>,
    full_paid: bool,
    full_paid_at: Option<DateTime>,
    payment_method: Option<payment::Method>,
    notes: Option<String>,
    internal_notes: Option<String>,
    special_requests: Option<String>,
    created_by: Option<user::Id>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<domain::Reservation> for Reservation {
    fn from(r: domain::Reservation) -> Self {
        let payment_method = r
            .full_payment
            .or(r.deposit_payment)
            .map(|s| s.method);
        Self {
            id: r.id,
            reservation_number: r.number.to_string(),
            status: r.status,
            previous_status: r.previous_status,
            customer_id: r.customer.id,
            customer_name: r.customer.name.to_string(),
            customer_email: r.customer.email.to_string(),
            customer_phone: r.customer.phone.to_string(),
            customer_address: r.customer.address.as_ref().map(ToString::to_string),
            start_date: r.period.start(),
            end_date: r.period.end(),
            pickup_time: r.pickup_time.to_string(),
            return_time: r.return_time.to_string(),
            pickup_location: r.pickup_location.as_ref().map(ToString::to_string),
            return_location: r.return_location.as_ref().map(ToString::to_string),
            delivery_address: r.delivery.as_ref().map(|d| d.address.to_string()),
            delivery_fee: r.delivery.as_ref().and_then(|d| d.fee),
            items: r.items.into_iter().map(Into::into).collect(),
            currency: r.totals.currency,
            subtotal: r.totals.subtotal,
            discount_amount: r.totals.discount,
            discount_code: r.totals.discount_code.map(|c| c.to_string()),
            tax_rate: r.totals.tax_rate,
            tax_amount: r.totals.tax,
            total_amount: r.totals.total,
            deposit_amount: r.totals.deposit,
            remaining_amount: r.totals.remaining,
            approved_by: r.approval.and_then(|a| a.by),
            approved_at: r.approval.map(|a| a.at.coerce()),
            rejected_by: r.rejection.as_ref().and_then(|v| v.by),
            rejected_at: r.rejection.as_ref().map(|v| v.at.coerce()),
            rejection_reason: r
                .rejection
                .and_then(|v| v.reason)
                .map(|v| v.to_string()),
            deposit_paid: r.deposit_payment.is_some(),
            deposit_paid_at: r.deposit_payment.map(|s| s.at.coerce()),
            full_paid: r.full_payment.is_some(),
            full_paid_at: r.full_payment.map(|s| s.at.coerce()),
            payment_method,
            notes: r.notes.as_ref().map(ToString::to_string),
            internal_notes: r.internal_notes.as_ref().map(ToString::to_string),
            special_requests: r
                .special_requests
                .as_ref()
                .map(ToString::to_string),
            created_by: r.created_by,
            created_at: r.created_at.coerce(),
            updated_at: r.updated_at.coerce(),
        }
    }
}

/// A reserved line item.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    equipment_id: equipment::Id,
    equipment_name: String,
    equipment_code: String,
    quantity: u32,
    unit_price: Decimal,
    pricing_tier: Tier,
    days: u64,
    discount_amount: Decimal,
    subtotal: Decimal,
    total_price: Decimal,
    applied_pricing_rules: Vec<rule::Id>,
}

impl From<reservation::Item> for Item {
    fn from(i: reservation::Item) -> Self {
        Self {
            equipment_id: i.equipment_id,
            equipment_name: i.equipment_name.to_string(),
            equipment_code: i.equipment_code.to_string(),
            quantity: i.quantity,
            unit_price: i.unit_price,
            pricing_tier: i.tier,
            days: i.days,
            discount_amount: i.discount,
            subtotal: i.subtotal,
            total_price: i.total,
            applied_pricing_rules: i.applied_rules,
        }
    }
}

/// A recorded [`Status`] change.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    id: reservation::history::Id,
    from_status: Option<Status>,
    to_status: Status,
    changed_by: Option<user::Id>,
    reason: Option<String>,
    notes: Option<String>,
    changed_at: DateTime,
}

impl From<reservation::HistoryEntry> for HistoryEntry {
    fn from(e: reservation::HistoryEntry) -> Self {
        Self {
            id: e.id,
            from_status: e.from,
            to_status: e.to,
            changed_by: e.actor,
            reason: e.reason.map(|v| v.to_string()),
            notes: e.notes.map(|v| v.to_string()),
            changed_at: e.at.coerce(),
        }
    }
}

/// A recorded payment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    id: payment::Id,
    reservation_id: reservation::Id,
    amount: Decimal,
    payment_type: payment::Kind,
    payment_method: payment::Method,
    card_last_four: Option<String>,
    card_brand: Option<String>,
    transfer_ref: Option<String>,
    bank_name: Option<String>,
    receipt_number: Option<String>,
    paid_by: Option<String>,
    received_by: Option<user::Id>,
    notes: Option<String>,
    status: payment::Status,
    paid_at: DateTime,
}

impl From<reservation::Payment> for Payment {
    fn from(p: reservation::Payment) -> Self {
        let payment::Details {
            card_last_four,
            card_brand,
            transfer_reference,
            bank_name,
            receipt_number,
        } = p.details;
        Self {
            id: p.id,
            reservation_id: p.reservation_id,
            amount: p.amount,
            payment_type: p.kind,
            payment_method: p.method,
            card_last_four,
            card_brand,
            transfer_ref: transfer_reference,
            bank_name,
            receipt_number,
            paid_by: p.paid_by.map(|v| v.to_string()),
            received_by: p.received_by,
            notes: p.notes.map(|v| v.to_string()),
            status: p.status,
            paid_at: p.paid_at.coerce(),
        }
    }
}

/// A [`Reservation`] along with its history and payments.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(flatten)]
    reservation: Reservation,
    status_history: Vec<HistoryEntry>,
    payments: Vec<Payment>,
}

impl From<read::reservation::Details> for Details {
    fn from(d: read::reservation::Details) -> Self {
        Self {
            reservation: d.reservation.into(),
            status_history: d.history.into_iter().map(Into::into).collect(),
            payments: d.payments.into_iter().map(Into::into).collect(),
        }
    }
}

/// A page of [`Reservation`]s.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    reservations: Vec<Reservation>,
    pagination: Pagination,
}

/// Pagination of a [`ListPage`].
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
    total_pages: u64,
}

impl From<list::Page> for ListPage {
    fn from(page: list::Page) -> Self {
        let pagination = Pagination {
            page: page.arguments.page(),
            limit: page.arguments.limit(),
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            reservations: page.items.into_iter().map(Into::into).collect(),
            pagination,
        }
    }
}

/// Summary statistics of [`Reservation`]s.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    total: u64,
    by_status: HashMap<Status, u64>,
    total_revenue: Decimal,
    deposits_paid: u64,
    full_payments: u64,
}

impl From<stats::Stats> for Stats {
    fn from(s: stats::Stats) -> Self {
        Self {
            total: s.total,
            by_status: s.by_status,
            total_revenue: s.revenue,
            deposits_paid: s.deposits_paid,
            full_payments: s.full_payments,
        }
    }
}

/// Reservations laid out per equipment over some period.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    start_date: DateTime,
    end_date: DateTime,
    timeline: Vec<TimelineLane>,
    total_equipment: usize,
    total_reservations: usize,
}

/// Reservations of a single equipment on a [`Timeline`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLane {
    equipment_id: equipment::Id,
    equipment_name: String,
    equipment_code: String,
    equipment_category: Option<String>,
    total_quantity: u32,
    reservations: Vec<TimelineEntry>,
    reservation_count: usize,
    utilization: Decimal,
}

/// Reservation placed on a [`TimelineLane`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    id: reservation::Id,
    reservation_number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    start_date: DateTime,
    end_date: DateTime,
    status: Status,
    quantity: u32,
    total_amount: Decimal,
    deposit_paid: bool,
    full_payment: bool,
    notes: Option<String>,
}

impl From<read::Timeline> for Timeline {
    fn from(t: read::Timeline) -> Self {
        let lanes = t
            .lanes
            .into_iter()
            .map(|lane| TimelineLane {
                equipment_id: lane.equipment.id,
                equipment_name: lane.equipment.name.to_string(),
                equipment_code: lane.equipment.code.to_string(),
                equipment_category: lane
                    .equipment
                    .category
                    .map(|c| c.to_string()),
                total_quantity: lane.equipment.quantity,
                reservation_count: lane.entries.len(),
                reservations: lane
                    .entries
                    .into_iter()
                    .map(|e| {
                        let r = e.reservation;
                        TimelineEntry {
                            id: r.id,
                            reservation_number: r.number.to_string(),
                            customer_name: r.customer.name.to_string(),
                            customer_email: r.customer.email.to_string(),
                            customer_phone: r.customer.phone.to_string(),
                            start_date: r.period.start(),
                            end_date: r.period.end(),
                            status: r.status,
                            quantity: e.quantity,
                            total_amount: r.totals.total,
                            deposit_paid: r.deposit_payment.is_some(),
                            full_payment: r.full_payment.is_some(),
                            notes: r.notes.map(|n| n.to_string()),
                        }
                    })
                    .collect(),
                utilization: lane.utilization,
            })
            .collect::<Vec<_>>();
        Self {
            start_date: t.period.start(),
            end_date: t.period.end(),
            total_equipment: lanes.len(),
            timeline: lanes,
            total_reservations: t.total_reservations,
        }
    }
}

/// Creates a new [`Reservation`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - some field is missing or invalid;
/// - `INVALID_DATE_RANGE` - end date doesn't follow the start date;
/// - `EQUIPMENT_NOT_FOUND` - requested equipment doesn't exist;
/// - `EQUIPMENT_UNAVAILABLE` - requested equipment is already booked.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "createReservation", tenant = %ctx.tenant_id()),
)]
pub async fn create(
    ctx: Context,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, api::Success<Reservation>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = req.into_command(&ctx)?;

    let reservation = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((
        StatusCode::CREATED,
        api::Success::new(reservation.into())
            .with_message("Reservation created successfully"),
    ))
}

/// Lists [`Reservation`]s page by page, the most recent first.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "listReservations", tenant = %ctx.tenant_id()),
)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<api::Success<ListPage>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    let arguments = common::pagination::Arguments::new(params.page, params.limit)
        .ok_or(api::PaginationError::Invalid)?;
    let selector = list::Selector {
        arguments,
        filter: list::Filter {
            tenant_id: ctx.tenant_id(),
            customer_id: params.customer_id,
            status: params.status,
            starts_from: params.start_date,
            ends_until: params.end_date,
            search: params
                .search
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
        },
    };

    ctx.service()
        .execute(query::reservations::List::by(selector))
        .await
        .map_err(AsError::into_error)
        .map(|page| api::Success::new(page.into()))
}

/// Summarizes [`Reservation`]s created over the requested period.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "reservationStats", tenant = %ctx.tenant_id()),
)]
pub async fn stats(
    ctx: Context,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<api::Success<Stats>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    ctx.service()
        .execute(query::reservations::Stats::by(stats::Selector {
            tenant_id: ctx.tenant_id(),
            created_from: params.start_date,
            created_until: params.end_date,
        }))
        .await
        .map_err(AsError::into_error)
        .map(|s| api::Success::new(s.into()))
}

/// Lays out [`Reservation`]s per equipment over the requested period.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - some equipment ID is invalid, or only one of the
///                     dates is provided;
/// - `INVALID_DATE_RANGE` - end date doesn't follow the start date.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "reservationTimeline", tenant = %ctx.tenant_id()),
)]
pub async fn timeline(
    ctx: Context,
    params: Result<Query<TimelineParams>, QueryRejection>,
) -> Result<api::Success<Timeline>, Error> {
    let Query(params) = params.map_err(AsError::into_error)?;

    let period = match (params.start_date, params.end_date) {
        (None, None) => None,
        (Some(start), Some(end)) => Some(api::period(start, end)?),
        (Some(_), None) => return Err(Error::invalid("endDate")),
        (None, Some(_)) => return Err(Error::invalid("startDate")),
    };
    let equipment_ids = params
        .equipment_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| id.parse().map_err(|_| Error::invalid("equipmentIds")))
        .collect::<Result<Vec<equipment::Id>, _>>()?;

    ctx.service()
        .execute(query::Timeline {
            tenant_id: ctx.tenant_id(),
            period,
            equipment_ids,
            status: params.status,
        })
        .await
        .map_err(AsError::into_error)
        .map(|t| api::Success::new(t.into()))
}

/// Returns a [`Reservation`] along with its history and payments.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "reservation", tenant = %ctx.tenant_id()),
)]
pub async fn details(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
) -> Result<api::Success<Details>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(query::reservation::Details {
            tenant_id: ctx.tenant_id(),
            reservation_id: id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|d| api::Success::new(d.into()))
}

/// Updates a [`Reservation`].
///
/// Changing dates or items re-checks availability and reprices the
/// [`Reservation`].
///
/// # Errors
///
/// Possible error codes:
/// - `RESERVATION_NOT_FOUND` - reservation doesn't exist;
/// - `RESERVATION_CLOSED` - reservation no longer holds equipment, so cannot
///                          be rebooked;
/// - `EQUIPMENT_UNAVAILABLE` - requested equipment is already booked.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "updateReservation", tenant = %ctx.tenant_id()),
)]
pub async fn update(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<api::Success<Reservation>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    let current = if req.merges() {
        let tenant_id = ctx.tenant_id();
        Some(
            ctx.service()
                .execute(query::reservation::ById::by(id))
                .map_err(AsError::into_error)
                .await?
                .filter(|r| r.tenant_id == tenant_id)
                .ok_or(ReservationError::NotExists)?,
        )
    } else {
        None
    };
    let cmd = req.into_command(&ctx, id, current.as_ref())?;

    ctx.service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)
        .map(|r| {
            api::Success::new(r.into())
                .with_message("Reservation updated successfully")
        })
}

/// Changes [`Status`] of a [`Reservation`].
///
/// # Errors
///
/// Possible error codes:
/// - `RESERVATION_NOT_FOUND` - reservation doesn't exist;
/// - `ILLEGAL_TRANSITION` - reservation cannot move to the requested status;
/// - `REASON_REQUIRED` - rejection requires a reason.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "changeReservationStatus", tenant = %ctx.tenant_id()),
)]
pub async fn change_status(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<api::Success<Reservation>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    transition(
        &ctx,
        id,
        req.status,
        TransitionRequest {
            reason: req.reason,
            notes: req.notes,
        },
    )
    .await
}

/// Confirms a pending [`Reservation`].
#[tracing::instrument(
    skip_all,
    fields(http.handler = "approveReservation", tenant = %ctx.tenant_id()),
)]
pub async fn approve(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Option<Json<TransitionRequest>>,
) -> Result<api::Success<Reservation>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let req = body.map(|Json(r)| r).unwrap_or_default();

    transition(&ctx, id, Status::Confirmed, req).await
}

/// Rejects a pending [`Reservation`] for the provided reason.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "rejectReservation", tenant = %ctx.tenant_id()),
)]
pub async fn reject(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<api::Success<Reservation>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    transition(&ctx, id, Status::Rejected, req).await
}

/// Cancels a [`Reservation`].
#[tracing::instrument(
    skip_all,
    fields(http.handler = "cancelReservation", tenant = %ctx.tenant_id()),
)]
pub async fn cancel(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Option<Json<TransitionRequest>>,
) -> Result<api::Success<Reservation>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let req = body.map(|Json(r)| r).unwrap_or_default();

    transition(&ctx, id, Status::Cancelled, req).await
}

/// Executes a [`command::ChangeReservationStatus`].
async fn transition(
    ctx: &Context,
    id: reservation::Id,
    status: Status,
    req: TransitionRequest,
) -> Result<api::Success<Reservation>, Error> {
    let cmd = command::ChangeReservationStatus {
        tenant_id: ctx.tenant_id(),
        reservation_id: id,
        status,
        actor: ctx.user_id(),
        reason: api::parse_opt("reason", req.reason, Reason::new)?,
        notes: api::parse_opt("notes", req.notes, Note::new)?,
    };

    ctx.service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)
        .map(|r| {
            api::Success::new(r.into())
                .with_message("Reservation status updated successfully")
        })
}

/// Records a payment against a [`Reservation`].
///
/// # Errors
///
/// Possible error codes:
/// - `RESERVATION_NOT_FOUND` - reservation doesn't exist;
/// - `NON_POSITIVE_AMOUNT` - paid amount is not positive.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "recordPayment", tenant = %ctx.tenant_id()),
)]
pub async fn record_payment(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, api::Success<Payment>), Error> {
    let Path(id) = id.map_err(AsError::into_error)?;
    let Json(req) = body.map_err(AsError::into_error)?;

    let cmd = command::RecordPayment {
        tenant_id: ctx.tenant_id(),
        reservation_id: id,
        amount: req.amount,
        kind: req.payment_type,
        method: req.payment_method,
        details: payment::Details {
            card_last_four: req.card_last_four,
            card_brand: req.card_brand,
            transfer_reference: req.transfer_ref,
            bank_name: req.bank_name,
            receipt_number: req.receipt_number,
        },
        paid_by: api::parse_opt("paidBy", req.paid_by, payment::Party::new)?,
        received_by: req.received_by.or(ctx.user_id()),
        notes: api::parse_opt("notes", req.notes, Note::new)?,
    };

    let payment = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((
        StatusCode::CREATED,
        api::Success::new(payment.into())
            .with_message("Payment recorded successfully"),
    ))
}

/// Lists payments of a [`Reservation`], the most recent first.
#[tracing::instrument(
    skip_all,
    fields(http.handler = "reservationPayments", tenant = %ctx.tenant_id()),
)]
pub async fn payments(
    ctx: Context,
    id: Result<Path<reservation::Id>, PathRejection>,
) -> Result<api::Success<Vec<Payment>>, Error> {
    let Path(id) = id.map_err(AsError::into_error)?;

    ctx.service()
        .execute(query::reservation::Details {
            tenant_id: ctx.tenant_id(),
            reservation_id: id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|d| {
            api::Success::new(d.payments.into_iter().map(Into::into).collect())
        })
}

define_error! {
    enum ReservationError {
        #[code = "RESERVATION_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` does not exist"]
        NotExists,
    }
}

impl AsError for command::create_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::pricing::ItemsError;

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateEquipment(_) => {
                Some(ItemsError::DuplicateEquipment.into())
            }
            Self::EquipmentNotExists(_) => {
                Some(api::availability::EquipmentError::NotExists.into())
            }
            Self::MixedCurrencies => Some(ItemsError::MixedCurrencies.into()),
            Self::NoItems => Some(ItemsError::NoItems.into()),
            Self::Unavailable(shortages) => {
                Some(api::availability::unavailable(shortages))
            }
            Self::ZeroQuantity(_) => Some(ItemsError::ZeroQuantity.into()),
        }
    }
}

impl AsError for command::update_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::pricing::ItemsError;

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateEquipment(_) => {
                Some(ItemsError::DuplicateEquipment.into())
            }
            Self::EquipmentNotExists(_) => {
                Some(api::availability::EquipmentError::NotExists.into())
            }
            Self::MixedCurrencies => Some(ItemsError::MixedCurrencies.into()),
            Self::NoItems => Some(ItemsError::NoItems.into()),
            Self::ReservationClosed(..) => Some(Error::new(
                "RESERVATION_CLOSED",
                StatusCode::CONFLICT,
                self,
            )),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
            Self::Unavailable(shortages) => {
                Some(api::availability::unavailable(shortages))
            }
            Self::ZeroQuantity(_) => Some(ItemsError::ZeroQuantity.into()),
        }
    }
}

impl AsError for command::change_reservation_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "REASON_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "Rejection requires a `reason`"]
                ReasonRequired,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::IllegalTransition(e) => Some(crate::Error::new(
                "ILLEGAL_TRANSITION",
                StatusCode::CONFLICT,
                e,
            )),
            Self::ReasonRequired => Some(Error::ReasonRequired.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
        }
    }
}

impl AsError for command::record_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NON_POSITIVE_AMOUNT"]
                #[status = BAD_REQUEST]
                #[message = "Payment `amount` must be positive"]
                NonPositiveAmount,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NonPositiveAmount(_) => Some(Error::NonPositiveAmount.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
        }
    }
}

impl AsError for query::reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::domain::reservation;

    use super::{delivery, requests, ItemInput, UpdateRequest};

    #[test]
    fn rejects_zero_quantities() {
        let items: Vec<ItemInput> = serde_json::from_str(
            r#"[{"equipmentId":"7e7f1f52-2b0b-4a8e-9d3c-0c6a7b7a1e11","quantity":0}]"#,
        )
        .unwrap();

        let err = requests(items).unwrap_err();

        assert_eq!(err.code, "INVALID_INPUT");
        assert!(err.message.contains("`items.quantity`"));
    }

    #[test]
    fn delivery_fee_requires_address() {
        assert!(delivery(None, None).unwrap().is_none());
        assert!(delivery(None, Some(10.into())).is_err());
        assert!(delivery(Some("Kadıköy, İstanbul".into()), Some((-1).into()))
            .is_err());

        let d = delivery(Some("Kadıköy, İstanbul".into()), Some(150.into()))
            .unwrap()
            .unwrap();
        assert_eq!(d.fee, Some(150.into()));
    }

    #[test]
    fn merges_only_partial_updates() {
        let at = |s| DateTime::from_rfc3339(s).unwrap();

        assert!(!UpdateRequest::default().merges());
        assert!(!UpdateRequest {
            start_date: Some(at("2025-11-01T00:00:00Z")),
            end_date: Some(at("2025-11-05T00:00:00Z")),
            ..UpdateRequest::default()
        }
        .merges());
        assert!(UpdateRequest {
            end_date: Some(at("2025-11-05T00:00:00Z")),
            ..UpdateRequest::default()
        }
        .merges());
        assert!(UpdateRequest {
            customer_phone: Some("+90 555 000 00 00".into()),
            ..UpdateRequest::default()
        }
        .merges());
    }

    #[test]
    fn parses_payment_kinds() {
        let kind: reservation::payment::Kind =
            serde_json::from_str(r#""DEPOSIT""#).unwrap();

        assert_eq!(kind, reservation::payment::Kind::Deposit);
    }
}
