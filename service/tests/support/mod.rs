//! Fixtures shared by the [`Service`] integration tests.

#![allow(dead_code, reason = "not every test uses every fixture")]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{
    operations::{Deliver, Insert},
    Currency, DateTime, Handler as _,
};
use rust_decimal::Decimal;
use service::{
    command::CreateReservation,
    domain::{
        customer, equipment,
        reservation::{item, Reservation},
        tenant, Customer, Equipment, Notification, Period,
    },
    infra::{notifier, Memory, Notifier},
    task, Config, Service,
};
use tracerr::Traced;

/// [`Notifier`] remembering every delivered [`Notification`].
#[derive(Clone, Debug, Default)]
pub struct Recorder(Arc<Mutex<Vec<Notification>>>);

impl Recorder {
    /// Returns all the [`Notification`]s delivered so far.
    pub fn delivered(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier<Deliver<Notification>> for Recorder {
    type Ok = ();
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Deliver(notification): Deliver<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.lock().unwrap().push(notification);
        Ok(())
    }
}

/// [`Notifier`] failing every delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct Broken;

impl Notifier<Deliver<Notification>> for Broken {
    type Ok = ();
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        _: Deliver<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        Err(tracerr::new!(notifier::Error::Delivery("SMTP is down".into())))
    }
}

/// [`Config`] retrying failed deliveries without any delay.
pub fn config() -> Config {
    Config {
        notifications: task::dispatch_notifications::Config {
            retries: 1,
            retry_delay: Duration::ZERO,
        },
        ..Config::default()
    }
}

/// Spawns a new [`Service`] upon an empty [`Memory`] database.
pub fn spawn<N>(notifier: N) -> (Service<Memory>, Memory, task::Background)
where
    task::DispatchNotifications<N>: service::Task<
            common::operations::Start<notifier::Inbox>,
            Ok = (),
            Err = std::convert::Infallible,
        > + 'static,
{
    let db = Memory::new();
    let (service, background) = Service::new(config(), db.clone(), notifier);
    (service, db, background)
}

/// Stores new [`Equipment`] of the provided `tenant_id`.
pub async fn equipment(
    db: &Memory,
    tenant_id: tenant::Id,
    quantity: u32,
    daily: u32,
) -> Equipment {
    let e = Equipment {
        id: equipment::Id::new(),
        tenant_id,
        name: "Scaffold Tower".into(),
        code: "SC-01".into(),
        category: Some("Scaffolding".into()),
        quantity,
        rates: equipment::Rates {
            currency: Currency::Try,
            hourly: None,
            daily: Some(Decimal::from(daily)),
            weekly: None,
            monthly: None,
        },
    };
    db.execute(Insert(e.clone())).await.unwrap();
    e
}

/// Parses the provided RFC 3339 `input`.
pub fn at(input: &str) -> DateTime {
    DateTime::from_rfc3339(input).unwrap()
}

/// Creates a new [`Period`] between the provided days of November 2025.
pub fn november(from: u8, to: u8) -> Period {
    Period::new(
        at(&format!("2025-11-{from:02}T00:00:00Z")),
        at(&format!("2025-11-{to:02}T00:00:00Z")),
    )
    .unwrap()
}

/// Builds a [`CreateReservation`] of a single [`Equipment`].
pub fn booking(
    tenant_id: tenant::Id,
    equipment_id: equipment::Id,
    quantity: u32,
    period: Period,
) -> CreateReservation {
    CreateReservation {
        tenant_id,
        customer: Customer {
            id: Some(customer::Id::new()),
            name: customer::Name::new("Ayşe Yılmaz").unwrap(),
            email: customer::Email::new("ayse@example.com").unwrap(),
            phone: customer::Phone::new("+905551234567").unwrap(),
            address: None,
        },
        period,
        pickup_time: None,
        return_time: None,
        pickup_location: None,
        return_location: None,
        delivery: None,
        items: vec![item::Request {
            equipment_id,
            quantity,
        }],
        code: None,
        notes: None,
        internal_notes: None,
        special_requests: None,
        auto_approve: false,
        created_by: None,
    }
}

/// Returns the overall quantity of [`Equipment`] held by the provided
/// [`Reservation`]s.
pub fn held(reservations: &[Reservation], equipment_id: equipment::Id) -> u32 {
    reservations
        .iter()
        .filter(|r| r.status.holds_inventory())
        .flat_map(|r| &r.items)
        .filter(|i| i.equipment_id == equipment_id)
        .map(|i| i.quantity)
        .sum()
}
