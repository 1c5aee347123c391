//! Booking lifecycle of a reservation.

mod support;

use std::collections::HashSet;

use common::{operations::Insert, pagination::Arguments, Handler as _};
use futures::future;
use rust_decimal::Decimal;
use service::{
    command::{
        self, create_reservation, ChangeReservationStatus, RecordPayment,
        UpdateReservation,
    },
    domain::{
        equipment,
        notification::Channel,
        reservation::{item, payment, Reason, Reservation, Status},
        tenant, user, Equipment,
    },
    query,
    read::reservation::{list, stats},
};

use self::support::{booking, november, Broken, Recorder};

fn transition(
    r: &Reservation,
    status: Status,
    reason: Option<&str>,
) -> ChangeReservationStatus {
    ChangeReservationStatus {
        tenant_id: r.tenant_id,
        reservation_id: r.id,
        status,
        actor: Some(user::Id::new()),
        reason: reason.and_then(Reason::new),
        notes: None,
    }
}

fn payment(
    r: &Reservation,
    kind: payment::Kind,
    amount: Decimal,
) -> RecordPayment {
    RecordPayment {
        tenant_id: r.tenant_id,
        reservation_id: r.id,
        amount,
        kind,
        method: payment::Method::Card,
        details: payment::Details {
            card_last_four: Some("4242".into()),
            ..payment::Details::default()
        },
        paid_by: None,
        received_by: None,
        notes: None,
    }
}

fn update(r: &Reservation) -> UpdateReservation {
    UpdateReservation {
        tenant_id: r.tenant_id,
        reservation_id: r.id,
        customer: None,
        period: None,
        pickup_time: None,
        return_time: None,
        pickup_location: None,
        return_location: None,
        delivery: None,
        items: None,
        code: None,
        notes: None,
        internal_notes: None,
        special_requests: None,
    }
}

#[tokio::test]
async fn books_refuses_conflicts_and_approves() {
    let (service, db, background) = support::spawn(Broken);
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 2, 100).await;

    let first = service
        .execute(booking(tenant_id, e.id, 2, november(1, 5)))
        .await
        .unwrap();

    assert_eq!(first.status, Status::Pending);
    assert_eq!(first.totals.subtotal, Decimal::from(800));
    assert_eq!(first.totals.total, Decimal::from(960));
    assert_eq!(first.totals.deposit, Decimal::from(288));
    assert_eq!(first.totals.remaining, Decimal::from(672));
    assert_eq!(first.items[0].unit_price, Decimal::from(400));
    assert_eq!(first.number.sequence(), 1);

    let err = service
        .execute(booking(tenant_id, e.id, 1, november(3, 4)))
        .await
        .unwrap_err();
    let create_reservation::ExecutionError::Unavailable(shortages) =
        err.as_ref()
    else {
        panic!("expected unavailability, got: {err}");
    };
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0].availability.available, 0);
    assert_eq!(shortages[0].availability.conflicts[0].reservation_id, first.id);

    let approved = service
        .execute(transition(&first, Status::Confirmed, None))
        .await
        .unwrap();

    assert_eq!(approved.status, Status::Confirmed);
    assert_eq!(approved.previous_status, Some(Status::Pending));
    assert!(approved.approval.is_some());

    // Failed deliveries are only logged.
    drop(service);
    background.await.unwrap();
}

#[tokio::test]
async fn never_overcommits_concurrent_bookings() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 3, 50).await;

    let results = future::join_all((0..10).map(|_| {
        service.execute(booking(tenant_id, e.id, 1, november(10, 12)))
    }))
    .await;

    let booked = results
        .into_iter()
        .filter_map(Result::ok)
        .collect::<Vec<_>>();
    assert_eq!(booked.len(), 3);
    assert!(support::held(&booked, e.id) <= e.quantity);

    let numbers = booked.iter().map(|r| r.number.clone()).collect::<HashSet<_>>();
    assert_eq!(numbers.len(), booked.len());
}

#[tokio::test]
async fn frees_inventory_of_closed_reservations() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 1, 100).await;

    let first = service
        .execute(booking(tenant_id, e.id, 1, november(1, 3)))
        .await
        .unwrap();
    _ = service
        .execute(transition(&first, Status::Cancelled, Some("Changed plans")))
        .await
        .unwrap();

    let second = service
        .execute(booking(tenant_id, e.id, 1, november(2, 4)))
        .await
        .unwrap();
    assert_eq!(second.status, Status::Pending);
    assert_eq!(second.number.sequence(), 2);
}

#[tokio::test]
async fn isolates_tenants() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let (ours, theirs) = (tenant::Id::new(), tenant::Id::new());
    let e = support::equipment(&db, ours, 1, 100).await;

    let err = service
        .execute(booking(theirs, e.id, 1, november(1, 3)))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_reservation::ExecutionError::EquipmentNotExists(id) if *id == e.id,
    ));

    let r = service
        .execute(booking(ours, e.id, 1, november(1, 3)))
        .await
        .unwrap();
    let err = service
        .execute(ChangeReservationStatus {
            tenant_id: theirs,
            ..transition(&r, Status::Confirmed, None)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::change_reservation_status::ExecutionError::ReservationNotExists(_),
    ));
}

#[tokio::test]
async fn auto_approves_on_request() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 1, 100).await;
    let creator = user::Id::new();

    let r = service
        .execute(command::CreateReservation {
            auto_approve: true,
            created_by: Some(creator),
            ..booking(tenant_id, e.id, 1, november(1, 3))
        })
        .await
        .unwrap();

    assert_eq!(r.status, Status::Confirmed);
    assert_eq!(r.approval.map(|a| a.by), Some(Some(creator)));

    let history = service
        .execute(query::reservation::History::by(r.id))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from, None);
    assert_eq!(history[0].to, Status::Confirmed);
}

#[tokio::test]
async fn records_status_history() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 1, 100).await;

    let r = service
        .execute(booking(tenant_id, e.id, 1, november(1, 3)))
        .await
        .unwrap();
    for status in [Status::Confirmed, Status::InProgress, Status::Completed] {
        _ = service.execute(transition(&r, status, None)).await.unwrap();
    }

    let err = service
        .execute(transition(&r, Status::Cancelled, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::change_reservation_status::ExecutionError::IllegalTransition(
            _
        ),
    ));

    let details = service
        .execute(query::reservation::Details {
            tenant_id,
            reservation_id: r.id,
        })
        .await
        .unwrap();
    assert_eq!(details.reservation.status, Status::Completed);
    // Newest first.
    assert_eq!(
        details.history.iter().map(|h| h.to).collect::<Vec<_>>(),
        [
            Status::Completed,
            Status::InProgress,
            Status::Confirmed,
            Status::Pending,
        ],
    );
    assert_eq!(
        details.history.iter().map(|h| h.from).collect::<Vec<_>>(),
        [
            Some(Status::InProgress),
            Some(Status::Confirmed),
            Some(Status::Pending),
            None,
        ],
    );
}

#[tokio::test]
async fn requires_reason_for_rejection() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 1, 100).await;
    let r = service
        .execute(booking(tenant_id, e.id, 1, november(1, 3)))
        .await
        .unwrap();

    let err = service
        .execute(transition(&r, Status::Rejected, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::change_reservation_status::ExecutionError::ReasonRequired,
    ));

    let rejected = service
        .execute(transition(&r, Status::Rejected, Some("Out of stock")))
        .await
        .unwrap();
    assert_eq!(rejected.status, Status::Rejected);
    assert_eq!(
        rejected
            .rejection
            .and_then(|r| r.reason)
            .map(|r| r.to_string())
            .as_deref(),
        Some("Out of stock"),
    );
}

#[tokio::test]
async fn settles_payments() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 2, 100).await;
    let r = service
        .execute(booking(tenant_id, e.id, 2, november(1, 5)))
        .await
        .unwrap();

    let err = service
        .execute(payment(&r, payment::Kind::Deposit, Decimal::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::record_payment::ExecutionError::NonPositiveAmount(_),
    ));

    _ = service
        .execute(payment(&r, payment::Kind::Partial, Decimal::from(100)))
        .await
        .unwrap();
    let stored = service
        .execute(query::reservation::ById::by(r.id))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.deposit_payment.is_none());
    assert!(stored.full_payment.is_none());

    _ = service
        .execute(payment(&r, payment::Kind::Full, Decimal::from(960)))
        .await
        .unwrap();
    let details = service
        .execute(query::reservation::Details {
            tenant_id,
            reservation_id: r.id,
        })
        .await
        .unwrap();
    let settled = details.reservation;
    assert_eq!(
        settled.full_payment.map(|s| s.method),
        Some(payment::Method::Card),
    );
    assert!(settled.deposit_payment.is_some());
    assert_eq!(
        details.payments.iter().map(|p| p.kind).collect::<Vec<_>>(),
        [payment::Kind::Full, payment::Kind::Partial],
    );
    assert_eq!(
        details.payments[1].details.card_last_four.as_deref(),
        Some("4242"),
    );
}

#[tokio::test]
async fn rechecks_availability_on_update() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 2, 100).await;

    let first = service
        .execute(booking(tenant_id, e.id, 1, november(1, 5)))
        .await
        .unwrap();
    let second = service
        .execute(booking(tenant_id, e.id, 1, november(3, 7)))
        .await
        .unwrap();

    // Own quantity is not counted as a conflict.
    let moved = service
        .execute(UpdateReservation {
            period: Some(november(2, 6)),
            ..update(&first)
        })
        .await
        .unwrap();
    assert_eq!(moved.period, november(2, 6));
    assert_eq!(moved.totals.subtotal, Decimal::from(400));

    let err = service
        .execute(UpdateReservation {
            items: Some(vec![item::Request {
                equipment_id: e.id,
                quantity: 2,
            }]),
            ..update(&first)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::update_reservation::ExecutionError::Unavailable(_),
    ));

    _ = service
        .execute(transition(&second, Status::Cancelled, None))
        .await
        .unwrap();
    let grown = service
        .execute(UpdateReservation {
            items: Some(vec![item::Request {
                equipment_id: e.id,
                quantity: 2,
            }]),
            ..update(&first)
        })
        .await
        .unwrap();
    assert_eq!(grown.items[0].quantity, 2);
    assert_eq!(grown.totals.subtotal, Decimal::from(800));
    assert_eq!(grown.number, first.number);

    let err = service
        .execute(UpdateReservation {
            period: Some(november(10, 12)),
            ..update(&second)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::update_reservation::ExecutionError::ReservationClosed(
            _,
            Status::Cancelled,
        ),
    ));
}

#[tokio::test]
async fn lists_and_summarizes() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 10, 100).await;

    let confirmed = service
        .execute(booking(tenant_id, e.id, 2, november(1, 5)))
        .await
        .unwrap();
    _ = service
        .execute(transition(&confirmed, Status::Confirmed, None))
        .await
        .unwrap();
    _ = service
        .execute(payment(&confirmed, payment::Kind::Deposit, Decimal::from(288)))
        .await
        .unwrap();
    let pending = service
        .execute(command::CreateReservation {
            customer: service::domain::Customer {
                name: service::domain::customer::Name::new("Mehmet Demir")
                    .unwrap(),
                ..booking(tenant_id, e.id, 1, november(1, 2)).customer
            },
            ..booking(tenant_id, e.id, 1, november(1, 2))
        })
        .await
        .unwrap();
    _ = service
        .execute(booking(tenant::Id::new(), e.id, 1, november(1, 2)))
        .await
        .unwrap_err();

    let page = service
        .execute(query::reservations::List::by(list::Selector {
            arguments: Arguments::new(None, Some(1)).unwrap(),
            filter: list::Filter::new(tenant_id),
        }))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages(), 2);

    let page = service
        .execute(query::reservations::List::by(list::Selector {
            arguments: Arguments::new(None, None).unwrap(),
            filter: list::Filter {
                search: Some("demir".into()),
                ..list::Filter::new(tenant_id)
            },
        }))
        .await
        .unwrap();
    assert_eq!(
        page.items.iter().map(|r| r.id).collect::<Vec<_>>(),
        [pending.id],
    );

    let page = service
        .execute(query::reservations::List::by(list::Selector {
            arguments: Arguments::new(None, None).unwrap(),
            filter: list::Filter {
                status: Some(Status::Confirmed),
                ..list::Filter::new(tenant_id)
            },
        }))
        .await
        .unwrap();
    assert_eq!(
        page.items.iter().map(|r| r.id).collect::<Vec<_>>(),
        [confirmed.id],
    );

    let summary = service
        .execute(query::reservations::Stats::by(stats::Selector {
            tenant_id,
            created_from: None,
            created_until: None,
        }))
        .await
        .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_status.get(&Status::Pending), Some(&1));
    assert_eq!(summary.by_status.get(&Status::Confirmed), Some(&1));
    assert_eq!(summary.revenue, Decimal::from(960));
    assert_eq!(summary.deposits_paid, 1);
    assert_eq!(summary.full_payments, 0);
}

#[tokio::test]
async fn lays_out_timeline() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let scaffold = support::equipment(&db, tenant_id, 3, 100).await;
    let lift = Equipment {
        id: equipment::Id::new(),
        name: "Aerial Lift".into(),
        category: Some("Lifts".into()),
        ..scaffold.clone()
    };
    let ladder = Equipment {
        id: equipment::Id::new(),
        name: "Ladder".into(),
        category: None,
        ..scaffold.clone()
    };
    for e in [&lift, &ladder] {
        db.execute(Insert(e.clone())).await.unwrap();
    }
    _ = support::equipment(&db, tenant::Id::new(), 1, 100).await;

    let late = service
        .execute(booking(tenant_id, scaffold.id, 1, november(10, 12)))
        .await
        .unwrap();
    let early = service
        .execute(booking(tenant_id, scaffold.id, 2, november(1, 5)))
        .await
        .unwrap();
    _ = service
        .execute(booking(tenant_id, lift.id, 1, november(25, 28)))
        .await
        .unwrap();

    let timeline = service
        .execute(query::Timeline {
            tenant_id,
            period: Some(november(1, 21)),
            equipment_ids: vec![],
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(timeline.total_reservations, 2);
    assert_eq!(
        timeline
            .lanes
            .iter()
            .map(|l| l.equipment.id)
            .collect::<Vec<_>>(),
        [lift.id, scaffold.id, ladder.id],
    );
    let lane = &timeline.lanes[1];
    assert_eq!(
        lane.entries
            .iter()
            .map(|e| (e.reservation.id, e.quantity))
            .collect::<Vec<_>>(),
        [(early.id, 2), (late.id, 1)],
    );
    assert_eq!(lane.utilization, Decimal::from(30));
    assert!(timeline.lanes[0].entries.is_empty());
    assert_eq!(timeline.lanes[0].utilization, Decimal::ZERO);

    let timeline = service
        .execute(query::Timeline {
            tenant_id,
            period: Some(november(1, 21)),
            equipment_ids: vec![scaffold.id],
            status: Some(Status::Confirmed),
        })
        .await
        .unwrap();
    assert_eq!(timeline.total_reservations, 0);
    assert_eq!(timeline.lanes.len(), 1);
    assert!(timeline.lanes[0].entries.is_empty());
}

#[tokio::test]
async fn notifies_customers() {
    let notifier = Recorder::default();
    let (service, db, background) = support::spawn(notifier.clone());
    let tenant_id = tenant::Id::new();
    let e = support::equipment(&db, tenant_id, 1, 100).await;

    let r = service
        .execute(booking(tenant_id, e.id, 1, november(1, 3)))
        .await
        .unwrap();
    _ = service
        .execute(transition(&r, Status::Confirmed, None))
        .await
        .unwrap();

    drop(service);
    background.await.unwrap();

    let delivered = notifier.delivered();
    assert_eq!(
        delivered.iter().map(|n| n.channel).collect::<Vec<_>>(),
        [Channel::InApp, Channel::Email, Channel::InApp],
    );
    assert_eq!(
        delivered[2].title,
        format!("Reservation {} Confirmed", r.number),
    );
    assert_eq!(
        delivered[0].metadata.get("reservation_id"),
        Some(&r.id.to_string()),
    );
}
