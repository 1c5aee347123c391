//! Quoting, discounting and availability checks.

mod support;

use common::{
    operations::{By, Insert, Select},
    DateTime, Handler as _, Percent,
};
use rust_decimal::Decimal;
use service::{
    command::{
        self, CreateDiscountCode, CreatePricingRule, DeletePricingRule,
        UpdatePricingRule,
    },
    domain::{
        equipment,
        pricing::{
            discount_code::{self, Rejection, Scope},
            rule, Bounds, Usage,
        },
        reservation::{item, Status},
        tenant, DiscountCode, Equipment, Period, PricingRule,
    },
    infra::Memory,
    query::{self, pricing::Validity},
    read::pricing::codes,
    Service,
};

use self::support::{booking, november, Recorder};

fn always() -> Period {
    Period::new(
        support::at("2020-01-01T00:00:00Z"),
        support::at("2100-01-01T00:00:00Z"),
    )
    .unwrap()
}

fn long_rental_rule(e: &Equipment) -> CreatePricingRule {
    CreatePricingRule {
        tenant_id: e.tenant_id,
        equipment_id: e.id,
        name: rule::Name::new("Long rental").unwrap(),
        kind: rule::Kind::Duration,
        duration: Bounds {
            min: Some(3),
            max: None,
        },
        quantity: Bounds::default(),
        discount: rule::Discount::Percentage(
            Percent::new(Decimal::from(10)).unwrap(),
        ),
        priority: 0,
        validity: None,
        max_usage: Some(1),
    }
}

fn fixed_code(code: &str, amount: u32) -> CreateDiscountCode {
    CreateDiscountCode {
        code: discount_code::Code::new(code).unwrap(),
        discount: discount_code::Discount::FixedAmount(Decimal::from(amount)),
        min_order_amount: None,
        scope: Scope::All,
        validity: always(),
        max_usage: Some(1),
    }
}

async fn rule_usage(db: &Memory, id: rule::Id) -> u32 {
    db.execute(Select(By::<Option<PricingRule>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
        .usage
        .current
}

async fn code_usage(db: &Memory, code: &discount_code::Code) -> u32 {
    db.execute(Select(By::<Option<DiscountCode>, _>::new(code.clone())))
        .await
        .unwrap()
        .unwrap()
        .usage
        .current
}

fn untouched(e: &Equipment, rule_id: rule::Id) -> UpdatePricingRule {
    UpdatePricingRule {
        tenant_id: e.tenant_id,
        rule_id,
        name: None,
        kind: None,
        min_duration: None,
        max_duration: None,
        min_quantity: None,
        max_quantity: None,
        discount_kind: None,
        discount_value: None,
        priority: None,
        validity: None,
        max_usage: None,
        is_active: None,
    }
}

async fn listed_codes(
    service: &Service<Memory>,
    filter: codes::Filter,
) -> Vec<discount_code::Id> {
    service
        .execute(query::pricing::ListDiscountCodes::by(filter))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect()
}

fn quote_of(
    e: &Equipment,
    quantity: u32,
    code: Option<&discount_code::Code>,
) -> query::QuoteReservation {
    query::QuoteReservation {
        tenant_id: e.tenant_id,
        items: vec![item::Request {
            equipment_id: e.id,
            quantity,
        }],
        period: november(1, 5),
        code: code.cloned(),
    }
}

#[tokio::test]
async fn quotes_without_consuming_usage() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;
    let rule = service.execute(long_rental_rule(&e)).await.unwrap();
    let code = service
        .execute(fixed_code("welcome50", 50))
        .await
        .unwrap()
        .code;
    assert_eq!(code.to_string(), "WELCOME50");

    let quote = service.execute(quote_of(&e, 2, Some(&code))).await.unwrap();
    let again = service.execute(quote_of(&e, 2, Some(&code))).await.unwrap();

    assert_eq!(quote, again);
    assert_eq!(quote.subtotal, Decimal::from(800));
    assert_eq!(quote.items[0].total_discount, Decimal::from(80));
    assert_eq!(quote.code.as_ref().map(|c| c.amount), Some(Decimal::from(50)));
    assert_eq!(quote.discount, Decimal::from(130));
    assert_eq!(quote.tax, Decimal::from(134));
    assert_eq!(quote.total, Decimal::from(804));
    assert_eq!(quote.deposit, Decimal::new(2412, 1));
    assert_eq!(quote.remaining, Decimal::new(5628, 1));
    assert_eq!(rule_usage(&db, rule.id).await, 0);
    assert_eq!(code_usage(&db, &code).await, 0);

    let r = service
        .execute(command::CreateReservation {
            code: Some(code.clone()),
            ..booking(e.tenant_id, e.id, 2, november(1, 5))
        })
        .await
        .unwrap();

    assert_eq!(r.totals.total, Decimal::from(804));
    assert_eq!(r.totals.discount_code.as_ref(), Some(&code));
    assert_eq!(r.items[0].discount, Decimal::from(80));
    assert_eq!(rule_usage(&db, rule.id).await, 1);
    assert_eq!(code_usage(&db, &code).await, 1);

    // Both are exhausted now.
    let quote = service.execute(quote_of(&e, 2, Some(&code))).await.unwrap();
    assert_eq!(quote.discount, Decimal::ZERO);
    assert!(quote.code.is_none());
    assert_eq!(quote.total, Decimal::from(960));
}

#[tokio::test]
async fn reprices_without_recounting_same_code() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;
    let code = service
        .execute(CreateDiscountCode {
            max_usage: Some(5),
            ..fixed_code("SPRING", 20)
        })
        .await
        .unwrap()
        .code;

    let r = service
        .execute(command::CreateReservation {
            code: Some(code.clone()),
            ..booking(e.tenant_id, e.id, 1, november(1, 5))
        })
        .await
        .unwrap();
    assert_eq!(code_usage(&db, &code).await, 1);

    let updated = service
        .execute(command::UpdateReservation {
            tenant_id: e.tenant_id,
            reservation_id: r.id,
            customer: None,
            period: None,
            pickup_time: None,
            return_time: None,
            pickup_location: None,
            return_location: None,
            delivery: None,
            items: Some(vec![item::Request {
                equipment_id: e.id,
                quantity: 3,
            }]),
            code: None,
            notes: None,
            internal_notes: None,
            special_requests: None,
        })
        .await
        .unwrap();

    assert_eq!(updated.totals.subtotal, Decimal::from(1200));
    assert_eq!(updated.totals.discount, Decimal::from(20));
    assert_eq!(updated.totals.discount_code.as_ref(), Some(&code));
    assert_eq!(code_usage(&db, &code).await, 1);
}

#[tokio::test]
async fn keeps_own_exhausted_discounts_when_repricing() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;
    let rule = service.execute(long_rental_rule(&e)).await.unwrap();
    let code = service
        .execute(fixed_code("ONCE", 20))
        .await
        .unwrap()
        .code;

    let r = service
        .execute(command::CreateReservation {
            code: Some(code.clone()),
            ..booking(e.tenant_id, e.id, 1, november(1, 5))
        })
        .await
        .unwrap();
    assert_eq!(r.totals.discount, Decimal::from(60));
    assert_eq!(r.items[0].applied_rules, vec![rule.id]);
    assert_eq!(rule_usage(&db, rule.id).await, 1);
    assert_eq!(code_usage(&db, &code).await, 1);

    let updated = service
        .execute(command::UpdateReservation {
            tenant_id: e.tenant_id,
            reservation_id: r.id,
            items: Some(vec![item::Request {
                equipment_id: e.id,
                quantity: 2,
            }]),
            ..command::UpdateReservation::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.totals.subtotal, Decimal::from(800));
    assert_eq!(updated.totals.discount, Decimal::from(100));
    assert_eq!(updated.totals.discount_code.as_ref(), Some(&code));
    assert_eq!(updated.items[0].applied_rules, vec![rule.id]);
    assert_eq!(rule_usage(&db, rule.id).await, 1);
    assert_eq!(code_usage(&db, &code).await, 1);

    let moved = service
        .execute(command::UpdateReservation {
            tenant_id: e.tenant_id,
            reservation_id: r.id,
            period: Some(november(2, 6)),
            ..command::UpdateReservation::default()
        })
        .await
        .unwrap();
    assert_eq!(moved.totals.discount, Decimal::from(100));
    assert_eq!(rule_usage(&db, rule.id).await, 1);

    let other = service
        .execute(quote_of(&e, 2, Some(&code)))
        .await
        .unwrap();
    assert_eq!(other.discount, Decimal::ZERO);
}

#[tokio::test]
async fn prices_single_equipment() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;
    let rule = service
        .execute(CreatePricingRule {
            kind: rule::Kind::SpecialRate,
            discount: rule::Discount::SpecialRate(Decimal::from(150)),
            max_usage: None,
            ..long_rental_rule(&e)
        })
        .await
        .unwrap();

    let breakdown = service
        .execute(query::CalculatePrice {
            tenant_id: e.tenant_id,
            item: item::Request {
                equipment_id: e.id,
                quantity: 2,
            },
            period: november(1, 5),
            code: None,
        })
        .await
        .unwrap();

    // A special rate above the base one never raises the price.
    assert_eq!(breakdown.days, 4);
    assert_eq!(breakdown.subtotal, Decimal::from(800));
    assert_eq!(breakdown.total_discount, Decimal::ZERO);
    assert_eq!(breakdown.final_price, Decimal::from(800));
    assert_eq!(breakdown.price_per_day, Decimal::from(200));

    _ = service
        .execute(command::SetPricingRuleActive {
            tenant_id: e.tenant_id,
            rule_id: rule.id,
            is_active: false,
        })
        .await
        .unwrap();
    let discounted = service
        .execute(CreatePricingRule {
            kind: rule::Kind::SpecialRate,
            discount: rule::Discount::SpecialRate(Decimal::from(75)),
            max_usage: None,
            ..long_rental_rule(&e)
        })
        .await
        .unwrap();

    let breakdown = service
        .execute(query::CalculatePrice {
            tenant_id: e.tenant_id,
            item: item::Request {
                equipment_id: e.id,
                quantity: 2,
            },
            period: november(1, 5),
            code: None,
        })
        .await
        .unwrap();
    assert_eq!(breakdown.total_discount, Decimal::from(200));
    assert_eq!(breakdown.final_price, Decimal::from(600));
    assert_eq!(breakdown.discounts.len(), 1);
    assert_eq!(
        breakdown.discounts[0].source,
        service::domain::pricing::quote::Source::Rule(discounted.id),
    );
}

#[tokio::test]
async fn refuses_invalid_rules() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;

    let err = service
        .execute(CreatePricingRule {
            duration: Bounds {
                min: Some(7),
                max: Some(3),
            },
            ..long_rental_rule(&e)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::create_pricing_rule::ExecutionError::InvertedBounds(7, 3),
    ));

    let err = service
        .execute(CreatePricingRule {
            tenant_id: tenant::Id::new(),
            ..long_rental_rule(&e)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::create_pricing_rule::ExecutionError::EquipmentNotExists(_),
    ));

    let err = service
        .execute(command::SetPricingRuleActive {
            tenant_id: e.tenant_id,
            rule_id: rule::Id::new(),
            is_active: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::set_pricing_rule_active::ExecutionError::RuleNotExists(_),
    ));
}

#[tokio::test]
async fn manages_pricing_rules() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;
    let long = service.execute(long_rental_rule(&e)).await.unwrap();
    let bulk = service
        .execute(CreatePricingRule {
            name: rule::Name::new("Bulk").unwrap(),
            kind: rule::Kind::Quantity,
            duration: Bounds::default(),
            quantity: Bounds {
                min: Some(3),
                max: None,
            },
            priority: 10,
            ..long_rental_rule(&e)
        })
        .await
        .unwrap();
    _ = service
        .execute(command::SetPricingRuleActive {
            tenant_id: e.tenant_id,
            rule_id: bulk.id,
            is_active: false,
        })
        .await
        .unwrap();
    _ = service
        .execute(booking(e.tenant_id, e.id, 1, november(1, 5)))
        .await
        .unwrap();

    let listed = service
        .execute(query::ListPricingRules {
            tenant_id: e.tenant_id,
            equipment_id: e.id,
        })
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|r| (r.id, r.is_active)).collect::<Vec<_>>(),
        [(bulk.id, false), (long.id, true)],
    );

    let updated = service
        .execute(UpdatePricingRule {
            max_duration: Some(Some(30)),
            discount_value: Some(Decimal::from(15)),
            priority: Some(20),
            max_usage: Some(None),
            ..untouched(&e, long.id)
        })
        .await
        .unwrap();
    assert_eq!(updated.name, long.name);
    assert_eq!(
        updated.duration,
        Bounds {
            min: Some(3),
            max: Some(30),
        },
    );
    assert_eq!(
        updated.discount,
        rule::Discount::Percentage(Percent::new(Decimal::from(15)).unwrap()),
    );
    assert_eq!(updated.priority, 20);
    assert_eq!(
        updated.usage,
        Usage {
            current: 1,
            max: None,
        },
    );
    assert_eq!(rule_usage(&db, long.id).await, 1);

    let err = service
        .execute(UpdatePricingRule {
            min_duration: Some(Some(40)),
            ..untouched(&e, long.id)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::update_pricing_rule::ExecutionError::InvertedBounds(40, 30),
    ));

    let err = service
        .execute(UpdatePricingRule {
            discount_value: Some(Decimal::from(150)),
            ..untouched(&e, long.id)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::update_pricing_rule::ExecutionError::InvalidDiscount(..),
    ));

    let err = service
        .execute(UpdatePricingRule {
            tenant_id: tenant::Id::new(),
            ..untouched(&e, long.id)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::update_pricing_rule::ExecutionError::RuleNotExists(_),
    ));

    service
        .execute(DeletePricingRule {
            tenant_id: e.tenant_id,
            rule_id: bulk.id,
        })
        .await
        .unwrap();
    let listed = service
        .execute(query::ListPricingRules {
            tenant_id: e.tenant_id,
            equipment_id: e.id,
        })
        .await
        .unwrap();
    assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), [long.id]);

    let err = service
        .execute(DeletePricingRule {
            tenant_id: e.tenant_id,
            rule_id: bulk.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::delete_pricing_rule::ExecutionError::RuleNotExists(_),
    ));

    let err = service
        .execute(query::ListPricingRules {
            tenant_id: tenant::Id::new(),
            equipment_id: e.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::pricing::ExecutionError::EquipmentNotExists(_),
    ));
}

#[tokio::test]
async fn lists_discount_codes() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let stored = |code: &str, validity: Period, is_active, created: &str| {
        DiscountCode {
            id: discount_code::Id::new(),
            code: discount_code::Code::new(code).unwrap(),
            discount: discount_code::Discount::FixedAmount(Decimal::from(10)),
            min_order_amount: None,
            scope: Scope::All,
            validity,
            usage: Usage::default(),
            is_active,
            created_at: support::at(created).coerce(),
        }
    };
    let expired = Period::new(
        support::at("2020-01-01T00:00:00Z"),
        support::at("2020-02-01T00:00:00Z"),
    )
    .unwrap();
    let codes = [
        stored("FIRST", always(), true, "2025-01-01T00:00:00Z"),
        stored("EXPIRED", expired, true, "2025-02-01T00:00:00Z"),
        stored("PAUSED", always(), false, "2025-03-01T00:00:00Z"),
    ];
    for c in &codes {
        db.execute(Insert(c.clone())).await.unwrap();
    }
    let [first, expired, paused] = codes.map(|c| c.id);

    assert_eq!(
        listed_codes(&service, codes::Filter::default()).await,
        [paused, expired, first],
    );
    assert_eq!(
        listed_codes(&service, codes::Filter {
            is_active: Some(true),
            valid_at: None,
        })
        .await,
        [expired, first],
    );
    assert_eq!(
        listed_codes(&service, codes::Filter {
            is_active: None,
            valid_at: Some(DateTime::now()),
        })
        .await,
        [paused, first],
    );
    assert_eq!(
        listed_codes(&service, codes::Filter {
            is_active: Some(true),
            valid_at: Some(DateTime::now()),
        })
        .await,
        [first],
    );
}

#[tokio::test]
async fn validates_discount_codes() {
    let (service, _db, _bg) = support::spawn(Recorder::default());

    let code = service
        .execute(fixed_code("SUMMER10", 10))
        .await
        .unwrap()
        .code;
    let valid = service
        .execute(query::ValidateDiscountCode { code: code.clone() })
        .await
        .unwrap();
    assert!(matches!(valid, Validity::Valid(c) if c.code == code));

    let err = service
        .execute(fixed_code("summer10", 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::create_discount_code::ExecutionError::CodeOccupied(_),
    ));

    let expired = service
        .execute(CreateDiscountCode {
            validity: Period::new(
                support::at("2020-01-01T00:00:00Z"),
                support::at("2020-02-01T00:00:00Z"),
            )
            .unwrap(),
            ..fixed_code("WINTER20", 10)
        })
        .await
        .unwrap()
        .code;
    assert_eq!(
        service
            .execute(query::ValidateDiscountCode { code: expired })
            .await
            .unwrap(),
        Validity::Invalid(Rejection::Expired),
    );

    let upcoming = service
        .execute(CreateDiscountCode {
            validity: Period::new(
                DateTime::from_unix_timestamp(
                    DateTime::now().unix_timestamp() + 86_400,
                )
                .unwrap(),
                support::at("2100-01-01T00:00:00Z"),
            )
            .unwrap(),
            ..fixed_code("FUTURE", 10)
        })
        .await
        .unwrap()
        .code;
    assert_eq!(
        service
            .execute(query::ValidateDiscountCode { code: upcoming })
            .await
            .unwrap(),
        Validity::Invalid(Rejection::NotYetValid),
    );

    assert_eq!(
        service
            .execute(query::ValidateDiscountCode {
                code: discount_code::Code::new("MISSING").unwrap(),
            })
            .await
            .unwrap(),
        Validity::Invalid(Rejection::NotFound),
    );

    let err = service
        .execute(CreateDiscountCode {
            scope: Scope::Equipment(vec![]),
            ..fixed_code("NOBODY", 10)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        command::create_discount_code::ExecutionError::EmptyScope,
    ));
}

#[tokio::test]
async fn applies_scoped_code_to_eligible_items() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let scaffold = support::equipment(&db, tenant_id, 5, 100).await;
    let mixer = support::equipment(&db, tenant_id, 5, 50).await;
    let code = service
        .execute(CreateDiscountCode {
            discount: discount_code::Discount::Percentage {
                percent: Percent::new(Decimal::from(50)).unwrap(),
                max: Some(Decimal::from(150)),
            },
            scope: Scope::Equipment(vec![mixer.id]),
            min_order_amount: Some(Decimal::from(500)),
            ..fixed_code("MIXER", 0)
        })
        .await
        .unwrap()
        .code;

    let items = vec![
        item::Request {
            equipment_id: scaffold.id,
            quantity: 1,
        },
        item::Request {
            equipment_id: mixer.id,
            quantity: 1,
        },
    ];
    let quote = service
        .execute(query::QuoteReservation {
            tenant_id,
            items: items.clone(),
            period: november(1, 5),
            code: Some(code.clone()),
        })
        .await
        .unwrap();

    // 50% of the mixer subtotal only, while the minimum is met by the whole
    // order.
    assert_eq!(quote.subtotal, Decimal::from(600));
    assert_eq!(quote.code.map(|c| c.amount), Some(Decimal::from(100)));
    assert_eq!(quote.discount, Decimal::from(100));

    let quote = service
        .execute(query::QuoteReservation {
            tenant_id,
            items: items[1..].to_vec(),
            period: november(1, 5),
            code: Some(code),
        })
        .await
        .unwrap();
    assert!(quote.code.is_none());
    assert_eq!(quote.discount, Decimal::ZERO);
}

#[tokio::test]
async fn refuses_malformed_item_lists() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let e = support::equipment(&db, tenant::Id::new(), 5, 100).await;

    let err = service
        .execute(query::QuoteReservation {
            items: vec![],
            ..quote_of(&e, 1, None)
        })
        .await
        .unwrap_err();
    assert!(matches!(err.as_ref(), query::pricing::ExecutionError::NoItems));

    let err = service
        .execute(query::QuoteReservation {
            items: vec![
                item::Request {
                    equipment_id: e.id,
                    quantity: 1,
                },
                item::Request {
                    equipment_id: e.id,
                    quantity: 2,
                },
            ],
            ..quote_of(&e, 1, None)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::pricing::ExecutionError::DuplicateEquipment(id) if *id == e.id,
    ));

    let err = service
        .execute(quote_of(&e, 0, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::pricing::ExecutionError::ZeroQuantity(_),
    ));

    let err = service
        .execute(query::QuoteReservation {
            items: vec![item::Request {
                equipment_id: equipment::Id::new(),
                quantity: 1,
            }],
            ..quote_of(&e, 1, None)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::pricing::ExecutionError::EquipmentNotExists(_),
    ));
}

#[tokio::test]
async fn reports_availability() {
    let (service, db, _bg) = support::spawn(Recorder::default());
    let tenant_id = tenant::Id::new();
    let scaffold = support::equipment(&db, tenant_id, 3, 100).await;
    let mixer = support::equipment(&db, tenant_id, 1, 50).await;

    let held = service
        .execute(booking(tenant_id, scaffold.id, 2, november(1, 5)))
        .await
        .unwrap();
    _ = service
        .execute(booking(tenant_id, mixer.id, 1, november(1, 5)))
        .await
        .unwrap();

    let single = service
        .execute(query::CheckAvailability {
            tenant_id,
            equipment_id: scaffold.id,
            period: november(4, 6),
            exclude: None,
        })
        .await
        .unwrap();
    assert_eq!(single.total, 3);
    assert_eq!(single.available, 1);
    assert_eq!(single.conflicts.len(), 1);
    assert_eq!(single.conflicts[0].status, Status::Pending);

    let excluded = service
        .execute(query::CheckAvailability {
            exclude: Some(held.id),
            ..query::CheckAvailability {
                tenant_id,
                equipment_id: scaffold.id,
                period: november(4, 6),
                exclude: None,
            }
        })
        .await
        .unwrap();
    assert_eq!(excluded.available, 3);
    assert!(excluded.conflicts.is_empty());

    let bulk = service
        .execute(query::CheckBulkAvailability {
            tenant_id,
            items: vec![
                item::Request {
                    equipment_id: scaffold.id,
                    quantity: 1,
                },
                item::Request {
                    equipment_id: mixer.id,
                    quantity: 1,
                },
            ],
            period: november(2, 3),
            exclude: None,
        })
        .await
        .unwrap();
    assert!(!bulk.all_available());
    assert!(bulk.items[0].is_available());
    assert!(!bulk.items[1].is_available());

    let later = service
        .execute(query::CheckAvailability {
            tenant_id,
            equipment_id: mixer.id,
            period: november(6, 8),
            exclude: None,
        })
        .await
        .unwrap();
    assert_eq!(later.available, 1);
}
