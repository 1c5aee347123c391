//! [`Reservation`] definitions.

pub mod history;
pub mod item;
pub mod number;
pub mod payment;
pub mod status;

use std::sync::LazyLock;

use common::{unit, DateTime, DateTimeOf, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    customer::Address,
    pricing::{discount_code, Quote},
    tenant, user, Customer, Period,
};

pub use self::{
    history::Entry as HistoryEntry,
    item::Item,
    number::Number,
    payment::Payment,
    status::{IllegalTransition, Status},
};

/// Booking of some equipment for a [`Period`].
#[derive(Clone, Debug, PartialEq)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the tenant this [`Reservation`] belongs to.
    pub tenant_id: tenant::Id,

    /// Unique [`Number`] of this [`Reservation`].
    pub number: Number,

    /// [`Customer`] who made this [`Reservation`].
    pub customer: Customer,

    /// Reserved [`Period`].
    pub period: Period,

    /// Time of the day the equipment is picked up.
    pub pickup_time: TimeOfDay,

    /// Time of the day the equipment is returned.
    pub return_time: TimeOfDay,

    /// [`Location`] the equipment is picked up at, if specified.
    pub pickup_location: Option<Location>,

    /// [`Location`] the equipment is returned to, if specified.
    pub return_location: Option<Location>,

    /// [`Delivery`] of the equipment, if requested.
    pub delivery: Option<Delivery>,

    /// Reserved [`Item`]s.
    pub items: Vec<Item>,

    /// Monetary [`Totals`] of this [`Reservation`].
    pub totals: Totals,

    /// Current [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`Status`] this [`Reservation`] had before the current one, if any.
    pub previous_status: Option<Status>,

    /// [`Approval`] of this [`Reservation`], if approved.
    pub approval: Option<Approval>,

    /// [`Rejection`] of this [`Reservation`], if rejected.
    pub rejection: Option<Rejection>,

    /// [`Settlement`] of the deposit, if paid.
    pub deposit_payment: Option<Settlement>,

    /// [`Settlement`] of the full amount, if paid.
    pub full_payment: Option<Settlement>,

    /// Customer-facing [`Note`].
    pub notes: Option<Note>,

    /// Staff-only [`Note`].
    pub internal_notes: Option<Note>,

    /// Special requests of the [`Customer`].
    pub special_requests: Option<Note>,

    /// ID of the [`User`] who created this [`Reservation`], if any.
    ///
    /// [`User`]: crate::domain::user
    pub created_by: Option<user::Id>,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Reservation`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Reservation {
    /// Changes [`Status`] of this [`Reservation`] to the `next` one.
    ///
    /// Approval is stamped when confirming, and rejection when rejecting.
    /// The returned [`HistoryEntry`] must be persisted along with this
    /// [`Reservation`].
    ///
    /// # Errors
    ///
    /// With an [`IllegalTransition`] if the current [`Status`] may not be
    /// changed to the `next` one.
    pub fn transition(
        &mut self,
        next: Status,
        change: StatusChange,
    ) -> Result<HistoryEntry, IllegalTransition> {
        let StatusChange {
            actor,
            reason,
            notes,
            at,
        } = change;

        let prev = self.status;
        self.status = prev.transition_to(next)?;
        self.previous_status = Some(prev);
        self.updated_at = at.coerce();

        match next {
            Status::Confirmed => {
                self.approval = Some(Approval {
                    by: actor,
                    at: at.coerce(),
                });
            }
            Status::Rejected => {
                self.rejection = Some(Rejection {
                    by: actor,
                    at: at.coerce(),
                    reason: reason.clone(),
                });
            }
            Status::Pending
            | Status::InProgress
            | Status::Completed
            | Status::Cancelled => {}
        }

        Ok(HistoryEntry {
            id: history::Id::new(),
            reservation_id: self.id,
            from: Some(prev),
            to: next,
            actor,
            reason,
            notes,
            at: at.coerce(),
        })
    }

    /// Returns the [`HistoryEntry`] of this [`Reservation`] creation.
    #[must_use]
    pub fn creation_entry(&self, notes: Option<Note>) -> HistoryEntry {
        HistoryEntry {
            id: history::Id::new(),
            reservation_id: self.id,
            from: None,
            to: self.status,
            actor: self.created_by,
            reason: None,
            notes,
            at: self.created_at.coerce(),
        }
    }

    /// Reflects the provided [`Payment`] in the settlement flags of this
    /// [`Reservation`].
    ///
    /// A [`payment::Kind::Full`] payment settles the deposit as well, unless
    /// already settled. Partial payments and refunds change nothing.
    pub fn settle(&mut self, payment: &Payment) {
        let settlement = Settlement {
            at: payment.paid_at.coerce(),
            method: payment.method,
        };
        match payment.kind {
            payment::Kind::Deposit => {
                self.deposit_payment = Some(settlement);
            }
            payment::Kind::Full => {
                self.full_payment = Some(settlement);
                _ = self.deposit_payment.get_or_insert(settlement);
            }
            payment::Kind::Partial | payment::Kind::Refund => {}
        }
        self.updated_at = payment.paid_at.coerce();
    }

    /// Replaces [`Item`]s and [`Totals`] of this [`Reservation`].
    pub fn reprice(&mut self, items: Vec<Item>, quote: &Quote) {
        self.items = items;
        self.totals = Totals::from(quote);
    }

    /// Returns IDs of the [`PricingRule`]s discounting this [`Reservation`].
    ///
    /// [`PricingRule`]: crate::domain::PricingRule
    pub fn applied_rules(
        &self,
    ) -> impl Iterator<Item = crate::domain::pricing::rule::Id> + '_ {
        self.items.iter().flat_map(|i| i.applied_rules.iter().copied())
    }
}

/// Parameters of a [`Status`] change.
#[derive(Clone, Debug)]
pub struct StatusChange {
    /// ID of the [`User`] changing the [`Status`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub actor: Option<user::Id>,

    /// [`Reason`] of the change.
    pub reason: Option<Reason>,

    /// Free-form [`Note`] on the change.
    pub notes: Option<Note>,

    /// [`DateTime`] of the change.
    pub at: DateTime,
}

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Monetary totals of a [`Reservation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Totals {
    /// [`Currency`] of the amounts.
    ///
    /// [`Currency`]: common::Currency
    pub currency: common::Currency,

    /// Sum of the [`Item`]s subtotals.
    pub subtotal: Decimal,

    /// Overall discount.
    pub discount: Decimal,

    /// [`discount_code::Code`] applied, if any.
    pub discount_code: Option<discount_code::Code>,

    /// Applied tax rate.
    pub tax_rate: Percent,

    /// Tax amount.
    pub tax: Decimal,

    /// Total amount, equal to `subtotal - discount + tax`.
    pub total: Decimal,

    /// Deposit amount.
    pub deposit: Decimal,

    /// Amount remaining after the deposit.
    pub remaining: Decimal,
}

impl From<&Quote> for Totals {
    fn from(quote: &Quote) -> Self {
        Self {
            currency: quote.currency,
            subtotal: quote.subtotal,
            discount: quote.discount,
            discount_code: quote.code.as_ref().map(|c| c.code.clone()),
            tax_rate: quote.tax_rate,
            tax: quote.tax,
            total: quote.total,
            deposit: quote.deposit,
            remaining: quote.remaining,
        }
    }
}

/// Approval of a [`Reservation`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Approval {
    /// ID of the approving [`User`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub by: Option<user::Id>,

    /// [`DateTime`] of the approval.
    pub at: ApprovalDateTime,
}

/// Rejection of a [`Reservation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    /// ID of the rejecting [`User`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub by: Option<user::Id>,

    /// [`DateTime`] of the rejection.
    pub at: RejectionDateTime,

    /// [`Reason`] of the rejection.
    pub reason: Option<Reason>,
}

/// Settlement of a [`Reservation`] payment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settlement {
    /// [`DateTime`] of the settlement.
    pub at: SettlementDateTime,

    /// [`payment::Method`] of the settlement.
    pub method: payment::Method,
}

/// Delivery of the reserved equipment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delivery {
    /// [`Address`] to deliver to.
    pub address: Address,

    /// Delivery fee, if charged.
    ///
    /// Not included into [`Totals`].
    pub fee: Option<Decimal>,
}

/// Time of the day in `HH:MM` format.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TimeOfDay(String);

impl TimeOfDay {
    /// Creates a new [`TimeOfDay`] if the given `time` is valid.
    #[must_use]
    pub fn new(time: impl Into<String>) -> Option<Self> {
        /// Regular expression checking [`TimeOfDay`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid regex")
        });

        let time = time.into();
        REGEX.is_match(&time).then_some(Self(time))
    }

    /// Default pickup [`TimeOfDay`].
    #[must_use]
    pub fn default_pickup() -> Self {
        Self("09:00".into())
    }

    /// Default return [`TimeOfDay`].
    #[must_use]
    pub fn default_return() -> Self {
        Self("18:00".into())
    }
}

impl FromStr for TimeOfDay {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `TimeOfDay`")
    }
}

/// Pickup or return location.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`] if the given `location` is not blank.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        let location = location.trim();
        (!location.is_empty() && location.len() <= 512)
            .then(|| Self(location.to_owned()))
    }
}

/// Free-form note.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Note(String);

impl Note {
    /// Creates a new [`Note`] if the given `text` is not blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let text = text.trim();
        (!text.is_empty() && text.len() <= 4096).then(|| Self(text.to_owned()))
    }
}

/// Reason of a [`Status`] change.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Reason(String);

impl Reason {
    /// Creates a new [`Reason`] if the given `text` is not blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let text = text.trim();
        (!text.is_empty() && text.len() <= 1024).then(|| Self(text.to_owned()))
    }
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(Reservation, unit::Modification)>;

/// [`DateTime`] when a [`Reservation`] was approved.
pub type ApprovalDateTime = DateTimeOf<(Reservation, unit::Approval)>;

/// [`DateTime`] when a [`Reservation`] was rejected.
pub type RejectionDateTime = DateTimeOf<(Reservation, unit::Rejection)>;

/// [`DateTime`] when a [`Reservation`] payment was settled.
pub type SettlementDateTime = DateTimeOf<(Reservation, unit::Settlement)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{Currency, DateTime, Percent};
    use rust_decimal::Decimal;

    use crate::domain::{
        customer::{Email, Name, Phone},
        tenant, user, Customer, Period,
    };

    use super::{
        payment, HistoryEntry, Id, Note, Number, Payment, Reason,
        Reservation, Status, StatusChange, TimeOfDay, Totals,
    };

    pub(crate) fn reservation() -> Reservation {
        let now = DateTime::now();
        Reservation {
            id: Id::new(),
            tenant_id: tenant::Id::new(),
            number: Number::new(2025, 1),
            customer: Customer {
                id: None,
                name: Name::new("Ayşe Yılmaz").unwrap(),
                email: Email::new("ayse@example.com").unwrap(),
                phone: Phone::new("+90 555 123 45 67").unwrap(),
                address: None,
            },
            period: Period::new(
                DateTime::from_rfc3339("2025-11-01T00:00:00Z").unwrap(),
                DateTime::from_rfc3339("2025-11-05T00:00:00Z").unwrap(),
            )
            .unwrap(),
            pickup_time: TimeOfDay::default_pickup(),
            return_time: TimeOfDay::default_return(),
            pickup_location: None,
            return_location: None,
            delivery: None,
            items: vec![],
            totals: Totals {
                currency: Currency::Try,
                subtotal: Decimal::from(800),
                discount: Decimal::ZERO,
                discount_code: None,
                tax_rate: Percent::new(Decimal::from(20)).unwrap(),
                tax: Decimal::from(160),
                total: Decimal::from(960),
                deposit: Decimal::from(288),
                remaining: Decimal::from(672),
            },
            status: Status::Pending,
            previous_status: None,
            approval: None,
            rejection: None,
            deposit_payment: None,
            full_payment: None,
            notes: None,
            internal_notes: None,
            special_requests: None,
            created_by: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    fn change(actor: user::Id, reason: Option<&str>) -> StatusChange {
        StatusChange {
            actor: Some(actor),
            reason: reason.and_then(Reason::new),
            notes: None,
            at: DateTime::now(),
        }
    }

    pub(crate) fn payment(r: &Reservation, kind: payment::Kind) -> Payment {
        Payment {
            id: payment::Id::new(),
            reservation_id: r.id,
            amount: Decimal::from(288),
            kind,
            method: payment::Method::Card,
            details: payment::Details::default(),
            paid_by: None,
            received_by: None,
            notes: None,
            status: payment::Status::Completed,
            paid_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn stamps_approval() {
        let mut r = reservation();
        let actor = user::Id::new();

        let HistoryEntry { from, to, .. } =
            r.transition(Status::Confirmed, change(actor, None)).unwrap();

        assert_eq!((from, to), (Some(Status::Pending), Status::Confirmed));
        assert_eq!(r.status, Status::Confirmed);
        assert_eq!(r.previous_status, Some(Status::Pending));
        assert_eq!(r.approval.unwrap().by, Some(actor));
        assert!(r.rejection.is_none());
    }

    #[test]
    fn stamps_rejection() {
        let mut r = reservation();
        let actor = user::Id::new();

        let entry = r
            .transition(Status::Rejected, change(actor, Some("no stock")))
            .unwrap();

        let rejection = r.rejection.clone().unwrap();
        assert_eq!(rejection.by, Some(actor));
        assert_eq!(rejection.reason.unwrap().to_string(), "no stock");
        assert_eq!(entry.reason.unwrap().to_string(), "no stock");
        assert!(r.approval.is_none());
    }

    #[test]
    fn refuses_illegal_transitions() {
        let mut r = reservation();
        let actor = user::Id::new();

        r.transition(Status::Cancelled, change(actor, None)).unwrap();
        let before = r.clone();

        assert!(r.transition(Status::Pending, change(actor, None)).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn full_payment_settles_deposit() {
        let mut r = reservation();
        let p = payment(&r, payment::Kind::Full);

        r.settle(&p);

        assert!(r.full_payment.is_some());
        assert!(r.deposit_payment.is_some());
    }

    #[test]
    fn deposit_payment_leaves_full_unpaid() {
        let mut r = reservation();
        let p = payment(&r, payment::Kind::Deposit);

        r.settle(&p);

        assert!(r.deposit_payment.is_some());
        assert!(r.full_payment.is_none());

        let deposit = r.deposit_payment;
        r.settle(&payment(&r, payment::Kind::Full));
        assert_eq!(r.deposit_payment, deposit);
    }

    #[test]
    fn partial_payments_change_nothing() {
        let mut r = reservation();

        r.settle(&payment(&r, payment::Kind::Partial));
        r.settle(&payment(&r, payment::Kind::Refund));

        assert!(r.deposit_payment.is_none());
        assert!(r.full_payment.is_none());
    }

    #[test]
    fn creation_entry_has_no_origin() {
        let r = reservation();

        let entry = r.creation_entry(Note::new("New reservation"));

        assert_eq!(entry.from, None);
        assert_eq!(entry.to, Status::Pending);
    }

    #[test]
    fn time_of_day() {
        assert!(TimeOfDay::new("09:00").is_some());
        assert!(TimeOfDay::new("23:59").is_some());
        assert!(TimeOfDay::new("24:00").is_none());
        assert!(TimeOfDay::new("9:00").is_none());
    }
}
