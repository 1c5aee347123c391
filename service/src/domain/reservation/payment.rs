//! [`Payment`] of a [`Reservation`].
//!
//! [`Reservation`]: super::Reservation

use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

use super::Note;

/// Payment recorded against a [`Reservation`].
///
/// [`Reservation`]: super::Reservation
#[derive(Clone, Debug, PartialEq)]
pub struct Payment {
    /// ID of this [`Payment`].
    pub id: Id,

    /// ID of the paid [`Reservation`].
    ///
    /// [`Reservation`]: super::Reservation
    pub reservation_id: super::Id,

    /// Paid amount, always positive.
    pub amount: Decimal,

    /// [`Kind`] of this [`Payment`].
    pub kind: Kind,

    /// [`Method`] of this [`Payment`].
    pub method: Method,

    /// [`Method`]-specific [`Details`].
    pub details: Details,

    /// Name of the paying party, if known.
    pub paid_by: Option<Party>,

    /// ID of the [`User`] who received this [`Payment`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub received_by: Option<user::Id>,

    /// Free-form [`Note`] on this [`Payment`].
    pub notes: Option<Note>,

    /// [`Status`] of this [`Payment`].
    pub status: Status,

    /// [`DateTime`] when this [`Payment`] was made.
    ///
    /// [`DateTime`]: common::DateTime
    pub paid_at: SettlementDateTime,
}

/// ID of a [`Payment`].
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

define_kind! {
    #[doc = "Kind of a [`Payment`]."]
    enum Kind {
        #[doc = "Deposit payment."]
        Deposit = 1,

        #[doc = "Arbitrary part of the total."]
        Partial = 2,

        #[doc = "Whole total."]
        Full = 3,

        #[doc = "Money returned to the customer."]
        Refund = 4,
    }
}

define_kind! {
    #[doc = "Method of a [`Payment`]."]
    enum Method {
        #[doc = "Cash."]
        Cash = 1,

        #[doc = "Bank card."]
        Card = 2,

        #[doc = "Bank transfer."]
        Transfer = 3,

        #[doc = "Online payment."]
        Online = 4,

        #[doc = "Check."]
        Check = 5,
    }
}

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Money is received."]
        Completed = 1,
    }
}

/// [`Method`]-specific details of a [`Payment`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Details {
    /// Last four digits of the paying card.
    pub card_last_four: Option<String>,

    /// Brand of the paying card.
    pub card_brand: Option<String>,

    /// Reference of the bank transfer.
    pub transfer_reference: Option<String>,

    /// Name of the bank.
    pub bank_name: Option<String>,

    /// Number of the issued receipt.
    pub receipt_number: Option<String>,
}

/// Name of a party paying a [`Payment`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Party(String);

impl Party {
    /// Creates a new [`Party`] if the given `name` is not blank.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let name = name.trim();
        (!name.is_empty() && name.len() <= 256).then(|| Self(name.to_owned()))
    }
}

/// [`DateTime`] when a [`Payment`] was made.
///
/// [`DateTime`]: common::DateTime
pub type SettlementDateTime = DateTimeOf<(Payment, unit::Settlement)>;
