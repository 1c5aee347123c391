//! Status history of a [`Reservation`].
//!
//! [`Reservation`]: super::Reservation

use common::{unit, DateTimeOf};
use derive_more::{Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::user;

use super::{Note, Reason, Status};

/// Append-only record of a single [`Status`] change.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// ID of this [`Entry`].
    pub id: Id,

    /// ID of the [`Reservation`] this [`Entry`] belongs to.
    ///
    /// [`Reservation`]: super::Reservation
    pub reservation_id: super::Id,

    /// Previous [`Status`], if any.
    ///
    /// [`None`] for the initial [`Entry`].
    pub from: Option<Status>,

    /// New [`Status`].
    pub to: Status,

    /// ID of the [`User`] who changed the [`Status`], if known.
    ///
    /// [`User`]: crate::domain::user
    pub actor: Option<user::Id>,

    /// [`Reason`] of the change, if any.
    pub reason: Option<Reason>,

    /// Free-form [`Note`] on the change, if any.
    pub notes: Option<Note>,

    /// [`DateTime`] of the change.
    ///
    /// [`DateTime`]: common::DateTime
    pub at: CreationDateTime,
}

/// ID of an [`Entry`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, PartialEq, Serialize,
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

/// [`DateTime`] when an [`Entry`] was recorded.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Entry, unit::Creation)>;
