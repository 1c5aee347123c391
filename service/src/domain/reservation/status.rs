//! [`Status`] of a [`Reservation`] and its transitions.
//!
//! [`Reservation`]: super::Reservation

use common::define_kind;
use derive_more::{Display, Error};

define_kind! {
    #[doc = "Status of a [`Reservation`].\n\n\
             [`Reservation`]: super::Reservation"]
    enum Status {
        #[doc = "Awaiting approval."]
        Pending = 1,

        #[doc = "Approved and awaiting pickup."]
        Confirmed = 2,

        #[doc = "Declined. Terminal."]
        Rejected = 3,

        #[doc = "Rented equipment is picked up."]
        InProgress = 4,

        #[doc = "Rented equipment is returned. Terminal."]
        Completed = 5,

        #[doc = "Called off. Terminal."]
        Cancelled = 6,
    }
}

impl Status {
    /// [`Status`]es holding the reserved inventory.
    pub const HOLDING_INVENTORY: [Self; 3] =
        [Self::Pending, Self::Confirmed, Self::InProgress];

    /// Returns [`Status`]es this one may be changed to.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Rejected, Self::Cancelled],
            Self::Confirmed => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Rejected | Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Indicates whether this [`Status`] may be changed to the `next` one.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    /// Checks whether this [`Status`] may be changed to the `next` one.
    ///
    /// # Errors
    ///
    /// With an [`IllegalTransition`] if it may not.
    pub fn transition_to(self, next: Self) -> Result<Self, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Indicates whether this [`Status`] is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Indicates whether a [`Reservation`] in this [`Status`] holds its
    /// reserved inventory.
    ///
    /// [`Reservation`]: super::Reservation
    #[must_use]
    pub fn holds_inventory(self) -> bool {
        Self::HOLDING_INVENTORY.contains(&self)
    }
}

/// Error of changing a [`Status`] along a missing edge.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("Cannot change status from `{from}` to `{to}`")]
pub struct IllegalTransition {
    /// Current [`Status`].
    pub from: Status,

    /// Requested [`Status`].
    pub to: Status,
}

#[cfg(test)]
mod spec {
    use super::Status;

    #[test]
    fn follows_lifecycle() {
        use Status as S;

        for (from, to) in [
            (S::Pending, S::Confirmed),
            (S::Pending, S::Rejected),
            (S::Pending, S::Cancelled),
            (S::Confirmed, S::InProgress),
            (S::Confirmed, S::Cancelled),
            (S::InProgress, S::Completed),
            (S::InProgress, S::Cancelled),
        ] {
            assert!(from.can_transition_to(to), "{from} -> {to}");
        }

        for (from, to) in [
            (S::Pending, S::InProgress),
            (S::Pending, S::Completed),
            (S::Confirmed, S::Pending),
            (S::Confirmed, S::Rejected),
            (S::InProgress, S::Confirmed),
            (S::Completed, S::Pending),
            (S::Cancelled, S::Confirmed),
            (S::Rejected, S::Pending),
        ] {
            assert!(from.transition_to(to).is_err(), "{from} -> {to}");
        }
    }

    #[test]
    fn rejects_self_transitions() {
        for s in Status::all() {
            assert!(!s.can_transition_to(*s), "{s}");
        }
    }

    #[test]
    fn terminal_states() {
        assert!(Status::Completed.is_terminal());
        assert!(Status::Rejected.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(!Status::Pending.is_terminal());

        assert!(Status::Pending.holds_inventory());
        assert!(Status::InProgress.holds_inventory());
        assert!(!Status::Cancelled.holds_inventory());
    }
}
