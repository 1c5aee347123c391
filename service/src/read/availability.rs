//! Availability read model definitions.

use crate::domain::{
    customer, equipment,
    reservation::{self, Status},
    Period,
};

/// Reservation holding some units of an [`Equipment`] within a requested
/// [`Period`].
///
/// [`Equipment`]: crate::domain::Equipment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conflict {
    /// ID of the conflicting reservation.
    pub reservation_id: reservation::Id,

    /// [`reservation::Number`] of the conflicting reservation.
    pub number: reservation::Number,

    /// [`customer::Name`] of the conflicting reservation.
    pub customer_name: customer::Name,

    /// [`Period`] of the conflicting reservation.
    pub period: Period,

    /// [`Status`] of the conflicting reservation.
    pub status: Status,

    /// Number of units held by the conflicting reservation.
    pub quantity: u32,
}

/// Selector of [`Conflict`]s.
#[derive(Clone, Copy, Debug)]
pub struct Selector {
    /// ID of the [`Equipment`] to select [`Conflict`]s for.
    ///
    /// [`Equipment`]: crate::domain::Equipment
    pub equipment_id: equipment::Id,

    /// Requested [`Period`].
    pub period: Period,

    /// ID of the reservation to leave out, if any.
    pub exclude: Option<reservation::Id>,
}

impl Selector {
    /// Indicates whether the provided reservation data matches this
    /// [`Selector`].
    #[must_use]
    pub fn matches(
        &self,
        id: reservation::Id,
        period: &Period,
        status: Status,
    ) -> bool {
        self.exclude != Some(id)
            && status.holds_inventory()
            && period.overlaps(&self.period)
    }
}

/// Availability of an [`Equipment`] within a [`Period`].
///
/// [`Equipment`]: crate::domain::Equipment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Availability {
    /// ID of the [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    pub equipment_id: equipment::Id,

    /// Total number of units in the inventory.
    pub total: u32,

    /// Number of units left free.
    ///
    /// Negative if the [`Equipment`] is overbooked.
    ///
    /// [`Equipment`]: crate::domain::Equipment
    pub available: i64,

    /// [`Conflict`]s holding the inventory.
    pub conflicts: Vec<Conflict>,
}

impl Availability {
    /// Calculates [`Availability`] out of the total inventory and the
    /// [`Conflict`]s holding it.
    #[must_use]
    pub fn new(
        equipment_id: equipment::Id,
        total: u32,
        conflicts: Vec<Conflict>,
    ) -> Self {
        let held: i64 = conflicts.iter().map(|c| i64::from(c.quantity)).sum();
        Self {
            equipment_id,
            total,
            available: i64::from(total) - held,
            conflicts,
        }
    }

    /// Indicates whether the requested `quantity` may be reserved.
    #[must_use]
    pub fn suffices(&self, quantity: u32) -> bool {
        self.available >= i64::from(quantity)
    }
}

/// [`Availability`] of a single requested item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ItemAvailability {
    /// Requested quantity.
    pub requested: u32,

    /// [`Availability`] of the requested [`Equipment`].
    ///
    /// [`Equipment`]: crate::domain::Equipment
    pub availability: Availability,
}

impl ItemAvailability {
    /// Indicates whether the requested quantity may be reserved.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.availability.suffices(self.requested)
    }
}

/// [`Availability`] of multiple requested items.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BulkAvailability {
    /// [`ItemAvailability`] of every requested item.
    pub items: Vec<ItemAvailability>,
}

impl BulkAvailability {
    /// Indicates whether every requested item may be reserved.
    #[must_use]
    pub fn all_available(&self) -> bool {
        self.items.iter().all(ItemAvailability::is_available)
    }

    /// Returns the requested items lacking free units.
    pub fn shortages(&self) -> impl Iterator<Item = &ItemAvailability> {
        self.items.iter().filter(|i| !i.is_available())
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use proptest::prelude::*;

    use crate::domain::{
        customer,
        equipment,
        reservation::{self, Status},
        Period,
    };

    use super::{Availability, Conflict, Selector};

    fn period(start: &str, end: &str) -> Period {
        Period::new(
            DateTime::from_rfc3339(start).unwrap(),
            DateTime::from_rfc3339(end).unwrap(),
        )
        .unwrap()
    }

    fn conflict(quantity: u32) -> Conflict {
        Conflict {
            reservation_id: reservation::Id::new(),
            number: reservation::Number::new(2025, 1),
            customer_name: customer::Name::new("Ayşe Yılmaz").unwrap(),
            period: period("2025-10-20T00:00:00Z", "2025-10-25T00:00:00Z"),
            status: Status::Confirmed,
            quantity,
        }
    }

    #[test]
    fn selects_only_holding_overlaps() {
        let existing = period("2025-10-20T00:00:00Z", "2025-10-25T00:00:00Z");
        let id = reservation::Id::new();
        let sel = Selector {
            equipment_id: equipment::Id::new(),
            period: period("2025-10-24T00:00:00Z", "2025-10-28T00:00:00Z"),
            exclude: None,
        };

        assert!(sel.matches(id, &existing, Status::Pending));
        assert!(sel.matches(id, &existing, Status::InProgress));
        assert!(!sel.matches(id, &existing, Status::Cancelled));
        assert!(!sel.matches(id, &existing, Status::Completed));
        assert!(!sel.matches(id, &existing, Status::Rejected));
        assert!(!Selector {
            exclude: Some(id),
            ..sel
        }
        .matches(id, &existing, Status::Pending));
        assert!(!Selector {
            period: period("2025-10-26T00:00:00Z", "2025-10-30T00:00:00Z"),
            ..sel
        }
        .matches(id, &existing, Status::Pending));
    }

    #[test]
    fn may_go_negative() {
        let a = Availability::new(
            equipment::Id::new(),
            2,
            vec![conflict(2), conflict(1)],
        );

        assert_eq!(a.available, -1);
        assert!(!a.suffices(0));
        assert!(!a.suffices(1));
    }

    proptest! {
        #[test]
        fn overlap_matches_interval_rule(
            a_start in 0i64..1_000,
            a_len in 1i64..200,
            b_start in 0i64..1_000,
            b_len in 1i64..200,
        ) {
            let hour = 3600;
            let at = |h: i64| DateTime::from_unix_timestamp(
                1_760_000_000 + h * hour,
            ).unwrap();
            let a = Period::new(at(a_start), at(a_start + a_len)).unwrap();
            let b = Period::new(at(b_start), at(b_start + b_len)).unwrap();

            let expected =
                a_start <= b_start + b_len && a_start + a_len >= b_start;
            prop_assert_eq!(a.overlaps(&b), expected);
            prop_assert_eq!(b.overlaps(&a), expected);
        }
    }
}
