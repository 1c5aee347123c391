//! [`Timeline`] read definitions.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::{
    equipment, reservation::Status, tenant, Equipment, Period, Reservation,
};

/// Nanoseconds in a day.
const DAY_NANOS: u128 = 24 * 60 * 60 * 1_000_000_000;

/// Selector of a [`Timeline`].
#[derive(Clone, Debug)]
pub struct Selector {
    /// ID of the tenant to lay out the [`Timeline`] for.
    pub tenant_id: tenant::Id,

    /// [`Period`] covered by the [`Timeline`].
    pub period: Period,

    /// IDs of the [`Equipment`] to lay out, or all of it if empty.
    pub equipment_ids: Vec<equipment::Id>,

    /// [`Status`] of the laid out [`Reservation`]s, if restricted.
    pub status: Option<Status>,
}

impl Selector {
    /// Indicates whether the provided [`Equipment`] gets its own [`Lane`].
    #[must_use]
    pub fn covers(&self, e: &Equipment) -> bool {
        e.tenant_id == self.tenant_id
            && (self.equipment_ids.is_empty()
                || self.equipment_ids.contains(&e.id))
    }

    /// Indicates whether the provided [`Reservation`] is laid out.
    #[must_use]
    pub fn matches(&self, r: &Reservation) -> bool {
        r.tenant_id == self.tenant_id
            && self.status.map_or(true, |s| r.status == s)
            && r.period.overlaps(&self.period)
    }
}

/// [`Reservation`]s laid out per [`Equipment`] over some [`Period`].
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    /// [`Period`] covered by this [`Timeline`].
    pub period: Period,

    /// [`Lane`]s of every [`Equipment`], ordered by category and name.
    pub lanes: Vec<Lane>,

    /// Number of [`Reservation`]s overlapping the [`Period`].
    pub total_reservations: usize,
}

/// Single [`Equipment`] row of a [`Timeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    /// [`Equipment`] this [`Lane`] is about.
    pub equipment: Equipment,

    /// [`Entry`]s of this [`Lane`], the earliest starting first.
    pub entries: Vec<Entry>,

    /// Percentage of the [`Timeline`] days the [`Equipment`] is reserved,
    /// rounded to two decimal places.
    pub utilization: Decimal,
}

/// [`Reservation`] placed on a [`Lane`].
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// [`Reservation`] itself.
    pub reservation: Reservation,

    /// Quantity of the [`Lane`]'s [`Equipment`] reserved.
    pub quantity: u32,
}

impl Timeline {
    /// Lays out the provided `reservations` upon the [`Lane`]s of the
    /// provided `equipment`.
    ///
    /// Both are expected to be ordered already.
    #[must_use]
    pub fn new(
        period: Period,
        equipment: Vec<Equipment>,
        reservations: &[Reservation],
    ) -> Self {
        let total_days = started_days(period.duration());
        let lanes = equipment
            .into_iter()
            .map(|equipment| {
                let entries = reservations
                    .iter()
                    .filter_map(|r| {
                        let quantity = r
                            .items
                            .iter()
                            .filter(|i| i.equipment_id == equipment.id)
                            .map(|i| i.quantity)
                            .sum::<u32>();
                        (quantity > 0).then(|| Entry {
                            reservation: r.clone(),
                            quantity,
                        })
                    })
                    .collect::<Vec<_>>();

                let reserved_days = entries
                    .iter()
                    .map(|e| {
                        let r = &e.reservation.period;
                        let start = r.start().max(period.start());
                        let end = r.end().min(period.end());
                        started_days(
                            end.duration_since(start).unwrap_or_default(),
                        )
                    })
                    .sum::<u64>();
                let utilization = if total_days > 0 {
                    (Decimal::from(reserved_days) * Decimal::ONE_HUNDRED
                        / Decimal::from(total_days))
                    .round_dp(2)
                } else {
                    Decimal::ZERO
                };

                Lane {
                    equipment,
                    entries,
                    utilization,
                }
            })
            .collect();

        Self {
            period,
            lanes,
            total_reservations: reservations.len(),
        }
    }
}

/// Returns the number of started days in the provided [`Duration`].
fn started_days(d: Duration) -> u64 {
    u64::try_from(d.as_nanos().div_ceil(DAY_NANOS)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod spec {
    use common::{Currency, DateTime};
    use rust_decimal::Decimal;

    use crate::domain::{
        equipment::{self, Rates, Tier},
        reservation::{self, Item},
        Equipment, Period, Reservation,
    };

    use super::Timeline;

    fn period(start: &str, end: &str) -> Period {
        Period::new(
            DateTime::from_rfc3339(start).unwrap(),
            DateTime::from_rfc3339(end).unwrap(),
        )
        .unwrap()
    }

    fn equipment(name: &str) -> Equipment {
        Equipment {
            id: equipment::Id::new(),
            tenant_id: crate::domain::tenant::Id::new(),
            name: name.into(),
            code: "EQ".into(),
            category: None,
            quantity: 3,
            rates: Rates {
                currency: Currency::Try,
                hourly: None,
                daily: Some(Decimal::from(100)),
                weekly: None,
                monthly: None,
            },
        }
    }

    fn booked(e: &Equipment, quantity: u32, period: Period) -> Reservation {
        Reservation {
            period,
            items: vec![Item {
                equipment_id: e.id,
                equipment_name: e.name.clone(),
                equipment_code: e.code.clone(),
                quantity,
                unit_price: Decimal::from(100),
                tier: Tier::Daily,
                days: period.days(),
                discount: Decimal::ZERO,
                subtotal: Decimal::from(100),
                total: Decimal::from(100),
                applied_rules: vec![],
            }],
            ..reservation::spec::reservation()
        }
    }

    #[test]
    fn clamps_utilization_to_period() {
        let (drill, saw) = (equipment("Drill"), equipment("Saw"));
        let month = period("2025-11-01T00:00:00Z", "2025-11-21T00:00:00Z");
        let reservations = [
            booked(
                &drill,
                2,
                period("2025-10-28T00:00:00Z", "2025-11-03T00:00:00Z"),
            ),
            booked(
                &drill,
                1,
                period("2025-11-10T00:00:00Z", "2025-11-13T12:00:00Z"),
            ),
        ];

        let timeline = Timeline::new(
            month,
            vec![drill.clone(), saw.clone()],
            &reservations,
        );

        assert_eq!(timeline.total_reservations, 2);
        assert_eq!(timeline.lanes.len(), 2);

        let lane = &timeline.lanes[0];
        assert_eq!(lane.equipment.id, drill.id);
        assert_eq!(
            lane.entries.iter().map(|e| e.quantity).collect::<Vec<_>>(),
            [2, 1],
        );
        // 2 clamped days and 4 started days out of 20.
        assert_eq!(lane.utilization, Decimal::from(30));

        let lane = &timeline.lanes[1];
        assert_eq!(lane.equipment.id, saw.id);
        assert!(lane.entries.is_empty());
        assert_eq!(lane.utilization, Decimal::ZERO);
    }

    #[test]
    fn rounds_utilization() {
        let drill = equipment("Drill");
        let span = period("2025-11-01T00:00:00Z", "2025-11-04T00:00:00Z");
        let reservations = [booked(
            &drill,
            1,
            period("2025-11-01T00:00:00Z", "2025-11-02T00:00:00Z"),
        )];

        let timeline = Timeline::new(span, vec![drill], &reservations);

        assert_eq!(timeline.lanes[0].utilization, Decimal::new(3333, 2));
    }
}
