//! Reserved [`Item`] definitions.

use rust_decimal::Decimal;

use crate::domain::{
    equipment::{self, Tier},
    pricing::{rule, Breakdown},
    Equipment,
};

/// Line item of a [`Reservation`].
///
/// Keeps a snapshot of the reserved [`Equipment`] and its pricing at the
/// moment of booking.
///
/// [`Reservation`]: super::Reservation
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    /// ID of the reserved [`Equipment`].
    pub equipment_id: equipment::Id,

    /// [`equipment::Name`] of the reserved [`Equipment`] at booking time.
    pub equipment_name: equipment::Name,

    /// [`equipment::Code`] of the reserved [`Equipment`] at booking time.
    pub equipment_code: equipment::Code,

    /// Reserved quantity, at least `1`.
    pub quantity: u32,

    /// Base price of a single unit.
    pub unit_price: Decimal,

    /// Pricing [`Tier`] of the unit price.
    pub tier: Tier,

    /// Number of started rental days.
    pub days: u64,

    /// Discount of this [`Item`].
    pub discount: Decimal,

    /// Base price of all the units.
    pub subtotal: Decimal,

    /// Final price of this [`Item`].
    pub total: Decimal,

    /// IDs of the [`PricingRule`]s discounting this [`Item`].
    ///
    /// [`PricingRule`]: crate::domain::PricingRule
    pub applied_rules: Vec<rule::Id>,
}

impl Item {
    /// Creates a new [`Item`] out of the provided [`Equipment`] and its
    /// [`Breakdown`].
    #[must_use]
    pub fn new(equipment: &Equipment, price: &Breakdown) -> Self {
        Self {
            equipment_id: equipment.id,
            equipment_name: equipment.name.clone(),
            equipment_code: equipment.code.clone(),
            quantity: price.quantity,
            unit_price: price.base_price,
            tier: price.tier,
            days: price.days,
            discount: price.discount(),
            subtotal: price.subtotal,
            total: price.final_price,
            applied_rules: price.applied_rules().collect(),
        }
    }
}

/// Requested quantity of some [`Equipment`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Request {
    /// ID of the requested [`Equipment`].
    pub equipment_id: equipment::Id,

    /// Requested number of units.
    pub quantity: u32,
}
