//! [`Command`] definition.

pub mod change_reservation_status;
pub mod create_discount_code;
pub mod create_pricing_rule;
pub mod create_reservation;
pub mod delete_pricing_rule;
pub mod record_payment;
pub mod set_pricing_rule_active;
pub mod update_pricing_rule;
pub mod update_reservation;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    change_reservation_status::ChangeReservationStatus,
    create_discount_code::CreateDiscountCode,
    create_pricing_rule::CreatePricingRule,
    create_reservation::CreateReservation,
    delete_pricing_rule::DeletePricingRule, record_payment::RecordPayment,
    set_pricing_rule_active::SetPricingRuleActive,
    update_pricing_rule::UpdatePricingRule,
    update_reservation::UpdateReservation,
};
