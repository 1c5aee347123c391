//! Domain definitions.

pub mod customer;
pub mod equipment;
pub mod notification;
pub mod period;
pub mod pricing;
pub mod reservation;
pub mod tenant;
pub mod user;

pub use self::{
    customer::Customer,
    equipment::Equipment,
    notification::Notification,
    period::Period,
    pricing::{DiscountCode, PricingRule},
    reservation::Reservation,
};
