//! Read entities definitions.

pub mod availability;
pub mod pricing;
pub mod reservation;
pub mod timeline;

pub use self::{
    availability::{Availability, BulkAvailability},
    timeline::Timeline,
};
