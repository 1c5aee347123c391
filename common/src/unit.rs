//! Marker types describing kinds of [`DateTimeOf`].
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing the last modification of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing an approval.
#[derive(Clone, Copy, Debug)]
pub struct Approval;

/// Marker type describing a rejection.
#[derive(Clone, Copy, Debug)]
pub struct Rejection;

/// Marker type describing a settlement of some payment.
#[derive(Clone, Copy, Debug)]
pub struct Settlement;
