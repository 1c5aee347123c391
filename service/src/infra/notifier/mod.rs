//! [`Notifier`]-related implementations.

mod log;
pub mod outbox;

use derive_more::{Display, Error as StdError};

pub use self::{
    log::Log,
    outbox::{Inbox, Outbox},
};

/// Gateway delivering [`Notification`]s to their recipients.
///
/// [`Notification`]: crate::domain::Notification
pub use common::Handler as Notifier;

/// [`Notifier`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// [`Notification`] could not be delivered.
    ///
    /// [`Notification`]: crate::domain::Notification
    #[display("Failed to deliver notification: {_0}")]
    Delivery(#[error(not(source))] String),
}
