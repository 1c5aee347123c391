//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::convert::Infallible;

use common::{operations::Start, Percent};
use rust_decimal::Decimal;
use smart_default::SmartDefault;

#[cfg(doc)]
use infra::Database;
use infra::notifier::{Inbox, Outbox};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Tax rate charged on the discounted subtotal of a reservation.
    #[default(Percent::new(Decimal::from(20)).unwrap_or_default())]
    pub tax_rate: Percent,

    /// Share of a reservation total to be paid as a deposit.
    #[default(Percent::new(Decimal::from(30)).unwrap_or_default())]
    pub deposit_rate: Percent,

    /// Number of attempts to allocate a unique reservation number.
    #[default(3)]
    pub number_allocation_attempts: u8,

    /// [`task::DispatchNotifications`] configuration.
    pub notifications: task::dispatch_notifications::Config,
}

impl Config {
    /// Returns [`domain::pricing::quote::Charges`] of this [`Config`].
    #[must_use]
    pub const fn charges(&self) -> domain::pricing::quote::Charges {
        domain::pricing::quote::Charges {
            tax_rate: self.tax_rate,
            deposit_rate: self.deposit_rate,
        }
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Outbox`] of the [`Notification`]s of this [`Service`].
    ///
    /// [`Notification`]: domain::Notification
    outbox: Outbox,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// [`Notification`]s are delivered via the provided `notifier` by the
    /// returned [`task::Background`].
    ///
    /// [`Notification`]: domain::Notification
    pub fn new<N>(
        config: Config,
        database: Db,
        notifier: N,
    ) -> (Self, task::Background)
    where
        task::DispatchNotifications<N>:
            Task<Start<Inbox>, Ok = (), Err = Infallible> + 'static,
    {
        let (outbox, inbox) = Outbox::new();
        let this = Service {
            config,
            database,
            outbox,
        };

        let mut bg = task::Background::default();
        let dispatch =
            task::DispatchNotifications::new(config.notifications, notifier);
        bg.spawn(async move { dispatch.execute(Start(inbox)).await });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Outbox`] of this [`Service`].
    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}
