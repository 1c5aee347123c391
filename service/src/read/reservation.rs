//! [`Reservation`]-related read definitions.

use crate::domain::{
    reservation::{HistoryEntry, Payment},
    Reservation,
};

/// [`Reservation`] along with its status history and [`Payment`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct Details {
    /// [`Reservation`] itself.
    pub reservation: Reservation,

    /// Status history of the [`Reservation`], newest first.
    pub history: Vec<HistoryEntry>,

    /// [`Payment`]s of the [`Reservation`], newest first.
    pub payments: Vec<Payment>,
}

pub mod list {
    //! [`Reservation`] list definitions.

    use common::{define_pagination, DateTime};

    use crate::domain::{customer, reservation::Status, tenant, Reservation};

    define_pagination!(Reservation, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug)]
    pub struct Filter {
        /// ID of the tenant owning the listed [`Reservation`]s.
        pub tenant_id: tenant::Id,

        /// ID of the [`Customer`] to list [`Reservation`]s of.
        ///
        /// [`Customer`]: crate::domain::Customer
        pub customer_id: Option<customer::Id>,

        /// [`Status`] of the listed [`Reservation`]s.
        pub status: Option<Status>,

        /// Lower bound of the [`Reservation`]s start.
        pub starts_from: Option<DateTime>,

        /// Upper bound of the [`Reservation`]s end.
        pub ends_until: Option<DateTime>,

        /// Text to search for in a number or a customer contacts.
        pub search: Option<String>,
    }

    impl Filter {
        /// Creates a new [`Filter`] listing all the [`Reservation`]s of the
        /// provided tenant.
        #[must_use]
        pub fn new(tenant_id: tenant::Id) -> Self {
            Self {
                tenant_id,
                customer_id: None,
                status: None,
                starts_from: None,
                ends_until: None,
                search: None,
            }
        }

        /// Indicates whether the provided [`Reservation`] passes this
        /// [`Filter`].
        #[must_use]
        pub fn matches(&self, r: &Reservation) -> bool {
            let search = self.search.as_deref().map(str::to_lowercase);
            r.tenant_id == self.tenant_id
                && self.customer_id.map_or(true, |id| r.customer.id == Some(id))
                && self.status.map_or(true, |s| r.status == s)
                && self.starts_from.map_or(true, |d| r.period.start() >= d)
                && self.ends_until.map_or(true, |d| r.period.end() <= d)
                && search.map_or(true, |s| {
                    let fields: [&str; 4] = [
                        r.number.as_ref(),
                        r.customer.name.as_ref(),
                        r.customer.email.as_ref(),
                        r.customer.phone.as_ref(),
                    ];
                    fields.iter().any(|f| f.to_lowercase().contains(&s))
                })
        }
    }
}

pub mod stats {
    //! [`Reservation`] statistics definitions.

    use std::collections::HashMap;

    use common::DateTime;
    use rust_decimal::Decimal;

    use crate::domain::{reservation::Status, tenant, Reservation};

    /// Statuses whose [`Reservation`]s count towards revenue.
    pub const REVENUE_STATUSES: [Status; 3] =
        [Status::Confirmed, Status::InProgress, Status::Completed];

    /// Selector of [`Stats`].
    #[derive(Clone, Copy, Debug)]
    pub struct Selector {
        /// ID of the tenant to calculate [`Stats`] for.
        pub tenant_id: tenant::Id,

        /// Lower bound of the [`Reservation`]s creation.
        pub created_from: Option<DateTime>,

        /// Upper bound of the [`Reservation`]s creation.
        pub created_until: Option<DateTime>,
    }

    impl Selector {
        /// Indicates whether the provided [`Reservation`] is counted by this
        /// [`Selector`].
        #[must_use]
        pub fn matches(&self, r: &Reservation) -> bool {
            let created = r.created_at.coerce();
            r.tenant_id == self.tenant_id
                && self.created_from.map_or(true, |d| created >= d)
                && self.created_until.map_or(true, |d| created <= d)
        }
    }

    /// Aggregated [`Reservation`] statistics.
    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    pub struct Stats {
        /// Number of [`Reservation`]s in every [`Status`].
        pub by_status: HashMap<Status, u64>,

        /// Total number of [`Reservation`]s.
        pub total: u64,

        /// Sum of totals of [`Reservation`]s in [`REVENUE_STATUSES`].
        pub revenue: Decimal,

        /// Number of [`Reservation`]s with a paid deposit.
        pub deposits_paid: u64,

        /// Number of fully paid [`Reservation`]s.
        pub full_payments: u64,
    }

    impl Stats {
        /// Accounts the provided [`Reservation`] in these [`Stats`].
        pub fn account(&mut self, r: &Reservation) {
            *self.by_status.entry(r.status).or_default() += 1;
            self.total += 1;
            if REVENUE_STATUSES.contains(&r.status) {
                self.revenue += r.totals.total;
            }
            if r.deposit_payment.is_some() {
                self.deposits_paid += 1;
            }
            if r.full_payment.is_some() {
                self.full_payments += 1;
            }
        }
    }
}
