//! [`DispatchNotifications`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{Deliver, Perform, Start};
use smart_default::SmartDefault;
use tokio::time::sleep;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Notification,
    infra::{notifier, notifier::Inbox, Notifier},
};

use super::Task;

/// Configuration for [`DispatchNotifications`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Number of additional delivery attempts of a failed [`Notification`].
    #[default(2)]
    pub retries: u32,

    /// Delay between delivery attempts.
    #[default(time::Duration::from_secs(1))]
    pub retry_delay: time::Duration,
}

/// [`Task`] delivering enqueued [`Notification`]s via a [`Notifier`].
///
/// Delivery is best-effort: a [`Notification`] failed to be delivered after
/// all the retries is logged and dropped.
#[derive(Clone, Copy, Debug)]
pub struct DispatchNotifications<N> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Notifier`] to deliver [`Notification`]s with.
    notifier: N,
}

impl<N> DispatchNotifications<N> {
    /// Creates a new [`DispatchNotifications`] [`Task`].
    #[must_use]
    pub const fn new(config: Config, notifier: N) -> Self {
        Self { config, notifier }
    }
}

impl<N> Task<Start<Inbox>> for DispatchNotifications<N>
where
    Self: Task<Perform<Notification>, Ok = (), Err: Error>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(mut inbox): Start<Inbox>,
    ) -> Result<Self::Ok, Self::Err> {
        while let Some(notification) = inbox.recv().await {
            let title = notification.title.clone();
            _ = self.execute(Perform(notification)).await.map_err(|e| {
                log::error!("failed to deliver `{title}` notification: {e}");
            });
        }
        log::debug!("`task::DispatchNotifications` stopped: inbox is closed");
        Ok(())
    }
}

impl<N> Task<Perform<Notification>> for DispatchNotifications<N>
where
    N: Notifier<
        Deliver<Notification>,
        Ok = (),
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(
        &self,
        Perform(notification): Perform<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut attempt = 0;
        loop {
            let e = match self
                .notifier
                .execute(Deliver(notification.clone()))
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if attempt >= self.config.retries {
                return Err(e).map_err(tracerr::wrap!());
            }
            attempt += 1;
            log::warn!(
                "retrying `{}` notification delivery ({attempt}/{}): {e}",
                notification.title,
                self.config.retries,
            );
            sleep(self.config.retry_delay).await;
        }
    }
}

/// Error of [`DispatchNotifications`] execution.
pub type ExecutionError = Traced<notifier::Error>;

#[cfg(test)]
mod spec {
    use std::{
        cell::Cell,
        collections::BTreeMap,
        rc::Rc,
        time::Duration,
    };

    use common::operations::{Deliver, Perform};
    use tracerr::Traced;

    use crate::{
        domain::{notification, tenant, Notification},
        infra::{notifier, Notifier},
        task::Task as _,
    };

    use super::{Config, DispatchNotifications};

    /// Notifier failing the first `fails` deliveries.
    #[derive(Clone, Debug)]
    struct Flaky {
        fails: u32,
        attempts: Rc<Cell<u32>>,
    }

    impl Notifier<Deliver<Notification>> for Flaky {
        type Ok = ();
        type Err = Traced<notifier::Error>;

        async fn execute(
            &self,
            _: Deliver<Notification>,
        ) -> Result<Self::Ok, Self::Err> {
            let n = self.attempts.get() + 1;
            self.attempts.set(n);
            if n <= self.fails {
                return Err(tracerr::new!(notifier::Error::Delivery(
                    "SMTP is down".into(),
                )));
            }
            Ok(())
        }
    }

    fn notification() -> Notification {
        Notification {
            tenant_id: tenant::Id::new(),
            customer_id: None,
            channel: notification::Channel::InApp,
            recipient: notification::Recipient::InApp,
            title: "Reservation received".into(),
            message: "RES-2025-0001".into(),
            category: notification::Category::Reservation,
            priority: notification::Priority::Normal,
            metadata: BTreeMap::new(),
            send_at: None,
        }
    }

    fn task(fails: u32) -> (DispatchNotifications<Flaky>, Rc<Cell<u32>>) {
        let attempts = Rc::new(Cell::new(0));
        let task = DispatchNotifications::new(
            Config {
                retries: 2,
                retry_delay: Duration::from_millis(1),
            },
            Flaky {
                fails,
                attempts: Rc::clone(&attempts),
            },
        );
        (task, attempts)
    }

    #[tokio::test]
    async fn retries_failed_delivery() {
        let (task, attempts) = task(2);

        task.execute(Perform(notification())).await.unwrap();

        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retries() {
        let (task, attempts) = task(10);

        assert!(task.execute(Perform(notification())).await.is_err());
        assert_eq!(attempts.get(), 3);
    }
}
