//! [`Outbox`] of [`Notification`]s.

use tokio::sync::mpsc;
use tracing as log;

use crate::domain::Notification;

/// Sending side of the in-process [`Notification`] queue.
///
/// [`Notification`]s are enqueued once the triggering operation is committed
/// and delivered by the [`DispatchNotifications`] task.
///
/// [`DispatchNotifications`]: crate::task::DispatchNotifications
#[derive(Clone, Debug)]
pub struct Outbox(mpsc::UnboundedSender<Notification>);

/// Receiving side of the in-process [`Notification`] queue.
#[derive(Debug)]
pub struct Inbox(pub(crate) mpsc::UnboundedReceiver<Notification>);

impl Outbox {
    /// Creates a new [`Outbox`] along with its [`Inbox`].
    #[must_use]
    pub fn new() -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), Inbox(rx))
    }

    /// Enqueues the provided [`Notification`] for delivery.
    ///
    /// Never fails: a [`Notification`] that cannot be enqueued is logged and
    /// dropped.
    pub fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.0.send(notification) {
            log::error!(
                "failed to enqueue `{}` notification: inbox is closed",
                e.0.title,
            );
        }
    }
}

impl Inbox {
    /// Receives the next [`Notification`].
    ///
    /// [`None`] is returned once every [`Outbox`] is dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.0.recv().await
    }
}
