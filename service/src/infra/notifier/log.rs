//! [`Log`] [`Notifier`] definitions.

use common::operations::Deliver;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{notification::Recipient, Notification},
    infra::{notifier, Notifier},
};

/// [`Notifier`] writing [`Notification`]s to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Deliver<Notification>> for Log {
    type Ok = ();
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Deliver(notification): Deliver<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            tenant_id,
            channel,
            recipient,
            title,
            category,
            priority,
            ..
        } = notification;

        let recipient = match recipient {
            Recipient::InApp => None,
            Recipient::Email(email) => Some(email.to_string()),
            Recipient::Phone(phone) => Some(phone.to_string()),
        };
        log::info!(
            %tenant_id,
            %channel,
            %category,
            %priority,
            recipient = recipient.as_deref(),
            "notification delivered: {title}",
        );
        Ok(())
    }
}
