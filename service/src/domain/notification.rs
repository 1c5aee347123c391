//! [`Notification`] definitions.

use std::collections::BTreeMap;

use common::{define_kind, DateTime, Money};

use crate::domain::{
    customer,
    reservation::{Payment, Reason, Status},
    tenant, Reservation,
};

/// Notification about some event, to be delivered to its recipient on a
/// best-effort basis.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// ID of the tenant this [`Notification`] is sent on behalf of.
    pub tenant_id: tenant::Id,

    /// ID of the customer account to notify, if any.
    pub customer_id: Option<customer::Id>,

    /// [`Channel`] to deliver this [`Notification`] through.
    pub channel: Channel,

    /// [`Recipient`] of this [`Notification`].
    pub recipient: Recipient,

    /// Title of this [`Notification`].
    pub title: String,

    /// Body of this [`Notification`].
    pub message: String,

    /// [`Category`] of this [`Notification`].
    pub category: Category,

    /// [`Priority`] of this [`Notification`].
    pub priority: Priority,

    /// Free-form metadata.
    pub metadata: BTreeMap<String, String>,

    /// [`DateTime`] to deliver this [`Notification`] at, if scheduled.
    pub send_at: Option<DateTime>,
}

impl Notification {
    /// Creates a new in-app [`Notification`] of the [`Reservation`] customer.
    #[must_use]
    pub fn in_app(reservation: &Reservation, content: Content) -> Self {
        Self::to_customer(reservation, Channel::InApp, Recipient::InApp, content)
    }

    /// Creates a new email [`Notification`] of the [`Reservation`] customer.
    #[must_use]
    pub fn email(reservation: &Reservation, content: Content) -> Self {
        let email = reservation.customer.email.clone();
        Self::to_customer(
            reservation,
            Channel::Email,
            Recipient::Email(email),
            content,
        )
    }

    /// Creates a new [`Notification`] of the [`Reservation`] customer.
    fn to_customer(
        reservation: &Reservation,
        channel: Channel,
        recipient: Recipient,
        content: Content,
    ) -> Self {
        let Content {
            title,
            message,
            category,
            priority,
            mut metadata,
        } = content;
        _ = metadata
            .insert("reservation_id".into(), reservation.id.to_string());
        _ = metadata.insert(
            "reservation_number".into(),
            reservation.number.to_string(),
        );
        Self {
            tenant_id: reservation.tenant_id,
            customer_id: reservation.customer.id,
            channel,
            recipient,
            title,
            message,
            category,
            priority,
            metadata,
            send_at: None,
        }
    }
}

/// Content of a [`Notification`] about a [`Reservation`] event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Content {
    /// Title of the [`Notification`].
    pub title: String,

    /// Body of the [`Notification`].
    pub message: String,

    /// [`Category`] of the [`Notification`].
    pub category: Category,

    /// [`Priority`] of the [`Notification`].
    pub priority: Priority,

    /// Event-specific metadata.
    pub metadata: BTreeMap<String, String>,
}

impl Content {
    /// Creates [`Content`] about the provided [`Reservation`] being created.
    #[must_use]
    pub fn created(reservation: &Reservation) -> Self {
        let outcome = if reservation.status == Status::Confirmed {
            "confirmed"
        } else {
            "received and is pending approval"
        };
        Self {
            title: format!("Reservation {} Created", reservation.number),
            message: format!(
                "Your reservation for {} item(s) has been {outcome}.",
                reservation.items.len(),
            ),
            category: Category::Reservation,
            priority: Priority::Normal,
            metadata: BTreeMap::from([
                ("start".into(), reservation.period.start().to_rfc3339()),
                ("end".into(), reservation.period.end().to_rfc3339()),
                ("total".into(), money(reservation, reservation.totals.total)),
                (
                    "deposit".into(),
                    money(reservation, reservation.totals.deposit),
                ),
                ("status".into(), reservation.status.to_string()),
            ]),
        }
    }

    /// Creates [`Content`] about the provided [`Reservation`] [`Status`]
    /// being changed.
    #[must_use]
    pub fn status_changed(
        reservation: &Reservation,
        from: Status,
        reason: Option<&Reason>,
    ) -> Self {
        let number = &reservation.number;
        let reason = reason.map(ToString::to_string);
        let (title, message) = match reservation.status {
            Status::Confirmed => (
                format!("Reservation {number} Confirmed"),
                "Your reservation has been confirmed. \
                 Please proceed with the deposit payment."
                    .to_owned(),
            ),
            Status::Rejected => (
                format!("Reservation {number} Rejected"),
                format!(
                    "Unfortunately, your reservation could not be confirmed. \
                     Reason: {}",
                    reason.as_deref().unwrap_or("N/A"),
                ),
            ),
            Status::InProgress => (
                format!("Reservation {number} In Progress"),
                "Your rental period has started. Enjoy your equipment!"
                    .to_owned(),
            ),
            Status::Completed => (
                format!("Reservation {number} Completed"),
                "Thank you for your rental! We hope to serve you again."
                    .to_owned(),
            ),
            Status::Cancelled => (
                format!("Reservation {number} Cancelled"),
                match &reason {
                    Some(r) => format!("Your reservation has been cancelled. {r}"),
                    None => "Your reservation has been cancelled.".to_owned(),
                },
            ),
            Status::Pending => (
                format!("Reservation {number} Pending"),
                "Your reservation is pending approval.".to_owned(),
            ),
        };
        let mut metadata = BTreeMap::from([
            ("from".into(), from.to_string()),
            ("to".into(), reservation.status.to_string()),
        ]);
        if let Some(r) = reason {
            _ = metadata.insert("reason".into(), r);
        }
        Self {
            title,
            message,
            category: Category::Reservation,
            priority: Priority::High,
            metadata,
        }
    }

    /// Creates [`Content`] about the provided [`Payment`] being received.
    #[must_use]
    pub fn payment_received(reservation: &Reservation, payment: &Payment) -> Self {
        Self {
            title: format!("Payment Received - {}", reservation.number),
            message: format!(
                "Payment of {:.2} {} received for your reservation.",
                payment.amount, reservation.totals.currency,
            ),
            category: Category::Payment,
            priority: Priority::Normal,
            metadata: BTreeMap::from([
                ("payment_id".into(), payment.id.to_string()),
                ("amount".into(), money(reservation, payment.amount)),
                ("kind".into(), payment.kind.to_string()),
            ]),
        }
    }
}

/// Formats the provided `amount` in the currency of the [`Reservation`].
fn money(reservation: &Reservation, amount: rust_decimal::Decimal) -> String {
    Money {
        amount,
        currency: reservation.totals.currency,
    }
    .to_string()
}

/// Recipient address of a [`Notification`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Recipient {
    /// Delivered inside the application, no address needed.
    InApp,

    /// [`customer::Email`] address.
    Email(customer::Email),

    /// [`customer::Phone`] number.
    Phone(customer::Phone),
}

define_kind! {
    #[doc = "Delivery channel of a [`Notification`]."]
    enum Channel {
        #[doc = "Email."]
        Email = 1,

        #[doc = "Short text message."]
        Sms = 2,

        #[doc = "Mobile push notification."]
        Push = 3,

        #[doc = "In-application notification."]
        InApp = 4,
    }
}

define_kind! {
    #[doc = "Category of a [`Notification`]."]
    enum Category {
        #[doc = "Reservation lifecycle event."]
        Reservation = 1,

        #[doc = "Payment event."]
        Payment = 2,
    }
}

define_kind! {
    #[doc = "Priority of a [`Notification`]."]
    enum Priority {
        #[doc = "Low priority."]
        Low = 1,

        #[doc = "Normal priority."]
        Normal = 2,

        #[doc = "High priority."]
        High = 3,
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::reservation::{
        payment,
        spec::{payment, reservation},
        Status,
    };

    use super::{Channel, Content, Notification, Recipient};

    #[test]
    fn formats_amounts_in_reservation_currency() {
        let r = reservation();

        let created = Content::created(&r);
        assert_eq!(created.title, format!("Reservation {} Created", r.number));
        assert_eq!(created.metadata["total"], "960TRY");
        assert_eq!(created.metadata["deposit"], "288TRY");

        let deposit = payment(&r, payment::Kind::Deposit);
        let paid = Content::payment_received(&r, &deposit);
        assert_eq!(paid.metadata["amount"], "288TRY");
        assert_eq!(
            paid.message,
            "Payment of 288.00 TRY received for your reservation.",
        );
    }

    #[test]
    fn addresses_customer_email() {
        let mut r = reservation();
        r.status = Status::Confirmed;
        let content = Content::status_changed(&r, Status::Pending, None);

        let n = Notification::email(&r, content);

        assert_eq!(n.channel, Channel::Email);
        assert_eq!(n.recipient, Recipient::Email(r.customer.email.clone()));
        assert_eq!(n.metadata["to"], Status::Confirmed.to_string());
    }
}
