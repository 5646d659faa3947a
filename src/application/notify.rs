use crate::domain::order::{Order, PaymentLeg};
use crate::domain::ports::MailerRef;
use tracing::warn;

/// Fire-and-forget email side effects.
///
/// A failed send is logged and swallowed; it never rolls back the transition
/// that triggered it and is never retried synchronously.
pub struct Notifier {
    mailer: MailerRef,
    admin_email: String,
}

impl Notifier {
    pub fn new(mailer: MailerRef, admin_email: String) -> Self {
        Self { mailer, admin_email }
    }

    pub async fn order_received(&self, order: &Order) {
        let subject = format!("Order #{} received", order.number);
        let html = format!(
            "<p>Hi {}, we received your {} order. Total: {}.</p>",
            order.customer_name, order.service, order.gross
        );
        self.dispatch(&order.customer_email, &subject, &html).await;
    }

    pub async fn payment_confirmed(&self, order: &Order, leg: PaymentLeg) {
        let subject = match leg {
            PaymentLeg::Down => format!("Deposit confirmed for order #{}", order.number),
            PaymentLeg::Final => format!("Order #{} completed", order.number),
        };
        let html = format!(
            "<p>Payment of {} for order #{} is confirmed.</p>",
            order.leg_amount(leg),
            order.number
        );
        self.dispatch(&order.customer_email, &subject, &html).await;
    }

    pub async fn chat_alert(&self, order: &Order, body: &str) {
        let subject = format!("New message on order #{}", order.number);
        let html = format!("<p>{}: {}</p>", order.customer_name, body);
        self.dispatch(&self.admin_email, &subject, &html).await;
    }

    async fn dispatch(&self, to: &str, subject: &str, html: &str) {
        if let Err(err) = self.mailer.send(to, subject, html).await {
            warn!(%to, %subject, %err, "notification send failed, continuing");
        }
    }
}
