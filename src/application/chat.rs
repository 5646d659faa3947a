use crate::application::notify::Notifier;
use crate::domain::chat::{ChatMessage, ChatSender};
use crate::domain::order::Order;
use crate::domain::ports::{ChatStoreRef, OrderStoreRef};
use crate::error::{OrderError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Customer/admin messaging scoped to one order, gated by `chat_enabled`.
///
/// The gate itself is toggled only by the reconciliation state machine,
/// consultation intake, and explicit admin override; this service merely
/// enforces it.
pub struct ChatService {
    orders: OrderStoreRef,
    messages: ChatStoreRef,
    notifier: Arc<Notifier>,
}

impl ChatService {
    pub fn new(orders: OrderStoreRef, messages: ChatStoreRef, notifier: Arc<Notifier>) -> Self {
        Self {
            orders,
            messages,
            notifier,
        }
    }

    /// Customers authenticate with the order's public token.
    pub async fn send_as_customer(&self, token: &str, body: &str) -> Result<ChatMessage> {
        validate_body(body)?;
        let order = self
            .orders
            .get_by_token(token)
            .await?
            .ok_or(OrderError::Unauthorized)?;
        let message = self
            .append(&order, ChatSender::Customer, body)
            .await?;
        self.notifier.chat_alert(&order, body).await;
        Ok(message)
    }

    /// Admin identity is established by the caller.
    pub async fn send_as_admin(&self, order_id: Uuid, body: &str) -> Result<ChatMessage> {
        validate_body(body)?;
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id}")))?;
        self.append(&order, ChatSender::Admin, body).await
    }

    pub async fn history(&self, order_id: Uuid) -> Result<Vec<ChatMessage>> {
        self.messages.history(order_id).await
    }

    async fn append(
        &self,
        order: &Order,
        sender: ChatSender,
        body: &str,
    ) -> Result<ChatMessage> {
        if !order.chat_enabled {
            return Err(OrderError::ChatDisabled);
        }
        let message = ChatMessage::new(order.id, sender, body.trim().to_string());
        self.messages.append(message.clone()).await?;
        Ok(message)
    }
}

fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(OrderError::Validation("message body must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Amount;
    use crate::domain::ports::OrderStore;
    use crate::infrastructure::in_memory::{
        InMemoryChatStore, InMemoryOrderStore, RecordingMailer,
    };

    struct Fixture {
        orders: Arc<InMemoryOrderStore>,
        mailer: RecordingMailer,
        chat: ChatService,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(InMemoryOrderStore::new());
        let mailer = RecordingMailer::new();
        let notifier = Arc::new(Notifier::new(
            Arc::new(mailer.clone()),
            "admin@example.com".into(),
        ));
        let chat = ChatService::new(
            orders.clone(),
            Arc::new(InMemoryChatStore::new()),
            notifier,
        );
        Fixture {
            orders,
            mailer,
            chat,
        }
    }

    async fn seed(f: &Fixture, chat_enabled: bool) -> Order {
        let mut order = Order::new_commission(
            1,
            "Ada".into(),
            "ada@example.com".into(),
            "design".into(),
            "logo".into(),
            Amount::from_units(100_000),
        );
        if chat_enabled {
            order.confirm_down_payment();
        }
        f.orders.insert(order.clone()).await.unwrap();
        order
    }

    #[tokio::test]
    async fn customer_message_before_deposit_is_rejected() {
        let f = fixture();
        let order = seed(&f, false).await;
        assert!(matches!(
            f.chat.send_as_customer(&order.token, "hello").await,
            Err(OrderError::ChatDisabled)
        ));
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let f = fixture();
        seed(&f, true).await;
        assert!(matches!(
            f.chat.send_as_customer("not-a-token", "hello").await,
            Err(OrderError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn customer_message_alerts_the_admin() {
        let f = fixture();
        let order = seed(&f, true).await;

        f.chat
            .send_as_customer(&order.token, "how is it going?")
            .await
            .unwrap();

        let history = f.chat.history(order.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender, ChatSender::Customer);

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "admin@example.com");
    }

    #[tokio::test]
    async fn admin_reply_lands_in_the_same_log() {
        let f = fixture();
        let order = seed(&f, true).await;
        f.chat
            .send_as_customer(&order.token, "question")
            .await
            .unwrap();
        f.chat.send_as_admin(order.id, "answer").await.unwrap();

        let history = f.chat.history(order.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sender, ChatSender::Admin);
    }

    #[tokio::test]
    async fn blank_body_is_rejected() {
        let f = fixture();
        let order = seed(&f, true).await;
        assert!(matches!(
            f.chat.send_as_customer(&order.token, "   ").await,
            Err(OrderError::Validation(_))
        ));
    }
}
