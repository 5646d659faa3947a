use crate::domain::chat::ChatMessage;
use crate::domain::gateway::{FraudStatus, GatewayStatus};
use crate::domain::order::{Amount, Order, PaymentLeg, PaymentStatus};
use crate::domain::portfolio::PortfolioEntry;
use crate::domain::session::PaymentSession;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    async fn get_by_number(&self, number: u64) -> Result<Option<Order>>;
    async fn get_by_token(&self, token: &str) -> Result<Option<Order>>;
    /// Unconditional write, used for admin patches and session bookkeeping.
    async fn update(&self, order: Order) -> Result<()>;
    /// Atomic conditional update: writes `updated` only while the given
    /// payment leg still holds `expected`. Returns `false` when a concurrent
    /// writer got there first.
    async fn transition(
        &self,
        id: Uuid,
        leg: PaymentLeg,
        expected: PaymentStatus,
        updated: Order,
    ) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn all(&self) -> Result<Vec<Order>>;
    /// Hands out the next human-facing order number; monotonic, gap-tolerant.
    async fn next_order_number(&self) -> Result<u64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: PaymentSession) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Option<PaymentSession>>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append(&self, message: ChatMessage) -> Result<()>;
    async fn history(&self, order_id: Uuid) -> Result<Vec<ChatMessage>>;
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Upsert by natural key; returns `true` only when a new entry was
    /// created, so repeated publishes stay idempotent.
    async fn publish(&self, entry: PortfolioEntry) -> Result<bool>;
    async fn get(&self, key: &str) -> Result<Option<PortfolioEntry>>;
}

/// What the external processor hands back for a freshly created session.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub token: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_session(
        &self,
        session_id: &str,
        amount: Amount,
        customer_email: &str,
    ) -> Result<CheckoutSession>;
    async fn get_status(&self, session_id: &str)
    -> Result<(GatewayStatus, Option<FraudStatus>)>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type ChatStoreRef = Arc<dyn ChatStore>;
pub type PortfolioStoreRef = Arc<dyn PortfolioStore>;
pub type PaymentProcessorRef = Arc<dyn PaymentProcessor>;
pub type MailerRef = Arc<dyn Mailer>;
