use crate::domain::chat::ChatMessage;
use crate::domain::gateway::{FraudStatus, GatewayStatus};
use crate::domain::order::{Amount, Order, PaymentLeg, PaymentStatus};
use crate::domain::portfolio::PortfolioEntry;
use crate::domain::ports::{
    ChatStore, CheckoutSession, Mailer, OrderStore, PaymentProcessor, PortfolioStore,
    SessionStore,
};
use crate::domain::session::PaymentSession;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory order store.
///
/// The write lock makes [`OrderStore::transition`] a genuine compare-and-swap:
/// the leg status check and the overwrite happen under one exclusive guard.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
    next_number: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.number == number).cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.token == token).cloned())
    }

    async fn update(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id) {
            return Err(OrderError::NotFound(format!("order {}", order.id)));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        leg: PaymentLeg,
        expected: PaymentStatus,
        updated: Order,
    ) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&id)
            .ok_or_else(|| OrderError::NotFound(format!("order {id}")))?;
        if current.leg_status(leg) != expected {
            return Ok(false);
        }
        orders.insert(id, updated);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut orders = self.orders.write().await;
        Ok(orders.remove(&id).is_some())
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.number);
        Ok(all)
    }

    async fn next_order_number(&self) -> Result<u64> {
        Ok(self.next_number.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, PaymentSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: PaymentSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<PaymentSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryChatStore {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn append(&self, message: ChatMessage) -> Result<()> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }

    async fn history(&self, order_id: Uuid) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        let mut scoped: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.order_id == order_id)
            .cloned()
            .collect();
        scoped.sort_by_key(|m| m.created_at);
        Ok(scoped)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPortfolioStore {
    entries: Arc<RwLock<HashMap<String, PortfolioEntry>>>,
}

impl InMemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for InMemoryPortfolioStore {
    async fn publish(&self, entry: PortfolioEntry) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.key) {
            return Ok(false);
        }
        entries.insert(entry.key.clone(), entry);
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<PortfolioEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }
}

/// Mailer that records every send instead of talking to a transport.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        let mut sent = self.sent.write().await;
        sent.push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

/// Deterministic processor stand-in: created sessions start out pending and
/// their reported status can be scripted per session id.
#[derive(Default, Clone)]
pub struct ScriptedProcessor {
    statuses: Arc<RwLock<HashMap<String, (GatewayStatus, Option<FraudStatus>)>>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script(
        &self,
        session_id: &str,
        status: GatewayStatus,
        fraud: Option<FraudStatus>,
    ) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(session_id.to_string(), (status, fraud));
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn create_session(
        &self,
        session_id: &str,
        _amount: Amount,
        _customer_email: &str,
    ) -> Result<CheckoutSession> {
        let mut statuses = self.statuses.write().await;
        statuses
            .entry(session_id.to_string())
            .or_insert((GatewayStatus::Pending, None));
        Ok(CheckoutSession {
            token: format!("tok-{session_id}"),
            redirect_url: format!("https://gateway.example/pay/{session_id}"),
        })
    }

    async fn get_status(
        &self,
        session_id: &str,
    ) -> Result<(GatewayStatus, Option<FraudStatus>)> {
        let statuses = self.statuses.read().await;
        statuses
            .get(session_id)
            .copied()
            .ok_or_else(|| OrderError::GatewayUnavailable(format!("unknown session {session_id}")))
    }
}
