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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One transaction inside the sandbox gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxTransaction {
    pub status: GatewayStatus,
    pub fraud: Option<FraudStatus>,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEmail {
    pub to: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

/// Everything the CLI persists between invocations, as one JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    next_order_number: u64,
    orders: Vec<Order>,
    sessions: Vec<PaymentSession>,
    messages: Vec<ChatMessage>,
    portfolio: Vec<PortfolioEntry>,
    /// Deterministic stand-in for the external processor: sessions created
    /// here start pending and are flipped by the `gateway` subcommands.
    sandbox: HashMap<String, SandboxTransaction>,
    outbox: Vec<OutboxEmail>,
}

/// JSON-file-backed implementation of every port, plus the sandbox
/// processor and the email outbox.
///
/// Mutations touch only the in-memory document; [`FileState::save`] writes
/// it back once per CLI invocation.
pub struct FileState {
    path: PathBuf,
    state: RwLock<StateDocument>,
}

impl FileState {
    pub async fn load(path: &Path) -> Result<Arc<Self>> {
        let state = if tokio::fs::try_exists(path).await? {
            let raw = tokio::fs::read(path).await?;
            serde_json::from_slice(&raw)?
        } else {
            StateDocument::default()
        };
        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        }))
    }

    pub async fn save(&self) -> Result<()> {
        let state = self.state.read().await;
        let raw = serde_json::to_vec_pretty(&*state)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    /// Flips a sandbox transaction, standing in for the customer finishing
    /// (or abandoning) the hosted payment page.
    pub async fn sandbox_set(
        &self,
        session_id: &str,
        status: GatewayStatus,
        fraud: Option<FraudStatus>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let tx = state
            .sandbox
            .get_mut(session_id)
            .ok_or_else(|| OrderError::NotFound(format!("sandbox session {session_id}")))?;
        tx.status = status;
        tx.fraud = fraud;
        Ok(())
    }

    pub async fn sandbox_get(&self, session_id: &str) -> Result<SandboxTransaction> {
        let state = self.state.read().await;
        state
            .sandbox
            .get(session_id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(format!("sandbox session {session_id}")))
    }

    pub async fn outbox(&self) -> Vec<OutboxEmail> {
        self.state.read().await.outbox.clone()
    }

    pub async fn portfolio_entries(&self) -> Vec<PortfolioEntry> {
        self.state.read().await.portfolio.clone()
    }
}

#[async_trait]
impl OrderStore for FileState {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.push(order);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.number == number).cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.token == token).cloned())
    }

    async fn update(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        let slot = state
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order.id)))?;
        *slot = order;
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        leg: PaymentLeg,
        expected: PaymentStatus,
        updated: Order,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let slot = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| OrderError::NotFound(format!("order {id}")))?;
        if slot.leg_status(leg) != expected {
            return Ok(false);
        }
        *slot = updated;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        Ok(state.orders.len() < before)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut all = state.orders.clone();
        all.sort_by_key(|o| o.number);
        Ok(all)
    }

    async fn next_order_number(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.next_order_number += 1;
        Ok(state.next_order_number)
    }
}

#[async_trait]
impl SessionStore for FileState {
    async fn insert(&self, session: PaymentSession) -> Result<()> {
        let mut state = self.state.write().await;
        state.sessions.push(session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<PaymentSession>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }
}

#[async_trait]
impl ChatStore for FileState {
    async fn append(&self, message: ChatMessage) -> Result<()> {
        let mut state = self.state.write().await;
        state.messages.push(message);
        Ok(())
    }

    async fn history(&self, order_id: Uuid) -> Result<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let mut scoped: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.order_id == order_id)
            .cloned()
            .collect();
        scoped.sort_by_key(|m| m.created_at);
        Ok(scoped)
    }
}

#[async_trait]
impl PortfolioStore for FileState {
    async fn publish(&self, entry: PortfolioEntry) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.portfolio.iter().any(|e| e.key == entry.key) {
            return Ok(false);
        }
        state.portfolio.push(entry);
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<PortfolioEntry>> {
        let state = self.state.read().await;
        Ok(state.portfolio.iter().find(|e| e.key == key).cloned())
    }
}

#[async_trait]
impl PaymentProcessor for FileState {
    async fn create_session(
        &self,
        session_id: &str,
        amount: Amount,
        _customer_email: &str,
    ) -> Result<CheckoutSession> {
        let mut state = self.state.write().await;
        state.sandbox.insert(
            session_id.to_string(),
            SandboxTransaction {
                status: GatewayStatus::Pending,
                fraud: None,
                amount,
            },
        );
        Ok(CheckoutSession {
            token: format!("tok-{session_id}"),
            redirect_url: format!("https://gateway.example/pay/{session_id}"),
        })
    }

    async fn get_status(
        &self,
        session_id: &str,
    ) -> Result<(GatewayStatus, Option<FraudStatus>)> {
        let state = self.state.read().await;
        state
            .sandbox
            .get(session_id)
            .map(|tx| (tx.status, tx.fraud))
            .ok_or_else(|| {
                OrderError::GatewayUnavailable(format!("unknown session {session_id}"))
            })
    }
}

#[async_trait]
impl Mailer for FileState {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.outbox.push(OutboxEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}
