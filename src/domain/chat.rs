use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    Customer,
    Admin,
}

impl std::fmt::Display for ChatSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChatSender::Customer => "customer",
            ChatSender::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// One entry in an order's append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub order_id: Uuid,
    pub sender: ChatSender,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(order_id: Uuid, sender: ChatSender, body: String) -> Self {
        Self {
            order_id,
            sender,
            body,
            created_at: Utc::now(),
        }
    }
}
