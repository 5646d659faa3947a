use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published portfolio entry derived from a completed order.
///
/// Keyed by a natural key rather than a random id so repeated publishes of
/// the same order collapse into one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub key: String,
    pub service: String,
    pub title: String,
    pub order_number: u64,
    pub published_at: DateTime<Utc>,
}

impl PortfolioEntry {
    pub fn from_order(order: &crate::domain::order::Order) -> Self {
        Self {
            key: natural_key(&order.service, order.number),
            service: order.service.clone(),
            title: format!("{} for {}", order.service, order.customer_name),
            order_number: order.number,
            published_at: Utc::now(),
        }
    }
}

/// Natural key format: `{service-slug}-{orderNumber}`.
pub fn natural_key(service: &str, order_number: u64) -> String {
    format!("{}-{}", slug(service), order_number)
}

fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
