use crate::domain::order::{Amount, PaymentLeg};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One attempt to collect one payment leg via the external processor.
///
/// Ephemeral, but must stay retrievable by `session_id` so reconciliation can
/// find the attempt a gateway callback refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub order_id: Uuid,
    pub order_number: u64,
    pub leg: PaymentLeg,
    pub session_id: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Builds a gateway session id following the `{prefix}-{number}-{timestamp}`
/// convention the processor echoes back in callbacks. Millisecond precision
/// keeps rapid retry attempts from colliding on the same id.
pub fn encode_session_id(leg: PaymentLeg, order_number: u64, at: DateTime<Utc>) -> String {
    format!("{}-{}-{}", leg.prefix(), order_number, at.timestamp_millis())
}

/// Strictly decodes a session id back into its payment leg and order number.
///
/// The encoded prefix is authoritative for which leg a callback refers to;
/// a malformed id is rejected outright rather than guessed at.
pub fn decode_session_id(session_id: &str) -> Result<(PaymentLeg, u64)> {
    let malformed = || OrderError::MalformedSessionId(session_id.to_string());

    let mut parts = session_id.split('-');
    let prefix = parts.next().ok_or_else(malformed)?;
    let number = parts.next().ok_or_else(malformed)?;
    let timestamp = parts.next().ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }

    let leg = PaymentLeg::from_prefix(prefix).ok_or_else(malformed)?;
    let number: u64 = number.parse().map_err(|_| malformed())?;
    timestamp.parse::<i64>().map_err(|_| malformed())?;
    Ok((leg, number))
}
