use crate::domain::order::PaymentLeg;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrderError>;

/// Error taxonomy for the order and payment core.
///
/// Validation and sequencing failures are rejected before any mutation.
/// Gateway failures leave the order untouched and are safe to retry.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("payment sequence violation: {0}")]
    Sequence(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("chat is not enabled for this order")]
    ChatDisabled,
    #[error("{0} payment is already settled")]
    AlreadyPaid(PaymentLeg),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("concurrent reconciliation lost the conditional update")]
    ReconciliationConflict,
    #[error("malformed payment session id: {0}")]
    MalformedSessionId(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
