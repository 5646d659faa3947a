use crate::application::reconcile::{ReconcileOutcome, Reconciler};
use crate::domain::gateway::{FraudStatus, GatewayStatus};
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Inbound payload the processor pushes after a payment attempt changes
/// state. `order_id` carries the session id we issued at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: GatewayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraud_status: Option<FraudStatus>,
}

impl WebhookNotification {
    /// Signature the processor attaches:
    /// `sha512(order_id + status_code + gross_amount + server_key)`.
    pub fn sign(
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        server_key: &str,
    ) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self, server_key: &str) -> Result<()> {
        let expected = Self::sign(
            &self.order_id,
            &self.status_code,
            &self.gross_amount,
            server_key,
        );
        if self.signature_key == expected {
            Ok(())
        } else {
            Err(OrderError::Unauthorized)
        }
    }
}

/// Parses, verifies and reconciles one webhook payload.
///
/// Callers at the transport boundary must acknowledge receipt regardless of
/// this result; failures here are for the operator log, not the processor.
pub async fn ingest(
    reconciler: &Reconciler,
    server_key: &str,
    payload: &str,
) -> Result<ReconcileOutcome> {
    let notification: WebhookNotification = serde_json::from_str(payload)?;
    notification.verify(server_key)?;
    reconciler
        .apply_webhook(
            &notification.order_id,
            notification.transaction_status,
            notification.fraud_status,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notify::Notifier;
    use crate::domain::order::{Amount, Order, PaymentStatus};
    use crate::domain::ports::OrderStore;
    use crate::infrastructure::in_memory::{
        InMemoryOrderStore, InMemoryPortfolioStore, RecordingMailer,
    };
    use std::sync::Arc;

    const KEY: &str = "test-server-key";

    fn signed(session_id: &str, status: &str) -> String {
        let signature = WebhookNotification::sign(session_id, "200", "20000", KEY);
        format!(
            r#"{{"order_id":"{session_id}","status_code":"200","gross_amount":"20000","signature_key":"{signature}","transaction_status":"{status}"}}"#
        )
    }

    async fn reconciler_with_order() -> (Reconciler, Arc<InMemoryOrderStore>) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let order = Order::new_commission(
            7,
            "Ada".into(),
            "ada@example.com".into(),
            "design".into(),
            "logo".into(),
            Amount::from_units(100_000),
        );
        orders.insert(order).await.unwrap();
        let notifier = Arc::new(Notifier::new(
            Arc::new(RecordingMailer::new()),
            "admin@example.com".into(),
        ));
        (
            Reconciler::new(orders.clone(), Arc::new(InMemoryPortfolioStore::new()), notifier),
            orders,
        )
    }

    #[tokio::test]
    async fn valid_signed_settlement_is_applied() {
        let (reconciler, orders) = reconciler_with_order().await;
        let payload = signed("DP-7-1719999999", "settlement");

        ingest(&reconciler, KEY, &payload).await.unwrap();
        let order = orders.get_by_number(7).await.unwrap().unwrap();
        assert_eq!(order.down_payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected_before_reconciliation() {
        let (reconciler, orders) = reconciler_with_order().await;
        let mut payload = signed("DP-7-1719999999", "settlement");
        payload = payload.replace("20000", "1");

        assert!(matches!(
            ingest(&reconciler, KEY, &payload).await,
            Err(OrderError::Unauthorized)
        ));
        let order = orders.get_by_number(7).await.unwrap().unwrap();
        assert_eq!(order.down_payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn unparseable_payload_is_an_error() {
        let (reconciler, _) = reconciler_with_order().await;
        assert!(matches!(
            ingest(&reconciler, KEY, "not json").await,
            Err(OrderError::Json(_))
        ));
    }
}
