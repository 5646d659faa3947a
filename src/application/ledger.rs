use crate::application::notify::Notifier;
use crate::domain::order::{
    Amount, Attachment, Order, OrderStatus, PaymentStatus,
};
use crate::domain::portfolio::PortfolioEntry;
use crate::domain::ports::{OrderStoreRef, PortfolioStoreRef};
use crate::domain::pricing::{self, ServiceConfig};
use crate::error::{OrderError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Admin-authorized field patch. The caller has already established the
/// admin identity; the ledger only enforces state invariants.
#[derive(Debug, Default, Clone)]
pub struct AdminPatch {
    pub status: Option<OrderStatus>,
    pub progress: Option<u8>,
    pub chat_enabled: Option<bool>,
}

/// The persisted order record and its lifecycle.
pub struct OrderLedger {
    orders: OrderStoreRef,
    portfolio: PortfolioStoreRef,
    notifier: Arc<Notifier>,
}

impl OrderLedger {
    pub fn new(
        orders: OrderStoreRef,
        portfolio: PortfolioStoreRef,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            orders,
            portfolio,
            notifier,
        }
    }

    pub async fn create_order(
        &self,
        customer_name: &str,
        customer_email: &str,
        service: &str,
        description: &str,
        gross_amount: i64,
    ) -> Result<Order> {
        validate_identity(customer_name, customer_email)?;
        if service.trim().is_empty() {
            return Err(OrderError::Validation("service must not be blank".into()));
        }
        let gross = Amount::new(gross_amount)?;

        let number = self.orders.next_order_number().await?;
        let order = Order::new_commission(
            number,
            customer_name.trim().to_string(),
            customer_email.trim().to_string(),
            service.trim().to_string(),
            description.to_string(),
            gross,
        );
        self.orders.insert(order.clone()).await?;
        info!(number, gross = %order.gross, "order created");
        self.notifier.order_received(&order).await;
        Ok(order)
    }

    /// Quotes a calculator configuration and creates the order in one step.
    /// A zero quote means the selection is empty or unavailable and is
    /// rejected before anything is persisted.
    pub async fn create_from_config(
        &self,
        customer_name: &str,
        customer_email: &str,
        description: &str,
        config: &ServiceConfig,
    ) -> Result<Order> {
        let quoted = pricing::quote(config);
        if quoted.is_zero() {
            return Err(OrderError::Validation(
                "selected service configuration is not available".into(),
            ));
        }
        let mut order = self
            .create_order(
                customer_name,
                customer_email,
                config.service_label(),
                description,
                quoted.units() as i64,
            )
            .await?;
        order.pricing_details = Some(config.clone());
        self.orders.update(order.clone()).await?;
        Ok(order)
    }

    /// Consultation intake: zero-cost order subtype that skips the payment
    /// phase entirely.
    pub async fn create_consultation(
        &self,
        customer_name: &str,
        customer_email: &str,
        description: &str,
    ) -> Result<Order> {
        validate_identity(customer_name, customer_email)?;
        let number = self.orders.next_order_number().await?;
        let order = Order::new_consultation(
            number,
            customer_name.trim().to_string(),
            customer_email.trim().to_string(),
            description.to_string(),
        );
        self.orders.insert(order.clone()).await?;
        info!(number, "consultation created");
        self.notifier.order_received(&order).await;
        Ok(order)
    }

    pub async fn apply_admin_update(&self, id: Uuid, patch: AdminPatch) -> Result<Order> {
        let mut order = self.require(id).await?;

        if let Some(progress) = patch.progress {
            if progress > 100 {
                return Err(OrderError::Validation(
                    "progress must be between 0 and 100".into(),
                ));
            }
            order.progress = progress;
        }
        if let Some(status) = patch.status {
            if status == OrderStatus::Done
                && order.final_payment_status != PaymentStatus::Paid
            {
                return Err(OrderError::Validation(
                    "order cannot be marked done before the final payment settles".into(),
                ));
            }
            order.status = status;
            if status == OrderStatus::Done {
                order.progress = 100;
            }
        }
        if let Some(chat_enabled) = patch.chat_enabled {
            order.chat_enabled = chat_enabled;
        }

        self.orders.update(order.clone()).await?;
        info!(number = order.number, status = %order.status, progress = order.progress, "admin update applied");

        if order.status == OrderStatus::Done || order.progress == 100 {
            self.publish_portfolio(&order).await?;
        }
        Ok(order)
    }

    pub async fn append_evidence(&self, id: Uuid, url: &str, label: &str) -> Result<Order> {
        self.append_attachment(id, url, label, false).await
    }

    pub async fn append_result(&self, id: Uuid, url: &str, label: &str) -> Result<Order> {
        self.append_attachment(id, url, label, true).await
    }

    async fn append_attachment(
        &self,
        id: Uuid,
        url: &str,
        label: &str,
        result_file: bool,
    ) -> Result<Order> {
        if url.trim().is_empty() {
            return Err(OrderError::Validation("attachment url must not be blank".into()));
        }
        let mut order = self.require(id).await?;
        let attachment = Attachment {
            url: url.trim().to_string(),
            label: label.to_string(),
            uploaded_at: Utc::now(),
        };
        if result_file {
            order.result_files.push(attachment);
        } else {
            order.evidence_links.push(attachment);
        }
        self.orders.update(order.clone()).await?;
        Ok(order)
    }

    /// Hard delete, no tombstone.
    pub async fn delete_order(&self, id: Uuid) -> Result<()> {
        if !self.orders.delete(id).await? {
            return Err(OrderError::NotFound(format!("order {id}")));
        }
        info!(%id, "order deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        self.orders.get(id).await
    }

    pub async fn get_by_number(&self, number: u64) -> Result<Option<Order>> {
        self.orders.get_by_number(number).await
    }

    pub async fn list(&self) -> Result<Vec<Order>> {
        self.orders.all().await
    }

    async fn require(&self, id: Uuid) -> Result<Order> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {id}")))
    }

    async fn publish_portfolio(&self, order: &Order) -> Result<()> {
        let entry = PortfolioEntry::from_order(order);
        let key = entry.key.clone();
        if self.portfolio.publish(entry).await? {
            info!(%key, "portfolio entry published");
        }
        Ok(())
    }
}

fn validate_identity(customer_name: &str, customer_email: &str) -> Result<()> {
    if customer_name.trim().is_empty() {
        return Err(OrderError::Validation("customer name must not be blank".into()));
    }
    if customer_email.trim().is_empty() {
        return Err(OrderError::Validation("customer email must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderKind;
    use crate::domain::pricing::{PhotographyMode, ServiceConfig};
    use crate::infrastructure::in_memory::{
        InMemoryOrderStore, InMemoryPortfolioStore, RecordingMailer,
    };

    fn ledger() -> (OrderLedger, RecordingMailer, PortfolioStoreRef) {
        let mailer = RecordingMailer::new();
        let portfolio: PortfolioStoreRef = Arc::new(InMemoryPortfolioStore::new());
        let notifier = Arc::new(Notifier::new(
            Arc::new(mailer.clone()),
            "admin@example.com".into(),
        ));
        let ledger = OrderLedger::new(
            Arc::new(InMemoryOrderStore::new()),
            portfolio.clone(),
            notifier,
        );
        (ledger, mailer, portfolio)
    }

    #[tokio::test]
    async fn create_order_splits_deposit_and_sends_receipt() {
        let (ledger, mailer, _) = ledger();
        let order = ledger
            .create_order("Ada", "ada@example.com", "design", "logo", 100_000)
            .await
            .unwrap();

        assert_eq!(order.down_payment.units(), 20_000);
        assert_eq!(order.final_payment.units(), 80_000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.number, 1);

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ada@example.com");
    }

    #[tokio::test]
    async fn create_order_rejects_bad_input() {
        let (ledger, _, _) = ledger();
        assert!(matches!(
            ledger.create_order("", "a@b.c", "web", "", 100).await,
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            ledger.create_order("Ada", "a@b.c", "web", "", -1).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_configuration_is_rejected_at_submission() {
        let (ledger, _, _) = ledger();
        let config = ServiceConfig::Photography {
            mode: PhotographyMode::Package { region: "atlantis".into() },
        };
        assert!(matches!(
            ledger
                .create_from_config("Ada", "a@b.c", "shoot", &config)
                .await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn configured_order_carries_the_quoted_amount() {
        let (ledger, _, _) = ledger();
        let config = ServiceConfig::Design { concepts: 2, revisions: 1 };
        let order = ledger
            .create_from_config("Ada", "ada@example.com", "logo set", &config)
            .await
            .unwrap();
        assert_eq!(order.service, "design");
        assert_eq!(order.gross.units(), 350_000);
        assert_eq!(order.down_payment.units(), 70_000);
        // The stored configuration re-derives the stored price.
        let stored = order.pricing_details.as_ref().unwrap();
        assert_eq!(pricing::quote(stored), order.gross);
    }

    #[tokio::test]
    async fn consultation_is_processing_with_chat_open() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_consultation("Ada", "ada@example.com", "advice")
            .await
            .unwrap();
        assert_eq!(order.kind, OrderKind::Consultation);
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.chat_enabled);
        assert!(order.gateway_session_id.is_none());
    }

    #[tokio::test]
    async fn admin_cannot_mark_done_before_final_payment() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order("Ada", "a@b.c", "web", "", 5000)
            .await
            .unwrap();
        let patch = AdminPatch { status: Some(OrderStatus::Done), ..Default::default() };
        assert!(matches!(
            ledger.apply_admin_update(order.id, patch).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn progress_100_publishes_portfolio_once() {
        let (ledger, _, portfolio) = ledger();
        let order = ledger
            .create_order("Ada", "a@b.c", "web", "", 5000)
            .await
            .unwrap();

        let patch = AdminPatch { progress: Some(100), ..Default::default() };
        ledger.apply_admin_update(order.id, patch.clone()).await.unwrap();
        ledger.apply_admin_update(order.id, patch).await.unwrap();

        let key = crate::domain::portfolio::natural_key("web", order.number);
        assert!(portfolio.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order("Ada", "a@b.c", "web", "", 5000)
            .await
            .unwrap();
        ledger.delete_order(order.id).await.unwrap();
        assert!(ledger.get(order.id).await.unwrap().is_none());
        assert!(matches!(
            ledger.delete_order(order.id).await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn attachments_are_append_only() {
        let (ledger, _, _) = ledger();
        let order = ledger
            .create_order("Ada", "a@b.c", "web", "", 5000)
            .await
            .unwrap();
        ledger
            .append_evidence(order.id, "https://cdn.example/wip-1.png", "first draft")
            .await
            .unwrap();
        let order = ledger
            .append_result(order.id, "https://cdn.example/final.zip", "deliverable")
            .await
            .unwrap();
        assert_eq!(order.evidence_links.len(), 1);
        assert_eq!(order.result_files.len(), 1);
    }
}
