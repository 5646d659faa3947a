use crate::application::reconcile::{ReconcileOutcome, Reconciler};
use crate::domain::gateway::PaymentOutcome;
use crate::domain::order::{Order, PaymentLeg, PaymentStatus};
use crate::domain::ports::{OrderStoreRef, PaymentProcessorRef, SessionStoreRef};
use crate::domain::session::{PaymentSession, decode_session_id, encode_session_id};
use crate::error::{OrderError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// What the caller needs to send the customer into the hosted payment page.
/// `token`/`redirect_url` are absent when the zero-amount bypass fired.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub session_id: String,
    pub token: Option<String>,
    pub redirect_url: Option<String>,
}

/// Creates payment sessions against the external processor and feeds status
/// queries into the reconciler.
///
/// A session id is never handed back to the caller before both the session
/// record and the order's `gateway_session_id` are durably written.
pub struct PaymentGateway {
    processor: PaymentProcessorRef,
    orders: OrderStoreRef,
    sessions: SessionStoreRef,
    reconciler: Arc<Reconciler>,
}

impl PaymentGateway {
    pub fn new(
        processor: PaymentProcessorRef,
        orders: OrderStoreRef,
        sessions: SessionStoreRef,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            processor,
            orders,
            sessions,
            reconciler,
        }
    }

    /// Starts one payment attempt for one leg of an order.
    ///
    /// Every attempt gets a fresh session id; a stale pending session is
    /// overwritten so only the newest one is authoritative.
    pub async fn start_payment(&self, number: u64, leg: PaymentLeg) -> Result<Checkout> {
        let order = self.require_by_number(number).await?;
        if order.leg_status(leg) == PaymentStatus::Paid {
            return Err(OrderError::AlreadyPaid(leg));
        }
        if leg == PaymentLeg::Final && order.down_payment_status != PaymentStatus::Paid {
            return Err(OrderError::Sequence(
                "final payment cannot start before the down payment settles".into(),
            ));
        }

        let amount = order.leg_amount(leg);
        let session_id = encode_session_id(leg, order.number, Utc::now());

        if amount.is_zero() {
            // Zero-amount bypass: no external processor involved, but the
            // placeholder session still gives later status checks a key.
            self.persist_session(&order, leg, &session_id).await?;
            let order = self.require_by_number(number).await?;
            self.reconciler
                .apply(order, leg, PaymentOutcome::Paid)
                .await?;
            info!(number, %leg, %session_id, "zero-amount payment bypassed gateway");
            return Ok(Checkout {
                session_id,
                token: None,
                redirect_url: None,
            });
        }

        // Gateway failure surfaces before anything is persisted; the order
        // stays untouched and the attempt is safe to retry.
        let checkout = self
            .processor
            .create_session(&session_id, amount, &order.customer_email)
            .await?;

        self.persist_session(&order, leg, &session_id).await?;
        info!(number, %leg, %session_id, "payment session created");
        Ok(Checkout {
            session_id,
            token: Some(checkout.token),
            redirect_url: Some(checkout.redirect_url),
        })
    }

    /// Pull entry point: refresh an order's payment state from the processor
    /// using the session id persisted at creation time. Errors surface to
    /// the caller, unlike the webhook path.
    pub async fn sync(&self, number: u64) -> Result<ReconcileOutcome> {
        let order = self.require_by_number(number).await?;
        let session_id = order.gateway_session_id.clone().ok_or_else(|| {
            OrderError::NotFound(format!("no payment session recorded for order #{number}"))
        })?;
        let (leg, _) = decode_session_id(&session_id)?;
        let (status, fraud) = self.processor.get_status(&session_id).await?;
        let outcome = PaymentOutcome::from_gateway(status, fraud);
        self.reconciler.apply(order, leg, outcome).await
    }

    /// Writes the session record and stamps the order, moving the leg to
    /// pending. Runs through the conditional update so a reconciliation
    /// racing this call cannot be overwritten.
    async fn persist_session(
        &self,
        order: &Order,
        leg: PaymentLeg,
        session_id: &str,
    ) -> Result<()> {
        self.sessions
            .insert(PaymentSession {
                order_id: order.id,
                order_number: order.number,
                leg,
                session_id: session_id.to_string(),
                amount: order.leg_amount(leg),
                created_at: Utc::now(),
            })
            .await?;

        let mut current = order.clone();
        for attempt in 0..2 {
            let expected = current.leg_status(leg);
            if expected == PaymentStatus::Paid {
                return Err(OrderError::AlreadyPaid(leg));
            }
            let mut updated = current.clone();
            updated.gateway_session_id = Some(session_id.to_string());
            if !updated.leg_amount(leg).is_zero() {
                updated.set_leg_status(leg, PaymentStatus::Pending);
            }
            if self
                .orders
                .transition(updated.id, leg, expected, updated)
                .await?
            {
                return Ok(());
            }
            if attempt == 0 {
                current = self
                    .orders
                    .get(order.id)
                    .await?
                    .ok_or_else(|| OrderError::NotFound(format!("order {}", order.id)))?;
            }
        }
        Err(OrderError::ReconciliationConflict)
    }

    async fn require_by_number(&self, number: u64) -> Result<Order> {
        self.orders
            .get_by_number(number)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order #{number}")))
    }
}
