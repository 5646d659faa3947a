use crate::application::notify::Notifier;
use crate::domain::gateway::{FraudStatus, GatewayStatus, PaymentOutcome};
use crate::domain::order::{Order, PaymentLeg, PaymentStatus};
use crate::domain::portfolio::PortfolioEntry;
use crate::domain::ports::{OrderStoreRef, PortfolioStoreRef};
use crate::domain::session::decode_session_id;
use crate::error::{OrderError, Result};
use std::sync::Arc;
use tracing::info;

/// Result of applying one gateway result to one payment leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The leg moved to the given status and side effects ran once.
    Applied(PaymentStatus),
    /// The leg was already where the result would put it; nothing changed
    /// and no side effect was re-triggered.
    NoChange(PaymentStatus),
}

/// Applies gateway results to the order ledger.
///
/// Both the webhook push path and the polling pull path converge on
/// [`Reconciler::apply`]. Every transition goes through the store's
/// conditional update so two racing attempts resolve to exactly one applied
/// transition and one safe no-op.
pub struct Reconciler {
    orders: OrderStoreRef,
    portfolio: PortfolioStoreRef,
    notifier: Arc<Notifier>,
}

impl Reconciler {
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

    /// Push entry point: a processor callback identified by its session id.
    ///
    /// The payment leg comes from the session id's encoded prefix, which is
    /// authoritative; a malformed id is a hard error, never a guess.
    pub async fn apply_webhook(
        &self,
        session_id: &str,
        status: GatewayStatus,
        fraud: Option<FraudStatus>,
    ) -> Result<ReconcileOutcome> {
        let (leg, number) = decode_session_id(session_id)?;
        let order = self
            .orders
            .get_by_number(number)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order #{number}")))?;
        let outcome = PaymentOutcome::from_gateway(status, fraud);
        self.apply(order, leg, outcome).await
    }

    /// Applies a translated gateway outcome to one leg of an order.
    pub async fn apply(
        &self,
        order: Order,
        leg: PaymentLeg,
        outcome: PaymentOutcome,
    ) -> Result<ReconcileOutcome> {
        // Final payment is gated on the deposit; reject without mutating.
        if leg == PaymentLeg::Final && order.down_payment_status != PaymentStatus::Paid {
            return Err(OrderError::Sequence(
                "final payment cannot settle before the down payment".into(),
            ));
        }

        let target = match outcome {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Unpaid => PaymentStatus::Unpaid,
            PaymentOutcome::Pending => PaymentStatus::Pending,
        };

        let mut current_view = order;
        // One internal retry after a lost conditional update.
        for attempt in 0..2 {
            let current = current_view.leg_status(leg);
            // A settled leg never moves again; duplicate results short-circuit
            // so side effects cannot double-fire.
            if current == PaymentStatus::Paid {
                return Ok(ReconcileOutcome::NoChange(PaymentStatus::Paid));
            }
            if current == target {
                return Ok(ReconcileOutcome::NoChange(current));
            }

            let updated = projected(current_view.clone(), leg, target);
            let applied = self
                .orders
                .transition(updated.id, leg, current, updated.clone())
                .await?;
            if applied {
                info!(
                    number = updated.number,
                    %leg,
                    from = %current,
                    to = %target,
                    "payment leg transitioned"
                );
                if target == PaymentStatus::Paid {
                    self.notifier.payment_confirmed(&updated, leg).await;
                    if leg == PaymentLeg::Final {
                        self.publish_portfolio(&updated).await?;
                    }
                }
                return Ok(ReconcileOutcome::Applied(target));
            }

            if attempt == 0 {
                current_view = self
                    .orders
                    .get(updated.id)
                    .await?
                    .ok_or_else(|| OrderError::NotFound(format!("order {}", updated.id)))?;
            }
        }
        Err(OrderError::ReconciliationConflict)
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

fn projected(mut order: Order, leg: PaymentLeg, target: PaymentStatus) -> Order {
    match (leg, target) {
        (PaymentLeg::Down, PaymentStatus::Paid) => order.confirm_down_payment(),
        (PaymentLeg::Final, PaymentStatus::Paid) => order.confirm_final_payment(),
        (_, other) => order.set_leg_status(leg, other),
    }
    order
}
