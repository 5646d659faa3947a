use serde::{Deserialize, Serialize};

/// Raw transaction status reported by the external processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
}

/// Fraud screening verdict attached to capture-style statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
}

/// Internal reading of a gateway result, decoupled from the processor's
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    Unpaid,
    Pending,
}

impl PaymentOutcome {
    /// Translates a gateway status (plus optional fraud verdict) into the
    /// internal outcome.
    ///
    /// Capture/settlement only count as paid when fraud screening accepted
    /// the transaction or was not performed; a challenge keeps the leg
    /// pending until the processor re-notifies.
    pub fn from_gateway(status: GatewayStatus, fraud: Option<FraudStatus>) -> Self {
        match status {
            GatewayStatus::Capture | GatewayStatus::Settlement => match fraud {
                None | Some(FraudStatus::Accept) => PaymentOutcome::Paid,
                Some(FraudStatus::Challenge) => PaymentOutcome::Pending,
                Some(FraudStatus::Deny) => PaymentOutcome::Unpaid,
            },
            GatewayStatus::Deny | GatewayStatus::Cancel | GatewayStatus::Expire => {
                PaymentOutcome::Unpaid
            }
            GatewayStatus::Pending => PaymentOutcome::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_without_fraud_check_is_paid() {
        assert_eq!(
            PaymentOutcome::from_gateway(GatewayStatus::Settlement, None),
            PaymentOutcome::Paid
        );
    }

    #[test]
    fn capture_respects_fraud_verdict() {
        assert_eq!(
            PaymentOutcome::from_gateway(GatewayStatus::Capture, Some(FraudStatus::Accept)),
            PaymentOutcome::Paid
        );
        assert_eq!(
            PaymentOutcome::from_gateway(GatewayStatus::Capture, Some(FraudStatus::Challenge)),
            PaymentOutcome::Pending
        );
        assert_eq!(
            PaymentOutcome::from_gateway(GatewayStatus::Capture, Some(FraudStatus::Deny)),
            PaymentOutcome::Unpaid
        );
    }

    #[test]
    fn terminal_failures_map_to_unpaid() {
        for status in [GatewayStatus::Deny, GatewayStatus::Cancel, GatewayStatus::Expire] {
            assert_eq!(
                PaymentOutcome::from_gateway(status, None),
                PaymentOutcome::Unpaid
            );
        }
    }

    #[test]
    fn pending_stays_pending() {
        assert_eq!(
            PaymentOutcome::from_gateway(GatewayStatus::Pending, None),
            PaymentOutcome::Pending
        );
    }
}
