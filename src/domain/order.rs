use crate::domain::pricing::ServiceConfig;
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monetary value in whole currency units (no fractional cents).
///
/// Wraps a `u64` so amounts are non-negative by construction; signed input is
/// validated at the boundary via [`Amount::new`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Result<Self> {
        if value < 0 {
            return Err(OrderError::Validation(
                "amount must not be negative".to_string(),
            ));
        }
        Ok(Self(value as u64))
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Splits a gross amount into the 20% deposit and the remainder.
    ///
    /// The deposit is `round(gross / 5)`; since a tie would require a
    /// fractional gross, integer rounding here is exact. The two halves always
    /// sum back to the gross.
    pub fn deposit_split(self) -> (Amount, Amount) {
        let down = (self.0 + 2) / 5;
        (Amount(down), Amount(self.0 - down))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of one payment leg. Closed enumeration so invalid states are
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// Overall workflow state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Done,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Done => "done",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The two payment legs of a commission: the 20% deposit that gates project
/// start and the remainder that gates closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLeg {
    Down,
    Final,
}

impl PaymentLeg {
    /// Prefix used in the gateway session-id convention (`DP-…` / `FP-…`).
    pub fn prefix(&self) -> &'static str {
        match self {
            PaymentLeg::Down => "DP",
            PaymentLeg::Final => "FP",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "DP" => Some(PaymentLeg::Down),
            "FP" => Some(PaymentLeg::Final),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentLeg::Down => "down",
            PaymentLeg::Final => "final",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Priced work with the deposit/remainder payment flow.
    Commission,
    /// Zero-cost intake that skips the payment phase entirely.
    Consultation,
}

/// A stored link to an uploaded artifact. The core keeps only the URL the
/// object store handed back, never the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub label: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The order aggregate root.
///
/// Mutated only through the ledger and the reconciliation state machine;
/// payment sub-statuses move via the store's conditional update so concurrent
/// reconciliation attempts cannot interleave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Sequential human-facing order number; monotonic, gap-tolerant.
    pub number: u64,
    /// Unguessable public token for customer-facing links. 128 bits of
    /// entropy, unlinkable to the order number.
    pub token: String,
    pub customer_name: String,
    pub customer_email: String,
    pub service: String,
    pub description: String,
    pub kind: OrderKind,
    /// Calculator configuration the gross was quoted from, kept so the
    /// price can be re-derived for audit. Absent for manually priced orders.
    pub pricing_details: Option<ServiceConfig>,
    pub gross: Amount,
    pub down_payment: Amount,
    pub final_payment: Amount,
    pub down_payment_status: PaymentStatus,
    pub final_payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub progress: u8,
    pub chat_enabled: bool,
    pub evidence_links: Vec<Attachment>,
    pub result_files: Vec<Attachment>,
    /// Correlation id of the most recent gateway session. Persisted at
    /// session-creation time, never reconstructed later.
    pub gateway_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new_commission(
        number: u64,
        customer_name: String,
        customer_email: String,
        service: String,
        description: String,
        gross: Amount,
    ) -> Self {
        let (down_payment, final_payment) = gross.deposit_split();
        Self {
            id: Uuid::new_v4(),
            number,
            token: generate_token(),
            customer_name,
            customer_email,
            service,
            description,
            kind: OrderKind::Commission,
            pricing_details: None,
            gross,
            down_payment,
            final_payment,
            down_payment_status: PaymentStatus::Unpaid,
            final_payment_status: PaymentStatus::Unpaid,
            status: OrderStatus::Pending,
            progress: 0,
            chat_enabled: false,
            evidence_links: Vec::new(),
            result_files: Vec::new(),
            gateway_session_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_consultation(
        number: u64,
        customer_name: String,
        customer_email: String,
        description: String,
    ) -> Self {
        let mut order = Self::new_commission(
            number,
            customer_name,
            customer_email,
            "consultation".to_string(),
            description,
            Amount::ZERO,
        );
        order.kind = OrderKind::Consultation;
        order.down_payment_status = PaymentStatus::Paid;
        order.final_payment_status = PaymentStatus::Paid;
        order.status = OrderStatus::Processing;
        order.chat_enabled = true;
        order
    }

    pub fn leg_amount(&self, leg: PaymentLeg) -> Amount {
        match leg {
            PaymentLeg::Down => self.down_payment,
            PaymentLeg::Final => self.final_payment,
        }
    }

    pub fn leg_status(&self, leg: PaymentLeg) -> PaymentStatus {
        match leg {
            PaymentLeg::Down => self.down_payment_status,
            PaymentLeg::Final => self.final_payment_status,
        }
    }

    pub fn set_leg_status(&mut self, leg: PaymentLeg, status: PaymentStatus) {
        match leg {
            PaymentLeg::Down => self.down_payment_status = status,
            PaymentLeg::Final => self.final_payment_status = status,
        }
    }

    /// Applies the deposit-confirmed transition: project starts, chat opens.
    pub fn confirm_down_payment(&mut self) {
        self.down_payment_status = PaymentStatus::Paid;
        self.status = OrderStatus::Processing;
        self.chat_enabled = true;
    }

    /// Applies the final-payment transition: project closes, chat closes.
    pub fn confirm_final_payment(&mut self) {
        self.final_payment_status = PaymentStatus::Paid;
        self.status = OrderStatus::Done;
        self.progress = 100;
        self.chat_enabled = false;
    }
}

/// Generates the public order token: 16 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
