use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{IdempotencyToken, LineItem, SessionId};

// ============================================================================
// Checkout Outcomes and Receipts
// ============================================================================

/// Why a checkout did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FailureReason {
    /// The gateway refused the charge
    Declined(String),
    /// The gateway reported a temporary problem; the charge may be retried
    Transient(String),
    /// The gateway did not answer before the checkout deadline
    TimedOut,
}

impl FailureReason {
    /// For transient failures the charge state is unknown to the engine,
    /// so a retry must reuse the same idempotency token.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureReason::Transient(_) | FailureReason::TimedOut)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            FailureReason::Declined(_) => "declined",
            FailureReason::Transient(_) => "transient",
            FailureReason::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Declined(reason) => write!(f, "declined: {}", reason),
            FailureReason::Transient(reason) => write!(f, "transient failure: {}", reason),
            FailureReason::TimedOut => f.write_str("payment gateway timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CheckoutOutcome {
    Success { charge_id: String },
    Failure { reason: FailureReason },
}

impl CheckoutOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckoutOutcome::Success { .. })
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            CheckoutOutcome::Success { .. } => "success",
            CheckoutOutcome::Failure { reason } => reason.as_label(),
        }
    }
}

/// Immutable receipt of one checkout attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub session_id: SessionId,
    pub cart_id: Uuid,
    pub outcome: CheckoutOutcome,
    /// Zero unless the charge succeeded
    pub total_charged: Decimal,
    pub completed_line_items: Vec<LineItem>,
    pub idempotency_token: IdempotencyToken,
    pub attempt: u64,
    pub completed_at: DateTime<Utc>,
}
