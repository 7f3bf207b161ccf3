use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::cart::IdempotencyToken;

// ============================================================================
// Payment Gateway - external charge execution
// ============================================================================
//
// The engine never retries a charge on its own. Deduplication of replayed
// requests is the gateway's job, keyed by the idempotency token.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { charge_id: String },
    Declined { reason: String },
    TransientFailure { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `timeout` is advisory for the gateway; the engine enforces its own deadline.
    async fn charge(
        &self,
        amount: Decimal,
        token: &IdempotencyToken,
        timeout: Duration,
    ) -> ChargeOutcome;
}

// ============================================================================
// Mock gateway used by the binary and the tests
// ============================================================================

/// Scripted answer for the next fresh (non-replayed) charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    Approve,
    Decline(String),
    Transient(String),
}

#[derive(Debug)]
struct MockState {
    script: VecDeque<ScriptedResponse>,
    fallback: ScriptedResponse,
    latency: Duration,
    ledger: HashMap<IdempotencyToken, (String, Decimal)>,
    calls: u64,
}

/// Approves by default. Charges are recorded before the simulated latency, so
/// a caller that gives up early can still have been charged, just like a real
/// processor whose response got lost.
#[derive(Debug)]
pub struct MockPaymentGateway {
    state: Mutex<MockState>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new(ScriptedResponse::Approve)
    }
}

impl MockPaymentGateway {
    pub fn new(fallback: ScriptedResponse) -> Self {
        Self {
            state: Mutex::new(MockState {
                script: VecDeque::new(),
                fallback,
                latency: Duration::ZERO,
                ledger: HashMap::new(),
                calls: 0,
            }),
        }
    }

    pub fn declining(reason: impl Into<String>) -> Self {
        Self::new(ScriptedResponse::Decline(reason.into()))
    }

    /// Queue answers consumed in order before falling back to the default
    pub async fn push_responses(&self, responses: impl IntoIterator<Item = ScriptedResponse>) {
        self.state.lock().await.script.extend(responses);
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    /// Number of distinct approved charges
    pub async fn successful_charges(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    /// Total amount actually captured
    pub async fn captured_total(&self) -> Decimal {
        self.state.lock().await.ledger.values().map(|(_, amount)| *amount).sum()
    }

    /// Every request, replays included
    pub async fn calls(&self) -> u64 {
        self.state.lock().await.calls
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        amount: Decimal,
        token: &IdempotencyToken,
        _timeout: Duration,
    ) -> ChargeOutcome {
        let (outcome, latency) = {
            let mut state = self.state.lock().await;
            state.calls += 1;

            let outcome = if let Some((charge_id, _)) = state.ledger.get(token) {
                tracing::debug!(token = %token, charge_id = %charge_id, "Replaying approved charge");
                ChargeOutcome::Approved { charge_id: charge_id.clone() }
            } else {
                let response = state.script.pop_front().unwrap_or_else(|| state.fallback.clone());
                match response {
                    ScriptedResponse::Approve => {
                        let charge_id = format!("ch_{}", Uuid::new_v4().simple());
                        state.ledger.insert(token.clone(), (charge_id.clone(), amount));
                        ChargeOutcome::Approved { charge_id }
                    }
                    ScriptedResponse::Decline(reason) => ChargeOutcome::Declined { reason },
                    ScriptedResponse::Transient(reason) => ChargeOutcome::TransientFailure { reason },
                }
            };

            (outcome, state.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> IdempotencyToken {
        IdempotencyToken(s.to_string())
    }

    #[tokio::test]
    async fn test_same_token_charges_once() {
        let gateway = MockPaymentGateway::default();
        let amount = Decimal::new(29997, 2);

        let first = gateway.charge(amount, &token("s:1"), Duration::from_secs(1)).await;
        let second = gateway.charge(amount, &token("s:1"), Duration::from_secs(1)).await;

        assert!(matches!(first, ChargeOutcome::Approved { .. }));
        assert_eq!(first, second);
        assert_eq!(gateway.successful_charges().await, 1);
        assert_eq!(gateway.captured_total().await, amount);
        assert_eq!(gateway.calls().await, 2);
    }

    #[tokio::test]
    async fn test_distinct_tokens_charge_separately() {
        let gateway = MockPaymentGateway::default();

        gateway.charge(Decimal::ONE, &token("s:1"), Duration::from_secs(1)).await;
        gateway.charge(Decimal::ONE, &token("s:2"), Duration::from_secs(1)).await;

        assert_eq!(gateway.successful_charges().await, 2);
    }

    #[tokio::test]
    async fn test_script_consumed_before_fallback() {
        let gateway = MockPaymentGateway::default();
        gateway
            .push_responses([
                ScriptedResponse::Decline("insufficient funds".into()),
                ScriptedResponse::Transient("upstream 503".into()),
            ])
            .await;

        let a = gateway.charge(Decimal::ONE, &token("s:1"), Duration::from_secs(1)).await;
        let b = gateway.charge(Decimal::ONE, &token("s:2"), Duration::from_secs(1)).await;
        let c = gateway.charge(Decimal::ONE, &token("s:3"), Duration::from_secs(1)).await;

        assert_eq!(a, ChargeOutcome::Declined { reason: "insufficient funds".into() });
        assert_eq!(b, ChargeOutcome::TransientFailure { reason: "upstream 503".into() });
        assert!(matches!(c, ChargeOutcome::Approved { .. }));
    }

    #[tokio::test]
    async fn test_declining_gateway_never_captures() {
        let gateway = MockPaymentGateway::declining("card blocked");
        let outcome = gateway.charge(Decimal::ONE, &token("s:1"), Duration::from_secs(1)).await;

        assert!(matches!(outcome, ChargeOutcome::Declined { .. }));
        assert_eq!(gateway.successful_charges().await, 0);
        assert_eq!(gateway.captured_total().await, Decimal::ZERO);
    }
}
