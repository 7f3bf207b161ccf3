use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::{EngineConfig, PricingPolicy};
use crate::domain::cart::{
    CartAggregate, CartCommand, CartError, CartEvent, CartStatus, CheckoutOutcome,
    CheckoutResult, CheckoutTicket, FailureReason, Item, ItemId, LineItem, SessionId,
};
use crate::event_sourcing::{Aggregate, EventEnvelope, EventStore};
use crate::gateways::{CatalogGateway, ChargeOutcome, PaymentGateway};
use crate::metrics::Metrics;

// ============================================================================
// Cart Engine
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → State
//
// Every session owns one slot. Mutations hold the slot's write lock, reads
// hold its read lock, and different sessions only meet on the registry map
// for the duration of a lookup. The payment gateway is called with no lock
// held; the cart sits in CheckingOut meanwhile, which rejects mutations.
//
// ============================================================================

/// Snapshot of a cart handed back to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub session_id: SessionId,
    pub cart_id: Uuid,
    pub status: CartStatus,
    pub line_items: Vec<LineItem>,
    /// `None` when live pricing cannot price a line (its item left the
    /// catalog); `get_total` reports the reason
    pub total: Option<Decimal>,
}

struct SessionSlot {
    cart: RwLock<CartAggregate>,
    history: Mutex<Vec<CheckoutResult>>,
}

impl SessionSlot {
    fn new(cart: CartAggregate) -> Self {
        Self {
            cart: RwLock::new(cart),
            history: Mutex::new(Vec::new()),
        }
    }
}

pub struct CartEngine {
    catalog: Arc<dyn CatalogGateway>,
    payments: Arc<dyn PaymentGateway>,
    store: EventStore<CartEvent>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    metrics: Arc<Metrics>,
    config: EngineConfig,
}

impl CartEngine {
    pub fn new(
        catalog: Arc<dyn CatalogGateway>,
        payments: Arc<dyn PaymentGateway>,
        metrics: Arc<Metrics>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            payments,
            store: EventStore::new("Cart"),
            sessions: RwLock::new(HashMap::new()),
            metrics,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------------

    /// Open a cart for `session_id`. A Completed or Abandoned cart is replaced.
    pub async fn create_cart(&self, session_id: &SessionId) -> Result<CartView, CartError> {
        let result = self.try_create_cart(session_id).await;
        self.record("create_cart", session_id, result)
    }

    pub async fn add_item(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let result = self.try_add_item(session_id, item_id, quantity).await;
        self.record("add_item", session_id, result)
    }

    /// `quantity: None` removes the whole line
    pub async fn remove_item(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        quantity: Option<i32>,
    ) -> Result<CartView, CartError> {
        let command = CartCommand::RemoveItem {
            item_id: item_id.clone(),
            quantity,
        };
        let result = self.mutate(session_id, command).await;
        self.record("remove_item", session_id, result)
    }

    pub async fn set_quantity(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let command = CartCommand::SetQuantity {
            item_id: item_id.clone(),
            quantity,
        };
        let result = self.mutate(session_id, command).await;
        self.record("set_quantity", session_id, result)
    }

    pub async fn get_cart(&self, session_id: &SessionId) -> Result<CartView, CartError> {
        let slot = self.slot(session_id).await?;
        let cart = slot.cart.read().await;
        Ok(self.view(&cart))
    }

    pub async fn get_total(&self, session_id: &SessionId) -> Result<Decimal, CartError> {
        let slot = self.slot(session_id).await?;
        let cart = slot.cart.read().await;
        self.total(&cart)
    }

    /// Charge the cart. Gateway refusals come back as a `Failure` outcome
    /// with the cart reopened; `Err` is reserved for calls that never
    /// reached the gateway.
    pub async fn begin_checkout(&self, session_id: &SessionId) -> Result<CheckoutResult, CartError> {
        let result = self.try_begin_checkout(session_id).await;
        self.record("begin_checkout", session_id, result)
    }

    pub async fn reset_cart(&self, session_id: &SessionId) -> Result<CartView, CartError> {
        let result = self.try_reset_cart(session_id).await;
        self.record("reset_cart", session_id, result)
    }

    pub async fn abandon_cart(&self, session_id: &SessionId) -> Result<(), CartError> {
        let result = self.try_abandon_cart(session_id).await;
        self.record("abandon_cart", session_id, result)
    }

    /// Receipts of every checkout attempt made by the session, oldest first
    pub async fn checkout_history(&self, session_id: &SessionId) -> Result<Vec<CheckoutResult>, CartError> {
        let slot = self.slot(session_id).await?;
        let history = slot.history.lock().await;
        Ok(history.clone())
    }

    /// Event stream of the session's current cart
    pub async fn cart_events(&self, session_id: &SessionId) -> Result<Vec<EventEnvelope<CartEvent>>, CartError> {
        let slot = self.slot(session_id).await?;
        let cart_id = slot.cart.read().await.cart_id;
        Ok(self.store.load_events(cart_id).await)
    }

    pub fn list_items(&self) -> Vec<Item> {
        self.catalog.list_items().collect()
    }

    // ------------------------------------------------------------------------
    // Operation bodies
    // ------------------------------------------------------------------------

    async fn try_create_cart(&self, session_id: &SessionId) -> Result<CartView, CartError> {
        let mut sessions = self.sessions.write().await;

        if let Some(slot) = sessions.get(session_id).cloned() {
            drop(sessions);
            let mut cart = slot.cart.write().await;
            if !cart.status.is_terminal() {
                return Err(CartError::AlreadyExists(session_id.clone()));
            }
            let previous_status = cart.status;
            *cart = self.start_cart(session_id, cart.checkout_attempt).await?;
            tracing::info!(
                session_id = %session_id,
                cart_id = %cart.cart_id,
                previous_status = previous_status.as_str(),
                "Replaced finished cart"
            );
            return Ok(self.view(&cart));
        }

        let cart = self.start_cart(session_id, 0).await?;
        let view = self.view(&cart);
        sessions.insert(session_id.clone(), Arc::new(SessionSlot::new(cart)));
        self.metrics.set_sessions(sessions.len());

        tracing::info!(session_id = %session_id, cart_id = %view.cart_id, "Cart created");
        Ok(view)
    }

    async fn try_add_item(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let slot = self.slot(session_id).await?;
        let mut cart = slot.cart.write().await;

        // Cheap rejections first so a closed cart never costs a catalog lookup
        if cart.status != CartStatus::Open {
            return Err(CartError::CartNotOpen(cart.status));
        }
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let item = self.catalog.get_item(item_id)?;
        self.execute(&mut cart, CartCommand::AddItem { item, quantity }, Uuid::new_v4()).await?;

        tracing::debug!(
            session_id = %session_id,
            item_id = %item_id,
            quantity = quantity,
            "Item added"
        );
        Ok(self.view(&cart))
    }

    async fn mutate(&self, session_id: &SessionId, command: CartCommand) -> Result<CartView, CartError> {
        let slot = self.slot(session_id).await?;
        let mut cart = slot.cart.write().await;

        self.execute(&mut cart, command, Uuid::new_v4()).await?;

        tracing::debug!(session_id = %session_id, lines = cart.line_items.len(), "Cart updated");
        Ok(self.view(&cart))
    }

    async fn try_begin_checkout(&self, session_id: &SessionId) -> Result<CheckoutResult, CartError> {
        let slot = self.slot(session_id).await?;
        let correlation_id = Uuid::new_v4();

        // Phase 1: freeze the cart
        let (cart_id, ticket) = {
            let mut cart = slot.cart.write().await;
            if cart.status != CartStatus::Open {
                return Err(CartError::CartNotOpen(cart.status));
            }
            // A retry after a transient failure is charged the amount it was
            // first sent with, whatever the catalog says now
            let total = match &cart.pending {
                Some(pending) => pending.total,
                None => self.total(&cart)?,
            };
            self.execute(&mut cart, CartCommand::BeginCheckout { total }, correlation_id).await?;
            let ticket = cart.in_flight.clone().ok_or(CartError::CheckoutNotInFlight)?;
            (cart.cart_id, ticket)
        };

        tracing::info!(
            session_id = %session_id,
            cart_id = %cart_id,
            token = %ticket.token,
            attempt = ticket.attempt,
            total = %ticket.total,
            "Checkout started"
        );

        // Phase 2: charge, no lock held
        let started = Instant::now();
        let outcome = self.charge(&ticket).await;
        self.metrics
            .record_checkout(outcome.as_label(), started.elapsed().as_secs_f64());

        let result = CheckoutResult {
            session_id: session_id.clone(),
            cart_id,
            total_charged: if outcome.is_success() { ticket.total } else { Decimal::ZERO },
            outcome: outcome.clone(),
            completed_line_items: ticket.line_items.clone(),
            idempotency_token: ticket.token.clone(),
            attempt: ticket.attempt,
            completed_at: Utc::now(),
        };

        // Phase 3: settle
        {
            let mut cart = slot.cart.write().await;
            let command = CartCommand::CompleteCheckout {
                token: ticket.token.clone(),
                outcome,
            };
            match self.execute(&mut cart, command, correlation_id).await {
                Ok(()) => {}
                Err(CartError::CheckoutNotInFlight) => {
                    tracing::warn!(
                        session_id = %session_id,
                        cart_id = %cart_id,
                        token = %ticket.token,
                        outcome = result.outcome.as_label(),
                        "Checkout settled after the cart left CheckingOut; cart state untouched"
                    );
                }
                Err(e) => return Err(e),
            }
            slot.history.lock().await.push(result.clone());
        }

        match &result.outcome {
            CheckoutOutcome::Success { charge_id } => tracing::info!(
                session_id = %session_id,
                cart_id = %cart_id,
                charge_id = %charge_id,
                total = %result.total_charged,
                "Checkout completed"
            ),
            CheckoutOutcome::Failure { reason } => tracing::warn!(
                session_id = %session_id,
                cart_id = %cart_id,
                token = %ticket.token,
                reason = %reason,
                "Checkout failed, cart reopened"
            ),
        }

        Ok(result)
    }

    async fn try_reset_cart(&self, session_id: &SessionId) -> Result<CartView, CartError> {
        let slot = self.slot(session_id).await?;
        let mut cart = slot.cart.write().await;

        cart.ensure_can_reset()?;
        let previous = cart.cart_id;
        *cart = self.start_cart(session_id, cart.checkout_attempt).await?;

        tracing::info!(
            session_id = %session_id,
            previous_cart_id = %previous,
            cart_id = %cart.cart_id,
            "Cart reset"
        );
        Ok(self.view(&cart))
    }

    async fn try_abandon_cart(&self, session_id: &SessionId) -> Result<(), CartError> {
        let slot = self.slot(session_id).await?;
        let mut cart = slot.cart.write().await;

        let was = cart.status;
        self.execute(&mut cart, CartCommand::AbandonCart, Uuid::new_v4()).await?;

        if was == CartStatus::CheckingOut {
            tracing::warn!(session_id = %session_id, cart_id = %cart.cart_id, "Abandoned a cart stuck in checkout");
        } else {
            tracing::info!(session_id = %session_id, cart_id = %cart.cart_id, "Cart abandoned");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn slot(&self, session_id: &SessionId) -> Result<Arc<SessionSlot>, CartError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CartError::CartNotFound(session_id.clone()))
    }

    /// Begin a new cart stream for the session
    async fn start_cart(&self, session_id: &SessionId, checkout_attempt: u64) -> Result<CartAggregate, CartError> {
        let event = CartAggregate::open(session_id.clone(), checkout_attempt);
        let mut cart = CartAggregate::apply_first_event(&event)?;

        let envelope = EventEnvelope::new(cart.cart_id, 1, event, Uuid::new_v4())
            .with_metadata("session_id", session_id.as_str());
        let version = self.store.append_events(cart.cart_id, 0, vec![envelope]).await?;
        cart.set_version(version);

        Ok(cart)
    }

    /// Validate, apply to a copy, persist, then publish the copy. A rejected
    /// command or a failed append leaves `cart` untouched.
    async fn execute(
        &self,
        cart: &mut CartAggregate,
        command: CartCommand,
        correlation_id: Uuid,
    ) -> Result<(), CartError> {
        let events = cart.handle_command(&command)?;

        let mut next = cart.clone();
        for event in &events {
            next.apply_event(event)?;
        }

        let envelopes = events
            .into_iter()
            .zip(cart.version + 1..)
            .map(|(event, seq)| {
                EventEnvelope::new(cart.cart_id, seq, event, correlation_id)
                    .with_metadata("session_id", cart.session_id.as_str())
            })
            .collect();

        let version = self
            .store
            .append_events(cart.cart_id, cart.version, envelopes)
            .await?;
        next.set_version(version);
        *cart = next;

        Ok(())
    }

    async fn charge(&self, ticket: &CheckoutTicket) -> CheckoutOutcome {
        let timeout = self.config.checkout_timeout;
        let call = self.payments.charge(ticket.total, &ticket.token, timeout);

        match tokio::time::timeout(timeout, call).await {
            Ok(ChargeOutcome::Approved { charge_id }) => CheckoutOutcome::Success { charge_id },
            Ok(ChargeOutcome::Declined { reason }) => CheckoutOutcome::Failure {
                reason: FailureReason::Declined(reason),
            },
            Ok(ChargeOutcome::TransientFailure { reason }) => CheckoutOutcome::Failure {
                reason: FailureReason::Transient(reason),
            },
            Err(_) => CheckoutOutcome::Failure {
                reason: FailureReason::TimedOut,
            },
        }
    }

    fn total(&self, cart: &CartAggregate) -> Result<Decimal, CartError> {
        if let Some(ticket) = &cart.in_flight {
            return Ok(ticket.total);
        }

        match self.config.pricing_policy {
            PricingPolicy::Frozen => Ok(cart.frozen_total()),
            PricingPolicy::Live => cart.line_items.iter().try_fold(Decimal::ZERO, |sum, line| -> Result<Decimal, CartError> {
                let item = self.catalog.get_item(&line.item_id)?;
                Ok(sum + item.unit_price * Decimal::from(line.quantity))
            }),
        }
    }

    /// Never fails: a mutation that reaches this point is already committed
    fn view(&self, cart: &CartAggregate) -> CartView {
        let total = match self.total(cart) {
            Ok(total) => Some(total),
            Err(e) => {
                tracing::warn!(
                    session_id = %cart.session_id,
                    cart_id = %cart.cart_id,
                    error = %e,
                    "Cart total unavailable"
                );
                None
            }
        };

        CartView {
            session_id: cart.session_id.clone(),
            cart_id: cart.cart_id,
            status: cart.status,
            line_items: cart.line_items.clone(),
            total,
        }
    }

    fn record<T>(&self, operation: &str, session_id: &SessionId, result: Result<T, CartError>) -> Result<T, CartError> {
        self.metrics.record_operation(operation, result.is_ok());
        if let Err(e) = &result {
            tracing::debug!(
                session_id = %session_id,
                operation = operation,
                error = %e,
                "Cart operation rejected"
            );
        }
        result
    }
}
