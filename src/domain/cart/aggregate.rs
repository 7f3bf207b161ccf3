use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::Aggregate;
use super::checkout::CheckoutOutcome;
use super::commands::CartCommand;
use super::errors::CartError;
use super::events::*;
use super::value_objects::{CartStatus, IdempotencyToken, ItemId, LineItem, SessionId};

// ============================================================================
// Cart Aggregate - Domain Logic
// ============================================================================

/// The checkout currently waiting on the payment gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutTicket {
    pub attempt: u64,
    pub token: IdempotencyToken,
    pub total: Decimal,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAggregate {
    // Identity
    pub cart_id: Uuid,
    pub session_id: SessionId,
    pub version: i64,

    // Current State (derived from events)
    pub line_items: Vec<LineItem>,
    pub status: CartStatus,

    // Checkout bookkeeping
    pub checkout_attempt: u64,
    /// Checkout that failed transiently; the next attempt replays its token
    /// and amount since the gateway may already have captured it
    pub pending: Option<CheckoutTicket>,
    pub in_flight: Option<CheckoutTicket>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartAggregate {
    /// First event of a brand new cart stream
    pub fn open(session_id: SessionId, checkout_attempt: u64) -> CartEvent {
        CartEvent::Created(CartCreated {
            cart_id: Uuid::new_v4(),
            session_id,
            checkout_attempt,
        })
    }

    pub fn line(&self, item_id: &ItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|l| &l.item_id == item_id)
    }

    /// Sum of the prices captured on each line
    pub fn frozen_total(&self) -> Decimal {
        self.line_items.iter().map(LineItem::line_total).sum()
    }

    /// Only Completed and Abandoned carts can be replaced by a fresh one
    pub fn ensure_can_reset(&self) -> Result<(), CartError> {
        if self.status.is_terminal() {
            Ok(())
        } else {
            Err(CartError::InvalidStatusTransition {
                from: self.status,
                operation: "reset",
            })
        }
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        match self.status {
            CartStatus::Open => Ok(()),
            other => Err(CartError::CartNotOpen(other)),
        }
    }

    fn ensure_positive(quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        Ok(())
    }

    fn require_line(&self, item_id: &ItemId) -> Result<&LineItem, CartError> {
        self.line(item_id)
            .ok_or_else(|| CartError::LineItemNotFound(item_id.clone()))
    }

    fn drop_line(&mut self, item_id: &ItemId) {
        self.line_items.retain(|l| &l.item_id != item_id);
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for CartAggregate {
    type Event = CartEvent;
    type Command = CartCommand;
    type Error = CartError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            CartEvent::Created(e) => {
                let now = Utc::now();
                Ok(Self {
                    cart_id: e.cart_id,
                    session_id: e.session_id.clone(),
                    version: 0,
                    line_items: Vec::new(),
                    status: CartStatus::Open,
                    checkout_attempt: e.checkout_attempt,
                    pending: None,
                    in_flight: None,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(CartError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.updated_at = Utc::now();

        match event {
            CartEvent::Created(_) => {
                // First event already applied
            }
            CartEvent::ItemAdded(e) => {
                self.pending = None;
                match self.line_items.iter_mut().find(|l| l.item_id == e.item_id) {
                    Some(line) => {
                        line.quantity = line
                            .quantity
                            .checked_add(e.quantity)
                            .ok_or_else(|| CartError::QuantityOverflow(e.item_id.clone()))?;
                    }
                    None => self.line_items.push(LineItem {
                        item_id: e.item_id.clone(),
                        quantity: e.quantity,
                        unit_price: e.unit_price,
                    }),
                }
            }
            CartEvent::ItemRemoved(e) => {
                self.pending = None;
                let remaining = match (e.quantity, self.line(&e.item_id)) {
                    (Some(quantity), Some(line)) => line.quantity - quantity,
                    _ => 0,
                };
                if remaining <= 0 {
                    self.drop_line(&e.item_id);
                } else if let Some(line) = self.line_items.iter_mut().find(|l| l.item_id == e.item_id) {
                    line.quantity = remaining;
                }
            }
            CartEvent::QuantitySet(e) => {
                self.pending = None;
                if e.quantity <= 0 {
                    self.drop_line(&e.item_id);
                } else if let Some(line) = self.line_items.iter_mut().find(|l| l.item_id == e.item_id) {
                    line.quantity = e.quantity;
                }
            }
            CartEvent::CheckoutStarted(e) => {
                self.status = CartStatus::CheckingOut;
                self.checkout_attempt = e.attempt;
                self.pending = None;
                self.in_flight = Some(CheckoutTicket {
                    attempt: e.attempt,
                    token: e.token.clone(),
                    total: e.total,
                    line_items: e.line_items.clone(),
                });
            }
            CartEvent::CheckoutSucceeded(_) => {
                self.status = CartStatus::Completed;
                self.in_flight = None;
            }
            CartEvent::CheckoutFailed(e) => {
                // Lines are left exactly as they were before the checkout
                self.status = CartStatus::Open;
                let ticket = self.in_flight.take();
                self.pending = ticket.filter(|t| e.reason.is_transient() && t.token == e.token);
            }
            CartEvent::Abandoned(_) => {
                self.status = CartStatus::Abandoned;
                self.line_items.clear();
                self.in_flight = None;
                self.pending = None;
            }
        }

        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem { item, quantity } => {
                self.ensure_open()?;
                Self::ensure_positive(*quantity)?;

                if let Some(line) = self.line(&item.id) {
                    line.quantity
                        .checked_add(*quantity)
                        .ok_or_else(|| CartError::QuantityOverflow(item.id.clone()))?;
                }

                Ok(vec![CartEvent::ItemAdded(ItemAdded {
                    item_id: item.id.clone(),
                    quantity: *quantity,
                    unit_price: item.unit_price,
                })])
            }

            CartCommand::RemoveItem { item_id, quantity } => {
                self.ensure_open()?;
                if let Some(quantity) = quantity {
                    Self::ensure_positive(*quantity)?;
                }
                self.require_line(item_id)?;

                Ok(vec![CartEvent::ItemRemoved(ItemRemoved {
                    item_id: item_id.clone(),
                    quantity: *quantity,
                })])
            }

            CartCommand::SetQuantity { item_id, quantity } => {
                self.ensure_open()?;
                if *quantity < 0 {
                    return Err(CartError::InvalidQuantity(*quantity));
                }
                self.require_line(item_id)?;

                Ok(vec![CartEvent::QuantitySet(QuantitySet {
                    item_id: item_id.clone(),
                    quantity: *quantity,
                })])
            }

            CartCommand::BeginCheckout { total } => {
                self.ensure_open()?;
                if self.line_items.is_empty() {
                    return Err(CartError::EmptyCart);
                }

                // A transiently failed charge may still have gone through, so
                // the unchanged cart is retried under the same token and amount.
                let started = match &self.pending {
                    Some(pending) => CheckoutStarted {
                        attempt: pending.attempt,
                        token: pending.token.clone(),
                        total: pending.total,
                        line_items: pending.line_items.clone(),
                    },
                    None => {
                        let attempt = self.checkout_attempt + 1;
                        CheckoutStarted {
                            attempt,
                            token: IdempotencyToken::for_attempt(&self.session_id, attempt),
                            total: *total,
                            line_items: self.line_items.clone(),
                        }
                    }
                };

                Ok(vec![CartEvent::CheckoutStarted(started)])
            }

            CartCommand::CompleteCheckout { token, outcome } => {
                match &self.in_flight {
                    Some(ticket) if self.status == CartStatus::CheckingOut && &ticket.token == token => {
                        let event = match outcome {
                            CheckoutOutcome::Success { charge_id } => {
                                CartEvent::CheckoutSucceeded(CheckoutSucceeded {
                                    token: token.clone(),
                                    charge_id: charge_id.clone(),
                                    total_charged: ticket.total,
                                })
                            }
                            CheckoutOutcome::Failure { reason } => {
                                CartEvent::CheckoutFailed(CheckoutFailed {
                                    token: token.clone(),
                                    reason: reason.clone(),
                                })
                            }
                        };
                        Ok(vec![event])
                    }
                    _ => Err(CartError::CheckoutNotInFlight),
                }
            }

            CartCommand::AbandonCart => {
                match self.status {
                    CartStatus::Open | CartStatus::CheckingOut => {}
                    other => {
                        return Err(CartError::InvalidStatusTransition {
                            from: other,
                            operation: "abandon",
                        })
                    }
                }

                Ok(vec![CartEvent::Abandoned(CartAbandoned {
                    discarded_lines: self.line_items.len(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
