use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::DomainEvent;
use super::checkout::FailureReason;
use super::value_objects::{IdempotencyToken, ItemId, LineItem, SessionId};

// ============================================================================
// Cart Events - Domain Events for the Cart Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    Created(CartCreated),
    ItemAdded(ItemAdded),
    ItemRemoved(ItemRemoved),
    QuantitySet(QuantitySet),
    CheckoutStarted(CheckoutStarted),
    CheckoutSucceeded(CheckoutSucceeded),
    CheckoutFailed(CheckoutFailed),
    Abandoned(CartAbandoned),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::Created(_) => "CartCreated",
            CartEvent::ItemAdded(_) => "ItemAdded",
            CartEvent::ItemRemoved(_) => "ItemRemoved",
            CartEvent::QuantitySet(_) => "QuantitySet",
            CartEvent::CheckoutStarted(_) => "CheckoutStarted",
            CartEvent::CheckoutSucceeded(_) => "CheckoutSucceeded",
            CartEvent::CheckoutFailed(_) => "CheckoutFailed",
            CartEvent::Abandoned(_) => "CartAbandoned",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Cart Created - first event of every cart stream
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CartCreated {
    pub cart_id: Uuid,
    pub session_id: SessionId,
    /// Last checkout attempt number used by the session, carried across resets
    pub checkout_attempt: u64,
}

/// Item Added - merged into an existing line when the item is already present
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ItemAdded {
    pub item_id: ItemId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ItemRemoved {
    pub item_id: ItemId,
    /// `None` means the whole line was removed
    pub quantity: Option<i32>,
}

/// Quantity Set - absolute quantity, zero removes the line
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuantitySet {
    pub item_id: ItemId,
    pub quantity: i32,
}

/// Checkout Started - freezes the lines and total that will be charged
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckoutStarted {
    pub attempt: u64,
    pub token: IdempotencyToken,
    pub total: Decimal,
    pub line_items: Vec<LineItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckoutSucceeded {
    pub token: IdempotencyToken,
    pub charge_id: String,
    pub total_charged: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckoutFailed {
    pub token: IdempotencyToken,
    pub reason: FailureReason,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CartAbandoned {
    pub discarded_lines: usize,
}
