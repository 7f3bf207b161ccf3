use rust_decimal::Decimal;

use super::checkout::CheckoutOutcome;
use super::value_objects::{IdempotencyToken, Item, ItemId};

// ============================================================================
// Cart Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum CartCommand {
    /// `item` has already been resolved through the catalog
    AddItem {
        item: Item,
        quantity: i32,
    },
    /// `None` removes the whole line
    RemoveItem {
        item_id: ItemId,
        quantity: Option<i32>,
    },
    SetQuantity {
        item_id: ItemId,
        quantity: i32,
    },
    /// `total` is priced by the engine according to its pricing policy
    BeginCheckout {
        total: Decimal,
    },
    CompleteCheckout {
        token: IdempotencyToken,
        outcome: CheckoutOutcome,
    },
    AbandonCart,
}
