// ============================================================================
// Cart Domain - Business Logic for the Cart Aggregate
// ============================================================================
//
// - Value objects (SessionId, ItemId, Item, LineItem, CartStatus)
// - Commands, events and errors
// - Checkout outcomes and receipts
// - Aggregate (CartAggregate with the merge/quantity/checkout rules)
//
// Locking, pricing policy and the payment gateway call live in the engine.
//
// ============================================================================

pub mod value_objects;
pub mod checkout;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;

pub use value_objects::*;
pub use checkout::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
