use rust_decimal::Decimal;

use crate::event_sourcing::EventStoreError;
use super::value_objects::{CartStatus, ItemId, SessionId};

// ============================================================================
// Cart Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("No cart for session {0}")]
    CartNotFound(SessionId),

    #[error("Session {0} already has an active cart")]
    AlreadyExists(SessionId),

    #[error("Cart cannot be modified in status: {0:?}")]
    CartNotOpen(CartStatus),

    #[error("Item not found in catalog: {0}")]
    ItemNotFound(ItemId),

    #[error("Item {0} is not in the cart")]
    LineItemNotFound(ItemId),

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Quantity for item {0} exceeds the supported maximum")]
    QuantityOverflow(ItemId),

    #[error("Unit price cannot be negative: {0}")]
    NegativePrice(Decimal),

    #[error("Cannot check out an empty cart")]
    EmptyCart,

    #[error("Cannot {operation} a cart in status: {from:?}")]
    InvalidStatusTransition {
        from: CartStatus,
        operation: &'static str,
    },

    #[error("No checkout in flight for this cart")]
    CheckoutNotInFlight,

    #[error("Aggregate not initialized")]
    NotInitialized,

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Coarse classification used at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidArgument,
    AlreadyExists,
    Internal,
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::CartNotFound(_)
            | CartError::ItemNotFound(_)
            | CartError::LineItemNotFound(_) => ErrorKind::NotFound,
            CartError::CartNotOpen(_)
            | CartError::EmptyCart
            | CartError::InvalidStatusTransition { .. }
            | CartError::CheckoutNotInFlight => ErrorKind::InvalidState,
            CartError::InvalidQuantity(_)
            | CartError::QuantityOverflow(_)
            | CartError::NegativePrice(_) => ErrorKind::InvalidArgument,
            CartError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CartError::NotInitialized | CartError::Store(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CartError::CartNotFound(SessionId::new("s")).kind(), ErrorKind::NotFound);
        assert_eq!(CartError::LineItemNotFound(ItemId::new("i")).kind(), ErrorKind::NotFound);
        assert_eq!(CartError::CartNotOpen(CartStatus::Completed).kind(), ErrorKind::InvalidState);
        assert_eq!(CartError::EmptyCart.kind(), ErrorKind::InvalidState);
        assert_eq!(CartError::InvalidQuantity(0).kind(), ErrorKind::InvalidArgument);
        assert_eq!(CartError::AlreadyExists(SessionId::new("s")).kind(), ErrorKind::AlreadyExists);
        assert_eq!(CartError::NotInitialized.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_transition_error_display() {
        let err = CartError::InvalidStatusTransition {
            from: CartStatus::Open,
            operation: "reset",
        };
        assert_eq!(err.to_string(), "Cannot reset a cart in status: Open");
    }
}
