use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::CartError;

// ============================================================================
// Cart Value Objects
// ============================================================================

/// Opaque session identifier handed out by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque catalog identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A priced catalog entry. Never mutated by the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub unit_price: Decimal,
}

impl Item {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        unit_price: Decimal,
    ) -> Result<Self, CartError> {
        if unit_price < Decimal::ZERO {
            return Err(CartError::NegativePrice(unit_price));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            unit_price,
        })
    }
}

/// One line per distinct item; `quantity` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: ItemId,
    pub quantity: i32,
    /// Price captured when the line was first added
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartStatus {
    Open,
    CheckingOut,
    Completed,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "open",
            CartStatus::CheckingOut => "checking_out",
            CartStatus::Completed => "completed",
            CartStatus::Abandoned => "abandoned",
        }
    }

    /// Completed and Abandoned carts only leave their state through a reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, CartStatus::Completed | CartStatus::Abandoned)
    }
}

/// Key the payment gateway uses to recognise a replayed charge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyToken(pub String);

impl IdempotencyToken {
    pub fn for_attempt(session_id: &SessionId, attempt: u64) -> Self {
        Self(format!("{}:{}", session_id, attempt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
