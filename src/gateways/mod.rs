// ============================================================================
// Gateways - external collaborators consumed by the cart engine
// ============================================================================
//
// catalog  - read-only priced items
// payment  - charge execution with idempotency tokens
// auth     - opaque session identities
//
// ============================================================================

pub mod auth;
pub mod catalog;
pub mod payment;

pub use auth::{AuthError, AuthProvider, Credentials, Identity, MockAuthProvider};
pub use catalog::{CatalogError, CatalogGateway, InMemoryCatalog};
pub use payment::{ChargeOutcome, MockPaymentGateway, PaymentGateway, ScriptedResponse};
