// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Domain aggregates, separate from the event sourcing infrastructure and
// from the gateways they are fed by.
//
// ============================================================================

pub mod cart;
