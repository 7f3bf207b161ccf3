// ============================================================================
// Engine - session-scoped cart operations over the cart aggregate
// ============================================================================

mod cart_engine;


pub use cart_engine::{CartEngine, CartView};
