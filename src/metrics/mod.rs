mod server;

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

pub use server::{metrics_handler, health_handler};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Cart operations per kind and outcome
// - Checkout outcomes and payment gateway latency
// - Live session count
//
// Each Metrics value owns its own Registry, scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub cart_operations: IntCounterVec,
    pub checkout_outcomes: IntCounterVec,
    pub checkout_duration: Histogram,
    pub sessions: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cart_operations = IntCounterVec::new(
            Opts::new("cart_operations_total", "Cart engine operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(cart_operations.clone()))?;

        let checkout_outcomes = IntCounterVec::new(
            Opts::new("checkout_outcomes_total", "Checkout attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(checkout_outcomes.clone()))?;

        let checkout_duration = Histogram::with_opts(
            HistogramOpts::new("checkout_duration_seconds", "Payment gateway round trip during checkout")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(checkout_duration.clone()))?;

        let sessions = IntGauge::new("cart_sessions", "Sessions known to the cart engine")?;
        registry.register(Box::new(sessions.clone()))?;

        Ok(Self {
            registry,
            cart_operations,
            checkout_outcomes,
            checkout_duration,
            sessions,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.cart_operations.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_checkout(&self, outcome: &str, duration_secs: f64) {
        self.checkout_outcomes.with_label_values(&[outcome]).inc();
        self.checkout_duration.observe(duration_secs);
    }

    pub fn set_sessions(&self, count: usize) {
        self.sessions.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("add_item", true);
        metrics.record_operation("add_item", true);
        metrics.record_operation("add_item", false);

        assert_eq!(metrics.cart_operations.with_label_values(&["add_item", "ok"]).get(), 2);
        assert_eq!(metrics.cart_operations.with_label_values(&["add_item", "error"]).get(), 1);
    }

    #[test]
    fn test_record_checkout() {
        let metrics = Metrics::new().unwrap();
        metrics.record_checkout("success", 0.02);
        metrics.record_checkout("declined", 0.01);

        assert_eq!(metrics.checkout_outcomes.with_label_values(&["success"]).get(), 1);
        assert_eq!(metrics.checkout_duration.get_sample_count(), 2);
    }

    #[test]
    fn test_session_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_sessions(3);
        assert_eq!(metrics.sessions.get(), 3);
    }
}
