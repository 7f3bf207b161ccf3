pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod event_sourcing;
pub mod gateways;
pub mod metrics;
