use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

// ============================================================================
// Configuration
// ============================================================================
//
// Read from the environment (a .env file is honoured when present):
//   HOST                 bind address            (default 0.0.0.0)
//   PORT                 HTTP port               (default 8080)
//   CHECKOUT_TIMEOUT_MS  payment gateway deadline (default 5000)
//   PRICING_POLICY       frozen | live           (default frozen)
//
// ============================================================================

/// Which price a cart total is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricingPolicy {
    /// Price captured when the item was first added to the cart
    #[default]
    Frozen,
    /// Catalog price at the time the total is read
    Live,
}

impl FromStr for PricingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frozen" => Ok(PricingPolicy::Frozen),
            "live" => Ok(PricingPolicy::Live),
            other => anyhow::bail!("unknown pricing policy '{}', expected 'frozen' or 'live'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub checkout_timeout: Duration,
    pub pricing_policy: PricingPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkout_timeout: Duration::from_secs(5),
            pricing_policy: PricingPolicy::Frozen,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = EngineConfig::default();

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => 8080,
        };

        let checkout_timeout = match lookup("CHECKOUT_TIMEOUT_MS") {
            Some(raw) => {
                let millis: u64 = raw
                    .parse()
                    .with_context(|| format!("CHECKOUT_TIMEOUT_MS must be milliseconds, got '{}'", raw))?;
                if millis == 0 {
                    anyhow::bail!("CHECKOUT_TIMEOUT_MS must be greater than zero");
                }
                Duration::from_millis(millis)
            }
            None => defaults.checkout_timeout,
        };

        let pricing_policy = match lookup("PRICING_POLICY") {
            Some(raw) => raw.parse().context("invalid PRICING_POLICY")?,
            None => defaults.pricing_policy,
        };

        Ok(Self {
            host,
            port,
            engine: EngineConfig {
                checkout_timeout,
                pricing_policy,
            },
        })
    }
}
