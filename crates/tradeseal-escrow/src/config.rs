//! Escrow configuration shared by every instance created from one template.
//!
//! Defaults: Sepolia (chain id 11155111), 48-hour seller, bidding and
//! delivery windows, at most 20 transporter bids per product. Override via
//! environment variables.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_WINDOW_SECS: u64 = 2 * 24 * 60 * 60;
pub const DEFAULT_MAX_BIDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    pub chain_id: u64,
    /// Time the seller has to confirm an order after purchase.
    pub seller_window_secs: u64,
    /// Time allowed for transporter selection after order confirmation.
    pub bid_window_secs: u64,
    /// Time the transporter has to deliver after assignment.
    pub delivery_window_secs: u64,
    pub max_bids: usize,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            seller_window_secs: DEFAULT_WINDOW_SECS,
            bid_window_secs: DEFAULT_WINDOW_SECS,
            delivery_window_secs: DEFAULT_WINDOW_SECS,
            max_bids: DEFAULT_MAX_BIDS,
        }
    }
}

impl EscrowConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (all optional):
    /// - `TRADESEAL_CHAIN_ID` (default: 11155111)
    /// - `TRADESEAL_SELLER_WINDOW_SECS` (default: 172800)
    /// - `TRADESEAL_BID_WINDOW_SECS` (default: 172800)
    /// - `TRADESEAL_DELIVERY_WINDOW_SECS` (default: 172800)
    /// - `TRADESEAL_MAX_BIDS` (default: 20)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            chain_id: env_parse("TRADESEAL_CHAIN_ID", defaults.chain_id)?,
            seller_window_secs: env_parse("TRADESEAL_SELLER_WINDOW_SECS", defaults.seller_window_secs)?,
            bid_window_secs: env_parse("TRADESEAL_BID_WINDOW_SECS", defaults.bid_window_secs)?,
            delivery_window_secs: env_parse(
                "TRADESEAL_DELIVERY_WINDOW_SECS",
                defaults.delivery_window_secs,
            )?,
            max_bids: env_parse("TRADESEAL_MAX_BIDS", defaults.max_bids)?,
        };
        if cfg.chain_id == 0 {
            return Err(ConfigError::Invalid(
                "TRADESEAL_CHAIN_ID".to_string(),
                "must be non-zero".to_string(),
            ));
        }
        Ok(cfg)
    }
}

fn env_parse<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}
