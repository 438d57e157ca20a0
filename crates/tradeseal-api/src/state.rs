//! # Application State
//!
//! Shared state handed to every handler through the `State` extractor.
//! The proof service is stateless apart from its proof backend, so this
//! is cheap to clone.

use tradeseal_zkp::{MockValueProofSystem, ValueCommitmentVerifier};

pub const DEFAULT_PORT: u16 = 5010;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ApiConfig {
    /// Read `PORT`; an absent or unparseable value falls back to 5010.
    pub fn from_env() -> Self {
        Self::from_port_var("PORT")
    }

    fn from_port_var(var: &str) -> Self {
        let port = std::env::var(var)
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { port }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub verifier: ValueCommitmentVerifier<MockValueProofSystem>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self {
            config,
            verifier: ValueCommitmentVerifier::new(MockValueProofSystem),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
