//! rubricon-oracle — Scoring-oracle clients and configuration.
//!
//! Implementations of the `ScoringOracle` trait (Ollama-backed and mock),
//! grading prompt assembly, and the TOML configuration layer.

pub mod config;
pub mod error;
pub mod mock;
pub mod ollama;
pub mod prompt;

pub use config::{create_oracle, load_config, load_config_from, OracleConfig, RubriconConfig};
pub use error::OracleError;
pub use mock::MockOracle;
pub use ollama::OllamaOracle;
