//! Top-level configuration and oracle factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rubricon_core::config::GradingConfig;
use rubricon_core::traits::ScoringOracle;

use crate::ollama::OllamaOracle;

/// Configuration for the scoring oracle backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OracleConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "mistral".to_string()
}

/// Top-level rubricon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubriconConfig {
    /// Grading knobs.
    #[serde(default)]
    pub grading: GradingConfig,
    /// Oracle backend.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Max question blocks graded concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./rubricon-results")
}

impl Default for RubriconConfig {
    fn default() -> Self {
        Self {
            grading: GradingConfig::default(),
            oracle: OracleConfig::default(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_oracle_config(config: &OracleConfig) -> OracleConfig {
    match config {
        OracleConfig::Ollama { base_url, model } => OracleConfig::Ollama {
            base_url: resolve_env_vars(base_url),
            model: resolve_env_vars(model),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `rubricon.toml` in the current directory
/// 2. `~/.config/rubricon/config.toml`
///
/// Environment variable overrides: `RUBRICON_OLLAMA_URL`, `OLLAMA_MODEL`.
pub fn load_config() -> Result<RubriconConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<RubriconConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("rubricon.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<RubriconConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => RubriconConfig::default(),
    };

    // Apply env var overrides
    let OracleConfig::Ollama { base_url, model } = &mut config.oracle;
    if let Ok(url) = std::env::var("RUBRICON_OLLAMA_URL") {
        *base_url = url;
    }
    if let Ok(name) = std::env::var("OLLAMA_MODEL") {
        *model = name;
    }

    config.oracle = resolve_oracle_config(&config.oracle);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("rubricon"))
}

/// Create an oracle instance from its configuration.
pub fn create_oracle(config: &OracleConfig) -> Arc<dyn ScoringOracle> {
    match config {
        OracleConfig::Ollama { base_url, model } => Arc::new(OllamaOracle::new(base_url, model)),
    }
}
