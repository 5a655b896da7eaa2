//! Embedder configuration.
//!
//! Loaded from JSON with a default for every missing key; the embedder takes
//! an owned copy at construction and never mutates it.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedder::download::default_model_dir;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

// ── Default value functions ──────────────────────────────────────────

fn default_max_tokens() -> usize {
    384
}

fn default_true() -> bool {
    true
}

fn default_intra_threads() -> usize {
    4
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EmbedderConfig {
    /// Maximum tokens per sequence; longer sequences are truncated.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// L2-normalize every embedding.
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Explicit model file, overrides `model_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Explicit `tokenizer.json`, overrides `model_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,

    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            normalize: default_true(),
            model_dir: default_model_dir(),
            model_path: None,
            tokenizer_path: None,
            intra_threads: default_intra_threads(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl EmbedderConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults. Unparseable JSON is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_tokens > 0, "max_tokens must be positive");
        anyhow::ensure!(self.intra_threads > 0, "intra_threads must be positive");
        Ok(())
    }

    /// Resolved model file path.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join(MODEL_FILE))
    }

    /// Resolved tokenizer file path.
    #[must_use]
    pub fn tokenizer_path(&self) -> PathBuf {
        self.tokenizer_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join(TOKENIZER_FILE))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
