//! Configuration for promptpipe.
//!
//! All configuration is explicit: a YAML file (default `promptpipe.yaml`)
//! provides model, template, and sampling settings, and CLI flags override
//! file values. There is no hidden global state and no environment lookup.
//!
//! # File Format
//!
//! ```yaml
//! model:
//!   path: models/llama2-7b-chat.Q4_K_M.gguf
//!   gpu_layers: 32
//!   context_size: 2048
//!   seed: 42
//!
//! template:
//!   human_marker: "### HUMAN:"
//!   response_marker: "### RESPONSE:"
//!
//! sampling:
//!   max_new_tokens: 512
//!   temperature: 0.60
//!   top_p: 0.85
//!   repetition_penalty: 1.10
//! ```

use crate::cli::Cli;
use crate::error::{PipeError, Result};
use crate::generate::GenerationParams;
use crate::template::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Model loading settings.
    pub model: ModelConfig,

    /// Prompt template markers.
    pub template: PromptTemplate,

    /// Sampling parameters.
    pub sampling: GenerationParams,
}

/// Model loading settings for the llama backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the GGUF model file. Required for real runs.
    pub path: Option<PathBuf>,

    /// Number of layers to offload to the GPU.
    pub gpu_layers: u32,

    /// Context window size in tokens.
    pub context_size: u32,

    /// Batch size for prompt decode.
    pub batch_size: u32,

    /// RNG seed for reproducible sampling. Unset means entropy-seeded.
    pub seed: Option<u64>,

    /// Whether to prepend the BOS token when tokenizing.
    pub add_bos: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            gpu_layers: 0,
            context_size: 2048,
            batch_size: 512,
            seed: None,
            add_bos: true,
        }
    }
}

impl PipeConfig {
    /// Load config from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    /// Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PipeError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&content)?;
        Ok(Some(config))
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PipeError::Config(format!("failed to parse config: {}", e)))
    }

    /// Apply CLI flag overrides. Flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.model {
            self.model.path = Some(path.clone());
        }
        if let Some(n) = cli.gpu_layers {
            self.model.gpu_layers = n;
        }
        if let Some(seed) = cli.seed {
            self.model.seed = Some(seed);
        }
        if let Some(n) = cli.max_new_tokens {
            self.sampling.max_new_tokens = n;
        }
        if let Some(t) = cli.temperature {
            self.sampling.temperature = t;
        }
        if let Some(p) = cli.top_p {
            self.sampling.top_p = p;
        }
        if let Some(r) = cli.repetition_penalty {
            self.sampling.repetition_penalty = r;
        }
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<()> {
        if self.template.human_marker.is_empty() {
            return Err(PipeError::Config(
                "template.human_marker must not be empty".to_string(),
            ));
        }
        if self.template.response_marker.is_empty() {
            return Err(PipeError::Config(
                "template.response_marker must not be empty".to_string(),
            ));
        }
        if self.sampling.max_new_tokens == 0 {
            return Err(PipeError::Config(
                "sampling.max_new_tokens must be greater than 0".to_string(),
            ));
        }
        if self.sampling.temperature <= 0.0 {
            return Err(PipeError::Config(
                "sampling.temperature must be greater than 0".to_string(),
            ));
        }
        if self.sampling.top_p <= 0.0 || self.sampling.top_p > 1.0 {
            return Err(PipeError::Config(
                "sampling.top_p must be in (0, 1]".to_string(),
            ));
        }
        if self.sampling.repetition_penalty < 1.0 {
            return Err(PipeError::Config(
                "sampling.repetition_penalty must be at least 1".to_string(),
            ));
        }
        if self.model.context_size == 0 {
            return Err(PipeError::Config(
                "model.context_size must be greater than 0".to_string(),
            ));
        }
        if self.model.batch_size == 0 {
            return Err(PipeError::Config(
                "model.batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
