//! Generation capability seam.
//!
//! The runner never inspects model internals, quantization format, device
//! selection, or tokenizer vocabulary: it treats generation as a slow,
//! blocking function from (text, params) to text. The one concrete backend
//! is [`llama::LlamaGenerator`]; tests substitute stubs.

pub mod llama;

pub use llama::LlamaGenerator;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Sampling parameters passed to the generation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate beyond the prompt.
    pub max_new_tokens: usize,
    /// Softmax temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Penalty applied to the logits of already-generated tokens.
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.60,
            top_p: 0.85,
            repetition_penalty: 1.10,
        }
    }
}

/// A text completion capability.
///
/// Implementations receive the fully formatted prompt and return the full
/// exchange: the echoed prompt followed by the completion. The call blocks
/// until generation finishes; any internal fault surfaces as
/// [`crate::error::PipeError::Generation`].
pub trait Generator {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> Result<String>;
}
