//! Prompt template scaffolding.
//!
//! A prompt template is a fixed two-marker chat scaffold: the raw user prompt
//! is embedded between a human-turn marker and a response marker before
//! generation, and the model's completion is located after the first
//! occurrence of the response marker in the generated exchange.

use crate::error::{PipeError, Result};
use serde::{Deserialize, Serialize};

/// Default human-turn marker.
pub const HUMAN_MARKER: &str = "### HUMAN:";

/// Default response marker.
pub const RESPONSE_MARKER: &str = "### RESPONSE:";

/// Two-marker prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// Marker opening the human turn.
    pub human_marker: String,
    /// Marker separating the echoed prompt from the completion.
    pub response_marker: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            human_marker: HUMAN_MARKER.to_string(),
            response_marker: RESPONSE_MARKER.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Embed a raw prompt into the template.
    ///
    /// The result is always `"{human_marker}\n{raw}\n\n{response_marker}\n"`.
    pub fn format(&self, raw: &str) -> String {
        format!(
            "{}\n{}\n\n{}\n",
            self.human_marker, raw, self.response_marker
        )
    }

    /// Extract the completion from a full generated exchange.
    ///
    /// Returns the text after the first occurrence of the response marker,
    /// with surrounding whitespace trimmed. A missing marker is a hard error:
    /// falling back to the start of the exchange would silently include the
    /// echoed prompt in the output.
    pub fn extract_response(&self, exchange: &str) -> Result<String> {
        match exchange.find(&self.response_marker) {
            Some(idx) => {
                let suffix = &exchange[idx + self.response_marker.len()..];
                Ok(suffix.trim().to_string())
            }
            None => Err(PipeError::MarkerNotFound(self.response_marker.clone())),
        }
    }
}
