//! CLI argument parsing for promptpipe.
//!
//! Uses clap derive macros for declarative argument definitions. The tool has
//! a single linear operation, so there are no subcommands: two optional
//! positional paths and a handful of override flags.

use clap::Parser;
use std::path::PathBuf;

/// Promptpipe: file-to-file prompt completion against a local quantized model.
///
/// Reads a raw prompt from INPUT, wraps it in a two-marker chat template,
/// generates a completion with a local GGUF model, and writes the extracted
/// response to OUTPUT.
#[derive(Parser, Debug)]
#[command(name = "promptpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file containing the raw prompt.
    #[arg(default_value = "input.txt")]
    pub input: PathBuf,

    /// Output file for the extracted response.
    #[arg(default_value = "output.txt")]
    pub output: PathBuf,

    /// Path to the GGUF model file (overrides the config file).
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Path to the YAML config file.
    #[arg(long, default_value = "promptpipe.yaml")]
    pub config: PathBuf,

    /// Maximum number of new tokens to generate.
    #[arg(long)]
    pub max_new_tokens: Option<usize>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold.
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Repetition penalty applied to already-generated tokens.
    #[arg(long)]
    pub repetition_penalty: Option<f32>,

    /// Number of model layers to offload to the GPU.
    #[arg(long)]
    pub gpu_layers: Option<u32>,

    /// RNG seed for reproducible sampling.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
