//! llama.cpp-backed generation capability.
//!
//! Loads a quantized GGUF model from a local path, tokenizes the formatted
//! prompt, runs an autoregressive sampling loop, and detokenizes the result.
//! Sampling applies repetition penalty, temperature, and nucleus (top-p)
//! filtering over the logit candidates each step.

use crate::config::ModelConfig;
use crate::error::{PipeError, Result};
use crate::generate::{GenerationParams, Generator};
use std::collections::HashSet;
use std::num::NonZeroU32;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::{BatchAddError, LlamaBatch};
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::token::LlamaToken;
use llama_cpp_2::{
    DecodeError, LlamaCppError, LlamaContextLoadError, LlamaModelLoadError, StringToTokenError,
    TokenToStringError,
};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

impl From<LlamaCppError> for PipeError {
    fn from(err: LlamaCppError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<LlamaModelLoadError> for PipeError {
    fn from(err: LlamaModelLoadError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<LlamaContextLoadError> for PipeError {
    fn from(err: LlamaContextLoadError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<BatchAddError> for PipeError {
    fn from(err: BatchAddError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<StringToTokenError> for PipeError {
    fn from(err: StringToTokenError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<DecodeError> for PipeError {
    fn from(err: DecodeError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

impl From<TokenToStringError> for PipeError {
    fn from(err: TokenToStringError) -> Self {
        PipeError::Generation(err.to_string())
    }
}

/// Generator backed by an in-process llama.cpp model.
pub struct LlamaGenerator {
    backend: LlamaBackend,
    model: LlamaModel,
    context_size: u32,
    batch_size: u32,
    add_bos: bool,
    rng: StdRng,
}

impl LlamaGenerator {
    /// Initialize the backend and load the model named by the config.
    ///
    /// GPU layer offload, context size, and batch size come from the config;
    /// the runner never makes device decisions of its own.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = config.path.as_ref().ok_or_else(|| {
            PipeError::Config(
                "no model path configured; pass --model or set model.path in the config file"
                    .to_string(),
            )
        })?;

        if !path.exists() {
            return Err(PipeError::Generation(format!(
                "model file '{}' does not exist",
                path.display()
            )));
        }

        let backend = LlamaBackend::init()?;
        let model_params = LlamaModelParams::default().with_n_gpu_layers(config.gpu_layers);

        eprintln!("loading model '{}'", path.display());
        let model = LlamaModel::load_from_file(&backend, path, &model_params)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            backend,
            model,
            context_size: config.context_size,
            batch_size: config.batch_size,
            add_bos: config.add_bos,
            rng,
        })
    }
}

impl Generator for LlamaGenerator {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.context_size))
            .with_n_batch(self.batch_size)
            .with_n_ubatch(self.batch_size);

        let mut ctx = self.model.new_context(&self.backend, ctx_params)?;

        let add_bos = if self.add_bos {
            AddBos::Always
        } else {
            AddBos::Never
        };
        let tokens = self.model.str_to_token(prompt, add_bos)?;

        if tokens.is_empty() {
            return Err(PipeError::Generation(
                "prompt tokenized to zero tokens".to_string(),
            ));
        }
        if tokens.len() > self.batch_size as usize {
            return Err(PipeError::Generation(format!(
                "prompt is {} tokens but the batch size is {}",
                tokens.len(),
                self.batch_size
            )));
        }

        let mut batch = LlamaBatch::new(self.batch_size as usize, 1);
        let last_idx = tokens.len() - 1;
        for (i, token) in tokens.iter().enumerate() {
            batch.add(*token, i as i32, &[0], i == last_idx)?;
        }
        ctx.decode(&mut batch)?;

        eprintln!(
            "generating: {} prompt tokens, up to {} new tokens",
            tokens.len(),
            params.max_new_tokens
        );

        let mut completion = String::with_capacity(256);
        let mut generated: Vec<LlamaToken> = Vec::new();
        let mut current_pos = tokens.len() as i32;
        let eos = self.model.token_eos();

        while generated.len() < params.max_new_tokens {
            if current_pos as u32 >= self.context_size {
                break;
            }

            let mut candidates: Vec<(LlamaToken, f32)> = ctx
                .candidates_ith(batch.n_tokens() - 1)
                .map(|c| (c.id(), c.logit()))
                .collect();

            apply_repetition_penalty(&mut candidates, &generated, params.repetition_penalty);

            let next = sample_top_p(
                &mut candidates,
                params.temperature,
                params.top_p,
                &mut self.rng,
            )
            .ok_or_else(|| {
                PipeError::Generation("no candidate tokens to sample from".to_string())
            })?;

            if next == eos {
                break;
            }

            completion.push_str(&self.model.token_to_str(next, Special::Plaintext)?);
            generated.push(next);

            batch.clear();
            batch.add(next, current_pos, &[0], true)?;
            current_pos += 1;
            ctx.decode(&mut batch)?;
        }

        eprintln!("generated {} tokens", generated.len());

        // The runner extracts the completion from the full exchange, matching
        // the pipeline contract of returning prompt and completion together.
        Ok(format!("{}{}", prompt, completion))
    }
}

/// Scale down the logits of tokens that were already generated.
///
/// Positive logits are divided by the penalty, negative logits multiplied,
/// matching the usual repetition-penalty formulation.
fn apply_repetition_penalty(
    candidates: &mut [(LlamaToken, f32)],
    history: &[LlamaToken],
    penalty: f32,
) {
    if penalty <= 1.0 || history.is_empty() {
        return;
    }

    let seen: HashSet<i32> = history.iter().map(|t| t.0).collect();
    for (token, logit) in candidates.iter_mut() {
        if seen.contains(&token.0) {
            *logit = if *logit > 0.0 {
                *logit / penalty
            } else {
                *logit * penalty
            };
        }
    }
}

/// Sample a token with temperature and nucleus filtering.
///
/// Candidates are sorted by logit, softmaxed at the given temperature, cut to
/// the smallest prefix whose probability mass reaches `top_p` (always at
/// least one token), and sampled from that prefix.
fn sample_top_p<R: Rng>(
    candidates: &mut Vec<(LlamaToken, f32)>,
    temperature: f32,
    top_p: f32,
    rng: &mut R,
) -> Option<LlamaToken> {
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_unstable_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
    });

    // Softmax with the max logit subtracted for numeric stability.
    let max_logit = candidates[0].1;
    let mut probs: Vec<f32> = candidates
        .iter()
        .map(|(_, logit)| ((logit - max_logit) / temperature).exp())
        .collect();
    let sum: f32 = probs.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Some(candidates[0].0);
    }
    for p in probs.iter_mut() {
        *p /= sum;
    }

    let mut kept = 1;
    let mut mass = probs[0];
    while kept < probs.len() && mass < top_p {
        mass += probs[kept];
        kept += 1;
    }

    let pick: f32 = rng.r#gen::<f32>() * mass;
    let mut acc = 0.0;
    for i in 0..kept {
        acc += probs[i];
        if pick <= acc {
            return Some(candidates[i].0);
        }
    }
    Some(candidates[kept - 1].0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(id: i32) -> LlamaToken {
        LlamaToken(id)
    }

    #[test]
    fn repetition_penalty_scales_seen_tokens() {
        let mut candidates = vec![(token(1), 2.0), (token(2), -2.0), (token(3), 4.0)];
        let history = vec![token(1), token(2)];

        apply_repetition_penalty(&mut candidates, &history, 2.0);

        assert_eq!(candidates[0].1, 1.0);
        assert_eq!(candidates[1].1, -4.0);
        assert_eq!(candidates[2].1, 4.0);
    }

    #[test]
    fn repetition_penalty_of_one_is_a_no_op() {
        let mut candidates = vec![(token(1), 2.0)];
        apply_repetition_penalty(&mut candidates, &[token(1)], 1.0);
        assert_eq!(candidates[0].1, 2.0);
    }

    #[test]
    fn sample_empty_candidates_returns_none() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut candidates: Vec<(LlamaToken, f32)> = Vec::new();
        assert!(sample_top_p(&mut candidates, 0.6, 0.85, &mut rng).is_none());
    }

    #[test]
    fn sample_single_candidate_returns_it() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut candidates = vec![(token(7), 1.0)];
        assert_eq!(
            sample_top_p(&mut candidates, 0.6, 0.85, &mut rng),
            Some(token(7))
        );
    }

    #[test]
    fn dominant_logit_is_always_selected_with_tight_nucleus() {
        // One logit far above the rest keeps the nucleus at a single token.
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let mut candidates = vec![(token(1), 100.0), (token(2), 0.0), (token(3), -5.0)];
            let picked = sample_top_p(&mut candidates, 0.6, 0.85, &mut rng).unwrap();
            assert_eq!(picked, token(1));
        }
    }

    #[test]
    fn sampling_is_deterministic_for_a_fixed_seed() {
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picks = Vec::new();
            for _ in 0..20 {
                let mut candidates =
                    vec![(token(1), 1.0), (token(2), 1.0), (token(3), 1.0), (token(4), 1.0)];
                picks.push(sample_top_p(&mut candidates, 1.0, 1.0, &mut rng).unwrap());
            }
            picks
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn nucleus_excludes_low_probability_tail() {
        // With top_p = 0.5 and one token holding most of the mass, the tail
        // token must never be sampled.
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let mut candidates = vec![(token(1), 10.0), (token(2), 0.0)];
            let picked = sample_top_p(&mut candidates, 1.0, 0.5, &mut rng).unwrap();
            assert_eq!(picked, token(1));
        }
    }
}
