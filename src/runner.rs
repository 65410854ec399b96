//! The single read → generate → write pass.
//!
//! Control flow is strictly linear: read the prompt file, embed it in the
//! template, make one blocking call into the generation capability, extract
//! the completion after the response marker, write it atomically. No loops,
//! no retries, no intermediate states visible to callers.

use crate::error::{PipeError, Result};
use crate::fs::atomic_write_file;
use crate::generate::{GenerationParams, Generator};
use crate::template::PromptTemplate;
use std::path::Path;

/// Run one prompt completion pass.
///
/// Guarantees exactly one read, one generation call, and one write per
/// invocation. The output file is only touched after both the read and the
/// generation call have succeeded; on any failure it is left untouched.
pub fn run(
    input_path: &Path,
    output_path: &Path,
    generator: &mut dyn Generator,
    template: &PromptTemplate,
    params: &GenerationParams,
) -> Result<()> {
    let raw_prompt = std::fs::read_to_string(input_path).map_err(|e| {
        PipeError::Io(format!(
            "failed to read input '{}': {}",
            input_path.display(),
            e
        ))
    })?;

    let formatted = template.format(&raw_prompt);
    let exchange = generator.generate(&formatted, params)?;
    let response = template.extract_response(&exchange)?;

    atomic_write_file(output_path, &response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Stub capability returning a canned exchange and counting calls.
    struct StubGenerator {
        exchange: String,
        calls: usize,
        last_prompt: Option<String>,
    }

    impl StubGenerator {
        fn returning(exchange: &str) -> Self {
            Self {
                exchange: exchange.to_string(),
                calls: 0,
                last_prompt: None,
            }
        }
    }

    impl Generator for StubGenerator {
        fn generate(&mut self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            self.calls += 1;
            self.last_prompt = Some(prompt.to_string());
            Ok(self.exchange.clone())
        }
    }

    /// Stub capability that simulates a backend fault.
    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&mut self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Err(PipeError::Generation("simulated device fault".to_string()))
        }
    }

    fn write_input(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("input.txt");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn completion_is_extracted_and_written() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");

        let mut stub =
            StubGenerator::returning("### HUMAN:\nHello\n\n### RESPONSE:\nHi there!");
        run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "Hi there!");
        assert_eq!(stub.calls, 1);
    }

    #[test]
    fn formatted_prompt_embeds_input_exactly_once() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("### RESPONSE:\nok");
        run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        )
        .unwrap();

        assert_eq!(
            stub.last_prompt.as_deref(),
            Some("### HUMAN:\nHello\n\n### RESPONSE:\n")
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "");
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("### HUMAN:\n\n\n### RESPONSE:\n");
        run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn missing_input_is_io_error_and_skips_generation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("does-not-exist.txt");
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("irrelevant");
        let result = run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        );

        assert!(matches!(result, Err(PipeError::Io(_))));
        assert_eq!(stub.calls, 0, "no generation call on unreadable input");
        assert!(!output.exists());
    }

    #[test]
    fn non_utf8_input_is_io_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, [0xff, 0xfe, 0x00]).unwrap();
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("irrelevant");
        let result = run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        );

        assert!(matches!(result, Err(PipeError::Io(_))));
        assert_eq!(stub.calls, 0);
    }

    #[test]
    fn generation_fault_leaves_output_untouched() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");
        fs::write(&output, "previous run").unwrap();

        let result = run(
            &input,
            &output,
            &mut FailingGenerator,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        );

        assert!(matches!(result, Err(PipeError::Generation(_))));
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous run");
    }

    #[test]
    fn missing_marker_is_error_and_no_output_written() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("a completion without any marker");
        let result = run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        );

        assert!(matches!(result, Err(PipeError::MarkerNotFound(_))));
        assert!(!output.exists());
    }

    #[test]
    fn run_twice_with_deterministic_stub_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");

        let mut stub = StubGenerator::returning("### RESPONSE:\nstable answer");
        let template = PromptTemplate::default();
        let params = GenerationParams::default();

        run(&input, &output, &mut stub, &template, &params).unwrap();
        let first = fs::read_to_string(&output).unwrap();

        run(&input, &output, &mut stub, &template, &params).unwrap();
        let second = fs::read_to_string(&output).unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls, 2);
    }

    #[test]
    fn output_is_replaced_not_appended() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "Hello");
        let output = dir.path().join("output.txt");
        fs::write(&output, "a much longer previous output that must disappear").unwrap();

        let mut stub = StubGenerator::returning("### RESPONSE:\nshort");
        run(
            &input,
            &output,
            &mut stub,
            &PromptTemplate::default(),
            &GenerationParams::default(),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "short");
    }
}
