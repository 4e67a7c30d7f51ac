//! # Lust Test Helpers
//!
//! Every helper evaluates on a dedicated big-stack thread, the same way the
//! CLI does, and hands back printed text so nothing `Rc`-based crosses the
//! thread boundary.

#![allow(dead_code)]

use lust::{
    run_with_stack, ErrorKind, ExecutionPipeline, InterpreterConfig, LustError, OutputBuffer,
    SharedOutput,
};

const TEST_STACK_SIZE: usize = 256 * 1024 * 1024;

/// What a program produced: the printed last value and everything it wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: String,
    pub output: String,
}

pub fn run_with_config(source: &str, config: InterpreterConfig) -> Result<Outcome, LustError> {
    let source = source.to_string();
    run_with_stack(TEST_STACK_SIZE, move || {
        let buffer = OutputBuffer::new();
        let mut pipeline =
            ExecutionPipeline::with_output(config, SharedOutput::new(buffer.clone()));
        let value = pipeline.execute_source("test", &source)?;
        Ok(Outcome {
            value: value.to_string(),
            output: buffer.contents(),
        })
    })
}

pub fn try_run(source: &str) -> Result<Outcome, LustError> {
    run_with_config(source, InterpreterConfig::default())
}

/// The printed value of the last form; panics on error.
pub fn run(source: &str) -> String {
    match try_run(source) {
        Ok(outcome) => outcome.value,
        Err(error) => panic!("evaluation failed: {error}\nsource:\n{source}"),
    }
}

/// Everything the program printed; panics on error.
pub fn output_of(source: &str) -> String {
    match try_run(source) {
        Ok(outcome) => outcome.output,
        Err(error) => panic!("evaluation failed: {error}\nsource:\n{source}"),
    }
}

/// The error the program stops with; panics if it succeeds.
pub fn run_err(source: &str) -> LustError {
    match try_run(source) {
        Ok(outcome) => panic!("expected an error, got {}\nsource:\n{source}", outcome.value),
        Err(error) => error,
    }
}

/// Assert that `source` fails with an error whose code ends in `suffix`.
pub fn assert_error_code(source: &str, suffix: &str) -> ErrorKind {
    let error = run_err(source);
    assert!(
        error.code().ends_with(suffix),
        "expected an error ending in `{suffix}`, got `{}`: {error}",
        error.code()
    );
    error.kind
}

/// Run several sources one after another against the same interpreter,
/// collecting each source's printed value or error.
pub fn run_session(sources: &[&str]) -> Vec<Result<String, LustError>> {
    let sources: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
    let results = run_with_stack(TEST_STACK_SIZE, move || {
        let mut pipeline = ExecutionPipeline::with_output(
            InterpreterConfig::default(),
            SharedOutput::new(OutputBuffer::new()),
        );
        Ok(sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                pipeline
                    .execute_source(&format!("session-{i}"), source)
                    .map(|value| value.to_string())
            })
            .collect::<Vec<_>>())
    });
    match results {
        Ok(results) => results,
        Err(error) => panic!("session failed to start: {error}"),
    }
}
