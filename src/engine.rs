use std::{
    cell::RefCell,
    io::Write,
    path::Path,
    rc::Rc,
    thread,
};

use tracing::{debug, info};

use crate::{
    atoms::{build_std_registry, AtomRegistry, OutputSink, SharedOutput},
    config::InterpreterConfig,
    errors::{ErrorKind, ErrorReporting, LustError, SourceContext},
    macros,
    runtime::{
        env::Env,
        eval::{self, eval},
        modules::ModuleTable,
        value::Value,
    },
    syntax::{keywords, parser::Reader, Spanned, Symbol},
};

// ============================================================================
// EVALUATION CONTEXT - State threaded through every evaluation step
// ============================================================================

/// Interpreter state shared by the expander, the evaluator and stateful atoms.
pub struct EvaluationContext {
    /// The global environment; module frames are parented here.
    pub global: Env,
    /// Modules declared so far in this session.
    pub modules: ModuleTable,
    pub output: SharedOutput,
    /// Current non-tail nesting.
    pub depth: usize,
    pub max_depth: usize,
    pub max_macro_expansions: usize,
    gensym_counter: u64,
}

impl EvaluationContext {
    pub fn new(global: Env, output: SharedOutput, config: &InterpreterConfig) -> Self {
        Self {
            global,
            modules: ModuleTable::new(),
            output,
            depth: 0,
            max_depth: config.max_depth,
            max_macro_expansions: config.max_macro_expansions,
            gensym_counter: 0,
        }
    }

    /// Enter one level of non-tail evaluation.
    pub fn enter(&mut self) -> Result<(), LustError> {
        if self.depth >= self.max_depth {
            return Err(self.report(ErrorKind::RecursionLimit {
                depth: self.max_depth,
            }));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// A symbol no reader can produce from ordinary source by accident.
    pub fn next_gensym(&mut self, prefix: &str) -> Symbol {
        self.gensym_counter += 1;
        Symbol::new(&format!("{}__{}", prefix, self.gensym_counter))
    }

    pub fn emit(&self, text: &str) {
        self.output.emit(text);
    }
}

impl ErrorReporting for EvaluationContext {
    fn report(&self, kind: ErrorKind) -> LustError {
        LustError::new(kind)
    }
}

// ============================================================================
// OUTPUT TYPES - Generic output handling for CLI and testing
// ============================================================================

/// OutputBuffer: collects output into a String for testing or programmatic
/// capture. Clones share one buffer.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    buffer: Rc<RefCell<String>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

/// StdoutSink: writes output to stdout for CLI and default runner use.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // Output is best effort; a closed pipe must not abort evaluation.
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

// ============================================================================
// EXECUTION PIPELINE - Read → Expand → Evaluate, one top-level form at a time
// ============================================================================

/// The single entry point for running Lust code. Each top-level form is
/// read, macro-expanded against the current global environment, and
/// evaluated before the next one is read, so a macro is usable by every
/// form after its definition.
pub struct ExecutionPipeline {
    pub context: EvaluationContext,
    pub config: InterpreterConfig,
    atoms: AtomRegistry,
}

impl Default for ExecutionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionPipeline {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::with_output(config, SharedOutput::new(StdoutSink))
    }

    pub fn with_output(config: InterpreterConfig, output: SharedOutput) -> Self {
        let global = Env::new();
        let atoms = build_std_registry();
        atoms.install(&global);
        global.define(keywords().t, Value::Bool(true), false);
        Self {
            context: EvaluationContext::new(global, output, &config),
            config,
            atoms,
        }
    }

    pub fn global_env(&self) -> &Env {
        &self.context.global
    }

    // ============================================================================
    // PUBLIC EXECUTION METHODS
    // ============================================================================

    /// Run every form of `source`, stopping at the first error. Returns the
    /// value of the last form.
    pub fn execute_source(&mut self, name: &str, source: &str) -> Result<Value, LustError> {
        let context = SourceContext::from_file(name, source);
        let mut last = Value::Nil;
        for form in Reader::new(&context) {
            let form = form?;
            last = self.eval_spanned(&form, &context)?;
        }
        Ok(last)
    }

    /// Run every form of `source`, reporting each form's outcome. A parse
    /// error skips only the malformed form.
    pub fn execute_each(&mut self, name: &str, source: &str) -> Vec<Result<Value, LustError>> {
        let context = SourceContext::from_file(name, source);
        Reader::new(&context)
            .map(|form| form.and_then(|form| self.eval_spanned(&form, &context)))
            .collect()
    }

    pub fn execute_file(&mut self, path: &Path) -> Result<Value, LustError> {
        let source = Self::read_file(path)?;
        info!(path = %path.display(), "executing file");
        self.execute_source(&path.display().to_string(), &source)
    }

    /// Expand and evaluate one top-level form in the global environment.
    pub fn eval_form(&mut self, form: &Value) -> Result<Value, LustError> {
        self.context.depth = 0;
        let global = self.context.global.clone();
        let expanded = macros::expand(form, &global, &mut self.context)?;
        debug!(form = %expanded, "evaluating top-level form");
        eval(&expanded, &global, &mut self.context)
    }

    fn eval_spanned(
        &mut self,
        form: &Spanned<Value>,
        context: &SourceContext,
    ) -> Result<Value, LustError> {
        self.eval_form(&form.value)
            .map_err(|error| error.or_located(context, form.span))
    }

    /// Apply a callable value from host code.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, LustError> {
        self.context.depth = 0;
        eval::call(callee, args, &mut self.context)
    }

    // ============================================================================
    // CLI SERVICE METHODS
    // ============================================================================

    /// Read every form of `source` without evaluating anything.
    pub fn read_source(name: &str, source: &str) -> Result<Vec<Value>, LustError> {
        let context = SourceContext::from_file(name, source);
        Reader::new(&context)
            .map(|form| form.map(|form| form.value))
            .collect()
    }

    /// Macro-expand every form of `source`. `macro` definitions are
    /// evaluated as they are met so later forms can use them; nothing else
    /// runs.
    pub fn expand_source(&mut self, name: &str, source: &str) -> Result<Vec<Value>, LustError> {
        let context = SourceContext::from_file(name, source);
        let global = self.context.global.clone();
        let mut expanded_forms = Vec::new();
        for form in Reader::new(&context) {
            let form = form?;
            let expanded = macros::expand(&form.value, &global, &mut self.context)
                .map_err(|error| error.or_located(&context, form.span))?;
            if expanded.is_form(keywords().macro_) {
                eval(&expanded, &global, &mut self.context)
                    .map_err(|error| error.or_located(&context, form.span))?;
            }
            expanded_forms.push(expanded);
        }
        Ok(expanded_forms)
    }

    /// Reads a file with standardized error handling
    pub fn read_file(path: &Path) -> Result<String, LustError> {
        std::fs::read_to_string(path).map_err(|error| {
            LustError::new(ErrorKind::Io {
                path: path.display().to_string(),
                message: error.to_string(),
            })
        })
    }

    /// Lists all available atoms
    pub fn list_atoms(&self) -> Vec<String> {
        self.atoms.list()
    }
}

// ============================================================================
// EVALUATION THREAD
// ============================================================================

/// Run `f` on a dedicated thread with `stack_size` bytes of native stack.
///
/// `eval` grows the stack on demand wherever it runs; a large initial stack
/// only saves those allocations. A panic in `f` is resumed on the caller.
pub fn run_with_stack<F, T>(stack_size: usize, f: F) -> Result<T, LustError>
where
    F: FnOnce() -> Result<T, LustError> + Send + 'static,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name("lust-eval".to_string())
        .stack_size(stack_size)
        .spawn(f)
        .map_err(|error| {
            LustError::new(ErrorKind::Internal {
                message: format!("cannot start evaluation thread: {}", error),
            })
        })?;
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> (ExecutionPipeline, OutputBuffer) {
        let buffer = OutputBuffer::new();
        let pipeline = ExecutionPipeline::with_output(
            InterpreterConfig::default(),
            SharedOutput::new(buffer.clone()),
        );
        (pipeline, buffer)
    }

    #[test]
    fn forms_run_in_order_and_return_the_last_value() {
        let (mut pipeline, _) = capture();
        let value = pipeline
            .execute_source("t", "(let x 2) (let y 3) (* x y)")
            .unwrap();
        assert_eq!(value, Value::Int(6));
    }

    #[test]
    fn println_goes_to_the_configured_sink() {
        let (mut pipeline, buffer) = capture();
        pipeline
            .execute_source("t", r#"(println "a" 1) (display "b")"#)
            .unwrap();
        assert_eq!(buffer.contents(), "a 1\nb");
    }

    #[test]
    fn runtime_errors_are_located_at_their_top_level_form() {
        let (mut pipeline, _) = capture();
        let err = pipeline
            .execute_source("t", "(let a 1)\n(set! a 2)")
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::ImmutableBindingAssignment { .. }
        ));
        assert_eq!(err.location(), Some((2, 1)));
    }

    #[test]
    fn execute_each_keeps_going_after_a_parse_error() {
        let (mut pipeline, _) = capture();
        let results = pipeline.execute_each("t", "(+ 1 2)\n(1 2\n");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &Value::Int(3));
        assert!(results[1].as_ref().unwrap_err().is_parse_error());
    }

    #[test]
    fn expand_source_defines_macros_without_running_code() {
        let (mut pipeline, buffer) = capture();
        let forms = pipeline
            .expand_source(
                "t",
                "(macro (twice x) `(begin ,x ,x)) (twice (println 1))",
            )
            .unwrap();
        assert_eq!(forms[1].to_string(), "(begin (println 1) (println 1))");
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn recursion_limit_is_an_error_not_a_crash() {
        let mut config = InterpreterConfig::default();
        config.max_depth = 50;
        let mut pipeline = ExecutionPipeline::with_output(config, SharedOutput::new(OutputBuffer::new()));
        let err = pipeline
            .execute_source("t", "(let (down n) (if (= n 0) 0 (+ 1 (down (- n 1))))) (down 100)")
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RecursionLimit { depth: 50 }));
        // The context recovers for the next form.
        assert_eq!(
            pipeline.execute_source("t", "(down 10)").unwrap(),
            Value::Int(10)
        );
    }

    #[test]
    fn gensyms_are_fresh() {
        let (mut pipeline, _) = capture();
        let a = pipeline.execute_source("t", "(gensym)").unwrap();
        let b = pipeline.execute_source("t", "(gensym)").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn run_with_stack_returns_the_closure_result() {
        let value = run_with_stack(8 * 1024 * 1024, || {
            let mut pipeline = ExecutionPipeline::with_output(
                InterpreterConfig::default(),
                SharedOutput::new(OutputBuffer::new()),
            );
            pipeline
                .execute_source("t", "(+ 1 2)")
                .map(|value| value.to_string())
        })
        .unwrap();
        assert_eq!(value, "3");
    }
}
