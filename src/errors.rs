//! Lust Error Handling
//!
//! One error type for every phase of the pipeline. Errors carry what went
//! wrong (`ErrorKind`), where it happened (`SourceInfo`, when known), and how
//! to help (`DiagnosticInfo`). Rendering goes through `miette`.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// A named piece of source text that errors can point into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("; {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let before = &self.content[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// The single error type used across reader, expander and evaluator.
#[derive(Debug, Clone)]
pub struct LustError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened, once a source location is known
    pub source_info: Option<SourceInfo>,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors
    UnexpectedToken { expected: String, found: String },
    UnmatchedDelimiter { delimiter: char },
    UnterminatedString,
    InvalidLiteral { literal_type: String, value: String },
    OddMapLiteral { count: usize },

    // Expansion errors
    MacroExpansion { macro_name: String, reason: String },

    // Runtime errors
    UnboundVariable { symbol: String },
    ImmutableBindingAssignment { symbol: String },
    ArityMismatch { expected: String, actual: usize },
    TypeMismatch { expected: String, actual: String },
    InvalidOperation { operation: String, operand_type: String },
    RecursionLimit { depth: usize },

    // Module errors
    ModuleNotFound { module: String },
    DuplicateModuleDefinition { module: String },

    // Host errors
    Io { path: String, message: String },
    Internal { message: String },
}

/// Location of an error within a named source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub line: usize,
    pub column: usize,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Expansion,
    Runtime,
    Module,
    Host,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Expansion => "expansion",
            Self::Runtime => "runtime",
            Self::Module => "module",
            Self::Host => "host",
        }
    }
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedToken { .. }
            | Self::UnmatchedDelimiter { .. }
            | Self::UnterminatedString
            | Self::InvalidLiteral { .. }
            | Self::OddMapLiteral { .. } => ErrorCategory::Parse,

            Self::MacroExpansion { .. } => ErrorCategory::Expansion,

            Self::UnboundVariable { .. }
            | Self::ImmutableBindingAssignment { .. }
            | Self::ArityMismatch { .. }
            | Self::TypeMismatch { .. }
            | Self::InvalidOperation { .. }
            | Self::RecursionLimit { .. } => ErrorCategory::Runtime,

            Self::ModuleNotFound { .. } | Self::DuplicateModuleDefinition { .. } => {
                ErrorCategory::Module
            }

            Self::Io { .. } | Self::Internal { .. } => ErrorCategory::Host,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "unexpected_token",
            Self::UnmatchedDelimiter { .. } => "unmatched_delimiter",
            Self::UnterminatedString => "unterminated_string",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::OddMapLiteral { .. } => "odd_map_literal",
            Self::MacroExpansion { .. } => "macro_expansion",
            Self::UnboundVariable { .. } => "unbound_variable",
            Self::ImmutableBindingAssignment { .. } => "immutable_binding_assignment",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidOperation { .. } => "invalid_operation",
            Self::RecursionLimit { .. } => "recursion_limit",
            Self::ModuleNotFound { .. } => "module_not_found",
            Self::DuplicateModuleDefinition { .. } => "duplicate_module_definition",
            Self::Io { .. } => "io",
            Self::Internal { .. } => "internal",
        }
    }

    fn default_help(&self) -> Option<String> {
        match self {
            Self::UnmatchedDelimiter { .. } => {
                Some("check that every opening delimiter has a matching closer".into())
            }
            Self::ImmutableBindingAssignment { symbol } => Some(format!(
                "bind '{}' with `let!` to make it assignable",
                symbol
            )),
            Self::MacroExpansion { .. } => {
                Some("a macro that expands into a call to itself must eventually stop".into())
            }
            Self::ModuleNotFound { .. } => {
                Some("modules must be declared with `(module Name ...)` before use".into())
            }
            Self::RecursionLimit { .. } => {
                Some("raise `max_depth` or make the recursive call a tail call".into())
            }
            Self::Internal { .. } => {
                Some("This is an internal engine error. Please report this as a bug.".into())
            }
            _ => None,
        }
    }
}

impl LustError {
    /// Create an unlocated error; the engine attaches the current form later.
    pub fn new(kind: ErrorKind) -> Self {
        let error_code = format!("lust::{}::{}", kind.category().as_str(), kind.code_suffix());
        let help = kind.default_help();
        Self {
            kind,
            source_info: None,
            diagnostic_info: DiagnosticInfo { help, error_code },
        }
    }

    /// Create an error located at `span` inside `source`.
    pub fn at(kind: ErrorKind, source: &SourceContext, span: Span) -> Self {
        Self::new(kind).with_source(source, span)
    }

    /// Attach a location, replacing any previous one.
    pub fn with_source(mut self, source: &SourceContext, span: Span) -> Self {
        let (line, column) = source.line_col(span.start);
        self.source_info = Some(SourceInfo {
            source: source.to_named_source(),
            primary_span: span.into(),
            line,
            column,
        });
        self
    }

    /// Attach a location only if the error has none yet.
    pub fn or_located(self, source: &SourceContext, span: Span) -> Self {
        if self.source_info.is_some() {
            self
        } else {
            self.with_source(source, span)
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn code(&self) -> &str {
        &self.diagnostic_info.error_code
    }

    pub fn is_parse_error(&self) -> bool {
        self.category() == ErrorCategory::Parse
    }

    /// 1-based (line, column) of the error, when located.
    pub fn location(&self) -> Option<(usize, usize)> {
        self.source_info.as_ref().map(|info| (info.line, info.column))
    }

    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::UnexpectedToken { .. } => "unexpected token".into(),
            ErrorKind::UnmatchedDelimiter { .. } => "unmatched delimiter".into(),
            ErrorKind::UnterminatedString => "string starts here".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::OddMapLiteral { .. } => "map literal".into(),
            ErrorKind::MacroExpansion { .. } => "while expanding this form".into(),
            ErrorKind::UnboundVariable { .. } => "unbound variable".into(),
            ErrorKind::ImmutableBindingAssignment { .. } => "assignment here".into(),
            ErrorKind::ArityMismatch { .. } => "arity mismatch".into(),
            ErrorKind::TypeMismatch { .. } => "type mismatch".into(),
            ErrorKind::InvalidOperation { .. } => "invalid operation".into(),
            ErrorKind::RecursionLimit { .. } => "recursion limit exceeded".into(),
            ErrorKind::ModuleNotFound { .. } => "unknown module".into(),
            ErrorKind::DuplicateModuleDefinition { .. } => "duplicate module".into(),
            ErrorKind::Io { .. } | ErrorKind::Internal { .. } => "here".into(),
        }
    }
}

impl std::error::Error for LustError {}

impl fmt::Display for LustError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "Parse error: expected {}, found {}", expected, found)
            }
            ErrorKind::UnmatchedDelimiter { delimiter } => {
                write!(f, "Parse error: unmatched delimiter '{}'", delimiter)
            }
            ErrorKind::UnterminatedString => write!(f, "Parse error: unterminated string"),
            ErrorKind::InvalidLiteral {
                literal_type,
                value,
            } => write!(f, "Parse error: invalid {} '{}'", literal_type, value),
            ErrorKind::OddMapLiteral { count } => write!(
                f,
                "Parse error: map literal needs key/value pairs, found {} forms",
                count
            ),
            ErrorKind::MacroExpansion { macro_name, reason } => {
                write!(f, "Macro expansion error in '{}': {}", macro_name, reason)
            }
            ErrorKind::UnboundVariable { symbol } => {
                write!(f, "Runtime error: unbound variable '{}'", symbol)
            }
            ErrorKind::ImmutableBindingAssignment { symbol } => write!(
                f,
                "Runtime error: cannot assign to immutable binding '{}'",
                symbol
            ),
            ErrorKind::ArityMismatch { expected, actual } => write!(
                f,
                "Runtime error: incorrect arity, expected {}, got {}",
                expected, actual
            ),
            ErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "Type error: expected {}, got {}", expected, actual)
            }
            ErrorKind::InvalidOperation {
                operation,
                operand_type,
            } => write!(
                f,
                "Runtime error: invalid operation '{}' on {}",
                operation, operand_type
            ),
            ErrorKind::RecursionLimit { depth } => {
                write!(f, "Runtime error: recursion limit of {} exceeded", depth)
            }
            ErrorKind::ModuleNotFound { module } => {
                write!(f, "Module error: module '{}' not found", module)
            }
            ErrorKind::DuplicateModuleDefinition { module } => {
                write!(f, "Module error: module '{}' is already defined", module)
            }
            ErrorKind::Io { path, message } => write!(f, "I/O error on '{}': {}", path, message),
            ErrorKind::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl Diagnostic for LustError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let info = self.source_info.as_ref()?;
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_info
            .as_ref()
            .map(|info| &*info.source as &dyn miette::SourceCode)
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::from(span.start..span.end)
    }
}

// ============================================================================
// ERROR REPORTING TRAIT
// ============================================================================

/// Context-aware error creation: each phase knows how to build its errors.
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind) -> LustError;

    fn type_mismatch(&self, expected: &str, actual: &str) -> LustError {
        self.report(ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    fn unbound_variable(&self, symbol: &str) -> LustError {
        self.report(ErrorKind::UnboundVariable {
            symbol: symbol.into(),
        })
    }

    fn arity_mismatch(&self, expected: &str, actual: usize) -> LustError {
        self.report(ErrorKind::ArityMismatch {
            expected: expected.into(),
            actual,
        })
    }

    fn invalid_operation(&self, operation: &str, operand_type: &str) -> LustError {
        self.report(ErrorKind::InvalidOperation {
            operation: operation.into(),
            operand_type: operand_type.into(),
        })
    }

    fn module_not_found(&self, module: &str) -> LustError {
        self.report(ErrorKind::ModuleNotFound {
            module: module.into(),
        })
    }

    /// Creates an internal error; these indicate engine bugs, not user errors.
    fn internal_error(&self, message: &str) -> LustError {
        self.report(ErrorKind::Internal {
            message: message.into(),
        })
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a LustError with full miette diagnostics
pub fn print_error(error: LustError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_category_and_suffix() {
        let err = LustError::new(ErrorKind::ImmutableBindingAssignment {
            symbol: "a".into(),
        });
        assert_eq!(err.code(), "lust::runtime::immutable_binding_assignment");
        assert!(err.diagnostic_info.help.is_some());
    }

    #[test]
    fn located_errors_report_line_and_column() {
        let source = SourceContext::from_file("t.lust", "(let a 1)\n  (oops");
        let err = LustError::at(ErrorKind::UnterminatedString, &source, Span::new(12, 17));
        assert_eq!(err.location(), Some((2, 3)));
        assert!(err.is_parse_error());
    }

    #[test]
    fn or_located_keeps_existing_location() {
        let source = SourceContext::from_file("t.lust", "abc\ndef");
        let err = LustError::at(ErrorKind::UnterminatedString, &source, Span::new(4, 5))
            .or_located(&source, Span::new(0, 1));
        assert_eq!(err.location(), Some((2, 1)));
    }
}
