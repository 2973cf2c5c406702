//! Error types for parsing and evaluation.
//!
//! [`ParseError`] is produced while parsing the assembled markup source
//! and carries spans in that source. The session remaps it onto the
//! authored template and reports it as a
//! [`Diagnostic`](crate::diagnostics::Diagnostic). [`EvalError`] is
//! produced during evaluation and can originate from the evaluator, a
//! rendering back end, or a host component or callback.

use crate::ast::span::Span;
use std::sync::Arc;
use thiserror::Error;

// ── Parse errors ────────────────────────────────────────────────────────

/// A source location with an optional message, shown under the code frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: Option<String>,
}

impl Label {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// The first label is the primary location.
    pub labels: Vec<Label>,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            labels: vec![Label::new(span)],
            hint: None,
        }
    }

    /// Attach a message to the primary label.
    pub fn with_label(mut self, message: impl Into<String>) -> Self {
        if let Some(primary) = self.labels.first_mut() {
            primary.message = Some(message.into());
        }
        self
    }

    /// Add a secondary location, e.g. the opening tag of a mismatched pair.
    pub fn with_secondary(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(span).with_message(message));
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn span(&self) -> Span {
        self.labels.first().map(|label| label.span).unwrap_or_default()
    }
}

// ── Eval errors ─────────────────────────────────────────────────────────

/// An error that occurs during template evaluation.
///
/// Carries a structured [`EvalErrorKind`], a human-readable message,
/// an optional [`Span`] in the authored template, and an optional
/// underlying error cause.
///
/// Errors raised inside an interpolated expression are wrapped in an
/// [`Expression`](EvalErrorKind::Expression) error whose message quotes
/// the offending source; the original error is kept as its source.
///
/// ```rust
/// use markup_lit::EvalError;
///
/// fn load() -> Result<(), EvalError> {
///     let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
///     Err(EvalError::host_error("failed to load avatar").with_source(io_err))
/// }
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
    pub message: String,
    /// The underlying error that caused this evaluation error, if any.
    ///
    /// Wrapped in `Arc` so that `EvalError` remains `Clone`.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach an underlying error cause to this evaluation error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // Convenience constructors for common error types

    pub fn environment(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Environment, message)
    }

    pub fn unknown_component(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownComponent,
            format!("unknown component <{name}>: components must be interpolated, as in <${{{name}}}>"),
        )
    }

    pub fn invalid_element_type(got: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidElementType,
            format!("invalid element type: expected a component or function in tag position, got {got}"),
        )
    }

    /// `what` names the unsupported position, e.g. `"children"`.
    pub fn unsupported_async(what: &str) -> Self {
        Self::new(
            EvalErrorKind::UnsupportedValue,
            format!("Async {what} are not supported"),
        )
    }

    /// Wrap an error raised while evaluating the expression `source`.
    pub fn expression(source: &str, cause: EvalError) -> Self {
        Self::new(
            EvalErrorKind::Expression,
            format!("error evaluating `{source}`: {}", cause.message),
        )
        .with_source(cause)
    }

    pub fn not_defined(name: &str) -> Self {
        Self::new(EvalErrorKind::Reference, format!("{name} is not defined"))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeError,
            format!("expected {expected}, got {got}"),
        )
    }

    pub fn not_callable(what: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::NotCallable,
            format!("{what} is not a function (got {got})"),
        )
    }

    pub fn invalid_handler(prop: &str, got: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidHandler,
            format!("expected `{prop}` listener to be a function, got {got}"),
        )
    }

    pub fn invalid_raw_markup(got: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidRawMarkup,
            format!("`dangerouslySetInnerHTML` must be an object with a string `__html` field, got {got}"),
        )
    }

    pub fn host_error(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::HostError, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// The session has no document host for DOM rendering.
    Environment,
    /// A capitalized tag that was written literally instead of interpolated.
    UnknownComponent,
    /// A non-callable value interpolated in tag position.
    InvalidElementType,
    /// A deferred (async) value reached the renderer.
    UnsupportedValue,
    /// An error raised inside an interpolated expression.
    Expression,
    /// An identifier that is neither a local nor an interpolation.
    Reference,
    TypeError,
    NotCallable,
    /// An `on*` prop whose value is not a function.
    InvalidHandler,
    /// A malformed `dangerouslySetInnerHTML` value.
    InvalidRawMarkup,
    HostError,
}

impl EvalErrorKind {
    /// Errors that describe the markup itself rather than a failing
    /// expression; these pass through expression wrapping unchanged.
    pub fn is_markup_level(&self) -> bool {
        matches!(
            self,
            EvalErrorKind::Environment
                | EvalErrorKind::UnknownComponent
                | EvalErrorKind::InvalidElementType
                | EvalErrorKind::UnsupportedValue
                | EvalErrorKind::Expression
                | EvalErrorKind::InvalidHandler
                | EvalErrorKind::InvalidRawMarkup
        )
    }
}
