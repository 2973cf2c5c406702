//! # markup-lit
//!
//! Element markup written inside interpolated template literals, turned
//! at call time into either a live document tree or immutable element
//! descriptors.
//!
//! A render goes through three stages:
//!
//! - **Assembly** ([`assemble`]) merges the literal segments and the
//!   interpolated values into one markup source, replacing each value
//!   with a placeholder token or, in tag position, a bound identifier.
//! - **Parsing** ([`parse`]) reads that source. Failures are mapped back
//!   onto the text the author wrote by the [`Remapper`] and reported as
//!   [`Diagnostic`]s.
//! - **Evaluation** walks the tree and hands every element to a
//!   [`Backend`]: [`DomBackend`] for live [`Node`]s, [`DescriptorBackend`]
//!   for [`Element`] descriptors.
//!
//! ## Quick start
//!
//! ```rust
//! use markup_lit::{Document, Session, Template, Value};
//!
//! let session = Session::new().with_document(Document::new());
//! let template = Template::new(&["<p class=\"greeting\">Hello, ", "!</p>"], vec![Value::from("Ada")]);
//!
//! let node = session.html(&template).unwrap();
//! assert_eq!(node.to_html(), "<p class=\"greeting\">Hello, Ada!</p>");
//! ```
//!
//! The `markup!` macro from the `markup_macros` crate builds the
//! [`Template`] from a single string literal with `${expr}` holes.
//!
//! ## Components
//!
//! Functions and [`Component`]s go in tag position:
//!
//! ```rust
//! use markup_lit::{Callback, Document, Session, Template, Value};
//!
//! let badge = Value::Function(Callback::named("Badge", |args| {
//!     let label = args[0].as_object().and_then(|p| p.get("label")).cloned().unwrap_or_default();
//!     Ok(Value::String(format!("[{}]", label.to_display_string())))
//! }));
//!
//! let session = Session::new().with_document(Document::new());
//! let template = Template::new(&["<div><", " label=\"new\" /></div>"], vec![badge]);
//! assert_eq!(session.html(&template).unwrap().to_html(), "<div>[new]</div>");
//! ```
//!
//! ## Descriptors
//!
//! ```rust
//! use markup_lit::{Session, Template};
//!
//! let session = Session::new();
//! let value = session.jsx(&Template::new(&["<li key=\"a\">one</li>"], vec![])).unwrap();
//! let element = value.as_element().unwrap();
//! assert_eq!(element.tag_name(), Some("li"));
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

pub mod assemble;
pub mod ast;
pub mod attributes;
pub mod backend;
pub mod diagnostics;
pub mod dom;
pub mod element;
pub mod error;
mod eval;
mod parser;
pub mod registry;

pub use assemble::{Assembly, Interpolation, Splice, Template, assemble, placeholder_token};
pub use ast::span::{Span, Spanned};
pub use ast::value::{Deferred, Iterable, Props, Slot, ToValue, Value};
pub use attributes::{AttributeTable, HtmlAttributes, PropertyInfo};
pub use backend::{Backend, DescriptorBackend, DomBackend};
pub use diagnostics::{Diagnostic, Remapper, code_frame, offset_to_line_col};
pub use dom::{Document, Namespace, Node};
pub use element::{Descriptors, Element, ElementFactory, ElementType};
pub use error::{EvalError, EvalErrorKind, Label, ParseError};
pub use eval::RenderOptions;
pub use parser::parse;
pub use registry::{Bindings, Callable, Callback, ClosureComponent, Component, ComponentRef, TagBinding};

use eval::Context;

/// Combined error type returned by [`Session::html`] and [`Session::jsx`].
#[derive(Debug)]
pub enum RenderError {
    /// The markup did not parse. Each diagnostic points into the
    /// template as written.
    Parse(Vec<Diagnostic>),
    /// An error occurred during evaluation.
    Eval(EvalError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Parse(diagnostics) => {
                for (i, d) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{d}")?;
                }
                Ok(())
            }
            RenderError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Owns the per-session state of rendering: the invocation counter that
/// keeps placeholder tokens unique, the document host, the descriptor
/// factory and the render options.
///
/// Sessions are single-threaded. A component may render through the same
/// session re-entrantly; every call draws a fresh invocation id.
pub struct Session {
    invocations: Cell<u64>,
    document: Option<Document>,
    factory: Rc<dyn ElementFactory>,
    options: RenderOptions,
}

impl Session {
    /// A session with no document host, the built-in [`Descriptors`]
    /// factory and default options.
    pub fn new() -> Self {
        Self {
            invocations: Cell::new(0),
            document: None,
            factory: Rc::new(Descriptors),
            options: RenderOptions::default(),
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_factory(mut self, factory: Rc<dyn ElementFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Number of renders started so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.get()
    }

    /// Render into a live node. Results that are not nodes are wrapped:
    /// lists become fragments, nothing-values an empty fragment, anything
    /// else a text node.
    pub fn html(&self, template: &Template<'_>) -> Result<Node, RenderError> {
        let document = self.document.clone().ok_or_else(|| {
            RenderError::Eval(EvalError::environment(
                "html rendering needs a document host; configure one with `Session::with_document`",
            ))
        })?;
        let backend = DomBackend::new(document);
        let value = self.render_with(template, backend.clone(), "html")?;
        backend.to_node(value).map_err(RenderError::Eval)
    }

    /// Render into descriptors through the session's [`ElementFactory`].
    pub fn jsx(&self, template: &Template<'_>) -> Result<Value, RenderError> {
        let backend = DescriptorBackend::new(self.factory.clone());
        self.render_with(template, backend, "jsx")
    }

    /// Assemble, parse and evaluate `template` with a custom back end.
    /// `tag` names the renderer in diagnostics.
    pub fn render_with<B: Backend>(&self, template: &Template<'_>, backend: B, tag: &str) -> Result<Value, RenderError> {
        let invocation = self.next_invocation();
        let assembly = assemble(template, invocation);
        let remapper = Remapper::new(template, &assembly);

        let root = match parser::parse(assembly.source()) {
            Ok(root) => root,
            Err(errors) => {
                let diagnostics: Vec<Diagnostic> = errors.iter().map(|e| remapper.diagnostic(e, tag)).collect();
                debug!(
                    invocation,
                    errors = diagnostics.len(),
                    line = diagnostics.first().map_or(0, |d| d.line),
                    column = diagnostics.first().map_or(0, |d| d.column),
                    "template failed to parse"
                );
                return Err(RenderError::Parse(diagnostics));
            }
        };

        let ctx = Rc::new(Context::new(assembly, remapper, self.options.clone()));
        eval::evaluate(ctx, backend, &root).map_err(RenderError::Eval)
    }

    fn next_invocation(&self) -> u64 {
        let id = self.invocations.get() + 1;
        self.invocations.set(id);
        id
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("invocations", &self.invocations.get())
            .field("document", &self.document.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
