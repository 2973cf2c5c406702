//! Tree evaluation.
//!
//! The evaluator walks a parsed [`Markup`] tree and hands each resolved
//! element, component and fragment to a [`Backend`]. Tag resolution,
//! attribute merging, child flattening, text normalization and namespace
//! tracking happen here, once, for every back end.
//!
//! Expressions are evaluated directly on their parsed subtree (see
//! `expr.rs`). The only names in scope are the placeholder tokens of the
//! current assembly and the parameters of enclosing arrow functions.

use std::fmt;
use std::rc::Rc;

use crate::ast::expr::Expr;
use crate::ast::markup::*;
use crate::ast::span::Span;
use crate::ast::value::{Props, Value};
use crate::attributes::{AttributeTable, HtmlAttributes};
use crate::backend::Backend;
use crate::dom::Namespace;
use crate::error::EvalError;
use crate::registry::Callable;

mod context;
mod expr;

pub(crate) use context::Context;

// ── Render options ──────────────────────────────────────────────────────

/// Configuration for a render.
///
/// Create with [`RenderOptions::new()`] and chain builder methods:
///
/// ```rust
/// use std::rc::Rc;
/// use markup_lit::{HtmlAttributes, RenderOptions};
///
/// let opts = RenderOptions::new()
///     .diagnostics(true)
///     .attribute_table(Rc::new(HtmlAttributes));
/// assert!(opts.diagnostics);
/// ```
#[derive(Clone)]
pub struct RenderOptions {
    /// When `true`, malformed event handlers and raw-markup values are
    /// errors. When `false` they are skipped with a warning. Defaults to
    /// on in debug builds.
    pub diagnostics: bool,

    attributes: Rc<dyn AttributeTable>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable handler and raw-markup shape checks.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Replace the attribute classification table used by the DOM back end.
    pub fn attribute_table(mut self, table: Rc<dyn AttributeTable>) -> Self {
        self.attributes = table;
        self
    }

    pub fn attributes(&self) -> &dyn AttributeTable {
        self.attributes.as_ref()
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            diagnostics: cfg!(debug_assertions),
            attributes: Rc::new(HtmlAttributes),
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

// ── Lexical scope chain ─────────────────────────────────────────────────

/// Arrow-function parameters in scope. Frames are shared so closures can
/// capture the chain they were created in.
#[derive(Clone, Default)]
struct Scope(Option<Rc<Frame>>);

struct Frame {
    bindings: Vec<(String, Value)>,
    parent: Scope,
}

impl Scope {
    fn push(&self, bindings: Vec<(String, Value)>) -> Scope {
        Scope(Some(Rc::new(Frame {
            bindings,
            parent: self.clone(),
        })))
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.0.as_ref();
        while let Some(frame) = current {
            if let Some((_, value)) = frame.bindings.iter().rev().find(|(n, _)| n == name) {
                return Some(value.clone());
            }
            current = frame.parent.0.as_ref();
        }
        None
    }
}

// ── Evaluator ───────────────────────────────────────────────────────────

/// Evaluate `root` against `ctx`, producing the back end's output.
pub(crate) fn evaluate<B: Backend>(ctx: Rc<Context>, backend: B, root: &Markup) -> Result<Value, EvalError> {
    let evaluator = Evaluator { ctx, backend };
    evaluator.eval_markup(root, &Scope::default(), Namespace::Html)
}

/// How a tag name resolved.
enum TagKind<'a> {
    Native(&'a str),
    Bound(Callable),
}

#[derive(Clone)]
struct Evaluator<B: Backend> {
    ctx: Rc<Context>,
    backend: B,
}

impl<B: Backend> Evaluator<B> {
    fn eval_markup(&self, markup: &Markup, scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        match markup {
            Markup::Element(el) => self.eval_element(el, scope, ns),
            Markup::Fragment(frag) => {
                let children = self.eval_children(&frag.children, scope, ns)?;
                self.backend.fragment(children)
            }
        }
    }

    fn eval_element(&self, el: &Element, scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        match self.resolve_tag(&el.name.node, el.name.span)? {
            TagKind::Native(name) => {
                let (element_ns, children_ns) = namespaces_for(name, ns);
                let props = self.eval_attributes(&el.attributes, scope, element_ns)?;
                let children = self.eval_children(&el.children, scope, children_ns)?;
                self.backend
                    .native(&self.ctx.options, name, element_ns, props, children)
                    .map_err(|e| with_default_span(e, el.span))
            }
            TagKind::Bound(callable) => {
                let props = self.eval_attributes(&el.attributes, scope, ns)?;
                let children = self.eval_children(&el.children, scope, ns)?;
                let result = self
                    .backend
                    .component(&callable, props, children)
                    .map_err(|e| with_default_span(e, el.span))?;
                if matches!(result, Value::Deferred(_)) {
                    return Err(EvalError::unsupported_async("components").with_span(el.name.span));
                }
                Ok(result)
            }
        }
    }

    fn resolve_tag<'a>(&self, name: &'a str, span: Span) -> Result<TagKind<'a>, EvalError> {
        if let Some(callable) = self.ctx.assembly.bindings().get(name) {
            return Ok(TagKind::Bound(callable.clone()));
        }
        if let Some(value) = self.ctx.assembly.placeholder(name) {
            return Err(EvalError::invalid_element_type(value.type_name()).with_span(span));
        }
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(EvalError::unknown_component(name).with_span(span));
        }
        Ok(TagKind::Native(name))
    }

    // ── Attributes ──────────────────────────────────────────────────────

    fn eval_attributes(&self, attributes: &[Attribute], scope: &Scope, ns: Namespace) -> Result<Props, EvalError> {
        let mut props = Props::new();
        for attribute in attributes {
            match attribute {
                Attribute::Spread(expr) => {
                    // only plain objects spread; arrays and scalars are ignored
                    let spread = require_sync(self.eval_guarded(expr, scope, ns)?, "attribute values", expr.span)?;
                    if let Value::Object(entries) = spread {
                        for (key, value) in entries {
                            props.insert(key, require_sync(value, "attribute values", expr.span)?);
                        }
                    }
                }
                Attribute::Named { name, value } => {
                    let value = match value {
                        AttrValue::Implicit => Value::Bool(true),
                        AttrValue::Literal(text) => Value::String(text.clone()),
                        AttrValue::Interpolated(parts) => self.eval_string_parts(parts, scope, ns)?,
                        AttrValue::Expr(container) => match &container.expr {
                            None => continue,
                            Some(expr) => self.eval_guarded(expr, scope, ns)?,
                        },
                        AttrValue::Markup(markup) => self.eval_markup(markup, scope, ns)?,
                    };
                    props.insert(name.node.clone(), require_sync(value, "attribute values", name.span)?);
                }
            }
        }
        Ok(props)
    }

    fn eval_string_parts(&self, parts: &[StrPart], scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        let mut out = String::new();
        for part in parts {
            match part {
                StrPart::Text(text) => out.push_str(text),
                StrPart::Expr(expr) => {
                    let value = require_sync(self.eval_guarded(expr, scope, ns)?, "attribute values", expr.span)?;
                    out.push_str(&value.to_display_string());
                }
            }
        }
        Ok(Value::String(out))
    }

    // ── Children ────────────────────────────────────────────────────────

    fn eval_children(&self, children: &[Child], scope: &Scope, ns: Namespace) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Child::Text(text) => {
                    if let Some(text) = normalize_text(&text.node) {
                        out.push(Value::String(text));
                    }
                }
                Child::Expr(container) => {
                    if let Some(expr) = &container.expr {
                        let value = self.eval_guarded(expr, scope, ns)?;
                        flatten_into(value, &mut out).map_err(|e| with_default_span(e, expr.span))?;
                    }
                }
                Child::Markup(markup) => {
                    let value = self.eval_markup(markup, scope, ns)?;
                    flatten_into(value, &mut out).map_err(|e| with_default_span(e, markup.span()))?;
                }
            }
        }
        Ok(out)
    }

    /// Evaluate an embedded expression, wrapping expression-level
    /// failures with the text the author wrote.
    fn eval_guarded(&self, expr: &Expr, scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        self.eval_expr(expr, scope, ns).map_err(|e| {
            if e.kind.is_markup_level() {
                with_default_span(e, expr.span)
            } else {
                let source = self.ctx.remapper.snippet(expr.span).to_string();
                EvalError::expression(&source, e).with_span(expr.span)
            }
        })
    }
}

/// Namespace of an element and of its children. `svg` and `math` switch
/// dialect; `foreignObject` hands its children back to HTML.
fn namespaces_for(name: &str, parent: Namespace) -> (Namespace, Namespace) {
    let element = match name {
        "svg" => Namespace::Svg,
        "math" => Namespace::MathMl,
        _ => parent,
    };
    let children = if name == "foreignObject" {
        Namespace::Html
    } else {
        element
    };
    (element, children)
}

fn with_default_span(e: EvalError, span: Span) -> EvalError {
    if e.span.is_none() { e.with_span(span) } else { e }
}

fn require_sync(value: Value, what: &str, span: Span) -> Result<Value, EvalError> {
    match value {
        Value::Deferred(_) => Err(EvalError::unsupported_async(what).with_span(span)),
        other => Ok(other),
    }
}

/// Append `value` to `out` as zero or more children.
fn flatten_into(value: Value, out: &mut Vec<Value>) -> Result<(), EvalError> {
    match value {
        Value::Undefined | Value::Null | Value::Bool(_) => Ok(()),
        Value::Array(items) => items.into_iter().try_for_each(|item| flatten_into(item, out)),
        Value::Iterable(iter) => iter.take().into_iter().try_for_each(|item| flatten_into(item, out)),
        Value::Deferred(_) => Err(EvalError::unsupported_async("children")),
        other => {
            out.push(other);
            Ok(())
        }
    }
}

/// Collapse a raw text run the way markup authors expect.
///
/// Tabs count as spaces. Every line but the first loses its leading
/// spaces and every line but the last its trailing spaces; lines left
/// empty are dropped and the rest are joined with a single space.
/// Returns `None` when nothing remains.
fn normalize_text(raw: &str) -> Option<String> {
    let unified = raw.replace("\r\n", "\n");
    let lines: Vec<&str> = unified.split(['\n', '\r']).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut trimmed = line.replace('\t', " ");
        if i != 0 {
            trimmed = trimmed.trim_start_matches(' ').to_string();
        }
        if i != lines.len() - 1 {
            trimmed = trimmed.trim_end_matches(' ').to_string();
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(&trimmed);
        if i != last_non_empty {
            out.push(' ');
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::value::{Deferred, Iterable};
    use crate::error::EvalErrorKind;

    #[test]
    fn test_normalize_single_line_keeps_edges() {
        assert_eq!(normalize_text(" "), Some(" ".to_string()));
        assert_eq!(normalize_text("  a  b "), Some("  a  b ".to_string()));
    }

    #[test]
    fn test_normalize_multiline() {
        assert_eq!(normalize_text("\n    Hello\n    world\n  "), Some("Hello world".to_string()));
        assert_eq!(normalize_text("Count: "), Some("Count: ".to_string()));
        assert_eq!(normalize_text("\n\t\n   "), None);
        assert_eq!(normalize_text("a\r\n  b"), Some("a b".to_string()));
    }

    #[test]
    fn test_normalize_trailing_text_after_newline() {
        assert_eq!(normalize_text("\n  tail "), Some("tail ".to_string()));
        assert_eq!(normalize_text(" head\n  "), Some(" head".to_string()));
    }

    #[test]
    fn test_flatten_nested_and_skip_nothing() {
        let mut out = Vec::new();
        let nested = Value::Array(vec![
            Value::from(1),
            Value::Null,
            Value::Array(vec![Value::Bool(true), Value::Array(vec![Value::from("deep")])]),
            Value::Undefined,
            Value::Iterable(Iterable::new(vec![Value::from(2), Value::Bool(false)])),
        ]);
        flatten_into(nested, &mut out).unwrap();
        assert_eq!(out, vec![Value::from(1), Value::from("deep"), Value::from(2)]);
    }

    #[test]
    fn test_flatten_rejects_deferred() {
        let mut out = Vec::new();
        let err = flatten_into(Value::Array(vec![Value::Deferred(Deferred::new("fetch"))]), &mut out).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnsupportedValue);
        assert_eq!(err.message, "Async children are not supported");
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(namespaces_for("svg", Namespace::Html), (Namespace::Svg, Namespace::Svg));
        assert_eq!(namespaces_for("circle", Namespace::Svg), (Namespace::Svg, Namespace::Svg));
        assert_eq!(namespaces_for("foreignObject", Namespace::Svg), (Namespace::Svg, Namespace::Html));
        assert_eq!(namespaces_for("math", Namespace::Html), (Namespace::MathMl, Namespace::MathMl));
        assert_eq!(namespaces_for("div", Namespace::Html), (Namespace::Html, Namespace::Html));
    }

    #[test]
    fn test_scope_shadowing() {
        let outer = Scope::default().push(vec![("x".into(), Value::from(1)), ("y".into(), Value::from(2))]);
        let inner = outer.push(vec![("x".into(), Value::from(10))]);
        assert_eq!(inner.lookup("x"), Some(Value::from(10)));
        assert_eq!(inner.lookup("y"), Some(Value::from(2)));
        assert_eq!(outer.lookup("x"), Some(Value::from(1)));
        assert_eq!(inner.lookup("z"), None);
    }

    #[test]
    fn test_render_options_defaults() {
        let opts = RenderOptions::new();
        assert_eq!(opts.diagnostics, cfg!(debug_assertions));
        assert_eq!(opts.attributes().lookup(Namespace::Html, "className").attribute, "class");
    }
}
