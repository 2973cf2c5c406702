//! Template assembly: turn literal segments and interpolated values into
//! a single markup source the parser can read.
//!
//! Each interpolation becomes one of three things:
//!
//! - In tag position (the text so far ends with `<` or `</`) a function or
//!   component is bound in the [`Bindings`] table and its identifier is
//!   spliced in, so `<${Counter}>...</${Counter}>` parses as an ordinary
//!   element pair.
//! - In tag position a string is spliced verbatim, for dynamic native tag
//!   names like `<${level}>`.
//! - Everywhere else a placeholder token `__mk_<invocation>_<index>_` is
//!   spliced in and the value is recorded under that token.
//!
//! The invocation number comes from the owning
//! [`Session`](crate::Session), so tokens from different renders never
//! collide.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::span::Span;
use crate::ast::value::Value;
use crate::registry::Bindings;

/// The raw pieces of a tagged template: literal segments, the values
/// between them, and optionally the source text of each interpolated
/// expression (used only for diagnostics).
///
/// `strings` has one more entry than `values`. Values past the last
/// segment boundary are ignored.
///
/// ```rust
/// use markup_lit::{Template, Value};
///
/// let template = Template::new(&["<p>Hello, ", "!</p>"], vec![Value::from("Ada")])
///     .with_sources(&["name"]);
/// assert_eq!(template.strings().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Template<'a> {
    strings: &'a [&'a str],
    values: Vec<Value>,
    sources: &'a [&'a str],
}

impl<'a> Template<'a> {
    pub fn new(strings: &'a [&'a str], values: Vec<Value>) -> Self {
        Self {
            strings,
            values,
            sources: &[],
        }
    }

    /// Attach the source text of each interpolated expression.
    pub fn with_sources(mut self, sources: &'a [&'a str]) -> Self {
        self.sources = sources;
        self
    }

    pub fn strings(&self) -> &[&'a str] {
        self.strings
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Source text of interpolation `index`, if it was supplied.
    pub fn source_of(&self, index: usize) -> Option<&'a str> {
        self.sources.get(index).copied()
    }

    /// Number of interpolation slots between the literal segments.
    pub fn interpolation_count(&self) -> usize {
        self.strings.len().saturating_sub(1)
    }
}

/// What was spliced in for an interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splice {
    Placeholder,
    Binding,
    /// A string in tag position, written out as-is.
    TagName,
}

/// Where one interpolation landed in the assembled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolation {
    pub index: usize,
    pub span: Span,
    pub splice: Splice,
}

/// The assembled markup source plus everything needed to resolve the
/// tokens spliced into it.
#[derive(Debug)]
pub struct Assembly {
    source: String,
    placeholders: HashMap<String, Value>,
    bindings: Bindings,
    interpolations: Vec<Interpolation>,
}

impl Assembly {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder(&self, token: &str) -> Option<&Value> {
        self.placeholders.get(token)
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Spliced spans, in source order.
    pub fn interpolations(&self) -> &[Interpolation] {
        &self.interpolations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagPosition {
    None,
    /// Directly after `<`, or after `</` with or without whitespace.
    Adjacent,
    /// After `<` and whitespace. `a < ${b}` is still a comparison unless
    /// `b` is callable.
    Spaced,
}

fn tag_position(source: &str) -> TagPosition {
    let trimmed = source.trim_end();
    if source.ends_with('<') || trimmed.ends_with("</") {
        TagPosition::Adjacent
    } else if trimmed.ends_with('<') {
        TagPosition::Spaced
    } else {
        TagPosition::None
    }
}

/// The placeholder token for interpolation `index` of render `invocation`.
pub fn placeholder_token(invocation: u64, index: usize) -> String {
    format!("__mk_{invocation}_{index}_")
}

/// Assemble `template` into a single markup source.
///
/// A template without interpolations assembles to its single segment,
/// regardless of `invocation`.
pub fn assemble(template: &Template<'_>, invocation: u64) -> Assembly {
    let mut source = String::new();
    let mut placeholders = HashMap::new();
    let mut bindings = Bindings::new();
    let mut interpolations = Vec::new();

    let slots = template.interpolation_count();
    for (index, segment) in template.strings().iter().enumerate() {
        source.push_str(segment);
        if index >= slots {
            break;
        }

        let value = template.values().get(index).cloned().unwrap_or_default();
        let start = source.len();
        let position = tag_position(&source);

        let splice = match (&value, value.as_callable()) {
            (_, Some(callable)) if position != TagPosition::None => {
                source.push_str(bindings.bind(&callable));
                Splice::Binding
            }
            (Value::String(name), _) if position == TagPosition::Adjacent => {
                source.push_str(name);
                Splice::TagName
            }
            _ => {
                let token = placeholder_token(invocation, index);
                source.push_str(&token);
                placeholders.insert(token, value);
                Splice::Placeholder
            }
        };

        interpolations.push(Interpolation {
            index,
            span: Span::new(start, source.len()),
            splice,
        });
    }

    debug!(
        invocation,
        interpolations = interpolations.len(),
        len = source.len(),
        placeholders = placeholders.len(),
        bindings = bindings.len(),
        "assembled template"
    );

    Assembly {
        source,
        placeholders,
        bindings,
        interpolations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Callable, Callback};

    fn component(name: &str) -> Value {
        Value::Function(Callback::named(name, |_| Ok(Value::Null)))
    }

    #[test]
    fn test_no_interpolations_is_verbatim() {
        let template = Template::new(&["<div>hi</div>"], vec![]);
        let first = assemble(&template, 1);
        let second = assemble(&template, 7);
        assert_eq!(first.source(), "<div>hi</div>");
        assert_eq!(first.source(), second.source());
        assert_eq!(first.placeholder_count(), 0);
    }

    #[test]
    fn test_child_and_attribute_placeholders() {
        let template = Template::new(
            &["<a href=", ">", "</a>"],
            vec![Value::from("/home"), Value::from("Home")],
        );
        let assembly = assemble(&template, 3);
        assert_eq!(assembly.source(), "<a href=__mk_3_0_>__mk_3_1_</a>");
        assert_eq!(assembly.placeholder("__mk_3_0_"), Some(&Value::from("/home")));
        assert_eq!(assembly.placeholder("__mk_3_1_"), Some(&Value::from("Home")));
        assert_eq!(
            assembly.interpolations()[1],
            Interpolation {
                index: 1,
                span: Span::new(18, 27),
                splice: Splice::Placeholder,
            }
        );
    }

    #[test]
    fn test_tag_position_binds_component() {
        let counter = component("Counter");
        let template = Template::new(
            &["<", " start=", ">x</", ">"],
            vec![counter.clone(), Value::from(1), counter.clone()],
        );
        let assembly = assemble(&template, 1);
        assert_eq!(assembly.source(), "<Counter start=__mk_1_1_>x</Counter>");
        assert_eq!(assembly.bindings().len(), 1);
        assert_eq!(
            assembly.bindings().get("Counter"),
            counter.as_callable().as_ref()
        );
    }

    #[test]
    fn test_tag_position_allows_whitespace() {
        let c = component("C");
        let template = Template::new(&["<p>< ", " /></ ", "></p>"], vec![c.clone(), c]);
        let assembly = assemble(&template, 1);
        assert_eq!(assembly.source(), "<p>< C /></ C></p>");
        assert_eq!(assembly.bindings().len(), 1);
        assert_eq!(assembly.placeholder_count(), 0);
        assert_eq!(assembly.interpolations()[0].splice, Splice::Binding);
        assert_eq!(assembly.interpolations()[1].splice, Splice::Binding);
    }

    #[test]
    fn test_comparison_with_string_is_placeholder() {
        let template = Template::new(&["<p>{a < ", "}</p>"], vec![Value::from("b")]);
        let assembly = assemble(&template, 1);
        assert_eq!(assembly.source(), "<p>{a < __mk_1_0_}</p>");
        assert_eq!(assembly.interpolations()[0].splice, Splice::Placeholder);

        let template = Template::new(&["</ ", ">"], vec![Value::from("h2")]);
        assert_eq!(assemble(&template, 1).interpolations()[0].splice, Splice::TagName);
    }

    #[test]
    fn test_distinct_components_with_same_name() {
        let a = component("Item");
        let b = component("Item");
        let template = Template::new(&["<ul><", " /><", " /><", " /></ul>"], vec![a.clone(), b.clone(), a]);
        let assembly = assemble(&template, 1);
        assert_eq!(assembly.source(), "<ul><Item /><Item2 /><Item /></ul>");
        assert_eq!(assembly.bindings().len(), 2);
        assert_eq!(
            assembly.bindings().get("Item2"),
            Some(&Callable::Function(match b {
                Value::Function(cb) => cb,
                _ => unreachable!(),
            }))
        );
    }

    #[test]
    fn test_string_in_tag_position_is_verbatim() {
        let template = Template::new(&["<", ">x</", ">"], vec![Value::from("h2"), Value::from("h2")]);
        let assembly = assemble(&template, 2);
        assert_eq!(assembly.source(), "<h2>x</h2>");
        assert_eq!(assembly.placeholder_count(), 0);
        assert_eq!(assembly.interpolations()[0].splice, Splice::TagName);
    }

    #[test]
    fn test_other_values_in_tag_position_stay_placeholders() {
        let template = Template::new(&["<", " />"], vec![Value::from(7)]);
        let assembly = assemble(&template, 2);
        assert_eq!(assembly.source(), "<__mk_2_0_ />");
        assert!(assembly.bindings().is_empty());
    }

    #[test]
    fn test_callable_outside_tag_position_is_placeholder() {
        let template = Template::new(&["<button onClick=", " />"], vec![component("handler")]);
        let assembly = assemble(&template, 4);
        assert_eq!(assembly.source(), "<button onClick=__mk_4_0_ />");
        assert!(assembly.bindings().is_empty());
    }
}
