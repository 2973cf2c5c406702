//! Callables that can appear in tag position, and the per-template table
//! that binds them to identifiers.
//!
//! A template may put any function or component in tag position:
//! `<${Counter} start=${1} />`. The assembler cannot splice a host value
//! into markup text, so it records each one in a [`Bindings`] table keyed
//! by the value's identity and writes a stable identifier in its place.
//!
//! There are two ways to define a component:
//!
//! - **Closure-based**: [`ClosureComponent`] wraps a `Fn(Props)`, and a
//!   plain [`Callback`] works too (it receives the props object as its
//!   only argument).
//! - **Trait-based**: implement [`Component`] directly. The
//!   `#[component]` macro in the `markup_macros` crate generates an
//!   implementation from a function signature.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::ast::value::{Props, Value};
use crate::error::EvalError;

// ── Trait definitions ───────────────────────────────────────────────────

/// A component renders a props object into a value (usually markup).
pub trait Component {
    /// Declared name, used to derive the binding identifier and in
    /// diagnostics.
    fn name(&self) -> &str;

    /// Render with pre-evaluated props. Children arrive in `props`
    /// under the `children` key when the DOM back end is in use.
    fn render(&self, props: Props) -> Result<Value, EvalError>;
}

/// A shared handle to a [`Component`], compared by identity.
#[derive(Clone)]
pub struct ComponentRef(Rc<dyn Component>);

impl ComponentRef {
    pub fn new(component: impl Component + 'static) -> Self {
        Self(Rc::new(component))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn render(&self, props: Props) -> Result<Value, EvalError> {
        self.0.render(props)
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

// ── Callbacks ───────────────────────────────────────────────────────────

type CallbackFn = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// A host or arrow function.
///
/// Used for event handlers, `ref` callbacks, `.map` arguments, and as a
/// component when placed in tag position.
///
/// ```rust
/// use markup_lit::{Callback, Value};
///
/// let double = Callback::named("double", |args| {
///     let n = args.first().map(Value::to_number).unwrap_or(0.0);
///     Ok(Value::from(n * 2.0))
/// });
/// assert_eq!(double.call(&[Value::from(4)]).unwrap(), Value::from(8));
/// ```
#[derive(Clone)]
pub struct Callback {
    name: Option<Rc<str>>,
    func: Rc<CallbackFn>,
}

impl Callback {
    pub fn new(func: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Self {
            name: None,
            func: Rc::new(func),
        }
    }

    pub fn named(
        name: impl Into<Rc<str>>,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: Some(name.into()),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(args)
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.func) as *const () as usize
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}", self.name().unwrap_or("<anonymous>"))
    }
}

// ── Callable ────────────────────────────────────────────────────────────

/// Anything that may stand in tag position.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    Function(Callback),
    Component(ComponentRef),
}

impl Callable {
    /// Invoke with a props object.
    pub fn call(&self, props: Props) -> Result<Value, EvalError> {
        match self {
            Callable::Function(cb) => cb.call(&[Value::Object(props)]),
            Callable::Component(c) => c.render(props),
        }
    }

    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Callable::Function(cb) => cb.name(),
            Callable::Component(c) => Some(c.name()),
        }
    }

    fn identity(&self) -> usize {
        match self {
            Callable::Function(cb) => cb.identity(),
            Callable::Component(c) => c.identity(),
        }
    }
}

// ── Closure-based convenience wrapper ───────────────────────────────────

/// A [`Component`] implementation backed by a closure.
///
/// ```rust
/// use markup_lit::{ClosureComponent, Value};
///
/// let greeting = ClosureComponent::new("Greeting", |props| {
///     let name = props.get("name").and_then(|v| v.as_str()).unwrap_or("world");
///     Ok(Value::String(format!("Hello, {name}!")))
/// });
/// ```
pub struct ClosureComponent<F>
where
    F: Fn(Props) -> Result<Value, EvalError>,
{
    name: String,
    func: F,
}

impl<F> ClosureComponent<F>
where
    F: Fn(Props) -> Result<Value, EvalError>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Component for ClosureComponent<F>
where
    F: Fn(Props) -> Result<Value, EvalError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, props: Props) -> Result<Value, EvalError> {
        (self.func)(props)
    }
}

// ── Tag bindings ────────────────────────────────────────────────────────

/// One callable bound to the identifier spliced into the markup source.
#[derive(Debug, Clone)]
pub struct TagBinding {
    pub ident: String,
    pub callable: Callable,
}

/// Identity-keyed table of the callables used in tag position by one
/// template invocation.
///
/// The same callable always gets the same identifier, so an opening and
/// closing tag interpolating the same value agree. Distinct callables
/// never share one, even when their declared names collide.
#[derive(Debug, Default)]
pub struct Bindings {
    by_identity: HashMap<usize, usize>,
    by_ident: HashMap<String, usize>,
    entries: Vec<TagBinding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callable`, returning its identifier. Binding the same callable
    /// again returns the identifier assigned the first time.
    pub fn bind(&mut self, callable: &Callable) -> &str {
        let identity = callable.identity();
        let index = match self.by_identity.get(&identity) {
            Some(&index) => index,
            None => {
                let ident = self.unique_ident(callable.declared_name());
                let index = self.entries.len();
                self.by_identity.insert(identity, index);
                self.by_ident.insert(ident.clone(), index);
                self.entries.push(TagBinding {
                    ident,
                    callable: callable.clone(),
                });
                index
            }
        };
        &self.entries[index].ident
    }

    pub fn get(&self, ident: &str) -> Option<&Callable> {
        self.by_ident
            .get(ident)
            .map(|&index| &self.entries[index].callable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagBinding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn unique_ident(&self, declared: Option<&str>) -> String {
        let base = sanitize_identifier(declared);
        let taken: HashSet<&str> = self.by_ident.keys().map(String::as_str).collect();
        if !taken.contains(base.as_str()) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or(base)
    }
}

/// Derive a tag identifier from a declared name.
///
/// Non-identifier characters become `_`, the first letter is upper-cased so
/// the identifier can never shadow a native element name, and an empty or
/// missing name falls back to `Component`.
pub fn sanitize_identifier(declared: Option<&str>) -> String {
    let cleaned: String = declared
        .unwrap_or("")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');

    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '$' => {
            first.to_ascii_uppercase().to_string() + chars.as_str()
        }
        Some(_) => format!("Component_{cleaned}"),
        None => "Component".to_string(),
    }
}
