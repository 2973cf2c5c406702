use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Node;
use crate::element::Element;
use crate::registry::{Callable, Callback, ComponentRef};

/// Insertion-ordered property map, used for element props and object
/// literals alike.
pub type Props = IndexMap<String, Value>;

/// The set of runtime values that can be interpolated into a template,
/// produced by an expression, or handed to a rendering back end.
///
/// Data variants (`String`, `Number`, `Array`, `Object`, ...) compare
/// structurally. Host-side handles (`Function`, `Component`, `Node`,
/// `Element`, `Slot`, `Iterable`, `Deferred`) compare by identity.
///
/// ```rust
/// use markup_lit::Value;
///
/// let s: Value = "hello".into();
/// let n: Value = 42.into();
/// let b: Value = true.into();
/// let a: Value = vec!["a", "b"].into();
/// let missing: Value = None::<String>.into();
/// assert!(missing.is_nullish());
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Props),
    /// A host or arrow function.
    Function(Callback),
    /// A component usable in tag position.
    Component(ComponentRef),
    /// A one-shot lazy sequence, flattened when used as children.
    Iterable(Iterable),
    /// A pending asynchronous result. Never accepted by the renderer.
    Deferred(Deferred),
    /// A mutable cell that receives a DOM node through `ref`.
    Slot(Slot),
    Node(Node),
    Element(Element),
}

impl Value {
    /// Convert this value to its string form, following the usual
    /// template-literal coercions.
    ///
    /// - `Number`: formatted without trailing `.0` for whole numbers
    /// - `Array`: elements joined with `","`, nullish elements empty
    /// - `Object`: `"[object Object]"`
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Slot(_) | Value::Element(_) => "[object Object]".to_string(),
            Value::Function(cb) => format!("function {}() {{ [native code] }}", cb.name().unwrap_or("")),
            Value::Component(c) => format!("function {}() {{ [native code] }}", c.name()),
            Value::Iterable(_) => "[object Iterator]".to_string(),
            Value::Deferred(_) => "[object Promise]".to_string(),
            Value::Node(node) => node.text_content(),
        }
    }

    /// Type name for diagnostic messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Component(_) => "component",
            Value::Iterable(_) => "iterable",
            Value::Deferred(_) => "deferred value",
            Value::Slot(_) => "ref slot",
            Value::Node(_) => "node",
            Value::Element(_) => "element",
        }
    }

    /// Falsy values: `undefined`, `null`, `false`, `0`, `NaN`, `""`.
    /// Everything else is truthy, including empty arrays and objects.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Numeric coercion. Strings are trimmed and parsed; anything that
    /// does not parse is `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    /// `===`: same type and same value. Host handles compare by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// `==`: `null` and `undefined` equal each other, and numbers, strings
    /// and booleans are compared numerically when their types differ.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self == other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Props> {
        match self {
            Value::Object(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Value::Element(el) => Some(el),
            _ => None,
        }
    }

    /// The value as something that can stand in tag position, if it is one.
    pub fn as_callable(&self) -> Option<Callable> {
        match self {
            Value::Function(cb) => Some(Callable::Function(cb.clone())),
            Value::Component(c) => Some(Callable::Component(c.clone())),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Component(a), Value::Component(b)) => a == b,
            (Value::Iterable(a), Value::Iterable(b)) => a == b,
            (Value::Deferred(a), Value::Deferred(b)) => a == b,
            (Value::Slot(a), Value::Slot(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(props) => f.debug_tuple("Object").field(props).finish(),
            Value::Function(cb) => f.debug_tuple("Function").field(cb).finish(),
            Value::Component(c) => f.debug_tuple("Component").field(c).finish(),
            Value::Iterable(_) => f.write_str("Iterable(..)"),
            Value::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
            Value::Slot(slot) => f.debug_tuple("Slot").field(&slot.get()).finish(),
            Value::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Value::Element(el) => f.debug_tuple("Element").field(el).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

// ── Host handles ────────────────────────────────────────────────────────

/// A lazily produced sequence of values, consumed at most once.
///
/// Clones share the same underlying iterator: once one clone has been
/// drained, the others yield nothing.
#[derive(Clone)]
pub struct Iterable(Rc<RefCell<Option<Box<dyn Iterator<Item = Value>>>>>);

impl Iterable {
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self(Rc::new(RefCell::new(Some(Box::new(iter.into_iter())))))
    }

    /// Drain the remaining items.
    pub fn take(&self) -> Vec<Value> {
        match self.0.borrow_mut().take() {
            Some(iter) => iter.collect(),
            None => Vec::new(),
        }
    }
}

impl PartialEq for Iterable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A pending asynchronous result, such as an unresolved fetch.
///
/// Rendering is synchronous: a deferred value anywhere in the tree is
/// reported as an unsupported value.
#[derive(Debug, Clone)]
pub struct Deferred(Rc<str>);

impl Deferred {
    pub fn new(label: impl Into<Rc<str>>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A shared mutable cell, the target of a `ref` attribute.
///
/// ```rust
/// use markup_lit::{Slot, Value};
///
/// let slot = Slot::new();
/// slot.set(Value::from(1));
/// assert_eq!(slot.get(), Value::from(1));
/// ```
#[derive(Clone, Default)]
pub struct Slot(Rc<RefCell<Value>>);

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ── Conversions ─────────────────────────────────────────────────────────

/// Conversion used by the `markup!` macro for interpolated expressions.
///
/// Blanket-implemented for everything that is `Clone + Into<Value>`, so
/// interpolations borrow rather than move their operands.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: Clone + Into<Value>> ToValue for T {
    fn to_value(&self) -> Value {
        self.clone().into()
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Object(props)
    }
}

impl From<Callback> for Value {
    fn from(cb: Callback) -> Self {
        Value::Function(cb)
    }
}

impl From<ComponentRef> for Value {
    fn from(c: ComponentRef) -> Self {
        Value::Component(c)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        match c {
            Callable::Function(cb) => Value::Function(cb),
            Callable::Component(c) => Value::Component(c),
        }
    }
}

impl From<Iterable> for Value {
    fn from(it: Iterable) -> Self {
        Value::Iterable(it)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

impl From<Slot> for Value {
    fn from(slot: Slot) -> Self {
        Value::Slot(slot)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Element> for Value {
    fn from(el: Element) -> Self {
        Value::Element(el)
    }
}
