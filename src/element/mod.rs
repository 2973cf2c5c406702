//! Immutable element descriptors for the `jsx` back end.
//!
//! A descriptor records what to build without building it: the element
//! type, its props and its children. Component-tree libraries plug in
//! through [`ElementFactory`]; the built-in [`Descriptors`] factory
//! follows the usual `createElement(type, props, ...children)` shape.

use std::fmt;
use std::rc::Rc;

use crate::ast::value::{Props, Value};
use crate::backend::with_children;
use crate::error::EvalError;
use crate::registry::Callable;

/// What a descriptor stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Native(String),
    Component(Callable),
    Fragment,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Native(name) => write!(f, "{name}"),
            ElementType::Component(callable) => {
                write!(f, "{}", callable.declared_name().unwrap_or("Anonymous"))
            }
            ElementType::Fragment => write!(f, "Fragment"),
        }
    }
}

struct ElementData {
    ty: ElementType,
    key: Option<Value>,
    props: Props,
}

/// A shared, immutable element descriptor, compared by identity.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    pub fn new(ty: ElementType, key: Option<Value>, props: Props) -> Self {
        Self(Rc::new(ElementData { ty, key, props }))
    }

    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    pub fn key(&self) -> Option<&Value> {
        self.0.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// `props.children`, as a list.
    pub fn children(&self) -> Vec<Value> {
        match self.0.props.get("children") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
        }
    }

    /// The native tag name, if this is a native element.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.ty {
            ElementType::Native(name) => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Element");
        s.field("type", &self.0.ty.to_string());
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        s.field("props", &self.0.props).finish()
    }
}

/// The element-construction call of a component-tree library.
pub trait ElementFactory {
    fn create_element(
        &self,
        ty: ElementType,
        props: Props,
        children: Vec<Value>,
    ) -> Result<Value, EvalError>;
}

/// The built-in factory, producing [`Element`] descriptors.
///
/// `key` is pulled out of the props. Children are folded into
/// `props.children`: absent for none, the value itself for one, an array
/// for several.
///
/// ```rust
/// use markup_lit::{Descriptors, ElementFactory, ElementType, Props, Value};
///
/// let mut props = Props::new();
/// props.insert("key".into(), Value::from("a"));
/// let el = Descriptors
///     .create_element(ElementType::Native("li".into()), props, vec![Value::from("one")])
///     .unwrap();
/// let el = el.as_element().unwrap();
/// assert_eq!(el.key(), Some(&Value::from("a")));
/// assert_eq!(el.props().get("children"), Some(&Value::from("one")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Descriptors;

impl ElementFactory for Descriptors {
    fn create_element(
        &self,
        ty: ElementType,
        mut props: Props,
        children: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let key = props.shift_remove("key");
        let props = with_children(props, children);
        Ok(Value::Element(Element::new(ty, key, props)))
    }
}
