//! Output strategies shared by one tree walk.
//!
//! The evaluator resolves tags, props and children the same way for
//! every output; a [`Backend`] decides what a resolved native element,
//! component or fragment turns into.
//!
//! - [`DomBackend`] builds live [`Node`](crate::dom::Node)s and calls
//!   components.
//! - [`DescriptorBackend`] builds immutable descriptors through an
//!   [`ElementFactory`](crate::element::ElementFactory) and never calls
//!   components.

use crate::ast::value::{Props, Value};
use crate::dom::Namespace;
use crate::error::EvalError;
use crate::eval::RenderOptions;
use crate::registry::Callable;

mod descriptor;
mod dom;

pub use descriptor::DescriptorBackend;
pub use dom::DomBackend;

pub trait Backend: Clone + 'static {
    /// Build a native element. `children` are already flattened, with
    /// nullish and boolean values removed.
    fn native(
        &self,
        options: &RenderOptions,
        name: &str,
        namespace: Namespace,
        props: Props,
        children: Vec<Value>,
    ) -> Result<Value, EvalError>;

    fn component(&self, callable: &Callable, props: Props, children: Vec<Value>) -> Result<Value, EvalError>;

    fn fragment(&self, children: Vec<Value>) -> Result<Value, EvalError>;
}

/// Fold resolved children into `props.children`: absent for none, the
/// value itself for one, an array for several.
pub(crate) fn with_children(mut props: Props, mut children: Vec<Value>) -> Props {
    match children.len() {
        0 => {}
        1 => {
            props.insert("children".to_string(), children.remove(0));
        }
        _ => {
            props.insert("children".to_string(), Value::Array(children));
        }
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_children_shapes() {
        assert!(with_children(Props::new(), vec![]).get("children").is_none());
        assert_eq!(
            with_children(Props::new(), vec![Value::from("a")]).get("children"),
            Some(&Value::from("a"))
        );
        assert_eq!(
            with_children(Props::new(), vec![Value::from(1), Value::from(2)]).get("children"),
            Some(&Value::Array(vec![Value::from(1), Value::from(2)]))
        );
    }
}
