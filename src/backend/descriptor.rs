use std::fmt;
use std::rc::Rc;

use super::Backend;
use crate::ast::value::{Props, Value};
use crate::dom::Namespace;
use crate::element::{ElementFactory, ElementType};
use crate::error::EvalError;
use crate::eval::RenderOptions;
use crate::registry::Callable;

/// Renders into descriptors through an [`ElementFactory`]. Components
/// are recorded, not called.
#[derive(Clone)]
pub struct DescriptorBackend {
    factory: Rc<dyn ElementFactory>,
}

impl DescriptorBackend {
    pub fn new(factory: Rc<dyn ElementFactory>) -> Self {
        Self { factory }
    }
}

impl fmt::Debug for DescriptorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorBackend").finish_non_exhaustive()
    }
}

impl Backend for DescriptorBackend {
    fn native(
        &self,
        _options: &RenderOptions,
        name: &str,
        _namespace: Namespace,
        props: Props,
        children: Vec<Value>,
    ) -> Result<Value, EvalError> {
        self.factory
            .create_element(ElementType::Native(name.to_string()), props, children)
    }

    fn component(&self, callable: &Callable, props: Props, children: Vec<Value>) -> Result<Value, EvalError> {
        self.factory
            .create_element(ElementType::Component(callable.clone()), props, children)
    }

    fn fragment(&self, children: Vec<Value>) -> Result<Value, EvalError> {
        self.factory
            .create_element(ElementType::Fragment, Props::new(), children)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::element::Descriptors;
    use crate::registry::Callback;

    #[test]
    fn test_components_are_not_called() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let callable = Callable::Function(Callback::named("Card", move |_| {
            counter.set(counter.get() + 1);
            Ok(Value::Null)
        }));

        let backend = DescriptorBackend::new(Rc::new(Descriptors));
        let value = backend.component(&callable, Props::new(), vec![Value::from("body")]).unwrap();
        assert_eq!(calls.get(), 0);

        let element = value.as_element().unwrap();
        assert_eq!(element.ty(), &ElementType::Component(callable));
        assert_eq!(element.children(), vec![Value::from("body")]);
    }

    #[test]
    fn test_fragment_descriptor() {
        let backend = DescriptorBackend::new(Rc::new(Descriptors));
        let value = backend.fragment(vec![Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(value.as_element().unwrap().ty(), &ElementType::Fragment);
    }
}
