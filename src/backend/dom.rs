use tracing::{trace, warn};

use super::{Backend, with_children};
use crate::ast::value::{Props, Value};
use crate::attributes::PropertyInfo;
use crate::dom::{Document, Namespace, Node};
use crate::error::EvalError;
use crate::eval::RenderOptions;
use crate::registry::Callable;

/// Renders into live [`Node`]s of a [`Document`].
#[derive(Debug, Clone)]
pub struct DomBackend {
    document: Document,
}

impl DomBackend {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Turn an arbitrary render result into a node: nodes pass through,
    /// lists become fragments, nothing-values become an empty fragment,
    /// anything else becomes text.
    pub fn to_node(&self, value: Value) -> Result<Node, EvalError> {
        match value {
            Value::Node(node) => Ok(node),
            Value::Deferred(_) => Err(EvalError::unsupported_async("components")),
            Value::Undefined | Value::Null | Value::Bool(_) => Ok(self.document.create_fragment()),
            Value::Array(items) => self.fragment_node(items),
            Value::Iterable(iter) => self.fragment_node(iter.take()),
            other => Ok(self.document.create_text_node(&other.to_display_string())),
        }
    }

    fn fragment_node(&self, items: Vec<Value>) -> Result<Node, EvalError> {
        let fragment = self.document.create_fragment();
        for item in items {
            fragment.append_child(self.to_node(item)?);
        }
        Ok(fragment)
    }

    fn append_children(&self, parent: &Node, children: Vec<Value>) {
        for child in children {
            match child {
                Value::Node(node) => parent.append_child(node),
                other => parent.append_child(self.document.create_text_node(&other.to_display_string())),
            }
        }
    }
}

impl Backend for DomBackend {
    fn native(
        &self,
        options: &RenderOptions,
        name: &str,
        namespace: Namespace,
        props: Props,
        children: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let node = self.document.create_element(namespace, name);
        self.append_children(&node, children);
        for (key, value) in props {
            apply_prop(options, &node, namespace, &key, value)?;
        }
        Ok(Value::Node(node))
    }

    fn component(&self, callable: &Callable, props: Props, children: Vec<Value>) -> Result<Value, EvalError> {
        trace!(component = callable.declared_name().unwrap_or("anonymous"), "calling component");
        callable.call(with_children(props, children))
    }

    fn fragment(&self, children: Vec<Value>) -> Result<Value, EvalError> {
        let fragment = self.document.create_fragment();
        self.append_children(&fragment, children);
        Ok(Value::Node(fragment))
    }
}

// ── Prop application ────────────────────────────────────────────────────

fn apply_prop(
    options: &RenderOptions,
    node: &Node,
    namespace: Namespace,
    key: &str,
    value: Value,
) -> Result<(), EvalError> {
    match key {
        "children" | "key" => Ok(()),
        "ref" => apply_ref(node, value),
        "style" => {
            apply_style(node, value);
            Ok(())
        }
        "dangerouslySetInnerHTML" => apply_raw_markup(options, node, value),
        _ => match event_name(key) {
            Some((event, capture)) => apply_listener(options, node, key, &event, capture, value),
            None => {
                let info = options.attributes().lookup(namespace, key);
                apply_attribute(node, &info, value);
                Ok(())
            }
        },
    }
}

fn apply_ref(node: &Node, value: Value) -> Result<(), EvalError> {
    match value {
        Value::Function(callback) => callback.call(&[Value::Node(node.clone())]).map(|_| ()),
        Value::Slot(slot) => {
            slot.set(Value::Node(node.clone()));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn apply_style(node: &Node, value: Value) {
    match value {
        Value::String(css) => node.set_attribute("style", css),
        Value::Object(fields) => {
            for (field, value) in fields {
                if value.is_nullish() || value == Value::Bool(false) {
                    continue;
                }
                let value = value.to_display_string();
                if field.starts_with("--") {
                    node.set_style_property(&field, value);
                } else {
                    node.set_style(&field, value);
                }
            }
        }
        Value::Undefined | Value::Null => node.remove_attribute_ns(None, "style"),
        _ => {}
    }
}

fn apply_raw_markup(options: &RenderOptions, node: &Node, value: Value) -> Result<(), EvalError> {
    let html = value
        .as_object()
        .and_then(|fields| fields.get("__html"))
        .and_then(|html| html.as_str());
    match html {
        Some(html) => {
            node.set_inner_html(html);
            Ok(())
        }
        None if options.diagnostics => Err(EvalError::invalid_raw_markup(value.type_name())),
        None => {
            warn!(got = value.type_name(), "ignoring malformed dangerouslySetInnerHTML");
            Ok(())
        }
    }
}

fn apply_listener(
    options: &RenderOptions,
    node: &Node,
    key: &str,
    event: &str,
    capture: bool,
    value: Value,
) -> Result<(), EvalError> {
    match value {
        Value::Function(handler) => {
            node.add_event_listener(event, handler, capture);
            Ok(())
        }
        Value::Undefined | Value::Null | Value::Bool(false) => Ok(()),
        other if options.diagnostics => Err(EvalError::invalid_handler(key, other.type_name())),
        other => {
            warn!(prop = key, got = other.type_name(), "ignoring non-function event handler");
            Ok(())
        }
    }
}

/// `onClick` -> `click`, `onClickCapture` -> `click` (capture),
/// `on:my-event` -> `my-event`. Anything else is not an event prop.
///
/// The camel-case form is only lowercased, with no word splitting:
/// `onDoubleClick` listens for `doubleclick`, not the DOM's `dblclick`.
/// Use `on:dblclick` for event names that differ from the prop name.
fn event_name(key: &str) -> Option<(String, bool)> {
    if let Some(custom) = key.strip_prefix("on:") {
        if custom.is_empty() {
            return None;
        }
        return Some(match custom.strip_suffix("Capture") {
            Some(name) if !name.is_empty() => (name.to_string(), true),
            _ => (custom.to_string(), false),
        });
    }

    let rest = key.strip_prefix("on")?;
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let (rest, capture) = match rest.strip_suffix("Capture") {
        Some(name) if !name.is_empty() => (name, true),
        _ => (rest, false),
    };
    Some((rest.to_ascii_lowercase(), capture))
}

fn apply_attribute(node: &Node, info: &PropertyInfo, value: Value) {
    let ns = info.attribute_namespace;
    let name = info.attribute.as_str();

    if info.must_use_property {
        node.set_property(&info.property, value);
        return;
    }
    if value.is_nullish() {
        node.remove_attribute_ns(ns, name);
        return;
    }
    if info.boolean {
        let on = value.is_truthy();
        node.set_property(&info.property, Value::Bool(on));
        if on {
            node.set_attribute_ns(ns, name, "");
        } else {
            node.remove_attribute_ns(ns, name);
        }
        return;
    }
    if info.overloaded_boolean {
        match value {
            Value::Bool(true) => node.set_attribute_ns(ns, name, ""),
            Value::Bool(false) => node.remove_attribute_ns(ns, name),
            other => node.set_attribute_ns(ns, name, other.to_display_string()),
        }
        return;
    }

    let text = match (&value, info.space_separated, info.comma_separated) {
        (Value::Array(items), true, _) => join_display(items, " "),
        (Value::Array(items), _, true) => join_display(items, ", "),
        _ => value.to_display_string(),
    };
    node.set_attribute_ns(ns, name, text);
}

fn join_display(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::ast::value::Slot;
    use crate::error::EvalErrorKind;
    use crate::registry::Callback;

    fn render(props: Vec<(&str, Value)>) -> Result<Node, EvalError> {
        render_with(&RenderOptions::new().diagnostics(true), "div", Namespace::Html, props)
    }

    fn render_with(
        options: &RenderOptions,
        tag: &str,
        namespace: Namespace,
        props: Vec<(&str, Value)>,
    ) -> Result<Node, EvalError> {
        let backend = DomBackend::new(Document::new());
        let props: Props = props.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let value = backend.native(options, tag, namespace, props, vec![])?;
        Ok(value.as_node().cloned().expect("native returns a node"))
    }

    fn noop() -> Value {
        Value::Function(Callback::new(|_| Ok(Value::Undefined)))
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_name("onClick"), Some(("click".into(), false)));
        assert_eq!(event_name("onClickCapture"), Some(("click".into(), true)));
        assert_eq!(event_name("on:item-selected"), Some(("item-selected".into(), false)));
        assert_eq!(event_name("onDoubleClick"), Some(("doubleclick".into(), false)));
        assert_eq!(event_name("on:dblclick"), Some(("dblclick".into(), false)));
        assert_eq!(event_name("on:my-eventCapture"), Some(("my-event".into(), true)));
        assert_eq!(event_name("online"), None);
        assert_eq!(event_name("on"), None);
    }

    #[test]
    fn test_listener_registration() {
        let node = render(vec![("onClick", noop()), ("onKeyDownCapture", noop()), ("onBlur", Value::Null)]).unwrap();
        let listeners = node.listeners();
        assert_eq!(listeners.len(), 2);
        assert_eq!(listeners[0].event, "click");
        assert!(!listeners[0].capture);
        assert_eq!(listeners[1].event, "keydown");
        assert!(listeners[1].capture);
    }

    #[test]
    fn test_invalid_handler_depends_on_diagnostics() {
        let err = render(vec![("onClick", Value::from("alert(1)"))]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidHandler);

        let quiet = RenderOptions::new().diagnostics(false);
        let node = render_with(&quiet, "div", Namespace::Html, vec![("onClick", Value::from("x"))]).unwrap();
        assert!(node.listeners().is_empty());
    }

    #[test]
    fn test_ref_function_and_slot() {
        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();
        let callback = Callback::new(move |args| {
            flag.set(args.first().and_then(Value::as_node).is_some());
            Ok(Value::Undefined)
        });
        render(vec![("ref", Value::Function(callback))]).unwrap();
        assert!(seen.get());

        let slot = Slot::new();
        let node = render(vec![("ref", Value::Slot(slot.clone()))]).unwrap();
        assert_eq!(slot.get(), Value::Node(node));
    }

    #[test]
    fn test_style_object() {
        let mut style = Props::new();
        style.insert("backgroundColor".into(), Value::from("red"));
        style.insert("--accent".into(), Value::from("blue"));
        style.insert("color".into(), Value::Null);
        let node = render(vec![("style", Value::Object(style))]).unwrap();
        assert_eq!(node.style("background-color").as_deref(), Some("red"));
        assert_eq!(node.style("--accent").as_deref(), Some("blue"));
        assert_eq!(node.style("color"), None);
    }

    #[test]
    fn test_style_string() {
        let node = render(vec![("style", Value::from("color: red"))]).unwrap();
        assert_eq!(node.get_attribute("style").as_deref(), Some("color: red"));
    }

    #[test]
    fn test_raw_markup() {
        let mut raw = Props::new();
        raw.insert("__html".into(), Value::from("<b>hi</b>"));
        let node = render(vec![("dangerouslySetInnerHTML", Value::Object(raw))]).unwrap();
        assert_eq!(node.to_html(), "<div><b>hi</b></div>");

        let err = render(vec![("dangerouslySetInnerHTML", Value::from("<b>hi</b>"))]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidRawMarkup);
    }

    #[test]
    fn test_boolean_and_must_use_properties() {
        let options = RenderOptions::new();
        let node = render_with(
            &options,
            "input",
            Namespace::Html,
            vec![("disabled", Value::Bool(true)), ("readOnly", Value::Bool(false)), ("checked", Value::Bool(true))],
        )
        .unwrap();
        assert_eq!(node.get_attribute("disabled").as_deref(), Some(""));
        assert!(!node.has_attribute("readonly"));
        assert_eq!(node.property("readOnly"), Some(Value::Bool(false)));
        assert_eq!(node.property("checked"), Some(Value::Bool(true)));
        assert!(!node.has_attribute("checked"));
    }

    #[test]
    fn test_overloaded_boolean() {
        let node = render(vec![("download", Value::Bool(true))]).unwrap();
        assert_eq!(node.get_attribute("download").as_deref(), Some(""));
        let node = render(vec![("download", Value::from("report.pdf"))]).unwrap();
        assert_eq!(node.get_attribute("download").as_deref(), Some("report.pdf"));
        let node = render(vec![("download", Value::Bool(false))]).unwrap();
        assert!(!node.has_attribute("download"));
    }

    #[test]
    fn test_list_valued_attributes() {
        let node = render(vec![
            ("className", Value::from(vec!["btn", "primary"])),
            ("accept", Value::from(vec!["image/png", "image/jpeg"])),
        ])
        .unwrap();
        assert_eq!(node.get_attribute("class").as_deref(), Some("btn primary"));
        assert_eq!(node.get_attribute("accept").as_deref(), Some("image/png, image/jpeg"));
    }

    #[test]
    fn test_nullish_removes_and_namespaced_attributes() {
        let options = RenderOptions::new();
        let node = render_with(
            &options,
            "use",
            Namespace::Svg,
            vec![("xlinkHref", Value::from("#icon")), ("strokeWidth", Value::from(2)), ("title", Value::Null)],
        )
        .unwrap();
        assert_eq!(
            node.get_attribute_ns(Some(crate::dom::XLINK_NS), "xlink:href").as_deref(),
            Some("#icon")
        );
        assert_eq!(node.get_attribute("stroke-width").as_deref(), Some("2"));
        assert!(!node.has_attribute("title"));
    }

    #[test]
    fn test_children_and_key_skipped() {
        let node = render(vec![("key", Value::from("k")), ("children", Value::from("x"))]).unwrap();
        assert!(node.attributes().is_empty());
        assert_eq!(node.text_content(), "");
    }

    #[test]
    fn test_to_node_shapes() {
        let backend = DomBackend::new(Document::new());
        assert!(backend.to_node(Value::Null).unwrap().is_fragment());
        assert!(backend.to_node(Value::from("hi")).unwrap().is_text());
        let list = backend.to_node(Value::from(vec!["a", "b"])).unwrap();
        assert_eq!(list.text_content(), "ab");
        let err = backend.to_node(Value::Deferred(crate::ast::value::Deferred::new("fetch"))).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnsupportedValue);
    }
}
