//! A small in-memory document model for the DOM back end.
//!
//! [`Document`] creates nodes; [`Node`] is a shared, mutable handle that
//! records what the renderer did to it: attributes (with namespaces),
//! assigned properties, inline style declarations, event listeners and
//! raw inner markup. Nodes can be serialized with [`Node::to_html`] and
//! listeners fired with [`Node::dispatch`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::value::Value;
use crate::error::EvalError;
use crate::registry::Callback;

pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// Element namespace, tracked while walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Html => HTML_NS,
            Namespace::Svg => SVG_NS,
            Namespace::MathMl => MATHML_NS,
        }
    }
}

/// Node factory. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Document {
    _private: (),
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&self, namespace: Namespace, tag: &str) -> Node {
        Node::new(NodeKind::Element(ElementData {
            namespace,
            tag: tag.to_string(),
            attributes: Vec::new(),
            properties: IndexMap::new(),
            style: IndexMap::new(),
            listeners: Vec::new(),
            inner_html: None,
        }))
    }

    pub fn create_text_node(&self, text: &str) -> Node {
        Node::new(NodeKind::Text(text.to_string()))
    }

    pub fn create_fragment(&self) -> Node {
        Node::new(NodeKind::Fragment)
    }
}

/// An attribute as set on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub namespace: Option<&'static str>,
    pub name: String,
    pub value: String,
}

/// A registered event listener.
#[derive(Debug, Clone)]
pub struct Listener {
    pub event: String,
    pub capture: bool,
    pub handler: Callback,
}

struct ElementData {
    namespace: Namespace,
    tag: String,
    attributes: Vec<Attr>,
    properties: IndexMap<String, Value>,
    style: IndexMap<String, String>,
    listeners: Vec<Listener>,
    inner_html: Option<String>,
}

enum NodeKind {
    Element(ElementData),
    Text(String),
    Fragment,
}

struct NodeData {
    kind: NodeKind,
    children: Vec<Node>,
}

/// A shared handle to a document node. Clones refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            children: Vec::new(),
        })))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Fragment)
    }

    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.namespace),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    /// Append `child`. Appending a fragment moves its children instead.
    pub fn append_child(&self, child: Node) {
        if child.is_fragment() {
            let moved = std::mem::take(&mut child.0.borrow_mut().children);
            self.0.borrow_mut().children.extend(moved);
        } else {
            self.0.borrow_mut().children.push(child);
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element(ElementData {
                inner_html: Some(html),
                ..
            }) => strip_tags(html),
            _ => data.children.iter().map(Node::text_content).collect(),
        }
    }

    // ── Attributes ──────────────────────────────────────────────────────

    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.set_attribute_ns(None, name, value);
    }

    pub fn set_attribute_ns(&self, namespace: Option<&'static str>, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.with_element(|el| {
            match el
                .attributes
                .iter_mut()
                .find(|a| a.namespace == namespace && a.name == name)
            {
                Some(existing) => existing.value = value,
                None => el.attributes.push(Attr {
                    namespace,
                    name: name.to_string(),
                    value,
                }),
            }
        });
    }

    pub fn remove_attribute_ns(&self, namespace: Option<&'static str>, name: &str) {
        self.with_element(|el| {
            el.attributes
                .retain(|a| !(a.namespace == namespace && a.name == name))
        });
    }

    /// Look up an attribute by qualified name, ignoring its namespace.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.read_element(|el| {
            el.attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        })
        .flatten()
    }

    pub fn get_attribute_ns(&self, namespace: Option<&str>, name: &str) -> Option<String> {
        self.read_element(|el| {
            el.attributes
                .iter()
                .find(|a| a.namespace == namespace && a.name == name)
                .map(|a| a.value.clone())
        })
        .flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn attributes(&self) -> Vec<Attr> {
        self.read_element(|el| el.attributes.clone())
            .unwrap_or_default()
    }

    // ── Properties ──────────────────────────────────────────────────────

    pub fn set_property(&self, name: &str, value: Value) {
        self.with_element(|el| {
            el.properties.insert(name.to_string(), value);
        });
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.read_element(|el| el.properties.get(name).cloned())
            .flatten()
    }

    // ── Style ───────────────────────────────────────────────────────────

    /// Assign a style field by its camelCase name, e.g. `backgroundColor`.
    pub fn set_style(&self, field: &str, value: impl Into<String>) {
        self.set_style_property(&css_property_name(field), value);
    }

    /// Set a declaration by its CSS name, including `--custom` properties.
    pub fn set_style_property(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.with_element(|el| {
            el.style.insert(name.to_string(), value);
        });
    }

    /// Look up a declaration by its CSS name.
    pub fn style(&self, name: &str) -> Option<String> {
        self.read_element(|el| el.style.get(name).cloned())
            .flatten()
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn add_event_listener(&self, event: &str, handler: Callback, capture: bool) {
        self.with_element(|el| {
            el.listeners.push(Listener {
                event: event.to_string(),
                capture,
                handler,
            })
        });
    }

    pub fn listeners(&self) -> Vec<Listener> {
        self.read_element(|el| el.listeners.clone())
            .unwrap_or_default()
    }

    /// Invoke this node's listeners for `event`, capture listeners first.
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> Result<usize, EvalError> {
        let mut listeners: Vec<Listener> = self
            .listeners()
            .into_iter()
            .filter(|l| l.event == event)
            .collect();
        listeners.sort_by_key(|l| !l.capture);
        for listener in &listeners {
            listener.handler.call(args)?;
        }
        Ok(listeners.len())
    }

    // ── Raw markup ──────────────────────────────────────────────────────

    /// Replace the children with raw, unparsed markup.
    pub fn set_inner_html(&self, html: impl Into<String>) {
        let html = html.into();
        let mut guard = self.0.borrow_mut();
        let data = &mut *guard;
        if let NodeKind::Element(el) = &mut data.kind {
            el.inner_html = Some(html);
            data.children.clear();
        }
    }

    pub fn inner_html(&self) -> Option<String> {
        self.read_element(|el| el.inner_html.clone()).flatten()
    }

    // ── Serialization ───────────────────────────────────────────────────

    /// Serialize to markup. Properties and listeners are not reflected.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        let el = match &data.kind {
            NodeKind::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            NodeKind::Fragment => {
                for child in &data.children {
                    child.write_html(out);
                }
                return;
            }
            NodeKind::Element(el) => el,
        };

        out.push('<');
        out.push_str(&el.tag);
        for attr in &el.attributes {
            if attr.name == "style" && !el.style.is_empty() {
                continue;
            }
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&escape_attr(&attr.value));
            out.push('"');
        }
        if !el.style.is_empty() {
            let declarations: Vec<String> = el.style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            out.push_str(" style=\"");
            out.push_str(&escape_attr(&declarations.join("; ")));
            out.push('"');
        }

        let empty = data.children.is_empty() && el.inner_html.is_none();
        if el.namespace == Namespace::Html && is_void_element(&el.tag) {
            out.push('>');
            return;
        }
        if el.namespace != Namespace::Html && empty {
            out.push_str("/>");
            return;
        }

        out.push('>');
        match &el.inner_html {
            Some(html) => out.push_str(html),
            None => {
                for child in &data.children {
                    child.write_html(out);
                }
            }
        }
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
    }

    fn with_element(&self, f: impl FnOnce(&mut ElementData)) {
        if let NodeKind::Element(el) = &mut self.0.borrow_mut().kind {
            f(el);
        }
    }

    fn read_element<T>(&self, f: impl FnOnce(&ElementData) -> T) -> Option<T> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(f(el)),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_html())
    }
}

/// `backgroundColor` -> `background-color`, `WebkitTransition` ->
/// `-webkit-transition`, `cssFloat` -> `float`.
pub fn css_property_name(field: &str) -> String {
    if field == "cssFloat" {
        return "float".to_string();
    }
    let mut out = String::with_capacity(field.len() + 4);
    if field
        .strip_prefix("ms")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
    {
        out.push('-');
    }
    for ch in field.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

fn strip_tags(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_children_move_on_append() {
        let doc = Document::new();
        let list = doc.create_element(Namespace::Html, "ul");
        let frag = doc.create_fragment();
        frag.append_child(doc.create_element(Namespace::Html, "li"));
        frag.append_child(doc.create_element(Namespace::Html, "li"));
        list.append_child(frag.clone());
        assert_eq!(list.children().len(), 2);
        assert!(frag.children().is_empty());
    }

    #[test]
    fn test_serialization() {
        let doc = Document::new();
        let p = doc.create_element(Namespace::Html, "p");
        p.set_attribute("class", "a \"b\"");
        p.append_child(doc.create_text_node("1 < 2"));
        p.append_child(doc.create_element(Namespace::Html, "br"));
        let svg = doc.create_element(Namespace::Svg, "svg");
        svg.append_child(doc.create_element(Namespace::Svg, "circle"));
        p.append_child(svg);
        assert_eq!(
            p.to_html(),
            r#"<p class="a &quot;b&quot;">1 &lt; 2<br><svg><circle/></svg></p>"#
        );
    }

    #[test]
    fn test_style_serialization() {
        let doc = Document::new();
        let div = doc.create_element(Namespace::Html, "div");
        div.set_style("backgroundColor", "red");
        div.set_style_property("--gap", "4px");
        assert_eq!(div.style("background-color").as_deref(), Some("red"));
        assert_eq!(div.to_html(), r#"<div style="background-color: red; --gap: 4px"></div>"#);
    }

    #[test]
    fn test_css_property_names() {
        assert_eq!(css_property_name("fontSize"), "font-size");
        assert_eq!(css_property_name("WebkitTransition"), "-webkit-transition");
        assert_eq!(css_property_name("msTransform"), "-ms-transform");
        assert_eq!(css_property_name("cssFloat"), "float");
    }

    #[test]
    fn test_dispatch_runs_capture_first() {
        let doc = Document::new();
        let button = doc.create_element(Namespace::Html, "button");
        let order = Rc::new(RefCell::new(Vec::new()));
        let bubble = order.clone();
        let capture = order.clone();
        button.add_event_listener(
            "click",
            Callback::new(move |_| {
                bubble.borrow_mut().push("bubble");
                Ok(Value::Undefined)
            }),
            false,
        );
        button.add_event_listener(
            "click",
            Callback::new(move |_| {
                capture.borrow_mut().push("capture");
                Ok(Value::Undefined)
            }),
            true,
        );
        assert_eq!(button.dispatch("click", &[]).unwrap(), 2);
        assert_eq!(*order.borrow(), vec!["capture", "bubble"]);
        assert_eq!(button.dispatch("keydown", &[]).unwrap(), 0);
    }

    #[test]
    fn test_inner_html_replaces_children() {
        let doc = Document::new();
        let div = doc.create_element(Namespace::Html, "div");
        div.append_child(doc.create_text_node("old"));
        div.set_inner_html("<b>new</b>");
        assert!(div.children().is_empty());
        assert_eq!(div.text_content(), "new");
        assert_eq!(div.to_html(), "<div><b>new</b></div>");
    }
}
