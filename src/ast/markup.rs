use super::expr::Expr;
use super::span::{Span, Spanned};

/// The root of a parsed template: a single element or fragment.
#[derive(Debug, Clone)]
pub enum Markup {
    Element(Element),
    Fragment(Fragment),
}

impl Markup {
    pub fn span(&self) -> Span {
        match self {
            Markup::Element(el) => el.span,
            Markup::Fragment(frag) => frag.span,
        }
    }
}

/// `<name attr=...>children</name>` or `<name ... />`.
///
/// `name` is kept verbatim. Whether it names a native element, a bound
/// component, or an illegal interpolation is decided at evaluation time.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: Spanned<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Child>,
    pub span: Span,
}

/// `<>children</>`
#[derive(Debug, Clone)]
pub struct Fragment {
    pub children: Vec<Child>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Attribute {
    /// `name`, `name="text"`, `name={expr}`, `name=${value}`
    Named {
        name: Spanned<String>,
        value: AttrValue,
    },
    /// `{...expr}`, or a bare interpolation in attribute position.
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum AttrValue {
    /// `<input disabled />` sets the attribute to `true`.
    Implicit,
    /// A quoted string with character references already decoded.
    Literal(String),
    /// A quoted string with interpolations inside, e.g. `class="btn ${kind}"`.
    Interpolated(Vec<StrPart>),
    Expr(Container),
    Markup(Box<Markup>),
}

#[derive(Debug, Clone)]
pub enum StrPart {
    Text(String),
    Expr(Expr),
}

/// A `{ ... }` expression container. Empty containers (`{}` or
/// `{/* comment */}`) have no expression and contribute nothing.
#[derive(Debug, Clone)]
pub struct Container {
    pub expr: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Child {
    /// Raw text run, entity-decoded but not yet whitespace-normalized.
    Text(Spanned<String>),
    Expr(Container),
    Markup(Markup),
}
