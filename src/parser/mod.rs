//! Markup parser, built on [pest](https://pest.rs/).
//!
//! The grammar is defined in `markup.pest`. This module converts pest's
//! parse tree into the typed AST defined in [`crate::ast`]. Binary
//! operators are folded by pest's Pratt parser.
//!
//! The parser sees the *assembled* source, in which every interpolation
//! has already been replaced by a placeholder token or a tag identifier
//! (see [`crate::assemble`]). All spans it produces are byte offsets into
//! that source.

use std::rc::Rc;
use std::sync::LazyLock;

use pest::Parser;
use pest::error::{ErrorVariant, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::ast::expr::*;
use crate::ast::markup::*;
use crate::ast::span::{Span, Spanned};
use crate::ast::value::Value;
use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "parser/markup.pest"]
struct MarkupParser;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::nullish, Assoc::Left) | Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
});

type ParseResult<T> = Result<T, Vec<ParseError>>;

/// Parse assembled markup source into a [`Markup`] tree.
///
/// The source must contain exactly one root element or fragment. Returns
/// a list of [`ParseError`]s on invalid syntax, including a closing tag
/// that does not match its opening tag.
pub fn parse(source: &str) -> ParseResult<Markup> {
    let mut pairs = MarkupParser::parse(Rule::template, source)
        .map_err(|e| vec![convert_pest_error(&e, source)])?;

    let template = next_pair(&mut pairs, Span::point(0))?;
    let span = pair_span(&template);
    let root = next_pair(&mut template.into_inner(), span)?;
    build_markup(root)
}

fn pair_span(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Take the next pair the grammar guarantees to be present.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| vec![ParseError::new(span, "malformed syntax tree")])
}

fn unexpected(pair: &Pair<Rule>) -> Vec<ParseError> {
    vec![ParseError::new(
        pair_span(pair),
        format!("unexpected {:?} in syntax tree", pair.as_rule()),
    )]
}

// ── pest error conversion ───────────────────────────────────────────────

fn convert_pest_error(e: &pest::error::Error<Rule>, source: &str) -> ParseError {
    let span = match e.location {
        InputLocation::Pos(p) => Span::point(p),
        InputLocation::Span((s, e)) => Span::new(s, e),
    };
    if let Some(error) = mismatched_closing_tag(source, span.start) {
        return error;
    }

    let message = match source.get(span.start..).and_then(|rest| rest.chars().next()) {
        Some(found) => format!("Unexpected token `{found}`"),
        None => "Unexpected end of template".to_string(),
    };
    let mut error = ParseError::new(span, message);

    match &e.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            if let Some(expected) = describe_expected(positives) {
                error = error.with_label(expected);
            }
            if positives
                .iter()
                .any(|r| matches!(r, Rule::close_tag | Rule::fragment_close))
            {
                error = error.with_hint(
                    "every element needs a matching closing tag, or must be self-closing like <br />",
                );
            }
        }
        ErrorVariant::CustomError { message } => {
            error = error.with_label(message.clone());
        }
    }
    error
}

/// A failure right after `</` is a closing tag that does not name the
/// innermost open element. Report it against both tags.
fn mismatched_closing_tag(source: &str, pos: usize) -> Option<ParseError> {
    if pos >= source.len() {
        return None;
    }
    let close_start = source.get(..pos)?.trim_end().strip_suffix("</")?.len();
    let (open, open_span) = innermost_open_tag(source, close_start)?;

    let rest = &source[pos..];
    let found = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | ':')))
        .unwrap_or(rest.len());

    Some(
        ParseError::new(
            Span::new(pos, pos + found),
            format!("Expected corresponding closing tag for <{open}>"),
        )
        .with_label(format!("expected </{open}>"))
        .with_secondary(open_span, "opening tag here"),
    )
}

/// Name and span of the innermost element still open at byte `end`.
///
/// Tags are recognised with the grammar's own tag rules, so `<` inside
/// expressions and attribute values is not mistaken for markup. `None`
/// when nothing is open or the innermost container is a fragment.
fn innermost_open_tag(source: &str, end: usize) -> Option<(String, Span)> {
    let mut open: Vec<Option<(String, Span)>> = Vec::new();
    let mut i = 0;
    while let Some(offset) = source.get(i..end)?.find('<') {
        let at = i + offset;
        let rest = &source[at..];
        if let Ok(mut pairs) = MarkupParser::parse(Rule::self_closing, rest) {
            i = at + pairs.next().map_or(1, |tag| tag.as_span().end());
        } else if let Ok(mut pairs) = MarkupParser::parse(Rule::open_tag, rest) {
            let tag = pairs.next()?;
            i = at + tag.as_span().end();
            let name = tag.into_inner().next()?;
            let span = name.as_span();
            open.push(Some((
                name.as_str().to_string(),
                Span::new(at + span.start(), at + span.end()),
            )));
        } else if rest.starts_with("</") {
            open.pop();
            i = at + 2;
        } else {
            if rest[1..].trim_start().starts_with('>') {
                open.push(None);
            }
            i = at + 1;
        }
    }
    open.pop().flatten()
}

fn describe_expected(positives: &[Rule]) -> Option<String> {
    let mut wanted: Vec<&str> = Vec::new();
    for rule in positives {
        let description = match rule {
            Rule::element | Rule::fragment | Rule::self_closing | Rule::open_tag | Rule::fragment_open => {
                "an element"
            }
            Rule::close_tag | Rule::close_name | Rule::fragment_close => "a closing tag",
            Rule::text | Rule::dq_text | Rule::sq_text => "text",
            Rule::placeholder => "an interpolation",
            Rule::tag_name => "a tag name",
            Rule::attr_name | Rule::named_attribute | Rule::spread_attribute => "an attribute",
            Rule::attr_string => "an attribute value",
            Rule::EOI => "end of template",
            Rule::infix
            | Rule::strict_eq
            | Rule::strict_ne
            | Rule::eq
            | Rule::ne
            | Rule::le
            | Rule::ge
            | Rule::and
            | Rule::or
            | Rule::nullish
            | Rule::lt
            | Rule::gt
            | Rule::add
            | Rule::sub
            | Rule::mul
            | Rule::div
            | Rule::rem => "an operator",
            _ => "an expression",
        };
        if !wanted.contains(&description) {
            wanted.push(description);
        }
    }

    match wanted.as_slice() {
        [] => None,
        [one] => Some(format!("expected {one}")),
        [init @ .., last] => Some(format!("expected {} or {last}", init.join(", "))),
    }
}

// ── Markup building ─────────────────────────────────────────────────────

fn build_markup(pair: Pair<Rule>) -> ParseResult<Markup> {
    match pair.as_rule() {
        Rule::element => Ok(Markup::Element(build_element(pair)?)),
        Rule::fragment => Ok(Markup::Fragment(build_fragment(pair)?)),
        _ => Err(unexpected(&pair)),
    }
}

fn build_element(pair: Pair<Rule>) -> ParseResult<Element> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();
    let tag = next_pair(&mut inner, span)?;

    match tag.as_rule() {
        Rule::self_closing => {
            let (name, attributes) = build_open_tag(tag)?;
            Ok(Element {
                name,
                attributes,
                children: Vec::new(),
                span,
            })
        }
        Rule::open_tag => {
            let (name, attributes) = build_open_tag(tag)?;
            // the grammar only accepts a closing tag naming this element
            let children = build_children(next_pair(&mut inner, span)?)?;
            Ok(Element {
                name,
                attributes,
                children,
                span,
            })
        }
        _ => Err(unexpected(&tag)),
    }
}

fn build_open_tag(pair: Pair<Rule>) -> ParseResult<(Spanned<String>, Vec<Attribute>)> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, span)?;
    let name = Spanned::new(name.as_str().to_string(), pair_span(&name));

    let mut attributes = Vec::new();
    for attr in inner {
        attributes.push(build_attribute(attr)?);
    }
    Ok((name, attributes))
}

fn build_fragment(pair: Pair<Rule>) -> ParseResult<Fragment> {
    let span = pair_span(&pair);
    let mut children = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::children {
            children = build_children(inner)?;
        }
    }
    Ok(Fragment { children, span })
}

fn build_children(pair: Pair<Rule>) -> ParseResult<Vec<Child>> {
    let mut children = Vec::new();
    for child in pair.into_inner() {
        let span = pair_span(&child);
        children.push(match child.as_rule() {
            Rule::text => Child::Text(Spanned::new(decode_entities(child.as_str()), span)),
            Rule::expr_container => Child::Expr(build_container(child)?),
            Rule::placeholder => Child::Expr(Container {
                expr: Some(placeholder_expr(&child)),
                span,
            }),
            Rule::element | Rule::fragment => Child::Markup(build_markup(child)?),
            _ => return Err(unexpected(&child)),
        });
    }
    Ok(children)
}

fn build_container(pair: Pair<Rule>) -> ParseResult<Container> {
    let span = pair_span(&pair);
    let expr = pair.into_inner().next().map(build_expr).transpose()?;
    Ok(Container { expr, span })
}

fn placeholder_expr(pair: &Pair<Rule>) -> Expr {
    Spanned::new(ExprKind::Ident(pair.as_str().to_string()), pair_span(pair))
}

// ── Attribute building ──────────────────────────────────────────────────

fn build_attribute(pair: Pair<Rule>) -> ParseResult<Attribute> {
    let span = pair_span(&pair);
    match pair.as_rule() {
        Rule::spread_attribute => {
            let expr = next_pair(&mut pair.into_inner(), span)?;
            Ok(Attribute::Spread(build_expr(expr)?))
        }
        Rule::placeholder => Ok(Attribute::Spread(placeholder_expr(&pair))),
        Rule::named_attribute => {
            let mut inner = pair.into_inner();
            let name = next_pair(&mut inner, span)?;
            let name = Spanned::new(name.as_str().to_string(), pair_span(&name));
            let value = match inner.next() {
                None => AttrValue::Implicit,
                Some(value) => build_attr_value(value)?,
            };
            Ok(Attribute::Named { name, value })
        }
        _ => Err(unexpected(&pair)),
    }
}

fn build_attr_value(pair: Pair<Rule>) -> ParseResult<AttrValue> {
    let span = pair_span(&pair);
    match pair.as_rule() {
        Rule::attr_string => {
            let mut parts = Vec::new();
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::placeholder => parts.push(StrPart::Expr(placeholder_expr(&part))),
                    _ => parts.push(StrPart::Text(decode_entities(part.as_str()))),
                }
            }
            match parts.as_slice() {
                [] => Ok(AttrValue::Literal(String::new())),
                [StrPart::Text(text)] => Ok(AttrValue::Literal(text.clone())),
                _ => Ok(AttrValue::Interpolated(parts)),
            }
        }
        Rule::expr_container => Ok(AttrValue::Expr(build_container(pair)?)),
        Rule::placeholder => Ok(AttrValue::Expr(Container {
            expr: Some(placeholder_expr(&pair)),
            span,
        })),
        Rule::element | Rule::fragment => Ok(AttrValue::Markup(Box::new(build_markup(pair)?))),
        _ => Err(unexpected(&pair)),
    }
}

// ── Expression building ─────────────────────────────────────────────────

fn build_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_span(&pair);
    let inner = next_pair(&mut pair.into_inner(), span)?;
    match inner.as_rule() {
        Rule::arrow => build_arrow(inner),
        Rule::conditional => build_conditional(inner),
        _ => Err(unexpected(&inner)),
    }
}

fn build_arrow(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();
    let params: Rc<[String]> = next_pair(&mut inner, span)?
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
    let body = build_expr(next_pair(&mut inner, span)?)?;
    Ok(Spanned::new(
        ExprKind::Arrow {
            params,
            body: Rc::new(body),
        },
        span,
    ))
}

fn build_conditional(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();
    let test = build_binary(next_pair(&mut inner, span)?)?;

    match (inner.next(), inner.next()) {
        (Some(consequent), Some(alternate)) => Ok(Spanned::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(build_expr(consequent)?),
                alternate: Box::new(build_expr(alternate)?),
            },
            span,
        )),
        _ => Ok(test),
    }
}

fn build_binary(pair: Pair<Rule>) -> ParseResult<Expr> {
    PRATT
        .map_primary(build_unary)
        .map_infix(|left, op, right| {
            let (left, right) = (left?, right?);
            let op = match op.as_rule() {
                Rule::strict_eq => BinOp::StrictEq,
                Rule::strict_ne => BinOp::StrictNotEq,
                Rule::eq => BinOp::Eq,
                Rule::ne => BinOp::NotEq,
                Rule::lt => BinOp::Lt,
                Rule::gt => BinOp::Gt,
                Rule::le => BinOp::LtEq,
                Rule::ge => BinOp::GtEq,
                Rule::and => BinOp::And,
                Rule::or => BinOp::Or,
                Rule::nullish => BinOp::Nullish,
                Rule::add => BinOp::Add,
                Rule::sub => BinOp::Sub,
                Rule::mul => BinOp::Mul,
                Rule::div => BinOp::Div,
                Rule::rem => BinOp::Rem,
                _ => return Err(unexpected(&op)),
            };
            let span = left.span.merge(right.span);
            Ok(Spanned::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            ))
        })
        .parse(pair.into_inner())
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut prefixes = Vec::new();
    let mut operand = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::prefix => {
                let op = match inner.as_str() {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Neg,
                    _ => UnaryOp::Plus,
                };
                prefixes.push((op, pair_span(&inner).start));
            }
            Rule::postfix_expr => operand = Some(build_postfix(inner)?),
            _ => return Err(unexpected(&inner)),
        }
    }

    let Some(mut expr) = operand else {
        return Err(vec![ParseError::new(Span::default(), "malformed syntax tree")]);
    };
    for (op, start) in prefixes.into_iter().rev() {
        let span = Span::new(start, expr.span.end);
        expr = Spanned::new(
            ExprKind::Unary {
                op,
                operand: Box::new(expr),
            },
            span,
        );
    }
    Ok(expr)
}

fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_primary(next_pair(&mut inner, span)?)?;

    for op in inner {
        let span = Span::new(expr.span.start, pair_span(&op).end);
        let kind = match op.as_rule() {
            Rule::member | Rule::optional_member => {
                let optional = op.as_rule() == Rule::optional_member;
                let property = next_pair(&mut op.into_inner(), span)?.as_str().to_string();
                ExprKind::Member {
                    object: Box::new(expr),
                    property,
                    optional,
                }
            }
            Rule::index => {
                let index = build_expr(next_pair(&mut op.into_inner(), span)?)?;
                ExprKind::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                }
            }
            Rule::call => {
                let args = op.into_inner().map(build_expr).collect::<ParseResult<Vec<_>>>()?;
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                }
            }
            _ => return Err(unexpected(&op)),
        };
        expr = Spanned::new(kind, span);
    }
    Ok(expr)
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = pair_span(&pair);

    let kind = match pair.as_rule() {
        Rule::expr => return build_expr(pair),
        Rule::number => {
            let n: f64 = pair.as_str().parse().map_err(|_| {
                vec![ParseError::new(span, format!("invalid number: {}", pair.as_str()))]
            })?;
            ExprKind::Literal(Value::Number(n))
        }
        Rule::string => ExprKind::Literal(Value::String(unescape_string(pair.as_str()))),
        Rule::bool_literal => ExprKind::Literal(Value::Bool(pair.as_str() == "true")),
        Rule::null_literal => ExprKind::Literal(Value::Null),
        Rule::undefined_literal => ExprKind::Literal(Value::Undefined),
        Rule::ident => ExprKind::Ident(pair.as_str().to_string()),
        Rule::element | Rule::fragment => ExprKind::Markup(Box::new(build_markup(pair)?)),
        Rule::array => {
            let mut items = Vec::new();
            for item in pair.into_inner() {
                items.push(match item.as_rule() {
                    Rule::spread => {
                        let item_span = pair_span(&item);
                        ArrayItem::Spread(build_expr(next_pair(&mut item.into_inner(), item_span)?)?)
                    }
                    _ => ArrayItem::Item(build_expr(item)?),
                });
            }
            ExprKind::Array(items)
        }
        Rule::object => {
            let mut props = Vec::new();
            for prop in pair.into_inner() {
                props.push(build_object_prop(prop)?);
            }
            ExprKind::Object(props)
        }
        _ => return Err(unexpected(&pair)),
    };
    Ok(Spanned::new(kind, span))
}

fn build_object_prop(pair: Pair<Rule>) -> ParseResult<ObjectProp> {
    let span = pair_span(&pair);
    match pair.as_rule() {
        Rule::spread => {
            let expr = build_expr(next_pair(&mut pair.into_inner(), span)?)?;
            Ok(ObjectProp::Spread(expr))
        }
        Rule::shorthand => {
            let ident = next_pair(&mut pair.into_inner(), span)?;
            Ok(ObjectProp::Shorthand(Spanned::new(
                ident.as_str().to_string(),
                pair_span(&ident),
            )))
        }
        Rule::keyed => {
            let mut inner = pair.into_inner();
            let key = next_pair(&mut inner, span)?;
            let key = match key.as_rule() {
                Rule::string => unescape_string(key.as_str()),
                Rule::number => {
                    let n: f64 = key.as_str().parse().unwrap_or(f64::NAN);
                    Value::Number(n).to_display_string()
                }
                _ => key.as_str().to_string(),
            };
            let value = build_expr(next_pair(&mut inner, span)?)?;
            Ok(ObjectProp::KeyValue(key, value))
        }
        _ => Err(unexpected(&pair)),
    }
}

// ── Literal text helpers ────────────────────────────────────────────────

/// Strip the quotes from a string literal and process escape sequences.
fn unescape_string(quoted: &str) -> String {
    let inner = quoted
        .get(1..quoted.len().saturating_sub(1))
        .unwrap_or("");

    let mut result = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('v') => result.push('\u{b}'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut result, &hex, 16);
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut result, &hex, 16);
            }
            Some(c) => result.push(c),
            None => result.push('\\'),
        }
    }
    result
}

fn push_code_point(out: &mut String, digits: &str, radix: u32) {
    match u32::from_str_radix(digits, radix).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push(char::REPLACEMENT_CHARACTER),
    }
}

/// Decode HTML character references in text and quoted attribute values.
///
/// Numeric references (`&#169;`, `&#xA9;`) and the common named ones are
/// decoded; unknown references are left untouched.
pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let c = if let Some(num) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(num, 16).ok().and_then(char::from_u32)
            } else if let Some(num) = entity.strip_prefix('#') {
                num.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "middot" => '·',
        "bull" => '•',
        "times" => '×',
        "divide" => '÷',
        "deg" => '°',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "sect" => '§',
        "para" => '¶',
        "larr" => '←',
        "rarr" => '→',
        "uarr" => '↑',
        "darr" => '↓',
        "hearts" => '♥',
        "zwj" => '\u{200d}',
        "zwnj" => '\u{200c}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_element(source: &str) -> Element {
        match parse(source).unwrap() {
            Markup::Element(el) => el,
            Markup::Fragment(_) => panic!("expected element"),
        }
    }

    fn container_expr(source: &str) -> Expr {
        let el = root_element(source);
        match el.children.into_iter().next() {
            Some(Child::Expr(Container { expr: Some(expr), .. })) => expr,
            other => panic!("expected expression child, got {other:?}"),
        }
    }

    #[test]
    fn test_self_closing_element() {
        let el = root_element("<br />");
        assert_eq!(el.name.node, "br");
        assert!(el.children.is_empty());
        assert_eq!(el.span, Span::new(0, 6));
    }

    #[test]
    fn test_nested_children_keep_text() {
        let el = root_element("<p>Hello <b>world</b>!</p>");
        assert_eq!(el.children.len(), 3);
        match &el.children[0] {
            Child::Text(text) => assert_eq!(text.node, "Hello "),
            other => panic!("expected text, got {other:?}"),
        }
        assert!(matches!(&el.children[1], Child::Markup(Markup::Element(b)) if b.name.node == "b"));
    }

    #[test]
    fn test_fragment_root() {
        match parse("<><li>a</li><li>b</li></>").unwrap() {
            Markup::Fragment(frag) => assert_eq!(frag.children.len(), 2),
            Markup::Element(_) => panic!("expected fragment"),
        }
    }

    #[test]
    fn test_attribute_forms() {
        let el = root_element(r#"<input disabled type="text" value={v} {...rest} __mk_1_0_ data-x=__mk_1_1_ />"#);
        assert_eq!(el.attributes.len(), 6);
        assert!(matches!(&el.attributes[0], Attribute::Named { value: AttrValue::Implicit, .. }));
        assert!(matches!(&el.attributes[1], Attribute::Named { value: AttrValue::Literal(s), .. } if s == "text"));
        assert!(matches!(&el.attributes[2], Attribute::Named { value: AttrValue::Expr(_), .. }));
        assert!(matches!(&el.attributes[3], Attribute::Spread(_)));
        assert!(matches!(&el.attributes[4], Attribute::Spread(Spanned { node: ExprKind::Ident(t), .. }) if t == "__mk_1_0_"));
        assert!(matches!(&el.attributes[5], Attribute::Named { value: AttrValue::Expr(_), .. }));
    }

    #[test]
    fn test_interpolated_attribute_string() {
        let el = root_element(r#"<a class="btn __mk_3_0_ big"></a>"#);
        match &el.attributes[0] {
            Attribute::Named {
                value: AttrValue::Interpolated(parts),
                ..
            } => assert_eq!(parts.len(), 3),
            other => panic!("expected interpolated value, got {other:?}"),
        }
    }

    #[test]
    fn test_entities_decoded() {
        let el = root_element(r#"<p title="a &amp; b">&lt;tag&gt; &copy; &#65;&#x42; &bogus;</p>"#);
        assert!(matches!(&el.attributes[0], Attribute::Named { value: AttrValue::Literal(s), .. } if s == "a & b"));
        match &el.children[0] {
            Child::Text(text) => assert_eq!(text.node, "<tag> © AB &bogus;"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_comment_containers() {
        let el = root_element("<div>{}{/* note */}</div>");
        assert_eq!(el.children.len(), 2);
        assert!(el
            .children
            .iter()
            .all(|c| matches!(c, Child::Expr(Container { expr: None, .. }))));
    }

    #[test]
    fn test_operator_precedence() {
        let expr = container_expr("<p>{1 + 2 * 3 === 7 && ok}</p>");
        match expr.node {
            ExprKind::Binary { op: BinOp::And, left, .. } => match left.node {
                ExprKind::Binary { op: BinOp::StrictEq, left, .. } => {
                    assert!(matches!(left.node, ExprKind::Binary { op: BinOp::Add, .. }))
                }
                other => panic!("expected ===, got {other:?}"),
            },
            other => panic!("expected &&, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_with_markup_body() {
        let expr = container_expr("<ul>{items.map((item, i) => <li key={i}>{item}</li>)}</ul>");
        match expr.node {
            ExprKind::Call { callee, args } => {
                assert!(matches!(callee.node, ExprKind::Member { ref property, .. } if property == "map"));
                match &args[0].node {
                    ExprKind::Arrow { params, body } => {
                        assert_eq!(&params[..], &["item".to_string(), "i".to_string()][..]);
                        assert!(matches!(body.node, ExprKind::Markup(_)));
                    }
                    other => panic!("expected arrow, got {other:?}"),
                }
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_object_and_array_literals() {
        let expr = container_expr(r#"<p>{{ a: 1, "b-c": [1, ...xs], d, ...rest }}</p>"#);
        match expr.node {
            ExprKind::Object(props) => {
                assert_eq!(props.len(), 4);
                assert!(matches!(&props[1], ObjectProp::KeyValue(k, _) if k == "b-c"));
                assert!(matches!(&props[2], ObjectProp::Shorthand(s) if s.node == "d"));
                assert!(matches!(&props[3], ObjectProp::Spread(_)));
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_and_optional_member() {
        let expr = container_expr("<p>{user?.name ? 'hi' : null}</p>");
        match expr.node {
            ExprKind::Conditional { test, .. } => {
                assert!(matches!(test.node, ExprKind::Member { optional: true, .. }))
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn test_string_escapes() {
        let expr = container_expr(r#"<p>{"a\nA\u{1F600}\'"}</p>"#);
        assert!(matches!(expr.node, ExprKind::Literal(Value::String(ref s)) if s == "a\nA😀'"));
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let errors = parse("<div></span>").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expected corresponding closing tag for <div>");
        assert_eq!(errors[0].labels.len(), 2);
        assert_eq!(errors[0].span(), Span::new(7, 11));
        assert_eq!(errors[0].labels[1].span, Span::new(1, 4));
    }

    #[test]
    fn test_nested_mismatched_closing_tag() {
        let source = "<div>\n  <p>x</p>\n  <span>\n</div>";
        let errors = parse(source).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expected corresponding closing tag for <span>");
        assert_eq!(errors[0].span(), Span::new(28, 31));
        assert_eq!(&source[28..31], "div");
        assert_eq!(errors[0].labels[1].span, Span::new(20, 24));
        assert!(errors[0].hint.is_none());
    }

    #[test]
    fn test_mismatch_skips_markup_in_attributes() {
        let source = "<ul title={<b>x</b>}><li a=\"<i>\" />\n</ol>";
        let errors = parse(source).unwrap_err();
        assert_eq!(errors[0].message, "Expected corresponding closing tag for <ul>");
        assert_eq!(errors[0].labels[1].span, Span::new(1, 3));
    }

    #[test]
    fn test_named_closing_tag_inside_fragment() {
        let errors = parse("<><p></p></div>").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Unexpected token"));
        assert!(errors[0].labels.iter().all(|l| l.message.as_deref() != Some("opening tag here")));
    }

    #[test]
    fn test_unclosed_element_points_at_end() {
        let errors = parse("<div>").unwrap_err();
        assert_eq!(errors[0].message, "Unexpected end of template");
        assert_eq!(errors[0].span(), Span::point(5));
        assert!(errors[0].hint.is_some());
    }

    #[test]
    fn test_multiple_roots_rejected() {
        assert!(parse("<a></a><b></b>").is_err());
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        let expr = container_expr("<p>{nullable ?? undefined}</p>");
        match expr.node {
            ExprKind::Binary { left, right, .. } => {
                assert!(matches!(left.node, ExprKind::Ident(ref n) if n == "nullable"));
                assert!(matches!(right.node, ExprKind::Literal(Value::Undefined)));
            }
            other => panic!("expected ??, got {other:?}"),
        }
    }
}
