//! Expression evaluation over the parsed subtree.

use std::cmp::Ordering;

use super::{Evaluator, Scope, with_default_span};
use crate::ast::expr::*;
use crate::ast::value::{Props, Value};
use crate::backend::Backend;
use crate::dom::Namespace;
use crate::error::{EvalError, EvalErrorKind};
use crate::registry::Callback;

impl<B: Backend> Evaluator<B> {
    pub(super) fn eval_expr(&self, expr: &Expr, scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        match &expr.node {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Ident(name) => self
                .resolve(name, scope)
                .ok_or_else(|| EvalError::not_defined(name).with_span(expr.span)),

            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ArrayItem::Item(e) => values.push(self.eval_expr(e, scope, ns)?),
                        ArrayItem::Spread(e) => {
                            let spread = self.eval_expr(e, scope, ns)?;
                            values.extend(spread_items(spread).map_err(|err| err.with_span(e.span))?);
                        }
                    }
                }
                Ok(Value::Array(values))
            }

            ExprKind::Object(props) => {
                let mut object = Props::new();
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue(key, e) => {
                            object.insert(key.clone(), self.eval_expr(e, scope, ns)?);
                        }
                        ObjectProp::Shorthand(name) => {
                            let value = self
                                .resolve(&name.node, scope)
                                .ok_or_else(|| EvalError::not_defined(&name.node).with_span(name.span))?;
                            object.insert(name.node.clone(), value);
                        }
                        ObjectProp::Spread(e) => match self.eval_expr(e, scope, ns)? {
                            Value::Object(entries) => object.extend(entries),
                            Value::Array(items) => {
                                object.extend(items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)));
                            }
                            _ => {}
                        },
                    }
                }
                Ok(Value::Object(object))
            }

            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval_expr(object, scope, ns)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                get_member(&target, property).map_err(|e| e.with_span(expr.span))
            }

            ExprKind::Index { object, index } => {
                let target = self.eval_expr(object, scope, ns)?;
                let key = self.eval_expr(index, scope, ns)?;
                get_index(&target, &key).map_err(|e| e.with_span(expr.span))
            }

            ExprKind::Call { callee, args } => self.eval_call(callee, args, scope, ns),

            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope, ns)?;
                Ok(eval_unary_op(*op, &value))
            }

            ExprKind::Binary { left, op, right } => {
                let left = self.eval_expr(left, scope, ns)?;
                match op {
                    BinOp::And if !left.is_truthy() => Ok(left),
                    BinOp::Or if left.is_truthy() => Ok(left),
                    BinOp::Nullish if !left.is_nullish() => Ok(left),
                    BinOp::And | BinOp::Or | BinOp::Nullish => self.eval_expr(right, scope, ns),
                    _ => {
                        let right = self.eval_expr(right, scope, ns)?;
                        Ok(eval_binary_op(&left, *op, &right))
                    }
                }
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, scope, ns)?.is_truthy() {
                    self.eval_expr(consequent, scope, ns)
                } else {
                    self.eval_expr(alternate, scope, ns)
                }
            }

            ExprKind::Arrow { params, body } => {
                let evaluator = self.clone();
                let scope = scope.clone();
                let params = params.clone();
                let body = body.clone();
                Ok(Value::Function(Callback::new(move |args| {
                    let frame = params
                        .iter()
                        .enumerate()
                        .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or_default()))
                        .collect();
                    evaluator.eval_expr(&body, &scope.push(frame), ns)
                })))
            }

            ExprKind::Markup(markup) => self.eval_markup(markup, scope, ns),
        }
    }

    /// Arrow parameters first, then this assembly's placeholders.
    fn resolve(&self, name: &str, scope: &Scope) -> Option<Value> {
        scope
            .lookup(name)
            .or_else(|| self.ctx.assembly.placeholder(name).cloned())
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Scope, ns: Namespace) -> Result<Value, EvalError> {
        let span = callee.span;
        if let ExprKind::Member {
            object,
            property,
            optional,
        } = &callee.node
        {
            let target = self.eval_expr(object, scope, ns)?;
            if *optional && target.is_nullish() {
                return Ok(Value::Undefined);
            }
            let args = self.eval_args(args, scope, ns)?;
            return call_method(&target, property, &args).map_err(|e| with_default_span(e, span));
        }

        let function = self.eval_expr(callee, scope, ns)?;
        let args = self.eval_args(args, scope, ns)?;
        let what = format!("`{}`", self.ctx.remapper.snippet(span));
        invoke(&function, &args, &what).map_err(|e| with_default_span(e, span))
    }

    fn eval_args(&self, args: &[Expr], scope: &Scope, ns: Namespace) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval_expr(arg, scope, ns)).collect()
    }
}

// ── Calls and members ───────────────────────────────────────────────────

/// Call `function` with positional arguments. Components receive the
/// first argument as their props.
fn invoke(function: &Value, args: &[Value], what: &str) -> Result<Value, EvalError> {
    match function {
        Value::Function(callback) => callback.call(args),
        Value::Component(component) => {
            let props = args.first().and_then(Value::as_object).cloned().unwrap_or_default();
            component.render(props)
        }
        other => Err(EvalError::not_callable(what, other.type_name())),
    }
}

fn call_method(target: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    match (target, method) {
        (Value::Array(items), "map") => {
            let f = arg(0);
            items
                .iter()
                .enumerate()
                .map(|(i, item)| invoke(&f, &[item.clone(), Value::from(i)], "map callback"))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (Value::Array(items), "filter") => {
            let f = arg(0);
            let mut kept = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if invoke(&f, &[item.clone(), Value::from(i)], "filter callback")?.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Ok(Value::Array(kept))
        }
        (Value::Array(items), "join") => {
            let separator = match arg(0) {
                Value::Undefined => ",".to_string(),
                other => other.to_display_string(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_display_string() })
                .collect();
            Ok(Value::String(parts.join(&separator)))
        }
        (Value::Array(items), "includes") => {
            let needle = arg(0);
            Ok(Value::Bool(items.iter().any(|item| same_value_zero(item, &needle))))
        }
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::String(s), "includes") => Ok(Value::Bool(s.contains(arg(0).to_display_string().as_str()))),
        _ => {
            let function = get_member(target, method)?;
            invoke(&function, args, method)
        }
    }
}

fn get_member(target: &Value, property: &str) -> Result<Value, EvalError> {
    Ok(match (target, property) {
        (Value::Undefined | Value::Null, _) => {
            return Err(EvalError::new(
                EvalErrorKind::TypeError,
                format!("cannot read property `{property}` of {}", target.type_name()),
            ));
        }
        (Value::String(s), "length") => Value::from(s.encode_utf16().count()),
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::Object(fields), _) => fields.get(property).cloned().unwrap_or_default(),
        (Value::Slot(slot), "current") => slot.get(),
        (Value::Element(el), "props") => Value::Object(el.props().clone()),
        (Value::Element(el), "key") => el.key().cloned().unwrap_or(Value::Null),
        (Value::Node(node), "textContent") => Value::String(node.text_content()),
        (Value::Node(node), "tagName") => node.tag_name().map(Value::String).unwrap_or_default(),
        (Value::Node(node), _) => node.property(property).unwrap_or_default(),
        _ => Value::Undefined,
    })
}

fn get_index(target: &Value, key: &Value) -> Result<Value, EvalError> {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) => Ok(array_index(*n)
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default()),
        (Value::String(s), Value::Number(n)) => Ok(array_index(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        _ => get_member(target, &key.to_display_string()),
    }
}

fn array_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn spread_items(value: Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Iterable(iter) => Ok(iter.take()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(EvalError::type_error("an iterable to spread", other.type_name())),
    }
}

// ── Pure operator evaluation ────────────────────────────────────────────

fn eval_binary_op(left: &Value, op: BinOp, right: &Value) -> Value {
    match op {
        BinOp::Eq => Value::Bool(left.loose_equals(right)),
        BinOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),

        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = match ordering {
                None => false,
                Some(ordering) => match op {
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Gt => ordering == Ordering::Greater,
                    BinOp::LtEq => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                },
            };
            Value::Bool(result)
        }

        BinOp::Add => eval_add(left, right),
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Rem => Value::Number(left.to_number() % right.to_number()),

        // short-circuit operators are handled before operands are evaluated
        BinOp::And | BinOp::Or | BinOp::Nullish => right.clone(),
    }
}

/// `+` concatenates when either side is text-like, otherwise adds.
fn eval_add(left: &Value, right: &Value) -> Value {
    let text_like = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
    if text_like(left) || text_like(right) {
        Value::String(format!("{}{}", left.to_display_string(), right.to_display_string()))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

fn eval_unary_op(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!value.is_truthy()),
        UnaryOp::Neg => Value::Number(-value.to_number()),
        UnaryOp::Plus => Value::Number(value.to_number()),
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_coercions() {
        assert_eq!(eval_add(&Value::from(1), &Value::from(2)), Value::from(3));
        assert_eq!(eval_add(&Value::from("n"), &Value::from(1)), Value::from("n1"));
        assert_eq!(eval_add(&Value::from(1), &Value::Bool(true)), Value::from(2));
        assert_eq!(eval_add(&Value::from(vec![1, 2]), &Value::from(3)), Value::from("1,23"));
    }

    #[test]
    fn test_relational() {
        assert_eq!(eval_binary_op(&Value::from(2), BinOp::Lt, &Value::from(10)), Value::Bool(true));
        assert_eq!(eval_binary_op(&Value::from("2"), BinOp::Lt, &Value::from("10")), Value::Bool(false));
        assert_eq!(
            eval_binary_op(&Value::Undefined, BinOp::GtEq, &Value::from(0)),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval_binary_op(&Value::Null, BinOp::Eq, &Value::Undefined), Value::Bool(true));
        assert_eq!(eval_binary_op(&Value::Null, BinOp::StrictEq, &Value::Undefined), Value::Bool(false));
        assert_eq!(eval_binary_op(&Value::from("1"), BinOp::Eq, &Value::from(1)), Value::Bool(true));
    }

    #[test]
    fn test_arithmetic_follows_float_rules() {
        assert_eq!(eval_binary_op(&Value::from(7), BinOp::Rem, &Value::from(3)), Value::from(1));
        let inf = eval_binary_op(&Value::from(1), BinOp::Div, &Value::from(0));
        assert_eq!(inf.as_number(), Some(f64::INFINITY));
    }

    #[test]
    fn test_builtin_methods() {
        let items = Value::from(vec!["a", "b"]);
        assert_eq!(call_method(&items, "join", &[Value::from("-")]).unwrap(), Value::from("a-b"));
        assert_eq!(call_method(&items, "includes", &[Value::from("b")]).unwrap(), Value::Bool(true));
        assert_eq!(
            call_method(&Value::from(" Hi "), "trim", &[]).unwrap(),
            Value::from("Hi")
        );
        let upper = Callback::new(|args| Ok(Value::String(args[0].to_display_string().to_uppercase())));
        assert_eq!(
            call_method(&items, "map", &[Value::Function(upper)]).unwrap(),
            Value::from(vec!["A", "B"])
        );
    }

    #[test]
    fn test_members() {
        assert_eq!(get_member(&Value::from("héllo"), "length").unwrap(), Value::from(5));
        let mut fields = Props::new();
        fields.insert("name".into(), Value::from("Ada"));
        assert_eq!(get_member(&Value::Object(fields), "name").unwrap(), Value::from("Ada"));
        let err = get_member(&Value::Null, "name").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeError);
    }

    #[test]
    fn test_index() {
        let items = Value::from(vec![10, 20]);
        assert_eq!(get_index(&items, &Value::from(1)).unwrap(), Value::from(20));
        assert_eq!(get_index(&items, &Value::from(5)).unwrap(), Value::Undefined);
        assert_eq!(get_index(&items, &Value::from("length")).unwrap(), Value::from(2));
    }

    #[test]
    fn test_calling_non_function() {
        let err = invoke(&Value::from(3), &[], "count").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NotCallable);
        assert_eq!(err.message, "count is not a function (got number)");
    }
}
