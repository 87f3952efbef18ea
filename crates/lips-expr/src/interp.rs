//! Tree-walking evaluator

use std::cell::Cell;
use std::rc::Rc;

use crate::ast::{
    Arrow, AssignOp, BinaryOp, Element, Expr, Literal, LogicalOp, MemberProperty, Property,
    PropertyKey, TemplateSegment, UnaryOp, UpdateOp,
};
use crate::builtins;
use crate::error::EvalError;
use crate::scope::Scope;
use crate::value::{Function, Object, Value};

/// Nested arrow invocations allowed before a RangeError
pub const MAX_CALL_DEPTH: usize = 64;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Evaluate an expression tree
pub fn eval(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    Ok(eval_chain(expr, scope)?.unwrap_or_default())
}

/// `None` when an optional chain short-circuited
fn eval_chain(expr: &Expr, scope: &Scope) -> Result<Option<Value>, EvalError> {
    match expr {
        Expr::Member { object, property, optional } => {
            let Some(target) = eval_chain(object, scope)? else { return Ok(None) };
            if *optional && target.is_nullish() {
                return Ok(None);
            }
            let key = property_key(property, scope)?;
            read_property(&target, &key).map(Some)
        }
        Expr::Call { callee, arguments, optional } => match callee.as_ref() {
            Expr::Member { object, property, optional: member_optional } => {
                let Some(receiver) = eval_chain(object, scope)? else { return Ok(None) };
                if *member_optional && receiver.is_nullish() {
                    return Ok(None);
                }
                let key = property_key(property, scope)?;
                call_member(&receiver, &key, arguments, *optional, scope)
            }
            _ => {
                let Some(function) = eval_chain(callee, scope)? else { return Ok(None) };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = eval_elements(arguments, scope)?;
                call_value(&function, &args, || describe(callee)).map(Some)
            }
        },
        other => eval_expr(other, scope).map(Some),
    }
}

fn eval_expr(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::from(&**s),
        }),

        Expr::Template(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment {
                    TemplateSegment::Str(s) => out.push_str(s),
                    TemplateSegment::Expr(e) => out.push_str(&eval(e, scope)?.to_display()),
                }
            }
            Ok(Value::from(out))
        }

        Expr::Identifier(name) => resolve(name, scope),

        Expr::Array(elements) => Ok(Value::from(eval_elements(elements, scope)?)),

        Expr::Object(properties) => {
            let mut map = Object::new();
            for property in properties {
                match property {
                    Property::KeyValue { key, value } => {
                        let key = match key {
                            PropertyKey::Static(k) => k.to_string(),
                            PropertyKey::Computed(e) => eval(e, scope)?.to_key(),
                        };
                        map.insert(key, eval(value, scope)?);
                    }
                    Property::Spread(e) => match eval(e, scope)? {
                        Value::Object(other) => {
                            for (k, v) in other.iter() {
                                map.insert(k.clone(), v.clone());
                            }
                        }
                        Value::Array(items) => {
                            for (i, v) in items.iter().enumerate() {
                                map.insert(i.to_string(), v.clone());
                            }
                        }
                        _ => {}
                    },
                }
            }
            Ok(Value::from(map))
        }

        Expr::Unary { operator, argument } => match operator {
            UnaryOp::Typeof => {
                if let Expr::Identifier(name) = argument.as_ref() {
                    if lookup(name, scope).is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                Ok(Value::from(eval(argument, scope)?.type_of()))
            }
            UnaryOp::Not => Ok(Value::Bool(!eval(argument, scope)?.is_truthy())),
            UnaryOp::Minus => Ok(Value::Number(-eval(argument, scope)?.to_number())),
            UnaryOp::Plus => Ok(Value::Number(eval(argument, scope)?.to_number())),
        },

        Expr::Update { operator, prefix, target } => {
            let old = eval(target, scope)?.to_number();
            let new = match operator {
                UpdateOp::Increment => old + 1.0,
                UpdateOp::Decrement => old - 1.0,
            };
            assign(target, Value::Number(new), scope)?;
            Ok(Value::Number(if *prefix { new } else { old }))
        }

        Expr::Binary { operator, left, right } => {
            let l = eval(left, scope)?;
            let r = eval(right, scope)?;
            Ok(binary(*operator, &l, &r))
        }

        Expr::Logical { operator, left, right } => {
            let l = eval(left, scope)?;
            let short = match operator {
                LogicalOp::And => !l.is_truthy(),
                LogicalOp::Or => l.is_truthy(),
                LogicalOp::NullishCoalescing => !l.is_nullish(),
            };
            if short { Ok(l) } else { eval(right, scope) }
        }

        Expr::Conditional { test, consequent, alternate } => {
            if eval(test, scope)?.is_truthy() {
                eval(consequent, scope)
            } else {
                eval(alternate, scope)
            }
        }

        Expr::Assign { operator, target, value } => {
            let rhs = eval(value, scope)?;
            let new = match operator {
                AssignOp::Assign => rhs,
                AssignOp::AddAssign => binary(BinaryOp::Add, &eval(target, scope)?, &rhs),
                AssignOp::SubAssign => binary(BinaryOp::Sub, &eval(target, scope)?, &rhs),
            };
            assign(target, new.clone(), scope)?;
            Ok(new)
        }

        Expr::Arrow(arrow) => Ok(Value::Function(closure(arrow.clone(), scope.clone()))),

        Expr::Member { .. } | Expr::Call { .. } => eval(expr, scope),
    }
}

fn lookup(name: &str, scope: &Scope) -> Option<Value> {
    scope.lookup(name).or_else(|| builtins::global(name))
}

fn resolve(name: &str, scope: &Scope) -> Result<Value, EvalError> {
    lookup(name, scope).ok_or_else(|| EvalError::Reference(name.to_string()))
}

fn property_key(property: &MemberProperty, scope: &Scope) -> Result<String, EvalError> {
    match property {
        MemberProperty::Name(name) => Ok(name.to_string()),
        MemberProperty::Computed(e) => Ok(eval(e, scope)?.to_key()),
    }
}

fn read_property(target: &Value, key: &str) -> Result<Value, EvalError> {
    if target.is_nullish() {
        return Err(EvalError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            target.to_display(),
            key
        )));
    }
    Ok(target.get(key))
}

fn call_member(
    receiver: &Value,
    key: &str,
    arguments: &[Element],
    optional: bool,
    scope: &Scope,
) -> Result<Option<Value>, EvalError> {
    if receiver.is_nullish() {
        return Err(EvalError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            receiver.to_display(),
            key
        )));
    }

    if let Value::Object(map) = receiver {
        let own = map.get(key).cloned().unwrap_or_default();
        if optional && own.is_nullish() {
            return Ok(None);
        }
        let args = eval_elements(arguments, scope)?;
        if own.is_undefined() && (key == "toString" || key == "valueOf") {
            return builtins::call_method(receiver, key, &args).map(Some);
        }
        return call_value(&own, &args, || key.to_string()).map(Some);
    }

    let args = eval_elements(arguments, scope)?;
    match builtins::call_method(receiver, key, &args) {
        Err(EvalError::Type(_)) if optional => Ok(None),
        other => other.map(Some),
    }
}

fn call_value(callee: &Value, args: &[Value], name: impl FnOnce() -> String) -> Result<Value, EvalError> {
    match callee {
        Value::Function(f) => f.call(args),
        _ => Err(EvalError::type_error(format!("{} is not a function", name()))),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.to_string(),
        Expr::Member { object, property: MemberProperty::Name(name), .. } => {
            format!("{}.{}", describe(object), name)
        }
        _ => "expression".to_string(),
    }
}

fn eval_elements(elements: &[Element], scope: &Scope) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::Item(e) => out.push(eval(e, scope)?),
            Element::Spread(e) => match eval(e, scope)? {
                Value::Array(items) => out.extend(items.iter().cloned()),
                Value::String(s) => out.extend(s.chars().map(|c| Value::from(c.to_string()))),
                other => {
                    return Err(EvalError::type_error(format!("{} is not iterable", other.to_display())));
                }
            },
        }
    }
    Ok(out)
}

fn closure(arrow: Rc<Arrow>, captured: Scope) -> Function {
    Function::new(move |args| {
        let bindings = arrow
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.to_string(), args.get(i).cloned().unwrap_or_default()));
        let inner = captured.extend(bindings);
        with_call_depth(|| eval(&arrow.body, &inner))
    })
}

fn with_call_depth<T>(f: impl FnOnce() -> Result<T, EvalError>) -> Result<T, EvalError> {
    let depth = CALL_DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    let result = if depth > MAX_CALL_DEPTH {
        Err(EvalError::Range("Maximum call stack size exceeded".to_string()))
    } else {
        f()
    };
    CALL_DEPTH.with(|d| d.set(d.get() - 1));
    result
}

/// Split an assignment target into its root binding and property path
fn target_path(target: &Expr, scope: &Scope) -> Result<(String, Vec<Value>), EvalError> {
    match target {
        Expr::Identifier(name) => Ok((name.to_string(), Vec::new())),
        Expr::Member { object, property, optional: false } => {
            let (root, mut path) = target_path(object, scope)?;
            path.push(Value::from(property_key(property, scope)?));
            Ok((root, path))
        }
        _ => Err(EvalError::Host("SyntaxError: Invalid left-hand side in assignment".to_string())),
    }
}

fn assign(target: &Expr, value: Value, scope: &Scope) -> Result<(), EvalError> {
    let (root, path) = target_path(target, scope)?;
    if scope.lookup(&root).is_none() && builtins::global(&root).is_some() {
        return Err(EvalError::ReadOnly(root));
    }
    scope.assign(&root, &path, value)
}

fn binary(operator: BinaryOp, l: &Value, r: &Value) -> Value {
    match operator {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Promise(_));
            if stringy(l) || stringy(r) {
                Value::from(l.to_display() + &r.to_display())
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Mod => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Pow => Value::Number(l.to_number().powf(r.to_number())),
        BinaryOp::LessThan => compare(l, r, |o| o.is_lt()),
        BinaryOp::LessThanEq => compare(l, r, |o| o.is_le()),
        BinaryOp::GreaterThan => compare(l, r, |o| o.is_gt()),
        BinaryOp::GreaterThanEq => compare(l, r, |o| o.is_ge()),
        BinaryOp::Equal => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEqual => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEqual => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNotEqual => Value::Bool(!l.strict_eq(r)),
    }
}

fn compare(l: &Value, r: &Value, test: fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    };
    Value::Bool(ordering.is_some_and(test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn run(src: &str, scope: &Scope) -> Result<Value, EvalError> {
        eval(&parse_expression(src).unwrap(), scope)
    }

    #[test]
    fn test_arithmetic_and_strings() {
        let scope = Scope::new();
        assert_eq!(run("1 + 2 * 3", &scope).unwrap(), Value::from(7));
        assert_eq!(run("2 ** 3 ** 2", &scope).unwrap(), Value::from(512));
        assert_eq!(run("'a' + 1", &scope).unwrap(), Value::from("a1"));
        assert_eq!(run("[1, 2] + ''", &scope).unwrap(), Value::from("1,2"));
        assert_eq!(run("-7 % 3", &scope).unwrap(), Value::from(-1));
        assert_eq!(run("'b' > 'a'", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_optional_chain_short_circuits() {
        let scope = Scope::new().with("user", Value::Null);
        assert_eq!(run("user?.name.first", &scope).unwrap(), Value::Undefined);
        assert_eq!(run("user?.greet()", &scope).unwrap(), Value::Undefined);
        assert!(matches!(run("user.name", &scope), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_assignment_to_local() {
        let scope = Scope::new().with("item", Value::object([("n", Value::from(1))]));
        assert_eq!(run("item.n += 2", &scope).unwrap(), Value::from(3));
        assert_eq!(run("item.n++", &scope).unwrap(), Value::from(3));
        assert_eq!(scope.lookup("item").unwrap().get("n"), Value::from(4));
    }

    #[test]
    fn test_assign_to_global_is_read_only() {
        let scope = Scope::new();
        assert!(matches!(run("Math = 1", &scope), Err(EvalError::ReadOnly(_))));
        assert!(matches!(run("missing = 1", &scope), Err(EvalError::Reference(_))));
    }

    #[test]
    fn test_closures_capture_scope() {
        let scope = Scope::new().with("k", Value::from(10));
        assert_eq!(
            run("[1, 2, 3].map(x => x * k)", &scope).unwrap(),
            Value::array([Value::from(10), Value::from(20), Value::from(30)])
        );
        assert_eq!(run("((a, b) => a + b)(2, 3)", &scope).unwrap(), Value::from(5));
    }

    #[test]
    fn test_call_depth_limit() {
        let scope = Scope::new().with("holder", Value::empty_object());
        run("holder.f = n => holder.f(n + 1)", &scope).unwrap();
        assert!(matches!(run("holder.f(0)", &scope), Err(EvalError::Range(_))));
        assert_eq!(CALL_DEPTH.with(Cell::get), 0);
    }

    #[test]
    fn test_typeof_undeclared() {
        let scope = Scope::new();
        assert_eq!(run("typeof nothing", &scope).unwrap(), Value::from("undefined"));
        assert_eq!(run("typeof Math.max", &scope).unwrap(), Value::from("function"));
    }
}
