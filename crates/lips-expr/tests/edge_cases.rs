//! Edge case tests for lips-expr
//!
//! Scope resolution, host assignment, fail-soft evaluation and the builtin
//! surface templates lean on.

use std::cell::RefCell;
use std::rc::Rc;

use lips_expr::*;

struct Component {
    state: RefCell<Value>,
    input: Value,
}

impl Host for Component {
    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "state" => Some(self.state.borrow().clone()),
            "input" => Some(self.input.clone()),
            "static" | "context" => Some(Value::empty_object()),
            _ => None,
        }
    }

    fn assign(&self, name: &str, path: &[Value], value: Value) -> Result<(), EvalError> {
        match name {
            "state" => self.state.borrow_mut().set_path(path, value),
            other => Err(EvalError::ReadOnly(other.to_string())),
        }
    }
}

fn component_scope() -> (Rc<Component>, Scope) {
    let host = Rc::new(Component {
        state: RefCell::new(Value::object([
            ("count", Value::from(1)),
            ("user", Value::object([("name", Value::from("Ada"))])),
        ])),
        input: Value::object([("title", Value::from("Hello"))]),
    });
    let scope = Scope::with_host(host.clone());
    (host, scope)
}

// ============================================================================
// SCOPE RESOLUTION
// ============================================================================

#[test]
fn test_host_names_resolve() {
    let (_, scope) = component_scope();
    assert_eq!(evaluate("state.count + 1", &scope), Value::from(2));
    assert_eq!(evaluate("input.title", &scope), Value::from("Hello"));
    assert_eq!(evaluate("state.user?.name", &scope), Value::from("Ada"));
}

#[test]
fn test_locals_shadow_host() {
    let (_, scope) = component_scope();
    let scope = scope.with("state", Value::from("local"));
    assert_eq!(evaluate("state", &scope), Value::from("local"));
}

#[test]
fn test_scope_object_lists_locals() {
    let scope = Scope::new().with("each", Value::from(3)).with("index", Value::from(0));
    assert_eq!(evaluate("Object.keys(scope).join(',')", &scope), Value::from("each,index"));
}

#[test]
fn test_globals_after_locals() {
    let scope = Scope::new().with("Math", Value::from("mine"));
    assert_eq!(evaluate("Math", &scope), Value::from("mine"));
    assert_eq!(evaluate("Math.max(1, 4)", &Scope::new()), Value::from(4));
}

// ============================================================================
// ASSIGNMENT
// ============================================================================

#[test]
fn test_state_assignment_mutates_host() {
    let (host, scope) = component_scope();
    assert_eq!(evaluate("state.count = 10", &scope), Value::from(10));
    assert_eq!(host.state.borrow().get("count"), Value::from(10));

    evaluate("state.count++", &scope);
    evaluate("state.user.name += '!'", &scope);
    let state = host.state.borrow();
    assert_eq!(state.get("count"), Value::from(11));
    assert_eq!(state.get_path(&["user".into(), "name".into()]), Value::from("Ada!"));
}

#[test]
fn test_input_assignment_is_error() {
    let (_, scope) = component_scope();
    let err = try_evaluate("input.title = 'x'", &scope).unwrap_err();
    assert!(matches!(err, EvalError::ReadOnly(ref name) if name == "input"));
}

#[test]
fn test_assignment_through_nullish_errors() {
    let (_, scope) = component_scope();
    assert!(matches!(try_evaluate("state.missing.deep = 1", &scope), Err(EvalError::Type(_))));
}

// ============================================================================
// FAIL SOFT
// ============================================================================

#[test]
fn test_syntax_error_returns_source() {
    assert_eq!(evaluate("a +* b", &Scope::new()), Value::from("a +* b"));
}

#[test]
fn test_calling_non_function() {
    let scope = Scope::new().with("n", Value::from(1));
    let err = try_evaluate("n()", &scope).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: n is not a function");
}

#[test]
fn test_question_mark_sentinel_is_plain_string() {
    assert_eq!(evaluate("'?'", &Scope::new()), Value::from("?"));
    assert_eq!(evaluate("false ? 1 : '?'", &Scope::new()), Value::from("?"));
}

// ============================================================================
// LANGUAGE SURFACE
// ============================================================================

#[test]
fn test_object_literal_features() {
    let scope = Scope::new().with("a", Value::from(1)).with("k", Value::from("dyn"));
    let out = evaluate("({ a, [k]: 2, ...{ c: 3 }, 'd-e': 4 })", &scope);
    assert_eq!(out, Value::object([
        ("a", Value::from(1)),
        ("dyn", Value::from(2)),
        ("c", Value::from(3)),
        ("d-e", Value::from(4)),
    ]));
}

#[test]
fn test_template_literal() {
    let scope = Scope::new().with("n", Value::from(3));
    assert_eq!(evaluate("`${n} item${n === 1 ? '' : 's'}`", &scope), Value::from("3 items"));
}

#[test]
fn test_nullish_and_logical() {
    let scope = Scope::new().with("zero", Value::from(0));
    assert_eq!(evaluate("zero ?? 5", &scope), Value::from(0));
    assert_eq!(evaluate("zero || 5", &scope), Value::from(5));
    assert_eq!(evaluate("null ?? 'x'", &scope), Value::from("x"));
    assert_eq!(evaluate("1 && 'y'", &scope), Value::from("y"));
}

#[test]
fn test_equality() {
    let scope = Scope::new();
    assert_eq!(evaluate("1 == '1'", &scope), Value::Bool(true));
    assert_eq!(evaluate("1 === '1'", &scope), Value::Bool(false));
    assert_eq!(evaluate("null == undefined", &scope), Value::Bool(true));
    assert_eq!(evaluate("null === undefined", &scope), Value::Bool(false));
}

#[test]
fn test_array_pipeline() {
    let scope = Scope::new().with("items", Value::array([
        Value::object([("name", Value::from("a")), ("done", Value::Bool(true))]),
        Value::object([("name", Value::from("b")), ("done", Value::Bool(false))]),
        Value::object([("name", Value::from("c")), ("done", Value::Bool(true))]),
    ]));
    assert_eq!(
        evaluate("items.filter(i => i.done).map(i => i.name.toUpperCase()).join('+')", &scope),
        Value::from("A+C")
    );
    assert_eq!(evaluate("items.length", &scope), Value::from(3));
    assert_eq!(evaluate("items.find(i => !i.done).name", &scope), Value::from("b"));
    assert_eq!(evaluate("items.some(i => i.name === 'z')", &scope), Value::Bool(false));
}

#[test]
fn test_json_roundtrip_through_builtins() {
    let scope = Scope::new();
    assert_eq!(evaluate("JSON.parse('{\"a\":[1,2]}').a[1]", &scope), Value::from(2));
    assert_eq!(evaluate("JSON.stringify({ b: 'x', f: () => 1 })", &scope), Value::from(r#"{"b":"x"}"#));
}

#[test]
fn test_number_formatting() {
    let scope = Scope::new();
    assert_eq!(evaluate("String(0.1 + 0.2)", &scope), Value::from("0.30000000000000004"));
    assert_eq!(evaluate("String(1 / 0)", &scope), Value::from("Infinity"));
    assert_eq!(evaluate("(2.5).toFixed(2)", &scope), Value::from("2.50"));
    assert_eq!(evaluate("parseInt('12px') + parseFloat('0.5')", &scope), Value::from(12.5));
}

// ============================================================================
// INTERPOLATION
// ============================================================================

#[test]
fn test_interpolation_against_host() {
    let (_, scope) = component_scope();
    assert_eq!(interpolate("{input.title}, {state.user.name}!", &scope), "Hello, Ada!");
}

#[test]
fn test_interpolation_failure_keeps_source() {
    assert_eq!(interpolate("value: {nope}", &Scope::new()), "value: nope");
}

// ============================================================================
// PROMISES AS VALUES
// ============================================================================

#[test]
fn test_promise_value() {
    let (promise, deferred) = Promise::pending();
    let scope = Scope::new().with("p", Value::from(promise.clone()));
    assert_eq!(evaluate("typeof p", &scope), Value::from("object"));

    deferred.resolve(Value::from("done"));
    assert_eq!(promise.state(), PromiseState::Fulfilled(Value::from("done")));
}
