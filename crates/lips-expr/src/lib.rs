//! Lips Expression Language
//!
//! Sandboxed interpreter for the JS-like expressions embedded in templates.
//!
//! Features:
//! - Lexer and precedence-climbing parser producing an [`Expr`] tree
//! - Tree-walking evaluator over an explicit [`Scope`] chain
//! - Insertion-ordered [`Value`] model with `serde_json` conversions
//! - Settle-once [`Promise`] cells for async directives
//! - `{expr}` text interpolation

mod ast;
mod builtins;
mod error;
mod interp;
mod interpolate;
mod lexer;
mod parser;
mod promise;
mod scope;
mod token;
mod value;

pub use ast::{Arrow, Expr};
pub use error::{EvalError, ParseError};
pub use interp::{MAX_CALL_DEPTH, eval};
pub use interpolate::{TextPart, has_interpolation, interpolate, split_interpolations, split_top_level};
pub use builtins::MAX_STRING_LENGTH;
pub use parser::{MAX_NESTING, parse_expression};
pub use promise::{Deferred, Promise, PromiseState};
pub use scope::{Host, Scope};
pub use token::Span;
pub use value::{Function, MAX_ARRAY_LENGTH, MAX_EQ_DEPTH, NativeFn, Object, Value, format_number, parse_number};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Compiled expressions kept per thread before the cache is flushed
const CACHE_LIMIT: usize = 4096;

thread_local! {
    static COMPILED: RefCell<HashMap<Box<str>, Result<Rc<Expr>, ParseError>>> =
        RefCell::new(HashMap::new());
}

/// Parse an expression, reusing earlier results for the same source
pub fn compile(source: &str) -> Result<Rc<Expr>, ParseError> {
    if let Some(hit) = COMPILED.with(|c| c.borrow().get(source).cloned()) {
        return hit;
    }

    tracing::debug!(expression = source, "compiling expression");
    let compiled = parse_expression(source).map(Rc::new);
    COMPILED.with(|c| {
        let mut cache = c.borrow_mut();
        if cache.len() >= CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(source.into(), compiled.clone());
    });
    compiled
}

/// Evaluate an expression, reporting any failure
pub fn try_evaluate(source: &str, scope: &Scope) -> Result<Value, EvalError> {
    let expr = compile(source)?;
    eval(&expr, scope)
}

/// Evaluate an expression, falling back to its source text on failure
pub fn evaluate(source: &str, scope: &Scope) -> Value {
    match try_evaluate(source, scope) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(expression = source, error = %err, "expression fell back to source text");
            Value::from(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_fails_soft() {
        let scope = Scope::new();
        assert_eq!(evaluate("1 +", &scope), Value::from("1 +"));
        assert_eq!(evaluate("nobody.here", &scope), Value::from("nobody.here"));
        assert_eq!(evaluate("'ok'", &scope), Value::from("ok"));
    }

    #[test]
    fn test_runaway_expressions_fall_back() {
        let scope = Scope::new().with("xs", Value::array([Value::from(1)]));
        let soft = |source: &str| assert_eq!(evaluate(source, &scope), Value::from(source));

        soft("'ab'.repeat(1e19)");
        soft("'ab'.padStart(1e12)");
        soft("xs[1e20] = 5");
        soft(&format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)));
        assert_eq!(evaluate("'abc'.charAt(1e20)", &scope), Value::from(""));
        assert_eq!(evaluate("xs", &scope), Value::array([Value::from(1)]));
    }

    #[test]
    fn test_compile_is_cached() {
        let a = compile("a + b").unwrap();
        let b = compile("a + b").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(compile("(").is_err());
    }

    #[test]
    fn test_try_evaluate_reports() {
        let err = try_evaluate("missing", &Scope::new()).unwrap_err();
        assert_eq!(err, EvalError::Reference("missing".to_string()));
        assert_eq!(err.to_string(), "ReferenceError: missing is not defined");
    }
}
