//! Runtime values
//!
//! Values are immutable trees shared through `Rc`; writes go through
//! [`Value::set_path`], which copies on write. Trees are acyclic by
//! construction, and structural comparison is additionally depth bounded.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::promise::Promise;

/// Insertion-ordered object map
pub type Object = IndexMap<String, Value>;

/// Signature of callable values
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// Levels compared by structural equality; deeper levels compare equal
pub const MAX_EQ_DEPTH: usize = 64;

/// Arrays are dense; writes past this length are rejected
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Callable value
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Function]")
    }
}

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
    Function(Function),
    Promise(Promise),
}

impl Value {
    /// Build an object from key/value pairs
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(Rc::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }

    /// Build an array
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    pub fn empty_object() -> Value {
        Value::Object(Rc::new(Object::new()))
    }

    /// Wrap a closure as a function value
    pub fn function(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Value {
        Value::Function(Function::new(f))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// JS truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Promise(_) => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Promise(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }

    /// JS `Number(value)`
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => if *b { 1.0 } else { 0.0 },
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) | Value::Function(_) | Value::Promise(_) => f64::NAN,
        }
    }

    /// JS `String(value)`
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items.iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "[object Function]".to_string(),
            Value::Promise(_) => "[object Promise]".to_string(),
        }
    }

    /// Property key form of a value (`obj[key]`)
    pub fn to_key(&self) -> String {
        self.to_display()
    }

    /// Own property lookup: object keys, array indices and `length`
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.len() as f64)
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or_default()
                }
            }
            Value::String(s) => {
                if key == "length" {
                    Value::Number(s.chars().count() as f64)
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|i| s.chars().nth(i))
                        .map(|c| Value::from(c.to_string()))
                        .unwrap_or_default()
                }
            }
            _ => Value::Undefined,
        }
    }

    /// Follow a path of property keys
    pub fn get_path(&self, path: &[Value]) -> Value {
        let mut current = self.clone();
        for key in path {
            current = current.get(&key.to_key());
        }
        current
    }

    /// Set a nested property, copying shared nodes on the way down
    pub fn set_path(&mut self, path: &[Value], value: Value) -> Result<(), EvalError> {
        let Some((key, rest)) = path.split_first() else {
            *self = value;
            return Ok(());
        };

        match self {
            Value::Object(map) => {
                let map = Rc::make_mut(map);
                let key = key.to_key();
                if rest.is_empty() {
                    map.insert(key, value);
                    return Ok(());
                }
                match map.get_mut(&key) {
                    Some(child) if !child.is_nullish() => child.set_path(rest, value),
                    _ => Err(EvalError::type_error(format!(
                        "Cannot set properties of undefined (setting '{}')",
                        rest[0].to_key()
                    ))),
                }
            }
            Value::Array(items) => {
                let index = key.to_number();
                if index < 0.0 || index.fract() != 0.0 || !index.is_finite() {
                    return Err(EvalError::type_error(format!("Invalid array index '{}'", key.to_key())));
                }
                if index >= MAX_ARRAY_LENGTH as f64 {
                    return Err(EvalError::Range("Invalid array length".to_string()));
                }
                let index = index as usize;
                let items = Rc::make_mut(items);
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index].set_path(rest, value)
            }
            other => Err(EvalError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                other.to_display(),
                key.to_key()
            ))),
        }
    }

    /// Shallow merge: keys of `partial` override keys of `self`
    ///
    /// A non-object on either side yields `partial`.
    pub fn merge(&self, partial: &Value) -> Value {
        match (self, partial) {
            (Value::Object(base), Value::Object(over)) => {
                let mut merged = (**base).clone();
                for (k, v) in over.iter() {
                    merged.insert(k.clone(), v.clone());
                }
                Value::Object(Rc::new(merged))
            }
            _ => partial.clone(),
        }
    }

    /// JS `===`: primitives by value, everything else by identity
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// JS `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => {
                if matches!((self, other), (Value::Bool(_), Value::Bool(_))) {
                    return self.strict_eq(other);
                }
                self.to_number() == other.to_number()
            }
            _ => self.strict_eq(other),
        }
    }

    fn structural_eq(&self, other: &Value, depth: usize) -> bool {
        if depth >= MAX_EQ_DEPTH {
            return true;
        }
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y, depth + 1)))
            }
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().all(|(k, v)| {
                            b.get(k).map(|w| v.structural_eq(w, depth + 1)).unwrap_or(false)
                        }))
            }
            // callables compare by presence only
            (Value::Function(_), Value::Function(_)) => true,
            (Value::Promise(_), Value::Promise(_)) => true,
            _ => false,
        }
    }

    /// Convert to JSON; functions, promises and `undefined` become `null`
    /// (and are skipped as object members)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Promise(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_) | Value::Promise(_)))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.structural_eq(other, 0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// JS number to string conversion
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        // Rust prints `1e21`, JS prints `1e+21`
        let s = format!("{:e}", n);
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        };
    }
    if n.fract() == 0.0 {
        return format!("{:.0}", n);
    }
    format!("{}", n)
}

/// JS string to number conversion
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    if !s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Value::Object(Rc::new(map))
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::array([1.into(), Value::Null, "x".into()]).to_string(), "1,,x");
        assert_eq!(Value::empty_object().to_string(), "[object Object]");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::array([]).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn test_structural_eq() {
        let a = Value::from(json!({"a": 1, "b": [1, 2, {"c": null}]}));
        let b = Value::from(json!({"b": [1, 2, {"c": null}], "a": 1}));
        assert_eq!(a, b);
        assert_ne!(a, Value::from(json!({"a": 1})));
        assert!(!a.strict_eq(&b));

        let f = Value::function(|_| Ok(Value::Undefined));
        let g = Value::function(|_| Ok(Value::Null));
        assert_eq!(Value::object([("on", f)]), Value::object([("on", g)]));
    }

    #[test]
    fn test_structural_eq_depth_bound() {
        let mut deep_a = Value::from(1);
        let mut deep_b = Value::from(2);
        for _ in 0..MAX_EQ_DEPTH + 1 {
            deep_a = Value::array([deep_a]);
            deep_b = Value::array([deep_b]);
        }
        assert_eq!(deep_a, deep_b);
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(Value::from(1).loose_eq(&Value::from("1")));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
    }

    #[test]
    fn test_merge() {
        let base = Value::from(json!({"a": 1, "b": 2}));
        let merged = base.merge(&Value::from(json!({"b": 3, "c": 4})));
        assert_eq!(merged, Value::from(json!({"a": 1, "b": 3, "c": 4})));
        assert_eq!(base.get("b"), Value::from(2));
    }

    #[test]
    fn test_set_path_copies_on_write() {
        let original = Value::from(json!({"items": [{"done": false}]}));
        let mut copy = original.clone();
        copy.set_path(&["items".into(), 0.into(), "done".into()], true.into()).unwrap();

        assert_eq!(copy.get_path(&["items".into(), 0.into(), "done".into()]), Value::Bool(true));
        assert_eq!(original.get_path(&["items".into(), 0.into(), "done".into()]), Value::Bool(false));
        assert!(copy.set_path(&["missing".into(), "x".into()], 1.into()).is_err());
    }

    #[test]
    fn test_set_path_rejects_huge_index() {
        let mut items = Value::array([Value::from(1)]);
        let err = items.set_path(&[Value::Number(1e20)], 5.into()).unwrap_err();
        assert!(matches!(err, EvalError::Range(_)));
        assert!(items.set_path(&[Value::from(MAX_ARRAY_LENGTH)], 5.into()).is_err());
        assert_eq!(items, Value::array([Value::from(1)]));

        items.set_path(&[Value::from(2)], 3.into()).unwrap();
        assert_eq!(items, Value::array([Value::from(1), Value::Undefined, Value::from(3)]));
    }

    #[test]
    fn test_json_round_trip_numbers() {
        let v = Value::from(json!({"n": 1, "f": 1.5, "u": null}));
        assert_eq!(v.to_json(), json!({"n": 1, "f": 1.5, "u": null}));
        assert_eq!(Value::object([("x", Value::Undefined)]).to_json(), json!({}));
    }
}
