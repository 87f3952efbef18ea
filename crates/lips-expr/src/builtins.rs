//! Built-in globals and methods
//!
//! The global object (`Math`, `JSON`, `Object`, `Array`, conversions) and
//! the string, number and array methods reachable through member calls.

use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{Function, Object, Value, format_number};

/// Longest string a builtin may produce, in chars
pub const MAX_STRING_LENGTH: usize = 1 << 28;

thread_local! {
    static GLOBALS: Object = build_globals();
}

/// Look up a global binding
pub fn global(name: &str) -> Option<Value> {
    GLOBALS.with(|g| g.get(name).cloned())
}

fn native(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Value {
    Value::Function(Function::new(f))
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    arg(args, i).to_number()
}

fn math_unary(f: fn(f64) -> f64) -> Value {
    native(move |args| Ok(Value::Number(f(num_arg(args, 0)))))
}

fn build_globals() -> Object {
    let math = Value::object([
        ("PI", Value::Number(std::f64::consts::PI)),
        ("E", Value::Number(std::f64::consts::E)),
        ("min", native(|args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::INFINITY, js_min)))
        })),
        ("max", native(|args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, js_max)))
        })),
        ("round", math_unary(|n| (n + 0.5).floor())),
        ("floor", math_unary(f64::floor)),
        ("ceil", math_unary(f64::ceil)),
        ("abs", math_unary(f64::abs)),
        ("trunc", math_unary(f64::trunc)),
        ("sqrt", math_unary(f64::sqrt)),
        ("sign", math_unary(|n| if n.is_nan() || n == 0.0 { n } else { n.signum() })),
        ("pow", native(|args| Ok(Value::Number(num_arg(args, 0).powf(num_arg(args, 1)))))),
    ]);

    let json = Value::object([
        ("stringify", native(|args| json_stringify(&arg(args, 0), &arg(args, 2)))),
        ("parse", native(|args| {
            let text = arg(args, 0).to_display();
            serde_json::from_str::<serde_json::Value>(&text)
                .map(Value::from)
                .map_err(|e| EvalError::Host(format!("SyntaxError: {}", e)))
        })),
    ]);

    let object = Value::object([
        ("keys", native(|args| Ok(Value::array(entries(&arg(args, 0)).into_iter().map(|(k, _)| Value::from(k)))))),
        ("values", native(|args| Ok(Value::array(entries(&arg(args, 0)).into_iter().map(|(_, v)| v))))),
        ("entries", native(|args| {
            Ok(Value::array(
                entries(&arg(args, 0))
                    .into_iter()
                    .map(|(k, v)| Value::array([Value::from(k), v])),
            ))
        })),
        ("assign", native(|args| {
            Ok(args.iter().skip(1).fold(arg(args, 0), |acc, next| acc.merge(next)))
        })),
    ]);

    let array = Value::object([
        ("isArray", native(|args| Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_)))))),
    ]);

    let mut globals = Object::new();
    globals.insert("Math".into(), math);
    globals.insert("JSON".into(), json);
    globals.insert("Object".into(), object);
    globals.insert("Array".into(), array);
    globals.insert("String".into(), native(|args| {
        Ok(Value::from(args.first().map(Value::to_display).unwrap_or_default()))
    }));
    globals.insert("Number".into(), native(|args| {
        Ok(Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)))
    }));
    globals.insert("Boolean".into(), native(|args| Ok(Value::Bool(arg(args, 0).is_truthy()))));
    globals.insert("parseInt".into(), native(|args| {
        let radix = args.get(1).map(Value::to_number).filter(|r| *r != 0.0 && r.is_finite());
        Ok(Value::Number(parse_int(&arg(args, 0).to_display(), radix.map(|r| r as u32))))
    }));
    globals.insert("parseFloat".into(), native(|args| Ok(Value::Number(parse_float(&arg(args, 0).to_display())))));
    globals.insert("isNaN".into(), native(|args| Ok(Value::Bool(num_arg(args, 0).is_nan()))));
    globals.insert("Infinity".into(), Value::Number(f64::INFINITY));
    globals.insert("NaN".into(), Value::Number(f64::NAN));
    globals
}

fn js_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn js_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

/// Own enumerable entries of an object or array
fn entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v.clone())).collect(),
        Value::String(s) => s.chars().enumerate().map(|(i, c)| (i.to_string(), Value::from(c.to_string()))).collect(),
        _ => Vec::new(),
    }
}

fn json_stringify(value: &Value, indent: &Value) -> Result<Value, EvalError> {
    if matches!(value, Value::Undefined | Value::Function(_)) {
        return Ok(Value::Undefined);
    }
    let json = value.to_json();
    let width = match indent {
        Value::Number(n) if *n >= 1.0 => n.min(10.0) as usize,
        Value::String(s) if !s.is_empty() => s.len().min(10),
        _ => 0,
    };
    let out = if width == 0 {
        serde_json::to_string(&json)
    } else {
        let pad = vec![b' '; width];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&pad);
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&json, &mut ser)
            .map(|_| String::from_utf8_lossy(&buf).into_owned())
    };
    out.map(Value::from).map_err(|e| EvalError::Host(e.to_string()))
}

/// `parseInt`: longest valid integer prefix
pub fn parse_int(s: &str, radix: Option<u32>) -> f64 {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, s) = match radix {
        None | Some(16) if s.starts_with("0x") || s.starts_with("0X") => (16, &s[2..]),
        None => (10, s),
        Some(r) if (2..=36).contains(&r) => (r, s),
        Some(_) => return f64::NAN,
    };

    let mut result: f64 = 0.0;
    let mut any = false;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix) else { break };
        result = result * radix as f64 + digit as f64;
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -result,
        (true, false) => result,
    }
}

/// `parseFloat`: longest valid decimal prefix
pub fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    for prefix in ["Infinity", "+Infinity"] {
        if s.starts_with(prefix) {
            return f64::INFINITY;
        }
    }
    if s.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Resolve a relative index (negative counts from the end) into `0..=len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn callback(args: &[Value], method: &str) -> Result<Function, EvalError> {
    match args.first() {
        Some(Value::Function(f)) => Ok(f.clone()),
        Some(other) => Err(EvalError::type_error(format!("{} is not a function", other.to_display()))),
        None => Err(EvalError::type_error(format!("undefined is not a function (in {})", method))),
    }
}

/// SameValueZero
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_eq(b),
    }
}

/// Call a built-in method on a primitive or array receiver
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let result = match receiver {
        Value::String(s) => string_method(s, name, args)?,
        Value::Array(items) => array_method(receiver, items, name, args)?,
        Value::Number(n) => number_method(*n, name, args),
        _ => None,
    };

    match result {
        Some(value) => Ok(value),
        None if name == "toString" => Ok(Value::from(receiver.to_display())),
        None if name == "valueOf" => Ok(receiver.clone()),
        None => Err(EvalError::type_error(format!(
            "{}.{} is not a function",
            receiver.type_of(),
            name
        ))),
    }
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "toFixed" => {
            let digits = num_arg(args, 0);
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
            Some(Value::from(format!("{:.*}", digits, n)))
        }
        "toString" => {
            let radix = args.first().map(Value::to_number).unwrap_or(10.0);
            if radix == 10.0 || n.fract() != 0.0 || !n.is_finite() {
                Some(Value::from(format_number(n)))
            } else {
                Some(Value::from(int_to_radix(n as i64, radix as u32)))
            }
        }
        _ => None,
    }
}

fn int_to_radix(mut n: i64, radix: u32) -> String {
    let radix = radix.clamp(2, 36) as i64;
    if n == 0 {
        return "0".into();
    }
    let negative = n < 0;
    let mut digits = Vec::new();
    while n != 0 {
        let d = (n % radix).unsigned_abs() as u32;
        digits.push(std::char::from_digit(d, radix as u32).unwrap_or('0'));
        n /= radix;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn invalid_length() -> EvalError {
    EvalError::Range("Invalid string length".to_string())
}

fn pad(s: &str, args: &[Value], at_start: bool) -> Result<String, EvalError> {
    let target = num_arg(args, 0).trunc();
    let fill = match args.get(1) {
        Some(v) if !v.is_undefined() => v.to_display(),
        _ => " ".to_string(),
    };
    let len = s.chars().count();
    if target.is_nan() || target <= len as f64 || fill.is_empty() {
        return Ok(s.to_string());
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(invalid_length());
    }
    let padding: String = fill.chars().cycle().take(target as usize - len).collect();
    Ok(if at_start { padding + s } else { s.to_string() + &padding })
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let len = s.chars().count();
    let value = match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "includes" => Value::Bool(s.contains(arg(args, 0).to_display().as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg(args, 0).to_display().as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg(args, 0).to_display().as_str())),
        "indexOf" => {
            let needle = arg(args, 0).to_display();
            match s.find(needle.as_str()) {
                Some(byte) => Value::Number(s[..byte].chars().count() as f64),
                None => Value::Number(-1.0),
            }
        }
        "charAt" => {
            let i = num_arg(args, 0);
            let i = if i.is_nan() { 0.0 } else { i.trunc() };
            if i < 0.0 || i >= len as f64 {
                Value::from("")
            } else {
                let i = i as usize;
                Value::from(char_slice(s, i, i.saturating_add(1)))
            }
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::from(char_slice(s, start, end))
        }
        "split" => {
            let limit = match args.get(1) {
                Some(v) if !v.is_undefined() => v.to_number().max(0.0) as usize,
                _ => usize::MAX,
            };
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(sep) => {
                    let sep = sep.to_display();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::array(parts.into_iter().take(limit))
        }
        "replace" | "replaceAll" => {
            let pattern = arg(args, 0).to_display();
            let replacement = arg(args, 1);
            let count = if name == "replace" { 1 } else { usize::MAX };
            replace(s, &pattern, &replacement, count)?
        }
        "padStart" => Value::from(pad(s, args, true)?),
        "padEnd" => Value::from(pad(s, args, false)?),
        "repeat" => {
            let n = num_arg(args, 0);
            if n < 0.0 || n.is_infinite() {
                return Err(EvalError::Range(format!("Invalid count value: {}", format_number(n))));
            }
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n * len as f64 > MAX_STRING_LENGTH as f64 {
                return Err(invalid_length());
            }
            Value::from(s.repeat(n as usize))
        }
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_display());
            }
            if out.len() > MAX_STRING_LENGTH {
                return Err(invalid_length());
            }
            Value::from(out)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn replace(s: &str, pattern: &str, replacement: &Value, count: usize) -> Result<Value, EvalError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    let mut replaced = 0;
    while replaced < count {
        let Some(pos) = rest.find(pattern) else { break };
        out.push_str(&rest[..pos]);
        match replacement {
            Value::Function(f) => out.push_str(&f.call(&[Value::from(pattern)])?.to_display()),
            other => out.push_str(&other.to_display()),
        }
        replaced += 1;
        if pattern.is_empty() {
            // empty pattern matches between every char
            let Some(c) = rest.chars().next() else {
                rest = "";
                break;
            };
            out.push(c);
            rest = &rest[c.len_utf8()..];
            if count == 1 {
                break;
            }
        } else {
            rest = &rest[pos + pattern.len()..];
        }
    }
    out.push_str(rest);
    Ok(Value::from(out))
}

fn array_method(receiver: &Value, items: &Rc<Vec<Value>>, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let len = items.len();
    let call = |f: &Function, item: &Value, index: usize| {
        f.call(&[item.clone(), Value::from(index), receiver.clone()])
    };

    let value = match name {
        "map" => {
            let f = callback(args, name)?;
            let mut out = Vec::with_capacity(len);
            for (i, item) in items.iter().enumerate() {
                out.push(call(&f, item, i)?);
            }
            Value::from(out)
        }
        "filter" => {
            let f = callback(args, name)?;
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if call(&f, item, i)?.is_truthy() {
                    out.push(item.clone());
                }
            }
            Value::from(out)
        }
        "forEach" => {
            let f = callback(args, name)?;
            for (i, item) in items.iter().enumerate() {
                call(&f, item, i)?;
            }
            Value::Undefined
        }
        "find" | "findIndex" => {
            let f = callback(args, name)?;
            let mut found = None;
            for (i, item) in items.iter().enumerate() {
                if call(&f, item, i)?.is_truthy() {
                    found = Some((i, item.clone()));
                    break;
                }
            }
            match (name, found) {
                ("find", found) => found.map(|(_, v)| v).unwrap_or_default(),
                (_, Some((i, _))) => Value::from(i),
                (_, None) => Value::Number(-1.0),
            }
        }
        "some" => {
            let f = callback(args, name)?;
            let mut any = false;
            for (i, item) in items.iter().enumerate() {
                if call(&f, item, i)?.is_truthy() {
                    any = true;
                    break;
                }
            }
            Value::Bool(any)
        }
        "every" => {
            let f = callback(args, name)?;
            let mut all = true;
            for (i, item) in items.iter().enumerate() {
                if !call(&f, item, i)?.is_truthy() {
                    all = false;
                    break;
                }
            }
            Value::Bool(all)
        }
        "reduce" => {
            let f = callback(args, name)?;
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => return Err(EvalError::type_error("Reduce of empty array with no initial value")),
                },
            };
            for (i, item) in iter {
                acc = f.call(&[acc, item.clone(), Value::from(i), receiver.clone()])?;
            }
            acc
        }
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.iter().any(|v| same_value_zero(v, &needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            match items.iter().position(|v| v.strict_eq(&needle)) {
                Some(i) => Value::from(i),
                None => Value::Number(-1.0),
            }
        }
        "join" => {
            let sep = match args.first() {
                Some(v) if !v.is_undefined() => v.to_display(),
                _ => ",".to_string(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect();
            Value::from(parts.join(&sep))
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::array(items.iter().skip(start).take(end.saturating_sub(start)).cloned())
        }
        "concat" => {
            let mut out: Vec<Value> = items.as_ref().clone();
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::from(out)
        }
        "reverse" => Value::array(items.iter().rev().cloned()),
        "at" => {
            let i = num_arg(args, 0).trunc();
            let i = if i < 0.0 { len as f64 + i } else { i };
            if i >= 0.0 && (i as usize) < len { items[i as usize].clone() } else { Value::Undefined }
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}
