// fun_project_root/fun_core/src/registry.rs
//! Process-wide table of named callables. Bare callable references such as
//! `"reverse"` or `"\\text::upper"` resolve here when a chain is built.

use crate::error::{FunError, FunResult};
use crate::lexer::is_callable_name;
use crate::value::{Callable, Key, Value, ValueMap};
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref REGISTRY: DashMap<String, Callable> = builtins();
}

/// A leading namespace separator is optional: `\reverse` and `reverse` are the same name.
fn canonical(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

pub fn register<F>(name: &str, func: F) -> FunResult<Callable>
where
    F: Fn(&[Value]) -> FunResult<Value> + Send + Sync + 'static,
{
    let callable = Callable::new(canonical(name), func);
    register_callable(name, callable.clone())?;
    Ok(callable)
}

/// Binds `name` to `callable`, replacing any earlier binding. Chains already
/// built keep the callable they resolved at construction time.
pub fn register_callable(name: &str, callable: Callable) -> FunResult<()> {
    if !is_callable_name(name) {
        return Err(FunError::Construction(format!(
            "'{}' is not a valid callable name",
            name
        )));
    }
    debug!(name, "registering callable");
    REGISTRY.insert(canonical(name).to_string(), callable);
    Ok(())
}

pub fn lookup(name: &str) -> Option<Callable> {
    REGISTRY.get(canonical(name)).map(|entry| entry.value().clone())
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.contains_key(canonical(name))
}

// --- Built-ins ---

fn unary(name: &'static str, f: fn(&Value) -> FunResult<Value>) -> (String, Callable) {
    let callable = Callable::new(name, move |args| match args {
        [value] => f(value),
        _ => Err(FunError::Argument(format!(
            "{} expects 1 argument, got {}",
            name,
            args.len()
        ))),
    });
    (name.to_string(), callable)
}

fn expected(name: &str, what: &str, got: &Value) -> FunError {
    FunError::Type(format!("{} expects {}, got {}", name, what, got.type_name()))
}

fn reverse(value: &Value) -> FunResult<Value> {
    match value {
        Value::List(items) => Ok(Value::list(items.iter().rev().cloned().collect())),
        Value::Map(entries) => Ok(Value::Map(Arc::new(
            entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))),
        other => Err(expected("reverse", "a list or map", other)),
    }
}

/// Swaps keys and values; later duplicates win, as with repeated inserts.
fn flip(value: &Value) -> FunResult<Value> {
    let pairs: Vec<(Key, &Value)> = match value {
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (Key::Int(i as i64), v))
            .collect(),
        Value::Map(entries) => entries.iter().map(|(k, v)| (k.clone(), v)).collect(),
        other => return Err(expected("flip", "a list or map", other)),
    };
    let mut flipped = ValueMap::with_capacity(pairs.len());
    for (key, item) in pairs {
        flipped.insert(Key::try_from(item)?, key.to_value());
    }
    Ok(Value::Map(Arc::new(flipped)))
}

fn keys(value: &Value) -> FunResult<Value> {
    match value {
        Value::List(items) => Ok(Value::list((0..items.len() as i64).map(Value::Int).collect())),
        Value::Map(entries) => Ok(Value::list(entries.keys().map(Key::to_value).collect())),
        other => Err(expected("keys", "a list or map", other)),
    }
}

fn values(value: &Value) -> FunResult<Value> {
    match value {
        Value::List(_) => Ok(value.clone()),
        Value::Map(entries) => Ok(Value::list(entries.values().cloned().collect())),
        other => Err(expected("values", "a list or map", other)),
    }
}

fn count(value: &Value) -> FunResult<Value> {
    match value {
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
        Value::Object(obj) => obj.call_method("count", &[]),
        other => Err(expected("count", "a list, map or countable object", other)),
    }
}

fn string_op(name: &'static str, value: &Value, f: fn(&str) -> Value) -> FunResult<Value> {
    value
        .as_str()
        .map(f)
        .ok_or_else(|| expected(name, "a string", value))
}

fn abs(value: &Value) -> FunResult<Value> {
    match value {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| FunError::Type("Integer overflow in abs".to_string())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(expected("abs", "a number", other)),
    }
}

fn builtins() -> DashMap<String, Callable> {
    [
        unary("reverse", reverse),
        unary("flip", flip),
        unary("keys", keys),
        unary("values", values),
        unary("count", count),
        unary("is_list", |v| Ok(Value::Bool(matches!(v, Value::List(_))))),
        unary("is_map", |v| Ok(Value::Bool(matches!(v, Value::Map(_))))),
        unary("is_container", |v| {
            Ok(Value::Bool(matches!(v, Value::List(_) | Value::Map(_))))
        }),
        unary("is_string", |v| Ok(Value::Bool(matches!(v, Value::Str(_))))),
        unary("is_int", |v| Ok(Value::Bool(matches!(v, Value::Int(_))))),
        unary("is_null", |v| Ok(Value::Bool(matches!(v, Value::None)))),
        unary("upper", |v| string_op("upper", v, |s| Value::from(s.to_uppercase()))),
        unary("lower", |v| string_op("lower", v, |s| Value::from(s.to_lowercase()))),
        unary("strlen", |v| {
            string_op("strlen", v, |s| Value::Int(s.chars().count() as i64))
        }),
        unary("abs", abs),
    ]
    .into_iter()
    .collect()
}
