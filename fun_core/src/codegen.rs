// fun_project_root/fun_core/src/codegen.rs
//! Turns expression source over `$_` into a one-argument [`Callable`].

use crate::ast::{BinaryOp, Expression};
use crate::container;
use crate::error::{FunError, FunResult};
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::value::{Callable, Key, Value};
use std::cmp::Ordering;
use std::sync::Arc;

pub fn parse_expression(source: &str) -> FunResult<Expression> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens).parse()
}

/// Compiles `source` into a callable that binds its (last) argument to `$_`.
pub fn compile(source: &str) -> FunResult<Callable> {
    let expr = Arc::new(parse_expression(source)?);
    Ok(Callable::new(source, move |args| {
        let placeholder = args.last().cloned().unwrap_or(Value::None);
        evaluate(&expr, &placeholder)
    }))
}

pub fn evaluate(expr: &Expression, placeholder: &Value) -> FunResult<Value> {
    match expr {
        Expression::Placeholder => Ok(placeholder.clone()),
        Expression::Int(i) => Ok(Value::Int(*i)),
        Expression::Float(n) => Ok(Value::Float(*n)),
        Expression::String(s) => Ok(Value::Str(s.clone())),
        Expression::Boolean(b) => Ok(Value::Bool(*b)),
        Expression::Null => Ok(Value::None),
        Expression::Negate(inner) => match evaluate(inner, placeholder)? {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| overflow("negation")),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(FunError::Type(format!(
                "Cannot negate {}",
                other.type_name()
            ))),
        },
        Expression::Binary(node) => {
            let left = evaluate(&node.left, placeholder)?;
            let right = evaluate(&node.right, placeholder)?;
            binary(node.op, left, right)
        }
        Expression::Index(node) => {
            let target = evaluate(&node.target, placeholder)?;
            let key = Key::try_from(&evaluate(&node.key, placeholder)?)?;
            container::get_key(&target, &key)
        }
    }
}

fn overflow(what: &str) -> FunError {
    FunError::Type(format!("Integer overflow in {}", what))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

/// Equality that treats `1` and `1.0` alike; everything else is structural.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_f64(left) == as_f64(right)
        }
        _ => left == right,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> FunResult<Ordering> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => l
                .partial_cmp(&r)
                .ok_or_else(|| FunError::Type("Cannot order NaN".to_string())),
            _ => Err(FunError::Type(format!(
                "Cannot compare {} and {} with {:?}",
                left.type_name(),
                right.type_name(),
                op
            ))),
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> FunResult<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(loose_eq(&left, &right))),
        BinaryOp::NotEq => return Ok(Value::Bool(!loose_eq(&left, &right))),
        BinaryOp::Lt => return Ok(Value::Bool(compare(op, &left, &right)?.is_lt())),
        BinaryOp::Gt => return Ok(Value::Bool(compare(op, &left, &right)?.is_gt())),
        BinaryOp::LtEq => return Ok(Value::Bool(compare(op, &left, &right)?.is_le())),
        BinaryOp::GtEq => return Ok(Value::Bool(compare(op, &left, &right)?.is_ge())),
        _ => {}
    }

    match (&left, &right) {
        (Value::Int(l), Value::Int(r)) => {
            let (l, r) = (*l, *r);
            let result = match op {
                BinaryOp::Add => l.checked_add(r).ok_or_else(|| overflow("addition"))?,
                BinaryOp::Sub => l.checked_sub(r).ok_or_else(|| overflow("subtraction"))?,
                BinaryOp::Mul => l.checked_mul(r).ok_or_else(|| overflow("multiplication"))?,
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(FunError::Type("Division by zero".to_string()));
                    }
                    match l.checked_rem(r) {
                        Some(0) => l.checked_div(r).ok_or_else(|| overflow("division"))?,
                        Some(_) => return Ok(Value::Float(l as f64 / r as f64)),
                        None => return Err(overflow("division")),
                    }
                }
                BinaryOp::Modulo => {
                    if r == 0 {
                        return Err(FunError::Type("Modulo by zero".to_string()));
                    }
                    l.checked_rem(r).ok_or_else(|| overflow("modulo"))?
                }
                _ => unreachable!("comparisons are handled above"),
            };
            Ok(Value::Int(result))
        }
        (Value::Str(l), Value::Str(r)) if op == BinaryOp::Add => {
            Ok(Value::Str(Arc::from(format!("{}{}", l, r))))
        }
        _ => match (as_f64(&left), as_f64(&right)) {
            (Some(l), Some(r)) if op != BinaryOp::Modulo => {
                let result = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => {
                        if r == 0.0 {
                            return Err(FunError::Type("Division by zero".to_string()));
                        }
                        l / r
                    }
                    _ => unreachable!("comparisons and modulo are handled above"),
                };
                Ok(Value::Float(result))
            }
            _ => Err(FunError::Type(format!(
                "Cannot apply {:?} to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}
