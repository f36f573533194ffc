//! The standard native procedures seeded into the global environment.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::evaluator::{EvalError, EvalResult};
use crate::types::{NativeFn, NativeProcedure, Value};

// Checks the number of arguments
macro_rules! check_arity {
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::arity(format!(
                "Primitive '{}' expects at least {} arguments, got {}",
                $name,
                $expected,
                $args.len()
            )));
        }
    };
    ($args:expr, $expected:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::arity(format!(
                "Primitive '{}' expects exactly {} arguments, got {}",
                $name,
                $expected,
                $args.len()
            )));
        }
    };
}

/// The name/procedure table for [`crate::Environment::new_global`].
pub fn standard_procedures() -> Vec<(&'static str, NativeProcedure)> {
    let table: [(&'static str, NativeFn); 23] = [
        ("+", prim_add),
        ("-", prim_sub),
        ("*", prim_mul),
        ("/", prim_div),
        (">", prim_greater_than),
        ("<", prim_less_than),
        (">=", prim_greater_than_or_equals),
        ("<=", prim_less_than_or_equals),
        ("=", prim_equal),
        ("equal?", prim_equal),
        ("eq?", prim_eq),
        ("not", prim_not),
        ("length", prim_length),
        ("cons", prim_cons),
        ("car", prim_car),
        ("cdr", prim_cdr),
        ("append", prim_append),
        ("list", prim_list),
        ("list?", prim_is_list),
        ("null?", prim_is_null),
        ("symbol?", prim_is_symbol),
        ("number?", prim_is_number),
        ("procedure?", prim_is_procedure),
    ];
    table
        .into_iter()
        .map(|(name, func)| (name, NativeProcedure::new(name, func)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Integer(n) => Value::Integer(n),
            Number::Float(n) => Value::Float(n),
        }
    }
}

fn expect_number(value: &Value, name: &str, position: usize) -> EvalResult<Number> {
    match value {
        Value::Integer(n) => Ok(Number::Integer(*n)),
        Value::Float(n) => Ok(Number::Float(*n)),
        other => Err(EvalError::type_error(format!(
            "Primitive '{}' expects a number for argument {}, got {}",
            name,
            position,
            other.type_name()
        ))),
    }
}

fn expect_list<'a>(value: &'a Value, name: &str, position: usize) -> EvalResult<&'a [Value]> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(EvalError::type_error(format!(
            "Primitive '{}' expects a list for argument {}, got {}",
            name,
            position,
            other.type_name()
        ))),
    }
}

// Integers stay integers unless one side is a float.
fn combine(
    left: Number,
    right: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    name: &str,
) -> EvalResult<Number> {
    match (left, right) {
        (Number::Integer(a), Number::Integer(b)) => int_op(a, b)
            .map(Number::Integer)
            .ok_or_else(|| EvalError::arithmetic(format!("integer overflow in '{}'", name))),
        _ => Ok(Number::Float(float_op(left.as_f64(), right.as_f64()))),
    }
}

fn fold_numbers(
    args: &[Value],
    start: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    name: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, arg) in args.iter().enumerate() {
        acc = combine(acc, expect_number(arg, name, i + 1)?, int_op, float_op, name)?;
    }
    Ok(acc.into_value())
}

pub fn prim_add(args: &[Value]) -> EvalResult {
    // (+) -> 0
    fold_numbers(args, Number::Integer(0), i64::checked_add, |a, b| a + b, "+")
}

pub fn prim_mul(args: &[Value]) -> EvalResult {
    // (*) -> 1
    fold_numbers(args, Number::Integer(1), i64::checked_mul, |a, b| a * b, "*")
}

pub fn prim_sub(args: &[Value]) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    check_arity!(args, min 1, "-");
    let first = expect_number(&args[0], "-", 1)?;
    if args.len() == 1 {
        return Ok(combine(Number::Integer(0), first, i64::checked_sub, |a, b| a - b, "-")?
            .into_value());
    }
    fold_numbers(&args[1..], first, i64::checked_sub, |a, b| a - b, "-")
}

pub fn prim_div(args: &[Value]) -> EvalResult {
    // (/ x) -> 1/x
    // (/ x y z) -> x / y / z, always a float
    check_arity!(args, min 1, "/");
    let (mut result, rest) = if args.len() == 1 {
        (1.0, args)
    } else {
        (expect_number(&args[0], "/", 1)?.as_f64(), &args[1..])
    };
    let offset = args.len() - rest.len();
    for (i, arg) in rest.iter().enumerate() {
        let divisor = expect_number(arg, "/", i + 1 + offset)?.as_f64();
        if divisor == 0.0 {
            return Err(EvalError::arithmetic("division by zero"));
        }
        result /= divisor;
    }
    Ok(Value::Float(result))
}

fn compare_numbers(args: &[Value], accept: fn(Ordering) -> bool, name: &str) -> EvalResult {
    check_arity!(args, min 2, name);
    let mut last = expect_number(&args[0], name, 1)?;
    let mut result = true;
    for (i, arg) in args.iter().enumerate().skip(1) {
        let current = expect_number(arg, name, i + 1)?;
        // Integer pairs compare exactly; NaN compares as false.
        let ordering = match (last, current) {
            (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(&b)),
            _ => last.as_f64().partial_cmp(&current.as_f64()),
        };
        result = result && ordering.is_some_and(accept);
        last = current;
    }
    Ok(Value::from_bool(result))
}

pub fn prim_greater_than(args: &[Value]) -> EvalResult {
    compare_numbers(args, Ordering::is_gt, ">")
}

pub fn prim_less_than(args: &[Value]) -> EvalResult {
    compare_numbers(args, Ordering::is_lt, "<")
}

pub fn prim_greater_than_or_equals(args: &[Value]) -> EvalResult {
    compare_numbers(args, Ordering::is_ge, ">=")
}

pub fn prim_less_than_or_equals(args: &[Value]) -> EvalResult {
    compare_numbers(args, Ordering::is_le, "<=")
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            *a as f64 == *b
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

pub fn prim_equal(args: &[Value]) -> EvalResult {
    check_arity!(args, 2, "equal?");
    Ok(Value::from_bool(values_equal(&args[0], &args[1])))
}

pub fn prim_eq(args: &[Value]) -> EvalResult {
    check_arity!(args, 2, "eq?");
    let same = match (&args[0], &args[1]) {
        (Value::List(a), Value::List(b)) => a.is_empty() && b.is_empty(),
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (left, right) => left == right,
    };
    Ok(Value::from_bool(same))
}

pub fn prim_not(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "not");
    Ok(Value::from_bool(!args[0].is_truthy()))
}

pub fn prim_length(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "length");
    let items = expect_list(&args[0], "length", 1)?;
    i64::try_from(items.len())
        .map(Value::Integer)
        .map_err(|_| EvalError::arithmetic("list length overflows an integer"))
}

pub fn prim_cons(args: &[Value]) -> EvalResult {
    check_arity!(args, 2, "cons");
    let tail = expect_list(&args[1], "cons", 2)?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend_from_slice(tail);
    Ok(Value::List(items))
}

pub fn prim_car(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "car");
    match expect_list(&args[0], "car", 1)?.first() {
        Some(first) => Ok(first.clone()),
        None => Err(EvalError::type_error(
            "Primitive 'car' expects a non-empty list",
        )),
    }
}

pub fn prim_cdr(args: &[Value]) -> EvalResult {
    // (cdr '()) -> ()
    check_arity!(args, 1, "cdr");
    let items = expect_list(&args[0], "cdr", 1)?;
    Ok(Value::List(items.iter().skip(1).cloned().collect()))
}

pub fn prim_append(args: &[Value]) -> EvalResult {
    let mut result = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        result.extend_from_slice(expect_list(arg, "append", i + 1)?);
    }
    Ok(Value::List(result))
}

pub fn prim_list(args: &[Value]) -> EvalResult {
    Ok(Value::List(args.to_vec()))
}

pub fn prim_is_list(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "list?");
    Ok(Value::from_bool(matches!(args[0], Value::List(_))))
}

pub fn prim_is_null(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "null?");
    Ok(Value::from_bool(
        matches!(&args[0], Value::List(items) if items.is_empty()),
    ))
}

pub fn prim_is_symbol(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "symbol?");
    Ok(Value::from_bool(matches!(args[0], Value::Symbol(_))))
}

pub fn prim_is_number(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "number?");
    Ok(Value::from_bool(matches!(
        args[0],
        Value::Integer(_) | Value::Float(_)
    )))
}

pub fn prim_is_procedure(args: &[Value]) -> EvalResult {
    check_arity!(args, 1, "procedure?");
    Ok(Value::from_bool(args[0].is_procedure()))
}
