//! Built-in host functions.
//!
//! Formulas delegate their actual computation to a host function. The
//! embedding application normally supplies these; this table covers the
//! arithmetic and text helpers used by the CLI and the tests.

use std::sync::Arc;

use crate::error::HostError;
use crate::value::{Value, ValueRef};

/// Host computation behind a formula.
pub type HostFn = Arc<dyn Fn(&[ValueRef]) -> Result<Value, HostError>>;

/// Names accepted by [`builtin`].
pub const BUILTINS: &[&str] = &["sum", "product", "min", "max", "neg", "copy", "concat"];

/// Look up a built-in host function by name.
pub fn builtin(name: &str) -> Option<HostFn> {
    let f = match name {
        "sum" => host(|args| fold_numbers(args, 0.0, |a, b| a + b)),
        "product" => host(|args| fold_numbers(args, 1.0, |a, b| a * b)),
        "min" => host(|args| {
            non_empty(args)?;
            fold_numbers(args, f64::INFINITY, f64::min)
        }),
        "max" => host(|args| {
            non_empty(args)?;
            fold_numbers(args, f64::NEG_INFINITY, f64::max)
        }),
        "neg" => host(|args| match args {
            [arg] => Ok(Value::Float(-number(arg)?)),
            _ => Err(arity("neg", 1, args.len())),
        }),
        "copy" => host(|args| match args {
            [arg] => Ok((**arg).clone()),
            _ => Err(arity("copy", 1, args.len())),
        }),
        "concat" => host(|args| {
            let text: String = args.iter().map(|v| v.to_string()).collect();
            Ok(Value::text(text))
        }),
        _ => return None,
    };
    Some(f)
}

/// Wrap a closure as a [`HostFn`].
pub fn host(f: impl Fn(&[ValueRef]) -> Result<Value, HostError> + 'static) -> HostFn {
    Arc::new(f)
}

fn number(value: &Value) -> Result<f64, HostError> {
    value
        .as_f64()
        .ok_or_else(|| HostError::new(format!("expected a number, got {}", value.type_name())))
}

fn non_empty(args: &[ValueRef]) -> Result<(), HostError> {
    if args.is_empty() {
        return Err(HostError::new("expected at least one argument"));
    }
    Ok(())
}

fn fold_numbers(
    args: &[ValueRef],
    init: f64,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, HostError> {
    let mut acc = init;
    for arg in args {
        acc = f(acc, number(arg)?);
    }
    Ok(Value::Float(acc))
}

fn arity(name: &str, expected: usize, got: usize) -> HostError {
    HostError::new(format!("{name} takes {expected} argument(s), got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, HostError> {
        let args: Vec<ValueRef> = args.iter().cloned().map(Value::into_ref).collect();
        builtin(name).unwrap()(args.as_slice())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(call("sum", &[Value::Int(1), Value::Float(2.5)]), Ok(Value::Float(3.5)));
        assert_eq!(call("product", &[Value::Int(3), Value::Int(4)]), Ok(Value::Float(12.0)));
        assert_eq!(call("min", &[Value::Int(3), Value::Int(-4)]), Ok(Value::Float(-4.0)));
        assert_eq!(call("max", &[Value::Int(3), Value::Int(-4)]), Ok(Value::Float(3.0)));
        assert_eq!(call("neg", &[Value::Float(2.0)]), Ok(Value::Float(-2.0)));
        assert_eq!(call("sum", &[]), Ok(Value::Float(0.0)));
    }

    #[test]
    fn type_and_arity_errors() {
        assert!(call("sum", &[Value::text("a")]).is_err());
        assert!(call("neg", &[]).is_err());
        assert!(call("min", &[]).is_err());
    }

    #[test]
    fn text_helpers() {
        assert_eq!(call("copy", &[Value::text("a")]), Ok(Value::text("a")));
        assert_eq!(call("concat", &[Value::text("a"), Value::Int(1)]), Ok(Value::text("a1")));
    }

    #[test]
    fn unknown_builtin() {
        assert!(builtin("sqrt").is_none());
        for name in BUILTINS {
            assert!(builtin(name).is_some());
        }
    }
}
