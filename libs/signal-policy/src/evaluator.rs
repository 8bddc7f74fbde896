//! Expression Evaluator - three-valued condition evaluation
//!
//! A condition is `true`, `false`, or undetermined. Undetermined is carried
//! as `Err(EvalError)`: the referenced signal is missing or the operands have
//! incompatible types. Connectives resolve undetermined operands the way
//! three-valued logic does:
//!
//! - `and`: any `false` operand wins, else any undetermined wins, else `true`
//! - `or`: any `true` operand wins, else any undetermined wins, else `false`
//!
//! Only a definite top-level `true` fires a rule.

use std::borrow::Cow;
use std::cmp::Ordering;

use tracing::trace;

use crate::error::EvalError;
use crate::expression::{BoolOp, CompareOp, Expression};
use crate::state::StateStore;
use crate::value::Value;

/// Evaluate a condition against the current state
pub fn evaluate(condition: &Expression, state: &StateStore) -> Result<bool, EvalError> {
    truth(condition, state, "condition")
}

/// Truth value of an expression used in boolean position
fn truth(expr: &Expression, state: &StateStore, context: &'static str) -> Result<bool, EvalError> {
    match expr {
        Expression::Comparison { op, left, right } => {
            let left = resolve(left, state)?;
            let right = resolve(right, state)?;
            compare(*op, &left, &right)
        },
        Expression::BoolOp { op, operands } => connective(*op, operands, state),
        Expression::Not(inner) => truth(inner, state, "not").map(|b| !b),
        Expression::Identifier(_) | Expression::Literal(_) => {
            let value = resolve(expr, state)?;
            value.as_bool().ok_or(EvalError::NotBoolean {
                op: context,
                found: value.type_name(),
            })
        },
    }
}

fn connective(op: BoolOp, operands: &[Expression], state: &StateStore) -> Result<bool, EvalError> {
    // The value that decides the connective on its own
    let decisive = op == BoolOp::Or;
    let mut undetermined = None;

    for operand in operands {
        match truth(operand, state, op.as_str()) {
            Ok(b) if b == decisive => {
                trace!("{} short-circuited on {}", op.as_str(), operand);
                return Ok(decisive);
            },
            Ok(_) => {},
            Err(e) => {
                undetermined.get_or_insert(e);
            },
        }
    }

    match undetermined {
        Some(e) => Err(e),
        None => Ok(!decisive),
    }
}

/// Value of an operand
fn resolve<'a>(expr: &'a Expression, state: &'a StateStore) -> Result<Cow<'a, Value>, EvalError> {
    match expr {
        Expression::Identifier(name) => state
            .get(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| EvalError::MissingSignal(name.clone())),
        Expression::Literal(value) => Ok(Cow::Borrowed(value)),
        other => truth(other, state, "condition").map(|b| Cow::Owned(Value::Bool(b))),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.as_str(),
        left: left.type_name(),
        right: right.type_name(),
    };

    // Booleans support equality only
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        return match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(mismatch()),
        };
    }

    let compatible = matches!(
        (left, right),
        (Value::String(_), Value::String(_))
            | (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
    );
    if !compatible {
        return Err(mismatch());
    }

    // NaN orders against nothing: only `!=` holds
    let ordering = left.partial_order(right);
    Ok(match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal),
        CompareOp::Ne => ordering != Some(Ordering::Equal),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    })
}
