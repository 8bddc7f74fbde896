//! Signal value model
//!
//! A signal carries one of four scalar types. Raw text (inbound payloads,
//! initial state, emit values from the rule document) is coerced with:
//! - `"x"` / `'x'` → String (quotes stripped)
//! - `true` / `false` → Bool
//! - numeric text with a `.` → Float, without → Int
//! - anything else → the raw text as String

use std::cmp::Ordering;
use std::fmt;

/// Typed signal value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Coerce raw text into a typed value
    pub fn coerce(raw: &str) -> Self {
        let text = raw.trim();

        if let Some(inner) = strip_matching_quotes(text) {
            return Value::String(inner.to_string());
        }

        match text {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {},
        }

        if is_numeric_text(text) {
            if text.contains('.') {
                if let Ok(f) = text.parse::<f64>() {
                    return Value::Float(f);
                }
            } else if let Ok(i) = text.parse::<i64>() {
                return Value::Int(i);
            }
        }

        Value::String(text.to_string())
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view, Int widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Render as a literal that coerces back to the same type
    ///
    /// Strings are double-quoted and floats always carry a decimal point.
    pub fn to_literal(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }

    /// Ordering between two values of compatible types.
    ///
    /// Int and Float compare numerically. Returns `None` for incompatible
    /// types, booleans (which are not ordered), and NaN.
    pub(crate) fn partial_order(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => {
                let text = v.to_string();
                if text.contains('.') || !v.is_finite() {
                    write!(f, "{}", text)
                } else {
                    write!(f, "{}.0", text)
                }
            },
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

fn strip_matching_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    if (first == b'"' || first == b'\'') && first == last {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Optional sign, then digits with at most one `.`, at least one digit
fn is_numeric_text(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_coerce_literal_kinds() {
        assert_eq!(Value::coerce("\"x\""), Value::String("x".to_string()));
        assert_eq!(Value::coerce("'x'"), Value::String("x".to_string()));
        assert_eq!(Value::coerce("true"), Value::Bool(true));
        assert_eq!(Value::coerce("false"), Value::Bool(false));
        assert_eq!(Value::coerce("3"), Value::Int(3));
        assert_eq!(Value::coerce("3.5"), Value::Float(3.5));
    }

    #[test]
    fn test_coerce_fallbacks() {
        // Only the exact lowercase spellings are booleans
        assert_eq!(Value::coerce("True"), Value::String("True".to_string()));
        assert_eq!(Value::coerce("on"), Value::String("on".to_string()));
        assert_eq!(Value::coerce("1.2.3"), Value::String("1.2.3".to_string()));
        assert_eq!(Value::coerce("-7"), Value::Int(-7));
        assert_eq!(Value::coerce("-0.25"), Value::Float(-0.25));
        // Mismatched quotes stay raw
        assert_eq!(Value::coerce("\"x'"), Value::String("\"x'".to_string()));
        assert_eq!(Value::coerce("\"\""), Value::String(String::new()));
        assert_eq!(Value::coerce("  42 "), Value::Int(42));
    }

    #[test]
    fn test_literal_coerces_back_to_same_type() {
        for raw in ["\"x\"", "'x'", "true", "false", "3", "3.5", "\"3\"", "2.0"] {
            let value = Value::coerce(raw);
            let again = Value::coerce(&value.to_literal());
            assert_eq!(value, again, "literal {} did not survive", raw);
        }
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_partial_order() {
        assert_eq!(
            Value::Int(3).partial_order(&Value::Float(3.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Bool(true).partial_order(&Value::Bool(false)), None);
        assert_eq!(Value::Int(1).partial_order(&Value::from("1")), None);
    }
}
