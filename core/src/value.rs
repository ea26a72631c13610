//! Value kinds, literals, and value previews.
//!
//! Validators operate on [`serde_json::Value`]. A missing value (an absent
//! object field) is represented as `None` and plays the role of
//! `undefined`: only [`Literal::Undefined`] and `any` accept it.

use std::fmt;

use serde_json::{Number, Value};

/// Scalar kinds checked by primitive validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Any JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// Anything, including a missing value.
    Any,
}

impl Primitive {
    /// Returns `true` if `value` has this kind.
    pub fn matches(self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Primitive::Any, _) => true,
            (_, None) => false,
            (Primitive::String, Some(v)) => v.is_string(),
            (Primitive::Number, Some(v)) => v.is_number(),
            (Primitive::Integer, Some(Value::Number(n))) => is_integral(n),
            (Primitive::Integer, Some(_)) => false,
            (Primitive::Boolean, Some(v)) => v.is_boolean(),
        }
    }

    /// Kind name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Integer => "integer",
            Primitive::Boolean => "boolean",
            Primitive::Any => "any",
        }
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

/// Container kinds checked by instance validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl Container {
    /// Returns `true` if `value` is this kind of container.
    pub fn matches(self, value: Option<&Value>) -> bool {
        match self {
            Container::Array => matches!(value, Some(Value::Array(_))),
            Container::Object => matches!(value, Some(Value::Object(_))),
        }
    }

    /// Kind name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Container::Array => "array",
            Container::Object => "object",
        }
    }
}

/// A single fixed value for literal and enum validators.
///
/// # Examples
///
/// ```
/// use cito_core::Literal;
/// use serde_json::json;
///
/// assert!(Literal::from("ok").matches(Some(&json!("ok"))));
/// assert!(Literal::from(1).matches(Some(&json!(1.0))));
/// assert!(Literal::Undefined.matches(None));
/// assert!(!Literal::Null.matches(None));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A missing value.
    Undefined,
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
}

impl Literal {
    /// Strict equality against a (possibly missing) value.
    ///
    /// Numbers compare numerically, so `1` equals `1.0`.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Literal::Undefined, None) => true,
            (Literal::Null, Some(Value::Null)) => true,
            (Literal::Bool(a), Some(Value::Bool(b))) => a == b,
            (Literal::Number(a), Some(Value::Number(b))) => numbers_equal(a, b),
            (Literal::String(a), Some(Value::String(b))) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Undefined => f.write_str("undefined"),
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "{}", Value::String(s.clone())),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<Number> for Literal {
    fn from(value: Number) -> Self {
        Literal::Number(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(value.into())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value.into())
    }
}

impl From<u64> for Literal {
    fn from(value: u64) -> Self {
        Literal::Number(value.into())
    }
}

/// Numeric equality across the integer and float representations.
pub(crate) fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Renders a (possibly missing) value for the `got` part of a diagnostic.
///
/// Values are shown as compact JSON, cut after `limit` characters.
pub(crate) fn preview(value: Option<&Value>, limit: usize) -> String {
    let Some(value) = value else {
        return "undefined".to_string();
    };
    let text = value.to_string();
    if text.chars().count() <= limit {
        return text;
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}
