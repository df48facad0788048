//! Text input coercion
//!
//! Property fields hand the editor raw strings. Before a string enters the
//! document it is narrowed to the most specific scalar it spells.

use crate::value::Value;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid integer pattern"));
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("valid float pattern"));
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}([0-9a-fA-F]{2})?$").expect("valid color pattern"));

/// Convert raw field text into a typed value.
///
/// Tried in order: unsigned integer, unsigned decimal, `true`/`false`,
/// verbatim string. Signed numbers and exponents stay strings. Coercion
/// never fails; anything ambiguous falls back to a string.
pub fn coerce(raw: &str) -> Value {
    if INTEGER.is_match(raw) {
        // Too large for i64: keep the digits as typed
        return match raw.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::String(raw.to_string()),
        };
    }

    if FLOAT.is_match(raw) {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }

    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Widget a front end should render for a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Checkbox,
    Color,
    Number,
    Text,
}

impl InputKind {
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => InputKind::Checkbox,
            Value::Int(_) | Value::Float(_) => InputKind::Number,
            Value::String(s) if HEX_COLOR.is_match(s) => InputKind::Color,
            _ => InputKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Checkbox => "checkbox",
            InputKind::Color => "color",
            InputKind::Number => "number",
            InputKind::Text => "text",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
