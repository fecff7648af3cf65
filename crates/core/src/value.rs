//! Local value representation and scalar conversions.
//!
//! External data is always `serde_json::Value`. Inside a model, attribute
//! values use [`Value`], which can additionally hold constructed values
//! (dates, decimals) and nested model instances. An attribute whose value
//! is unspecified is represented as `None` at the slot level, never as a
//! `Value` variant.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::model::Model;

type Json = serde_json::Value;

/// Largest integer an `f64` represents exactly; beyond it numbers are emitted as floats.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// A local attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Date(OffsetDateTime),
    Decimal(Decimal),
    /// A schema-conformant instance. Matching this variant is the
    /// conformance check used when embedding one model in another.
    Model(Model),
}

impl Value {
    /// Build an object value from key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Date(_) => "Date",
            Value::Decimal(_) => "Decimal",
            Value::Model(_) => "Model",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when this value is a model instance.
    pub fn is_model(&self) -> bool {
        matches!(self, Value::Model(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&OffsetDateTime> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Value::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut Model> {
        match self {
            Value::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Named member lookup: an object key, or an attribute of a model.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Model(model) => model.get(key),
            _ => None,
        }
    }

    // ── JSON conversion ─────────────────────────

    /// Convert an external JSON value into a local value, structurally.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as external JSON. Nested models are serialized through their
    /// own field mappings.
    pub fn to_json(&self) -> Json {
        self.render(&|model: &Model| model.to_data())
    }

    /// Render as JSON keyed by local attribute names at every level.
    pub fn to_local_json(&self) -> Json {
        self.render(&|model: &Model| model.to_local_json())
    }

    fn render(&self, model_json: &dyn Fn(&Model) -> Json) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(|v| v.render(model_json)).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.render(model_json)))
                    .collect(),
            ),
            Value::Date(d) => d.format(&Rfc3339).map(Json::String).unwrap_or(Json::Null),
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::Model(model) => model_json(model),
        }
    }

    // ── Scalar conversions ──────────────────────

    /// Convert to text, the way the `String` scalar type coerces.
    pub fn coerce_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => other.coerce_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Model(_) => self.to_local_json().to_string(),
            Value::Date(d) => d.format(&Rfc3339).unwrap_or_default(),
            Value::Decimal(d) => d.to_string(),
        }
    }

    /// Convert to a number, the way the `Number` scalar type coerces.
    /// Unparseable input yields NaN.
    pub fn coerce_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_number_text(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => parse_number_text(&single.coerce_text()),
                _ => f64::NAN,
            },
            Value::Object(_) | Value::Model(_) => f64::NAN,
            Value::Date(d) => (d.unix_timestamp_nanos() / 1_000_000) as f64,
            Value::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// Truthiness, the way the `Boolean` scalar type coerces.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_local_json().serialize(serializer)
    }
}

// ──────────────────────────────────────────────
// Conversions into Value
// ──────────────────────────────────────────────

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
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(d: OffsetDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<Model> for Value {
    fn from(m: Model) -> Self {
        Value::Model(m)
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        Value::from_json(json)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(&json)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

// ──────────────────────────────────────────────
// Number helpers
// ──────────────────────────────────────────────

fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

/// Format a number the way text coercion renders it: integral values
/// without a fractional part, non-finite values by name.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if (1e-6..1e21).contains(&n.abs()) {
        format!("{}", n)
    } else {
        // Exponent form carries an explicit sign: 1e+21, 1e-7.
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    }
}

/// Parse numeric text: blank is zero, radix prefixes are honoured,
/// anything else unparseable is NaN.
pub(crate) fn parse_number_text(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    let lowered = s.to_ascii_lowercase();
    if lowered.contains("inf") || lowered.contains("nan") {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}
