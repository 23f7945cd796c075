//! Assigns a `Category` to a webhook payload by sniffing its shape.
//!
//! The checks run in a fixed order and the first match wins, so a payload that
//! carries both a directive and a price is an `Alert`.

use crate::enums::Category;
use crate::structs::Payload;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Classifies a payload. Total and side-effect free: anything that cannot be
/// read as structured data is `Text`, anything structured but unrecognised is `Unknown`.
pub fn classify(payload: &Payload) -> Category {
    match payload {
        Payload::Text(text) => classify_text(text),
        Payload::Structured(Value::String(text)) => classify_text(text),
        Payload::Structured(value) => classify_value(value),
    }
}

fn classify_text(text: &str) -> Category {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => classify_value(&value),
        Err(_) => Category::Text,
    }
}

fn classify_value(value: &Value) -> Category {
    let Value::Object(fields) = value else {
        return Category::Unknown;
    };

    if is_truthy(fields, "action") {
        Category::Alert
    } else if is_truthy(fields, "symbol") {
        Category::SymbolData
    } else if has_price(fields) {
        Category::PriceUpdate
    } else if is_truthy(fields, "signal") {
        Category::Signal
    } else if is_truthy(fields, "strategy") {
        Category::Strategy
    } else {
        Category::Unknown
    }
}

/// A field counts when present and not `null`, `false`, zero or the empty string.
fn is_truthy(fields: &Map<String, Value>, key: &str) -> bool {
    match fields.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Prices must be numeric: a JSON number or a decimal string, and non-zero.
fn has_price(fields: &Map<String, Value>) -> bool {
    match fields.get("price") {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .is_ok_and(|d| !d.is_zero()),
        _ => false,
    }
}
