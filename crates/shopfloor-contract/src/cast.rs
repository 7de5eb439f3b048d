use serde_json::{Number, Value};

use crate::error::CastError;
use crate::types::FieldType;

/// Cast a raw caller value into `expected`. The input is never modified.
pub fn cast(value: &Value, expected: FieldType) -> Result<Value, CastError> {
    match expected {
        FieldType::Number => cast_number(value),
        FieldType::String => Ok(Value::String(to_text(value))),
        FieldType::Opaque => Ok(value.clone()),
    }
}

/// Textual form of any JSON value. Strings are returned without quotes.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn cast_number(value: &Value) -> Result<Value, CastError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(text) => {
            parse_number(text).ok_or_else(|| CastError::new(FieldType::Number, value))
        }
        _ => Err(CastError::new(FieldType::Number, value)),
    }
}

// A decimal point selects a float parse; anything else must be an integer.
fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.contains('.') {
        let parsed: f64 = text.parse().ok()?;
        return Number::from_f64(parsed).map(Value::Number);
    }
    if let Ok(signed) = text.parse::<i64>() {
        return Some(Value::from(signed));
    }
    text.parse::<u64>().ok().map(Value::from)
}
