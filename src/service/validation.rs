//! Document validation against field descriptors. Values are cast in place where the cast is lossless.

use crate::config::{FieldDescriptor, FieldType, ModelDescriptor};
use crate::error::RestError;
use crate::store::Document;
use serde_json::Value;

pub struct PayloadValidator;

impl PayloadValidator {
    /// Validate a full document: required fields present, every present value castable to its field type.
    pub fn validate(doc: &mut Document, model: &ModelDescriptor) -> Result<(), RestError> {
        for field in &model.fields {
            let missing = match doc.get(&field.path) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                if field.required {
                    return Err(RestError::Validation(format!("{} is required", field.path)));
                }
                continue;
            }
            if let Some(v) = doc.get_mut(&field.path) {
                let cast = cast_field(field, v)?;
                *v = cast;
            }
        }
        Ok(())
    }
}

fn invalid(field: &FieldDescriptor, expected: &str) -> RestError {
    RestError::Validation(format!("{} must be {}", field.path, expected))
}

fn cast_field(field: &FieldDescriptor, v: &Value) -> Result<Value, RestError> {
    match &field.type_ {
        FieldType::String => match v {
            Value::String(_) => Ok(v.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid(field, "a string")),
        },
        FieldType::Number => match v {
            Value::Number(_) => Ok(v.clone()),
            Value::String(s) => {
                if let Ok(n) = s.trim().parse::<i64>() {
                    return Ok(Value::Number(n.into()));
                }
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| invalid(field, "a number"))
            }
            _ => Err(invalid(field, "a number")),
        },
        FieldType::Boolean => match v {
            Value::Bool(_) => Ok(v.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") || s == "1" => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") || s == "0" => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            _ => Err(invalid(field, "a boolean")),
        },
        FieldType::Date => cast_date(v).ok_or_else(|| invalid(field, "a date")),
        FieldType::Object => Ok(v.clone()),
        FieldType::Enum(values) => match v.as_str() {
            Some(s) if values.iter().any(|a| a == s) => Ok(v.clone()),
            _ => Err(RestError::Validation(format!(
                "{} must be one of: {}",
                field.path,
                values.join(", ")
            ))),
        },
        FieldType::Reference(_) => match v {
            Value::String(_) => Ok(v.clone()),
            _ => Err(invalid(field, "a reference id")),
        },
        FieldType::ReferenceArray(_) => match v {
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(v.clone()),
            Value::String(_) => Ok(Value::Array(vec![v.clone()])),
            _ => Err(invalid(field, "a list of reference ids")),
        },
    }
}

/// RFC 3339 timestamps and `YYYY-MM-DD` dates are kept; epoch milliseconds become RFC 3339.
fn cast_date(v: &Value) -> Option<Value> {
    match v {
        Value::String(s) => {
            let ok = chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
            ok.then(|| v.clone())
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|d| Value::String(d.to_rfc3339())),
        _ => None,
    }
}
