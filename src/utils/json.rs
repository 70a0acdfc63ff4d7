use serde_json::Value;

/// A PATCH field that may be absent, explicitly null, or set.
pub enum Nullable<T> {
    Omitted,
    Null,
    Value(T),
}

pub fn nullable_string(optional_value: Option<&Value>) -> Result<Nullable<String>, String> {
    match optional_value {
        None => Ok(Nullable::Omitted),
        Some(Value::Null) => Ok(Nullable::Null),
        Some(Value::String(s)) => Ok(Nullable::Value(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

pub fn nullable_number(optional_value: Option<&Value>) -> Result<Nullable<f64>, String> {
    match optional_value {
        None => Ok(Nullable::Omitted),
        Some(Value::Null) => Ok(Nullable::Null),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Nullable::Value)
            .ok_or_else(|| format!("number {n} is out of range")),
        Some(other) => Err(format!("expected number or null, got {other}")),
    }
}

/// A field that may be omitted but never null.
pub fn optional_string(body: &Value, field: &str) -> Result<Option<String>, String> {
    match nullable_string(body.get(field))? {
        Nullable::Omitted => Ok(None),
        Nullable::Null => Err(format!("{field} cannot be null")),
        Nullable::Value(value) => Ok(Some(value)),
    }
}

pub fn optional_bool(body: &Value, field: &str) -> Result<Option<bool>, String> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::Null) => Err(format!("{field} cannot be null")),
        Some(other) => Err(format!("{field} must be a boolean, got {other}")),
    }
}
