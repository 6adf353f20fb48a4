//! Telemetry record model

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// A single reported field value.
///
/// Devices report numbers and short text labels. Anything else (booleans,
/// nulls, nested objects) is kept for display but never satisfies a
/// numeric criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl FieldValue {
    /// Numeric view of the value. Text is never coerced.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::Other(Value::Number(n)),
            },
            Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Other(other),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Latest reported state of one device.
///
/// Immutable once built; a newer record for the same device replaces it
/// wholesale. Serializes flat, with `device_id` next to the reported fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl TelemetryRecord {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The `name` label used for coarse category hints
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(FieldValue::as_text)
    }

    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.field(name)
            .and_then(FieldValue::as_text)
            .unwrap_or(default)
            .to_string()
    }

    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.field(name)
            .and_then(FieldValue::as_number)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from(json!(22)), FieldValue::Number(22.0));
        assert_eq!(FieldValue::from(json!("lobby")), FieldValue::Text("lobby".into()));
        assert_eq!(FieldValue::from(json!(true)), FieldValue::Other(json!(true)));
    }

    #[test]
    fn test_text_is_not_numeric() {
        assert_eq!(FieldValue::from(json!("25")).as_number(), None);
        assert_eq!(FieldValue::Number(25.0).as_text(), None);
    }

    #[test]
    fn test_accessors_fall_back_to_defaults() {
        let record = TelemetryRecord::new("d1")
            .with_field("type", "camera")
            .with_field("message_rate", "fast");

        assert_eq!(record.text_or("type", "unknown"), "camera");
        assert_eq!(record.text_or("location", "unknown"), "unknown");
        assert_eq!(record.number_or("message_rate", 0.0), 0.0);
        assert_eq!(record.name(), None);
    }

    #[test]
    fn test_serializes_flat() {
        let record = TelemetryRecord::new("d1").with_field("temperature", 22.5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "device_id": "d1", "temperature": 22.5 }));
    }
}
