//! Dimension parameter handling.
//!
//! Plan parameters arrive in two dimension shapes: a bare number
//! (implicitly mm) or a `{value, unit}` object. After sanitization the
//! object form is rewritten to canonical millimeters while preserving the
//! original value and unit for audit display. 3-D `{x, y, z}` values are
//! not dimensions and pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::units;

/// Errors from dimension extraction.
#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("invalid dimension format: {0}")]
    InvalidShape(Value),
}

/// A dimensional parameter value as authored by the plan generator.
///
/// Deserialized untagged: a bare number is implicitly millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Bare number, already in mm.
    Scalar(f64),
    /// Explicit value/unit pair.
    Measured {
        value: f64,
        #[serde(default = "default_unit")]
        unit: String,
    },
}

fn default_unit() -> String {
    units::CANONICAL_UNIT.to_string()
}

impl Dimension {
    /// The numeric value, ignoring the unit.
    pub fn raw_value(&self) -> f64 {
        match self {
            Dimension::Scalar(v) => *v,
            Dimension::Measured { value, .. } => *value,
        }
    }
}

/// Extract the numeric value from a dimension-shaped JSON value.
///
/// Accepts a bare number or an object with a numeric `value` field; the
/// unit is deliberately ignored (conversion is a separate, earlier step).
/// Anything else is a hard error that aborts sanitization of the
/// enclosing operation only.
pub fn extract(value: &Value) -> Result<f64, DimensionError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DimensionError::InvalidShape(value.clone())),
        Value::Object(map) => match map.get("value").and_then(Value::as_f64) {
            Some(v) => Ok(v),
            None => Err(DimensionError::InvalidShape(value.clone())),
        },
        _ => Err(DimensionError::InvalidShape(value.clone())),
    }
}

/// Whether a JSON value is a 3-D point/vector (`{x, y, z}` object).
pub fn is_point(value: &Value) -> bool {
    match value {
        Value::Object(map) => ["x", "y", "z"].iter().all(|k| map.contains_key(*k)),
        _ => false,
    }
}

/// Whether a JSON value has the explicit `{value, unit}` dimension shape.
pub fn is_measured(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("value") && map.contains_key("unit"),
        _ => false,
    }
}

/// Rewrite a `{value, unit}` object to the canonical mm form, preserving
/// the original for audit:
/// `{value: <mm>, unit: "mm", original_value, original_unit}`.
///
/// Returns a warning message when the unit was unknown (value kept as-is).
/// Non-measured values are returned unchanged.
pub fn convert_to_canonical(value: &Value) -> (Value, Option<String>) {
    let Value::Object(map) = value else {
        return (value.clone(), None);
    };
    let Some(raw) = map.get("value").and_then(Value::as_f64) else {
        return (value.clone(), None);
    };
    let unit = map
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or(units::CANONICAL_UNIT)
        .to_string();

    let conversion = units::convert(raw, &unit);
    let effective_unit = if conversion.warning.is_some() {
        units::CANONICAL_UNIT.to_string()
    } else {
        unit
    };

    let mut out = Map::new();
    out.insert("value".into(), json_number(conversion.value_mm));
    out.insert("unit".into(), Value::String(units::CANONICAL_UNIT.into()));
    out.insert("original_value".into(), json_number(raw));
    out.insert("original_unit".into(), Value::String(effective_unit));
    (Value::Object(out), conversion.warning)
}

fn json_number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_bare_number() {
        assert_eq!(extract(&json!(12.5)).unwrap(), 12.5);
        assert_eq!(extract(&json!(3)).unwrap(), 3.0);
    }

    #[test]
    fn extract_measured_object_ignores_unit() {
        assert_eq!(extract(&json!({"value": 2.0, "unit": "in"})).unwrap(), 2.0);
    }

    #[test]
    fn extract_rejects_other_shapes() {
        for bad in [json!("5mm"), json!(null), json!([1, 2]), json!({"width": 3})] {
            let err = extract(&bad).unwrap_err();
            assert!(matches!(err, DimensionError::InvalidShape(_)), "got: {err}");
        }
    }

    #[test]
    fn dimension_deserializes_both_shapes() {
        let scalar: Dimension = serde_json::from_value(json!(5.0)).unwrap();
        assert_eq!(scalar.raw_value(), 5.0);

        let measured: Dimension = serde_json::from_value(json!({"value": 2, "unit": "in"})).unwrap();
        assert_eq!(measured.raw_value(), 2.0);

        let defaulted: Dimension = serde_json::from_value(json!({"value": 7})).unwrap();
        assert!(matches!(defaulted, Dimension::Measured { ref unit, .. } if unit == "mm"));
    }

    #[test]
    fn point_detection() {
        assert!(is_point(&json!({"x": 0, "y": 1, "z": 2})));
        assert!(!is_point(&json!({"x": 0, "y": 1})));
        assert!(!is_point(&json!(5)));
    }

    #[test]
    fn canonical_conversion_preserves_original() {
        let (out, warning) = convert_to_canonical(&json!({"value": 2, "unit": "in"}));
        assert!(warning.is_none());
        assert_eq!(
            out,
            json!({"value": 50.8, "unit": "mm", "original_value": 2.0, "original_unit": "in"})
        );
    }

    #[test]
    fn canonical_conversion_of_mm_is_numeric_no_op() {
        let (out, _) = convert_to_canonical(&json!({"value": 9.5, "unit": "mm"}));
        assert_eq!(out["value"], json!(9.5));
        assert_eq!(out["original_unit"], json!("mm"));
    }

    #[test]
    fn canonical_conversion_unknown_unit_warns_and_keeps_value() {
        let (out, warning) = convert_to_canonical(&json!({"value": 4, "unit": "parsec"}));
        assert!(warning.unwrap().contains("parsec"));
        assert_eq!(out["value"], json!(4.0));
        // The original unit is coerced to mm, matching the no-silent-change rule.
        assert_eq!(out["original_unit"], json!("mm"));
    }
}
