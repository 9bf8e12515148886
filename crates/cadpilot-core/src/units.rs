//! Unit conversion to canonical millimeters.
//!
//! Every dimensional parameter in a plan is normalized to mm before
//! execution. Angular units pass through as degrees. Conversion is total:
//! an unknown unit keeps the numeric value and carries a warning instead
//! of failing.

/// The canonical linear unit every dimension is normalized to.
pub const CANONICAL_UNIT: &str = "mm";

/// Result of a unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Value in millimeters (or degrees for angular units).
    pub value_mm: f64,
    /// Set when the unit was not recognized and the value was kept as-is.
    pub warning: Option<String>,
}

/// Multiplier to millimeters for a known unit, or `None`.
///
/// `deg` is a pass-through; `rad` converts to degrees.
pub fn factor(unit: &str) -> Option<f64> {
    match unit {
        "mm" => Some(1.0),
        "cm" => Some(10.0),
        "m" => Some(1000.0),
        "in" => Some(25.4),
        "ft" => Some(304.8),
        "deg" => Some(1.0),
        "rad" => Some(180.0 / std::f64::consts::PI),
        _ => None,
    }
}

/// Whether `unit` is part of the supported unit vocabulary.
pub fn is_known(unit: &str) -> bool {
    factor(unit).is_some()
}

/// Convert `value` in `unit` to millimeters.
///
/// Never fails: an unknown unit is treated as already-mm and reported via
/// [`Conversion::warning`] so the caller can surface it.
pub fn convert(value: f64, unit: &str) -> Conversion {
    match factor(unit) {
        Some(f) => Conversion {
            value_mm: value * f,
            warning: None,
        },
        None => Conversion {
            value_mm: value,
            warning: Some(format!("unknown unit {unit:?}, treating value as mm")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millimeters_are_a_no_op() {
        let c = convert(42.5, "mm");
        assert_eq!(c.value_mm, 42.5);
        assert!(c.warning.is_none());
    }

    #[test]
    fn inches_convert_to_millimeters() {
        let c = convert(2.0, "in");
        assert_eq!(c.value_mm, 50.8);
        assert!(c.warning.is_none());
    }

    #[test]
    fn centimeters_and_meters_scale() {
        assert_eq!(convert(1.5, "cm").value_mm, 15.0);
        assert_eq!(convert(0.25, "m").value_mm, 250.0);
        assert_eq!(convert(1.0, "ft").value_mm, 304.8);
    }

    #[test]
    fn degrees_pass_through() {
        let c = convert(90.0, "deg");
        assert_eq!(c.value_mm, 90.0);
    }

    #[test]
    fn radians_convert_to_degrees() {
        let c = convert(std::f64::consts::PI, "rad");
        assert!((c.value_mm - 180.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_unit_keeps_value_and_warns() {
        let c = convert(7.0, "furlong");
        assert_eq!(c.value_mm, 7.0);
        let warning = c.warning.expect("should warn");
        assert!(warning.contains("furlong"), "warning names the unit: {warning}");
    }

    #[test]
    fn known_unit_vocabulary() {
        for unit in ["mm", "cm", "m", "in", "ft", "deg", "rad"] {
            assert!(is_known(unit), "{unit} should be known");
        }
        assert!(!is_known("yd"));
        assert!(!is_known(""));
    }
}
