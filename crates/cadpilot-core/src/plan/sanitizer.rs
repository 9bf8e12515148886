//! Plan sanitizer: validates and rewrites an untrusted plan document
//! into a safe, normalized plan.
//!
//! The pipeline runs in a fixed stage order over two message buckets
//! (errors and warnings):
//!
//! 1. Structural check (hard failure, short-circuits everything else).
//! 2. Metadata normalization.
//! 3. Per-operation sanitization, in original order.
//! 4. Dependency existence check (no cycle detection; see DESIGN.md).
//! 5. Geometric feasibility heuristics.
//! 6. Manufacturing constraint checks against the machine profile.
//! 7. Safety advisories.
//!
//! Only errors drive `is_valid = false`; warnings are advisory unless
//! strict mode is set. The sanitizer never returns `Err` or panics for
//! malformed input; every failure becomes a message in the outcome.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::dimension;
use crate::profile::MachineProfile;
use crate::settings::PlanLimits;
use crate::units;

use super::types::{
    is_expected_target_ref, is_valid_op_id, OpKind, Operation, Plan, PlanMetadata,
};

/// Gross structural malformation; aborts sanitization immediately and is
/// converted into a single-message failure outcome.
#[derive(Debug, Error)]
pub enum PlanStructureError {
    #[error("plan must be a JSON object")]
    NotAnObject,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("plan_id must be a string")]
    PlanIdNotAString,
    #[error("metadata must be an object")]
    MetadataNotAnObject,
    #[error("operations must be a list")]
    OperationsNotAList,
    #[error("plan must contain at least one operation")]
    NoOperations,
    #[error("plan exceeds maximum operations limit: {0}")]
    TooManyOperations(usize),
}

/// Result of sanitizing one plan document.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizeOutcome {
    /// Whether the plan may be executed. Errors always fail a plan; in
    /// strict mode warnings do too.
    pub is_valid: bool,
    /// The sanitized plan. `None` only when the input was structurally
    /// malformed beyond repair (the caller still holds its input).
    pub plan: Option<Plan>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SanitizeOutcome {
    /// All messages in pipeline order: errors first, then warnings.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .map(String::as_str)
    }
}

/// Message buckets accumulated over one sanitization run.
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Plan validation and normalization engine.
///
/// Holds the machine profile and limits explicitly; construct one per
/// configuration rather than sharing mutable state.
#[derive(Debug, Clone, Default)]
pub struct PlanSanitizer {
    profile: MachineProfile,
    limits: PlanLimits,
}

impl PlanSanitizer {
    pub fn new(profile: MachineProfile, limits: PlanLimits) -> Self {
        Self { profile, limits }
    }

    pub fn profile(&self) -> &MachineProfile {
        &self.profile
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    /// Validate and normalize an untrusted plan document.
    ///
    /// Never fails across this boundary: structural malformation yields a
    /// single-error outcome with `plan = None`; everything else yields a
    /// sanitized plan plus accumulated messages.
    pub fn sanitize(&self, raw: &Value, strict: bool) -> SanitizeOutcome {
        let plan_id = raw
            .get("plan_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(plan_id, strict, "starting plan sanitization");

        let mut findings = Findings::default();

        let root = match self.check_structure(raw) {
            Ok(root) => root,
            Err(e) => {
                info!(plan_id, error = %e, "plan rejected: structural malformation");
                return SanitizeOutcome {
                    is_valid: false,
                    plan: None,
                    errors: vec![e.to_string()],
                    warnings: vec![],
                };
            }
        };

        let metadata = self.sanitize_metadata(root, &mut findings);

        let raw_ops = root["operations"].as_array().expect("checked structurally");
        let mut operations = Vec::with_capacity(raw_ops.len());
        for (index, raw_op) in raw_ops.iter().enumerate() {
            match self.sanitize_operation(raw_op, index, &mut findings) {
                Ok(op) => operations.push(op),
                Err(msg) => findings.error(msg),
            }
        }

        self.check_dependencies(&operations, &mut findings);
        self.check_feasibility(&operations, &mut findings);
        self.check_manufacturing(&operations, &mut findings);
        self.check_safety(&metadata, &operations, &mut findings);

        let is_valid =
            findings.errors.is_empty() && (!strict || findings.warnings.is_empty());

        info!(
            plan_id,
            errors = findings.errors.len(),
            warnings = findings.warnings.len(),
            is_valid,
            "sanitization complete"
        );

        SanitizeOutcome {
            is_valid,
            plan: Some(Plan {
                plan_id: root["plan_id"].as_str().unwrap_or_default().to_string(),
                metadata,
                operations,
            }),
            errors: findings.errors,
            warnings: findings.warnings,
        }
    }

    // -- stage 1: structure ------------------------------------------------

    fn check_structure<'a>(
        &self,
        raw: &'a Value,
    ) -> Result<&'a Map<String, Value>, PlanStructureError> {
        let root = raw.as_object().ok_or(PlanStructureError::NotAnObject)?;

        for field in ["plan_id", "metadata", "operations"] {
            if !root.contains_key(field) {
                return Err(PlanStructureError::MissingField(field));
            }
        }
        if !root["plan_id"].is_string() {
            return Err(PlanStructureError::PlanIdNotAString);
        }
        if !root["metadata"].is_object() {
            return Err(PlanStructureError::MetadataNotAnObject);
        }
        let ops = root["operations"]
            .as_array()
            .ok_or(PlanStructureError::OperationsNotAList)?;
        if ops.is_empty() {
            return Err(PlanStructureError::NoOperations);
        }
        if ops.len() > self.limits.max_operations {
            return Err(PlanStructureError::TooManyOperations(
                self.limits.max_operations,
            ));
        }
        Ok(root)
    }

    // -- stage 2: metadata -------------------------------------------------

    fn sanitize_metadata(
        &self,
        root: &Map<String, Value>,
        findings: &mut Findings,
    ) -> PlanMetadata {
        let meta = root["metadata"].as_object().expect("checked structurally");

        let created_at = meta
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let units = match meta.get("units").and_then(Value::as_str) {
            None => self.limits.default_units.clone(),
            Some(u) if units::is_known(u) => u.to_string(),
            Some(u) => {
                findings.warning(format!("unknown unit {u:?}, defaulting to mm"));
                units::CANONICAL_UNIT.to_string()
            }
        };

        let confidence_score = match meta.get("confidence_score") {
            None => None,
            Some(v) => match v.as_f64() {
                Some(score) if (0.0..=1.0).contains(&score) => Some(score),
                Some(score) => {
                    findings.warning(format!(
                        "invalid confidence score {score}, clamping to [0,1]"
                    ));
                    Some(score.clamp(0.0, 1.0))
                }
                None => {
                    findings.warning(format!("non-numeric confidence score {v}, ignoring"));
                    None
                }
            },
        };

        let natural_language_prompt = meta
            .get("natural_language_prompt")
            .and_then(Value::as_str)
            .map(|prompt| {
                if prompt.chars().count() > self.limits.max_prompt_chars {
                    findings.warning(format!(
                        "prompt truncated to {} characters",
                        self.limits.max_prompt_chars
                    ));
                    prompt.chars().take(self.limits.max_prompt_chars).collect()
                } else {
                    prompt.to_string()
                }
            });

        let estimated_duration_seconds = meta
            .get("estimated_duration_seconds")
            .and_then(Value::as_f64);

        PlanMetadata {
            created_at: Some(created_at),
            units: Some(units),
            confidence_score,
            natural_language_prompt,
            estimated_duration_seconds,
        }
    }

    // -- stage 3: per-operation --------------------------------------------

    /// Sanitize one operation. `Err` carries the error message and drops
    /// the operation from the sanitized output.
    fn sanitize_operation(
        &self,
        raw: &Value,
        index: usize,
        findings: &mut Findings,
    ) -> Result<Operation, String> {
        let op = raw
            .as_object()
            .ok_or_else(|| format!("operation {index}: not an object"))?;

        for field in ["op_id", "op", "params"] {
            if !op.contains_key(field) {
                return Err(format!("operation {index}: missing required field: {field}"));
            }
        }

        let op_id = op["op_id"]
            .as_str()
            .ok_or_else(|| format!("operation {index}: op_id must be a string"))?
            .to_string();
        if !is_valid_op_id(&op_id) {
            return Err(format!("operation {index}: invalid op_id format: {op_id}"));
        }

        let tag = op["op"]
            .as_str()
            .ok_or_else(|| format!("operation {op_id}: op must be a string"))?;
        let kind: OpKind = tag
            .parse()
            .map_err(|_| format!("operation {op_id}: unknown operation type: {tag}"))?;

        let params = op["params"]
            .as_object()
            .ok_or_else(|| format!("operation {op_id}: params must be an object"))?;

        debug!(%op_id, op = tag, "sanitizing operation");

        self.check_operation_params(&op_id, kind, params, findings)
            .map_err(|msg| format!("operation {op_id}: {msg}"))?;

        let params = self.convert_params(&op_id, params, findings);

        let target_ref = match op.get("target_ref") {
            None | Some(Value::Null) => None,
            Some(Value::String(target)) => {
                if !is_expected_target_ref(target) {
                    findings.warning(format!(
                        "operation {op_id}: unusual target reference format: {target}"
                    ));
                }
                Some(target.clone())
            }
            Some(other) => {
                findings.warning(format!(
                    "operation {op_id}: target_ref is not a string ({other}), ignoring"
                ));
                None
            }
        };

        let dependencies = match op.get("dependencies") {
            None | Some(Value::Null) => vec![],
            Some(Value::Array(deps)) => {
                let mut out = Vec::with_capacity(deps.len());
                for dep in deps {
                    match dep.as_str() {
                        Some(id) => out.push(id.to_string()),
                        None => findings
                            .error(format!("operation {op_id}: dependency ids must be strings")),
                    }
                }
                out
            }
            Some(_) => {
                findings.error(format!("operation {op_id}: dependencies must be a list"));
                vec![]
            }
        };

        Ok(Operation {
            op_id,
            op: tag.to_string(),
            params,
            target_ref,
            dependencies,
        })
    }

    /// Operation-type-specific parameter rules. `Err` is an error-level
    /// violation that drops the operation; advisories go to `findings`.
    fn check_operation_params(
        &self,
        op_id: &str,
        kind: OpKind,
        params: &Map<String, Value>,
        findings: &mut Findings,
    ) -> Result<(), String> {
        match kind {
            OpKind::DrawCircle | OpKind::CreateHole => {
                for key in ["diameter", "radius"] {
                    if let Some(value) = params.get(key) {
                        let v = extract_checked(key, value)?;
                        if v <= 0.0 {
                            return Err(format!("{key} must be positive"));
                        }
                    }
                }
            }
            OpKind::DrawRectangle => {
                for key in ["width", "height", "length"] {
                    if let Some(value) = params.get(key) {
                        let v = extract_checked(key, value)?;
                        if v <= 0.0 {
                            return Err(format!("{key} must be positive"));
                        }
                        let max = self.profile.max_feature_size_mm;
                        if v > max {
                            return Err(format!(
                                "{key} {v}mm exceeds maximum feature size {max}mm"
                            ));
                        }
                    }
                }
            }
            OpKind::Extrude | OpKind::Cut => {
                if let Some(value) = params.get("distance") {
                    let v = extract_checked("distance", value)?;
                    if v <= 0.0 {
                        return Err("extrude distance must be positive".to_string());
                    }
                }
                if let Some(direction) = params.get("direction") {
                    let valid = direction
                        .as_str()
                        .is_some_and(|d| matches!(d, "positive" | "negative" | "symmetric"));
                    if !valid {
                        return Err(format!(
                            "invalid direction: {direction}, must be one of positive, negative, symmetric"
                        ));
                    }
                }
            }
            OpKind::Fillet | OpKind::Chamfer => {
                for key in ["radius", "distance"] {
                    if let Some(value) = params.get(key) {
                        let v = extract_checked(key, value)?;
                        if v <= 0.0 {
                            return Err(format!("fillet/chamfer {key} must be positive"));
                        }
                    }
                }
            }
            OpKind::Shell => {
                if let Some(value) = params.get("thickness") {
                    let v = extract_checked("thickness", value)?;
                    if v <= 0.0 {
                        return Err("shell thickness must be positive".to_string());
                    }
                }
            }
            OpKind::PatternLinear
            | OpKind::PatternCircular
            | OpKind::PatternRectangular
            | OpKind::PatternPath => {
                for key in ["count", "count_1", "count_2"] {
                    if let Some(value) = params.get(key) {
                        let count = value
                            .as_i64()
                            .filter(|c| *c >= 1)
                            .ok_or_else(|| format!("{key} must be a positive integer"))?;
                        if count > self.limits.max_pattern_count {
                            findings.warning(format!(
                                "operation {op_id}: large pattern count {count} may impact performance"
                            ));
                        }
                    }
                }
                for key in ["distance_1", "distance_2", "spacing"] {
                    if let Some(value) = params.get(key) {
                        let v = extract_checked(key, value)?;
                        if v <= 0.0 {
                            return Err(format!("{key} must be positive"));
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Rewrite every `{value, unit}` parameter to canonical millimeters.
    /// 3-D points and everything else pass through unchanged.
    fn convert_params(
        &self,
        op_id: &str,
        params: &Map<String, Value>,
        findings: &mut Findings,
    ) -> Map<String, Value> {
        let mut out = Map::with_capacity(params.len());
        for (key, value) in params {
            if dimension::is_measured(value) && !dimension::is_point(value) {
                let (converted, warning) = dimension::convert_to_canonical(value);
                if let Some(w) = warning {
                    findings.warning(format!("operation {op_id}, parameter {key}: {w}"));
                }
                out.insert(key.clone(), converted);
            } else {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    // -- stage 4: dependencies ---------------------------------------------

    fn check_dependencies(&self, operations: &[Operation], findings: &mut Findings) {
        let known: std::collections::HashSet<&str> =
            operations.iter().map(|op| op.op_id.as_str()).collect();

        for op in operations {
            for dep in &op.dependencies {
                if dep == &op.op_id {
                    // Existence alone cannot catch a self-cycle; broader
                    // cycle detection is intentionally out of scope.
                    findings.warning(format!(
                        "operation {} depends on itself; dependency cycles are not detected",
                        op.op_id
                    ));
                } else if !known.contains(dep.as_str()) {
                    findings.error(format!(
                        "operation {} depends on non-existent operation {dep}",
                        op.op_id
                    ));
                }
            }
        }
    }

    // -- stage 5: geometric feasibility ------------------------------------

    fn check_feasibility(&self, operations: &[Operation], findings: &mut Findings) {
        for op in operations {
            match op.kind() {
                Some(OpKind::Extrude) => {
                    let distance = param_value(&op.params, "distance").unwrap_or(0.0);
                    if distance == 0.0 {
                        findings.warning(format!(
                            "zero-distance extrude in operation {}",
                            op.op_id
                        ));
                    }
                }
                Some(OpKind::Fillet) => {
                    let radius = param_value(&op.params, "radius").unwrap_or(0.0);
                    if radius > 100.0 {
                        findings.warning(format!(
                            "very large fillet radius {radius}mm in operation {}",
                            op.op_id
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    // -- stage 6: manufacturing constraints ---------------------------------

    fn check_manufacturing(&self, operations: &[Operation], findings: &mut Findings) {
        for op in operations {
            match op.kind() {
                Some(OpKind::CreateHole | OpKind::DrawCircle) => {
                    if let Some(diameter) = param_value(&op.params, "diameter") {
                        let min_tool = self.profile.min_tool_diameter_mm;
                        if diameter < min_tool {
                            findings.warning(format!(
                                "operation {}: diameter {diameter}mm below minimum tool diameter {min_tool}mm",
                                op.op_id
                            ));
                        }
                    }
                }
                Some(OpKind::Extrude | OpKind::Cut) => {
                    if let Some(depth) = param_value(&op.params, "distance") {
                        let max_depth = self.profile.max_cut_depth_mm;
                        if depth > max_depth {
                            findings.warning(format!(
                                "operation {}: cut depth {depth}mm exceeds machine capability {max_depth}mm",
                                op.op_id
                            ));
                        }
                    }
                }
                Some(OpKind::Shell) => {
                    if let Some(thickness) = param_value(&op.params, "thickness") {
                        let min_wall = self.profile.min_wall_thickness_mm;
                        if thickness < min_wall {
                            findings.warning(format!(
                                "operation {}: shell thickness {thickness}mm below minimum wall thickness {min_wall}mm",
                                op.op_id
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // -- stage 7: safety ----------------------------------------------------

    fn check_safety(
        &self,
        metadata: &PlanMetadata,
        operations: &[Operation],
        findings: &mut Findings,
    ) {
        if let Some(estimated) = metadata.estimated_duration_seconds {
            let max = self.limits.max_estimated_duration_secs;
            if estimated > max {
                findings.warning(format!(
                    "estimated execution time {estimated}s exceeds maximum {max}s"
                ));
            }
        }

        for op in operations {
            if op.kind().is_some_and(OpKind::is_destructive) {
                findings.warning(format!(
                    "plan contains potentially destructive operation: {}",
                    op.op
                ));
            }
        }
    }
}

/// Extract a numeric value, mapping the shape error to a per-key message.
fn extract_checked(key: &str, value: &Value) -> Result<f64, String> {
    dimension::extract(value).map_err(|_| format!("invalid dimension format for {key}: {value}"))
}

/// Numeric value of a parameter if present and dimension-shaped.
fn param_value(params: &Map<String, Value>, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| dimension::extract(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer() -> PlanSanitizer {
        PlanSanitizer::default()
    }

    fn plate_plan() -> Value {
        json!({
            "plan_id": "test_plate_001",
            "metadata": {
                "created_at": "2024-01-15T10:30:00Z",
                "natural_language_prompt": "Create a 100x50mm plate that's 5mm thick",
                "estimated_duration_seconds": 15,
                "confidence_score": 0.95,
                "units": "mm"
            },
            "operations": [
                {
                    "op_id": "op_1",
                    "op": "create_sketch",
                    "params": {"plane": "XY", "name": "base_sketch"}
                },
                {
                    "op_id": "op_2",
                    "op": "draw_rectangle",
                    "params": {
                        "center_point": {"x": 0, "y": 0, "z": 0},
                        "width": {"value": 100, "unit": "mm"},
                        "height": {"value": 50, "unit": "mm"}
                    },
                    "dependencies": ["op_1"]
                },
                {
                    "op_id": "op_3",
                    "op": "extrude",
                    "params": {"distance": {"value": 5, "unit": "mm"}},
                    "dependencies": ["op_2"]
                }
            ]
        })
    }

    #[test]
    fn valid_simple_plan_passes() {
        let outcome = sanitizer().sanitize(&plate_plan(), false);
        assert!(outcome.is_valid, "errors: {:?}", outcome.errors);
        let plan = outcome.plan.unwrap();
        assert_eq!(plan.operations.len(), 3);
        assert_eq!(plan.metadata.units.as_deref(), Some("mm"));
    }

    #[test]
    fn missing_top_level_field_is_structural_failure() {
        let mut raw = plate_plan();
        raw.as_object_mut().unwrap().remove("operations");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.plan.is_none());
        assert_eq!(outcome.errors.len(), 1);
        assert!(
            outcome.errors[0].contains("operations"),
            "message names the field: {}",
            outcome.errors[0]
        );
    }

    #[test]
    fn non_object_input_is_structural_failure() {
        for raw in [json!(null), json!("plan"), json!([1, 2, 3])] {
            let outcome = sanitizer().sanitize(&raw, false);
            assert!(!outcome.is_valid);
            assert!(outcome.plan.is_none());
            assert_eq!(outcome.errors.len(), 1);
        }
    }

    #[test]
    fn empty_operations_list_is_structural_failure() {
        let mut raw = plate_plan();
        raw["operations"] = json!([]);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].contains("at least one operation"));
    }

    #[test]
    fn over_long_operations_list_is_structural_failure() {
        let op = json!({"op_id": "op_1", "op": "create_sketch", "params": {}});
        let mut raw = plate_plan();
        raw["operations"] = Value::Array(vec![op; 51]);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].contains("maximum operations limit"));
    }

    #[test]
    fn unknown_operation_type_is_error_and_dropped() {
        let mut raw = plate_plan();
        raw["operations"][1]["op"] = json!("teleport_feature");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("unknown operation type")));
        // The offending operation is dropped; the rest survive.
        assert_eq!(outcome.plan.unwrap().operations.len(), 2);
    }

    #[test]
    fn invalid_op_id_format_is_error() {
        let mut raw = plate_plan();
        raw["operations"][0]["op_id"] = json!("first_op");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|e| e.contains("invalid op_id format")));
    }

    #[test]
    fn missing_operation_fields_drop_that_operation() {
        let mut raw = plate_plan();
        raw["operations"][2].as_object_mut().unwrap().remove("params");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("missing required field: params")));
        assert_eq!(outcome.plan.unwrap().operations.len(), 2);
    }

    #[test]
    fn inch_dimensions_convert_with_audit_trail() {
        let mut raw = plate_plan();
        raw["operations"][1]["params"]["width"] = json!({"value": 2, "unit": "in"});
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        let plan = outcome.plan.unwrap();
        let width = &plan.operations[1].params["width"];
        assert_eq!(
            *width,
            json!({"value": 50.8, "unit": "mm", "original_value": 2.0, "original_unit": "in"})
        );
    }

    #[test]
    fn already_mm_dimension_is_numerically_unchanged() {
        let outcome = sanitizer().sanitize(&plate_plan(), false);
        let plan = outcome.plan.unwrap();
        assert_eq!(plan.operations[2].params["distance"]["value"], json!(5.0));
    }

    #[test]
    fn point_parameters_pass_through() {
        let outcome = sanitizer().sanitize(&plate_plan(), false);
        let plan = outcome.plan.unwrap();
        assert_eq!(
            plan.operations[1].params["center_point"],
            json!({"x": 0, "y": 0, "z": 0})
        );
    }

    #[test]
    fn negative_dimension_is_error() {
        let mut raw = plate_plan();
        raw["operations"][1]["params"]["width"] = json!({"value": -10, "unit": "mm"});
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|e| e.contains("width must be positive")));
    }

    #[test]
    fn zero_extrude_distance_is_error() {
        let mut raw = plate_plan();
        raw["operations"][2]["params"]["distance"] = json!(0.0);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("extrude distance must be positive")));
    }

    #[test]
    fn oversize_rectangle_is_error() {
        let mut raw = plate_plan();
        raw["operations"][1]["params"]["width"] = json!({"value": 1500, "unit": "mm"});
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("exceeds maximum feature size")));
    }

    #[test]
    fn invalid_extrude_direction_is_error() {
        let mut raw = plate_plan();
        raw["operations"][2]["params"]["direction"] = json!("sideways");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|e| e.contains("invalid direction")));
    }

    #[test]
    fn sub_minimum_hole_diameter_warns_but_passes() {
        let mut raw = plate_plan();
        raw["operations"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "op_id": "op_4",
                "op": "create_hole",
                "params": {"diameter": {"value": 0.2, "unit": "mm"}}
            }));
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid, "errors: {:?}", outcome.errors);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("below minimum tool diameter")));
    }

    #[test]
    fn strict_mode_turns_warnings_into_failure() {
        let mut raw = plate_plan();
        raw["operations"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "op_id": "op_4",
                "op": "create_hole",
                "params": {"diameter": {"value": 0.2, "unit": "mm"}}
            }));
        let outcome = sanitizer().sanitize(&raw, true);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.is_empty());
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn missing_dependency_is_error_naming_the_id() {
        let mut raw = plate_plan();
        raw["operations"][2]["dependencies"] = json!(["op_99"]);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.iter().any(|e| e.contains("op_99")));
    }

    #[test]
    fn self_dependency_is_flagged_as_warning() {
        let mut raw = plate_plan();
        raw["operations"][2]["dependencies"] = json!(["op_3"]);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("depends on itself")));
    }

    #[test]
    fn shell_thickness_below_wall_minimum_warns() {
        let mut raw = plate_plan();
        raw["operations"].as_array_mut().unwrap().push(json!({
            "op_id": "op_4",
            "op": "shell",
            "params": {"thickness": {"value": 0.4, "unit": "mm"}}
        }));
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("below minimum wall thickness")));
        // shell is also flagged as destructive
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("destructive operation: shell")));
    }

    #[test]
    fn confidence_score_is_clamped_with_warning() {
        let mut raw = plate_plan();
        raw["metadata"]["confidence_score"] = json!(1.7);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert_eq!(outcome.plan.unwrap().metadata.confidence_score, Some(1.0));
        assert!(outcome.warnings.iter().any(|w| w.contains("clamping")));
    }

    #[test]
    fn over_long_prompt_is_truncated_with_warning() {
        let mut raw = plate_plan();
        raw["metadata"]["natural_language_prompt"] = json!("x".repeat(2500));
        let outcome = sanitizer().sanitize(&raw, false);
        let plan = outcome.plan.unwrap();
        assert_eq!(
            plan.metadata.natural_language_prompt.unwrap().chars().count(),
            2000
        );
        assert!(outcome.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn missing_created_at_is_filled() {
        let mut raw = plate_plan();
        raw["metadata"].as_object_mut().unwrap().remove("created_at");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.plan.unwrap().metadata.created_at.is_some());
    }

    #[test]
    fn unknown_metadata_unit_defaults_to_mm_with_warning() {
        let mut raw = plate_plan();
        raw["metadata"]["units"] = json!("cubits");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert_eq!(outcome.plan.unwrap().metadata.units.as_deref(), Some("mm"));
        assert!(outcome.warnings.iter().any(|w| w.contains("cubits")));
    }

    #[test]
    fn unknown_param_unit_warns_and_keeps_value() {
        let mut raw = plate_plan();
        raw["operations"][2]["params"]["distance"] = json!({"value": 5, "unit": "lightyear"});
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        let plan = outcome.plan.unwrap();
        assert_eq!(plan.operations[2].params["distance"]["value"], json!(5.0));
        assert!(outcome.warnings.iter().any(|w| w.contains("lightyear")));
    }

    #[test]
    fn pattern_count_must_be_positive_integer() {
        let mut raw = plate_plan();
        raw["operations"].as_array_mut().unwrap().push(json!({
            "op_id": "op_4",
            "op": "pattern_linear",
            "params": {"count_1": 2.5, "distance_1": {"value": 10, "unit": "mm"}}
        }));
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .iter()
            .any(|e| e.contains("count_1 must be a positive integer")));
    }

    #[test]
    fn large_pattern_count_is_advisory() {
        let mut raw = plate_plan();
        raw["operations"].as_array_mut().unwrap().push(json!({
            "op_id": "op_4",
            "op": "pattern_linear",
            "params": {"count_1": 250, "distance_1": {"value": 10, "unit": "mm"}}
        }));
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("large pattern count")));
    }

    #[test]
    fn excessive_fillet_radius_is_feasibility_warning() {
        let mut raw = plate_plan();
        raw["operations"].as_array_mut().unwrap().push(json!({
            "op_id": "op_4",
            "op": "fillet",
            "params": {"radius": {"value": 150, "unit": "mm"}}
        }));
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("very large fillet radius")));
    }

    #[test]
    fn deep_cut_is_manufacturing_warning() {
        let mut raw = plate_plan();
        raw["operations"][2]["params"]["distance"] = json!({"value": 250, "unit": "mm"});
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("exceeds machine capability")));
    }

    #[test]
    fn excessive_estimated_duration_is_safety_warning() {
        let mut raw = plate_plan();
        raw["metadata"]["estimated_duration_seconds"] = json!(900);
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("estimated execution time")));
    }

    #[test]
    fn unusual_target_ref_is_warning_only() {
        let mut raw = plate_plan();
        raw["operations"][1]["target_ref"] = json!("base_sketch");
        let outcome = sanitizer().sanitize(&raw, false);
        assert!(outcome.is_valid);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("unusual target reference")));
        // The reference itself is preserved for the executor.
        assert_eq!(
            outcome.plan.unwrap().operations[1].target_ref.as_deref(),
            Some("base_sketch")
        );
    }

    #[test]
    fn messages_are_errors_then_warnings() {
        let mut raw = plate_plan();
        raw["operations"][1]["params"]["width"] = json!({"value": -1, "unit": "mm"});
        raw["metadata"]["confidence_score"] = json!(2.0);
        let outcome = sanitizer().sanitize(&raw, false);
        let messages: Vec<&str> = outcome.messages().collect();
        assert_eq!(messages.len(), outcome.errors.len() + outcome.warnings.len());
        assert!(messages[0].contains("width must be positive"));
    }
}
