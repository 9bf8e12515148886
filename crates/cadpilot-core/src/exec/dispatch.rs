//! Per-operation dispatch.
//!
//! One handler per executable operation type. Handlers read sanitized
//! parameters (dimensions already normalized to mm), resolve their target
//! through the binding registry, apply documented defaults for absent
//! parameters, and issue exactly one document mutation. Tags in the
//! vocabulary without a handler are rejected here rather than silently
//! skipped.

use serde_json::{Map, Value};
use tracing::debug;

use super::binding::EntityBindings;
use super::document::{
    DesignDocument, EntityKind, ExtrudeDirection, HoleDepth, Point3, SketchPlane, TimelineNode,
};
use super::error::ExecutionError;
use crate::dimension;
use crate::plan::{OpKind, Operation};

/// What a single handler produced, reported back through the executor's
/// result record.
#[derive(Debug, Clone)]
pub struct OpOutcome {
    pub op_id: String,
    pub kind: OpKind,
    /// Name of the created feature or sketch entity.
    pub feature_created: String,
    pub timeline: Option<TimelineNode>,
    /// Key dimensions actually applied (after defaults), in mm.
    pub dimensions: Map<String, Value>,
}

/// Execute one sanitized operation against the document.
pub fn execute_operation(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let kind = op
        .op
        .parse::<OpKind>()
        .map_err(|err| ExecutionError::UnsupportedOperation(err.0))?;
    debug!(op_id = %op.op_id, op = %kind, "dispatching operation");

    match kind {
        OpKind::CreateSketch => create_sketch(doc, bindings, op),
        OpKind::DrawRectangle => draw_rectangle(doc, bindings, op),
        OpKind::DrawCircle => draw_circle(doc, bindings, op),
        OpKind::DrawPolygon => draw_polygon(doc, bindings, op),
        OpKind::Extrude => extrude(doc, bindings, op, kind),
        OpKind::Cut => extrude(doc, bindings, op, kind),
        OpKind::CreateHole => create_hole(doc, bindings, op),
        OpKind::Fillet => fillet(doc, bindings, op),
        OpKind::Chamfer => chamfer(doc, bindings, op),
        OpKind::Shell => shell(doc, bindings, op),
        OpKind::PatternLinear => pattern_linear(doc, bindings, op),
        OpKind::PatternCircular => pattern_circular(doc, bindings, op),
        OpKind::PatternRectangular => pattern_rectangular(doc, bindings, op),
        other => Err(ExecutionError::UnsupportedOperation(other.as_str().into())),
    }
}

// ---- parameter helpers ----

fn dim_param(op: &Operation, key: &str, default: f64) -> Result<f64, ExecutionError> {
    match op.params.get(key) {
        None => Ok(default),
        Some(value) => dimension::extract(value).map_err(|_| ExecutionError::InvalidParams {
            op_id: op.op_id.clone(),
            message: format!("parameter {key:?} is not a dimension"),
        }),
    }
}

fn opt_dim_param(op: &Operation, key: &str) -> Result<Option<f64>, ExecutionError> {
    match op.params.get(key) {
        None => Ok(None),
        Some(value) => dimension::extract(value)
            .map(Some)
            .map_err(|_| ExecutionError::InvalidParams {
                op_id: op.op_id.clone(),
                message: format!("parameter {key:?} is not a dimension"),
            }),
    }
}

fn count_param(op: &Operation, key: &str, default: u32) -> Result<u32, ExecutionError> {
    match op.params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| ExecutionError::InvalidParams {
                op_id: op.op_id.clone(),
                message: format!("parameter {key:?} is not a positive count"),
            }),
    }
}

fn point_param(op: &Operation, key: &str) -> Point3 {
    op.params
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Entity name for the created feature: an explicit `name` parameter, or
/// `<Label>_<op_id>`.
fn feature_name(op: &Operation, label: &str) -> String {
    op.params
        .get("name")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("{label}_{}", op.op_id))
}

fn rejected(op: &Operation) -> impl FnOnce(super::document::DocumentError) -> ExecutionError + '_ {
    move |source| ExecutionError::Rejected {
        op_id: op.op_id.clone(),
        source,
    }
}

fn mm(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn outcome(
    op: &Operation,
    kind: OpKind,
    name: String,
    timeline: Option<TimelineNode>,
    dims: &[(&str, Value)],
) -> OpOutcome {
    let mut dimensions = Map::new();
    for (key, value) in dims {
        dimensions.insert((*key).to_string(), value.clone());
    }
    OpOutcome {
        op_id: op.op_id.clone(),
        kind,
        feature_created: name,
        timeline,
        dimensions,
    }
}

// ---- handlers ----

fn create_sketch(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let plane = op
        .params
        .get("plane")
        .and_then(Value::as_str)
        .map(SketchPlane::from_name)
        .unwrap_or_default();
    let name = feature_name(op, "Sketch");
    let created = doc.create_sketch(plane, &name).map_err(rejected(op))?;
    bindings.record_sketch(created.id);
    Ok(outcome(op, OpKind::CreateSketch, name, created.timeline, &[]))
}

fn draw_rectangle(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let sketch = bindings.resolve(doc, EntityKind::Sketch, op)?;
    let center = point_param(op, "center_point");
    let width = dim_param(op, "width", 10.0)?;
    let height = dim_param(op, "height", 10.0)?;
    let name = feature_name(op, "Rectangle");
    let created = doc
        .add_rectangle(sketch, center, width, height, &name)
        .map_err(rejected(op))?;
    bindings.record_profile(created.id);
    Ok(outcome(
        op,
        OpKind::DrawRectangle,
        name,
        created.timeline,
        &[("width", mm(width)), ("height", mm(height))],
    ))
}

fn draw_circle(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let sketch = bindings.resolve(doc, EntityKind::Sketch, op)?;
    let center = point_param(op, "center_point");
    let radius = match opt_dim_param(op, "radius")? {
        Some(radius) => radius,
        None => opt_dim_param(op, "diameter")?
            .map(|d| d / 2.0)
            .ok_or_else(|| ExecutionError::InvalidParams {
                op_id: op.op_id.clone(),
                message: "circle requires a radius or diameter parameter".into(),
            })?,
    };
    let name = feature_name(op, "Circle");
    let created = doc
        .add_circle(sketch, center, radius, &name)
        .map_err(rejected(op))?;
    bindings.record_profile(created.id);
    Ok(outcome(
        op,
        OpKind::DrawCircle,
        name,
        created.timeline,
        &[("diameter", mm(radius * 2.0))],
    ))
}

fn draw_polygon(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let sketch = bindings.resolve(doc, EntityKind::Sketch, op)?;
    let center = point_param(op, "center_point");
    let sides = count_param(op, "sides", 6)?.max(3);
    // An inscribed radius converts to the circumscribed one the document
    // expects: r / cos(pi / sides).
    let radius = match opt_dim_param(op, "circumscribed_radius")? {
        Some(radius) => radius,
        None => match opt_dim_param(op, "inscribed_radius")? {
            Some(inscribed) => inscribed / (std::f64::consts::PI / f64::from(sides)).cos(),
            None => dim_param(op, "radius", 10.0)?,
        },
    };
    let name = feature_name(op, "Polygon");
    let created = doc
        .add_polygon(sketch, center, sides, radius, &name)
        .map_err(rejected(op))?;
    bindings.record_profile(created.id);
    Ok(outcome(
        op,
        OpKind::DrawPolygon,
        name,
        created.timeline,
        &[("sides", Value::from(sides)), ("radius", mm(radius))],
    ))
}

/// Shared handler for extrude and cut; they differ only in the default
/// distance and the document call.
fn extrude(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
    kind: OpKind,
) -> Result<OpOutcome, ExecutionError> {
    let profile = bindings.resolve(doc, EntityKind::Profile, op)?;
    let default_distance = if kind == OpKind::Cut { 5.0 } else { 10.0 };
    let distance = dim_param(op, "distance", default_distance)?;
    let direction = op
        .params
        .get("direction")
        .and_then(Value::as_str)
        .and_then(ExtrudeDirection::from_name)
        .unwrap_or_default();
    let (label, created) = if kind == OpKind::Cut {
        let name = feature_name(op, "Cut");
        (name.clone(), doc.cut(profile, distance, direction, &name))
    } else {
        let name = feature_name(op, "Extrude");
        (
            name.clone(),
            doc.extrude(profile, distance, direction, &name),
        )
    };
    let created = created.map_err(rejected(op))?;
    Ok(outcome(
        op,
        kind,
        label,
        created.timeline,
        &[("distance", mm(distance))],
    ))
}

fn create_hole(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let face = bindings.resolve(doc, EntityKind::Face, op)?;
    let center = point_param(op, "center_point");
    let diameter = dim_param(op, "diameter", 5.0)?;
    let depth = match op.params.get("depth") {
        None => HoleDepth::ThroughAll,
        Some(Value::String(s)) if s == "through_all" || s == "through" => HoleDepth::ThroughAll,
        Some(value) => dimension::extract(value).map(HoleDepth::Depth).map_err(|_| {
            ExecutionError::InvalidParams {
                op_id: op.op_id.clone(),
                message: "parameter \"depth\" is not a dimension or \"through_all\"".into(),
            }
        })?,
    };
    let name = feature_name(op, "Hole");
    let created = doc
        .add_hole(face, center, diameter, depth, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::CreateHole,
        name,
        created.timeline,
        &[("diameter", mm(diameter))],
    ))
}

fn fillet(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let body = bindings.resolve(doc, EntityKind::Body, op)?;
    let radius = dim_param(op, "radius", 2.0)?;
    let name = feature_name(op, "Fillet");
    let created = doc.fillet_edges(body, radius, &name).map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::Fillet,
        name,
        created.timeline,
        &[("radius", mm(radius))],
    ))
}

fn chamfer(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let body = bindings.resolve(doc, EntityKind::Body, op)?;
    let distance = dim_param(op, "distance", 1.0)?;
    let name = feature_name(op, "Chamfer");
    let created = doc
        .chamfer_edges(body, distance, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::Chamfer,
        name,
        created.timeline,
        &[("distance", mm(distance))],
    ))
}

fn shell(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let body = bindings.resolve(doc, EntityKind::Body, op)?;
    let thickness = dim_param(op, "thickness", 2.0)?;
    let name = feature_name(op, "Shell");
    let created = doc
        .shell_body(body, thickness, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::Shell,
        name,
        created.timeline,
        &[("thickness", mm(thickness))],
    ))
}

fn pattern_linear(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let source = bindings.resolve(doc, EntityKind::Feature, op)?;
    let count = count_param(op, "count_1", 3)?;
    let spacing = dim_param(op, "distance_1", 10.0)?;
    let name = feature_name(op, "LinearPattern");
    let created = doc
        .pattern_linear(source, count, spacing, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::PatternLinear,
        name,
        created.timeline,
        &[("count", Value::from(count)), ("spacing", mm(spacing))],
    ))
}

fn pattern_circular(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let source = bindings.resolve(doc, EntityKind::Feature, op)?;
    let count = match op.params.get("count") {
        Some(_) => count_param(op, "count", 6)?,
        None => count_param(op, "count_1", 6)?,
    };
    let angle = dim_param(op, "angle", 360.0)?;
    let name = feature_name(op, "CircularPattern");
    let created = doc
        .pattern_circular(source, count, angle, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::PatternCircular,
        name,
        created.timeline,
        &[("count", Value::from(count)), ("angle", mm(angle))],
    ))
}

fn pattern_rectangular(
    doc: &mut dyn DesignDocument,
    bindings: &mut EntityBindings,
    op: &Operation,
) -> Result<OpOutcome, ExecutionError> {
    let source = bindings.resolve(doc, EntityKind::Feature, op)?;
    let counts = (count_param(op, "count_1", 2)?, count_param(op, "count_2", 2)?);
    let spacing = (
        dim_param(op, "distance_1", 10.0)?,
        dim_param(op, "distance_2", 10.0)?,
    );
    let name = feature_name(op, "RectangularPattern");
    let created = doc
        .pattern_rectangular(source, counts, spacing, &name)
        .map_err(rejected(op))?;
    Ok(outcome(
        op,
        OpKind::PatternRectangular,
        name,
        created.timeline,
        &[
            ("count_1", Value::from(counts.0)),
            ("count_2", Value::from(counts.1)),
            ("spacing_1", mm(spacing.0)),
            ("spacing_2", mm(spacing.1)),
        ],
    ))
}
