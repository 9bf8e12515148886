//! Transactional plan execution and sandbox preview.
//!
//! `execute_plan` runs a sanitized plan in document order inside a single
//! transaction: the first failing operation aborts the run and rolls the
//! document back to its pre-plan state. `preview_plan_in_sandbox` runs
//! the same dispatch inside a sandbox scope that is always discarded.
//! Both return result records; neither propagates errors to the caller.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::binding::EntityBindings;
use super::dispatch::{self, OpOutcome};
use super::document::{DesignDocument, TimelineNode};
use super::error::ExecutionError;
use super::transaction::{SandboxScope, Transaction};
use crate::plan::{OpKind, Plan};

/// Maps one executed operation to the timeline token the document
/// reported for it. Sketch geometry produces no token and has no entry.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub op_id: String,
    pub node: TimelineNode,
}

/// Outcome record for one execution run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub plan_id: String,
    pub operations_attempted: usize,
    pub operations_executed: usize,
    /// Names of created features, in execution order. On failure this
    /// lists what had been built before the rollback.
    pub features_created: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

/// Axis-aligned bounding box in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox {
        min: [0.0; 3],
        max: [0.0; 3],
    };
}

/// Estimated change in document extents if the plan were executed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BoundingBoxDelta {
    pub before: BoundingBox,
    pub after: BoundingBox,
}

/// Outcome record for one sandbox preview.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub success: bool,
    pub plan_id: String,
    pub operations_previewed: usize,
    /// One human-readable line per previewed operation.
    pub estimated_features: Vec<String>,
    pub bounding_box: BoundingBoxDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

/// Derives the preview bounding box from the dimensions the handlers
/// actually applied: sketch extents from widths and diameters, height
/// from extrude distances.
#[derive(Debug, Default)]
struct ExtentAccumulator {
    half_x: f64,
    half_y: f64,
    height: f64,
}

impl ExtentAccumulator {
    fn update(&mut self, outcome: &OpOutcome) {
        let dim = |key: &str| outcome.dimensions.get(key).and_then(|v| v.as_f64());
        if let Some(width) = dim("width") {
            self.half_x = self.half_x.max(width / 2.0);
        }
        if let Some(height) = dim("height") {
            self.half_y = self.half_y.max(height / 2.0);
        }
        if let Some(diameter) = dim("diameter") {
            self.half_x = self.half_x.max(diameter / 2.0);
            self.half_y = self.half_y.max(diameter / 2.0);
        }
        if let Some(radius) = dim("radius") {
            self.half_x = self.half_x.max(radius);
            self.half_y = self.half_y.max(radius);
        }
        if outcome.kind == OpKind::Extrude {
            if let Some(distance) = dim("distance") {
                self.height = self.height.max(distance);
            }
        }
    }

    fn delta(&self) -> BoundingBoxDelta {
        BoundingBoxDelta {
            before: BoundingBox::EMPTY,
            after: BoundingBox {
                min: [-self.half_x, -self.half_y, 0.0],
                max: [self.half_x, self.half_y, self.height],
            },
        }
    }
}

/// Runs sanitized plans against a document. Holds the binding registry
/// for the current run; the registry is cleared at the start of every
/// run so bindings never leak between plans.
#[derive(Debug, Default)]
pub struct PlanExecutor {
    bindings: EntityBindings,
}

impl PlanExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a plan inside a single document transaction.
    ///
    /// Always returns a result record. On failure the document has been
    /// rolled back; `features_created` and `timeline` then describe the
    /// operations that had succeeded before the abort.
    pub fn execute_plan(&mut self, doc: &mut dyn DesignDocument, plan: &Plan) -> ExecutionResult {
        let started = Instant::now();
        self.bindings.clear();
        let mut features = Vec::new();
        let mut timeline = Vec::new();
        let mut executed = 0usize;

        info!(
            plan_id = %plan.plan_id,
            operations = plan.operations.len(),
            document = doc.name(),
            "executing plan"
        );

        let run = run_in_transaction(
            doc,
            plan,
            &mut self.bindings,
            &mut features,
            &mut timeline,
            &mut executed,
        );

        let (success, error_message) = match run {
            Ok(()) => {
                info!(plan_id = %plan.plan_id, executed, "plan committed");
                (true, None)
            }
            Err(err) => {
                error!(plan_id = %plan.plan_id, %err, "plan failed, document rolled back");
                (false, Some(err.to_string()))
            }
        };

        ExecutionResult {
            success,
            plan_id: plan.plan_id.clone(),
            operations_attempted: plan.operations.len(),
            operations_executed: executed,
            features_created: features,
            timeline,
            error_message,
            duration_secs: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    /// Preview a plan inside a sandbox scope that is discarded whether or
    /// not the preview succeeds. The document is unchanged afterwards.
    pub fn preview_plan_in_sandbox(
        &mut self,
        doc: &mut dyn DesignDocument,
        plan: &Plan,
    ) -> PreviewResult {
        let started = Instant::now();
        self.bindings.clear();
        let mut estimated = Vec::new();
        let mut previewed = 0usize;
        let mut extents = ExtentAccumulator::default();

        info!(
            plan_id = %plan.plan_id,
            operations = plan.operations.len(),
            document = doc.name(),
            "previewing plan in sandbox"
        );

        let run = run_in_sandbox(
            doc,
            plan,
            &mut self.bindings,
            &mut estimated,
            &mut previewed,
            &mut extents,
        );

        let (success, error_message) = match run {
            Ok(()) => (true, None),
            Err(err) => {
                error!(plan_id = %plan.plan_id, %err, "preview failed, sandbox discarded");
                (false, Some(err.to_string()))
            }
        };

        PreviewResult {
            success,
            plan_id: plan.plan_id.clone(),
            operations_previewed: previewed,
            estimated_features: estimated,
            bounding_box: extents.delta(),
            error_message,
            duration_secs: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }
}

fn run_in_transaction(
    doc: &mut dyn DesignDocument,
    plan: &Plan,
    bindings: &mut EntityBindings,
    features: &mut Vec<String>,
    timeline: &mut Vec<TimelineEntry>,
    executed: &mut usize,
) -> Result<(), ExecutionError> {
    let mut txn = Transaction::begin(doc, &format!("plan_{}", plan.plan_id))?;
    for op in &plan.operations {
        let outcome = dispatch::execute_operation(txn.document(), bindings, op)?;
        features.push(outcome.feature_created);
        if let Some(node) = outcome.timeline {
            timeline.push(TimelineEntry {
                op_id: outcome.op_id,
                node,
            });
        }
        *executed += 1;
    }
    txn.commit()?;
    Ok(())
}

fn run_in_sandbox(
    doc: &mut dyn DesignDocument,
    plan: &Plan,
    bindings: &mut EntityBindings,
    estimated: &mut Vec<String>,
    previewed: &mut usize,
    extents: &mut ExtentAccumulator,
) -> Result<(), ExecutionError> {
    let mut scope = SandboxScope::enter(doc, &format!("preview_{}", plan.plan_id))?;
    for op in &plan.operations {
        let outcome = dispatch::execute_operation(scope.document(), bindings, op)?;
        extents.update(&outcome);
        estimated.push(describe(&outcome));
        *previewed += 1;
    }
    Ok(())
}

fn describe(outcome: &OpOutcome) -> String {
    let dim = |key: &str| outcome.dimensions.get(key).and_then(|v| v.as_f64());
    match outcome.kind {
        OpKind::CreateSketch => format!("Sketch: {}", outcome.feature_created),
        OpKind::Extrude => match dim("distance") {
            Some(d) => format!("Extrude: {d}mm"),
            None => format!("Extrude: {}", outcome.feature_created),
        },
        OpKind::Cut => match dim("distance") {
            Some(d) => format!("Cut: {d}mm"),
            None => format!("Cut: {}", outcome.feature_created),
        },
        OpKind::CreateHole => match dim("diameter") {
            Some(d) => format!("Hole: {d}mm dia"),
            None => format!("Hole: {}", outcome.feature_created),
        },
        other => format!("{}: {}", other, outcome.feature_created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::document::EntityKind;
    use crate::exec::memory::InMemoryDocument;
    use crate::plan::PlanSanitizer;
    use serde_json::json;

    fn plate_plan() -> Plan {
        let raw = json!({
            "plan_id": "plate_001",
            "metadata": {"units": "mm"},
            "operations": [
                {"op_id": "op_1", "op": "create_sketch", "params": {"plane": "XY"}},
                {"op_id": "op_2", "op": "draw_rectangle", "params": {
                    "width": {"value": 100.0, "unit": "mm"},
                    "height": {"value": 50.0, "unit": "mm"}
                }},
                {"op_id": "op_3", "op": "extrude", "params": {
                    "distance": {"value": 5.0, "unit": "mm"}
                }}
            ]
        });
        let outcome = PlanSanitizer::default().sanitize(&raw, false);
        assert!(outcome.is_valid, "fixture plan must sanitize cleanly");
        outcome.plan.unwrap()
    }

    #[test]
    fn plate_plan_executes_and_commits() {
        let mut doc = InMemoryDocument::new("test");
        let mut executor = PlanExecutor::new();
        let result = executor.execute_plan(&mut doc, &plate_plan());

        assert!(result.success);
        assert_eq!(result.operations_executed, 3);
        assert_eq!(result.operations_attempted, 3);
        assert_eq!(
            result.features_created,
            vec!["Sketch_op_1", "Rectangle_op_2", "Extrude_op_3"]
        );
        // Sketch and extrude have timeline nodes; sketch geometry does not.
        assert_eq!(result.timeline.len(), 2);
        assert_eq!(result.timeline[0].op_id, "op_1");
        assert_eq!(result.timeline[1].op_id, "op_3");
        assert!(result.error_message.is_none());
        assert_eq!(doc.entity_count(EntityKind::Sketch), 1);
        assert_eq!(doc.entity_count(EntityKind::Feature), 1);
    }

    #[test]
    fn preview_reports_extents_without_mutating() {
        let mut doc = InMemoryDocument::new("test");
        let mut executor = PlanExecutor::new();
        let result = executor.preview_plan_in_sandbox(&mut doc, &plate_plan());

        assert!(result.success);
        assert_eq!(result.operations_previewed, 3);
        assert_eq!(result.estimated_features.len(), 3);
        assert_eq!(result.estimated_features[2], "Extrude: 5mm");
        assert_eq!(result.bounding_box.before, BoundingBox::EMPTY);
        assert_eq!(result.bounding_box.after.max, [50.0, 25.0, 5.0]);
        assert_eq!(doc.entity_count(EntityKind::Sketch), 0);
    }
}
