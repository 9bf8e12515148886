//! Typed plan document model.
//!
//! These types are the sanitized form of the JSON plan document produced
//! by the external natural-language service. Operation parameters stay
//! loosely typed (`serde_json::Map`) because every field of the incoming
//! document is untrusted; the sanitizer rewrites dimensional parameters
//! in place before the executor reads them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A sanitized plan: an ordered sequence of CAD operations plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan identifier assigned by the generator.
    pub plan_id: String,
    pub metadata: PlanMetadata,
    /// Operations in execution order. Non-empty after sanitization.
    pub operations: Vec<Operation>,
}

/// Plan-level metadata. All fields are optional on input; sanitization
/// fills `created_at` and `units`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlanMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Generator self-assessment, clamped into [0, 1] by the sanitizer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration_seconds: Option<f64>,
}

/// One step in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Identifier matching `op_<integer>`.
    pub op_id: String,
    /// Operation-type tag; a member of [`OpKind`]'s vocabulary.
    pub op: String,
    /// Loosely typed parameter map, normalized to mm by the sanitizer.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Optional explicit entity reference (sketch/face/edge/feature name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    /// Declared dependencies on other op_ids. Checked for existence during
    /// sanitization; never used to reorder execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Operation {
    /// Parse the operation-type tag. The sanitizer guarantees this
    /// succeeds for sanitized plans; raw plans may carry unknown tags.
    pub fn kind(&self) -> Option<OpKind> {
        self.op.parse().ok()
    }
}

/// Whether an op_id has the required `op_<integer>` shape.
pub fn is_valid_op_id(op_id: &str) -> bool {
    match op_id.strip_prefix("op_") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Expected target-reference name prefixes. A `target_ref` that matches
/// none of these only draws a warning; the executor resolves references
/// defensively regardless.
pub const TARGET_REF_PREFIXES: [&str; 5] = ["sketch_", "face_", "edge_", "feature_", "component_"];

/// Whether a target reference has one of the expected name shapes
/// (known prefix followed by at least one word character).
pub fn is_expected_target_ref(target_ref: &str) -> bool {
    TARGET_REF_PREFIXES.iter().any(|prefix| {
        target_ref
            .strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
    })
}

macro_rules! op_kinds {
    ($(($variant:ident, $tag:literal)),+ $(,)?) => {
        /// The fixed vocabulary of supported operation-type tags.
        ///
        /// The sanitizer accepts all of these; the executor dispatches a
        /// subset and rejects the rest defensively at run time.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum OpKind {
            $($variant,)+
        }

        impl OpKind {
            /// All supported tags, in declaration order.
            pub const ALL: &'static [OpKind] = &[$(OpKind::$variant,)+];

            /// The wire tag for this operation type.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(OpKind::$variant => $tag,)+
                }
            }
        }

        impl FromStr for OpKind {
            type Err = UnknownOpKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(OpKind::$variant),)+
                    _ => Err(UnknownOpKind(s.to_string())),
                }
            }
        }
    };
}

op_kinds! {
    (CreateSketch, "create_sketch"),
    (DrawLine, "draw_line"),
    (DrawCircle, "draw_circle"),
    (DrawRectangle, "draw_rectangle"),
    (DrawPolygon, "draw_polygon"),
    (DrawArc, "draw_arc"),
    (DrawSpline, "draw_spline"),
    (Extrude, "extrude"),
    (Cut, "cut"),
    (Revolve, "revolve"),
    (Sweep, "sweep"),
    (Loft, "loft"),
    (Fillet, "fillet"),
    (Chamfer, "chamfer"),
    (Shell, "shell"),
    (Mirror, "mirror"),
    (PatternLinear, "pattern_linear"),
    (PatternCircular, "pattern_circular"),
    (PatternRectangular, "pattern_rectangular"),
    (PatternPath, "pattern_path"),
    (CreatePlane, "create_plane"),
    (CreateAxis, "create_axis"),
    (CreatePoint, "create_point"),
    (SetDimension, "set_dimension"),
    (AddConstraint, "add_constraint"),
    (RenameFeature, "rename_feature"),
    (CreateComponent, "create_component"),
    (CreateJoint, "create_joint"),
    (CreateHole, "create_hole"),
    (ThreadHole, "thread_hole"),
    (CountersinkHole, "countersink_hole"),
    (CounterboreHole, "counterbore_hole"),
}

/// Error for an operation tag outside the supported vocabulary.
#[derive(Debug, thiserror::Error)]
#[error("unknown operation type: {0:?}")]
pub struct UnknownOpKind(pub String);

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OpKind {
    /// Operation types that remove or hollow material; their presence in
    /// a plan is surfaced as an advisory warning.
    pub fn is_destructive(self) -> bool {
        matches!(self, OpKind::Cut | OpKind::Shell)
    }
}
