//! The `DesignDocument` trait -- the seam to the host CAD application.
//!
//! The core never inspects host geometry. It issues abstract mutation
//! requests and receives opaque handles plus opaque timeline tokens; the
//! host (or the in-memory reference document) owns everything else.
//! The trait is object-safe so executors can hold `&mut dyn DesignDocument`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque handle to an entity owned by the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Opaque token identifying a mutation recorded on the host timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNode(pub String);

impl fmt::Display for TimelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The categories of entity the executor resolves references against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sketch,
    Profile,
    Body,
    Face,
    Feature,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Sketch => "sketch",
            EntityKind::Profile => "profile",
            EntityKind::Body => "body",
            EntityKind::Face => "face",
            EntityKind::Feature => "feature",
        };
        f.write_str(s)
    }
}

/// Construction plane for a new sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SketchPlane {
    #[default]
    Xy,
    Xz,
    Yz,
}

impl SketchPlane {
    /// Parse the plan's plane name; anything unrecognized falls back to XY,
    /// matching the host behavior.
    pub fn from_name(name: &str) -> Self {
        match name {
            "XZ" | "xz" => SketchPlane::Xz,
            "YZ" | "yz" => SketchPlane::Yz,
            _ => SketchPlane::Xy,
        }
    }
}

/// Extrude/cut direction relative to the sketch plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrudeDirection {
    #[default]
    Positive,
    Negative,
    Symmetric,
}

impl ExtrudeDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "positive" => Some(ExtrudeDirection::Positive),
            "negative" => Some(ExtrudeDirection::Negative),
            "symmetric" => Some(ExtrudeDirection::Symmetric),
            _ => None,
        }
    }
}

/// Hole depth: through everything, or a fixed depth in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HoleDepth {
    ThroughAll,
    Depth(f64),
}

/// A 3-D point in document coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Receipt for a successful mutation: the new entity handle plus the
/// timeline token, when the mutation produced a timeline node (sketch
/// geometry does not).
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub id: EntityId,
    pub timeline: Option<TimelineNode>,
}

/// Failures reported by the host document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no transaction is active")]
    NoActiveTransaction,
    #[error("a transaction is already active")]
    TransactionAlreadyActive,
    #[error("no sandbox is active")]
    NoActiveSandbox,
    #[error("a sandbox is already active")]
    SandboxAlreadyActive,
    #[error("unknown {kind} entity: {id}")]
    UnknownEntity { kind: EntityKind, id: EntityId },
    #[error("document rejected the mutation: {0}")]
    Rejected(String),
}

/// Abstract host-document surface consumed by the executor.
///
/// Mutations must only take effect inside a transaction (or a sandbox);
/// `rollback_transaction` must leave no trace of the mutations performed
/// since `begin_transaction`. Sandbox state is an isolated overlay that
/// `leave_sandbox` discards entirely.
pub trait DesignDocument {
    /// Human-readable document name, used in log output.
    fn name(&self) -> &str;

    // Transactions.
    fn begin_transaction(&mut self, label: &str) -> Result<(), DocumentError>;
    fn commit_transaction(&mut self) -> Result<(), DocumentError>;
    fn rollback_transaction(&mut self) -> Result<(), DocumentError>;

    // Sandbox (disposable preview context).
    fn enter_sandbox(&mut self, label: &str) -> Result<(), DocumentError>;
    fn leave_sandbox(&mut self) -> Result<(), DocumentError>;

    // Queries used for reference resolution.
    fn find_entity(&self, kind: EntityKind, name: &str) -> Option<EntityId>;
    fn most_recent_entity(&self, kind: EntityKind) -> Option<EntityId>;
    fn entity_count(&self, kind: EntityKind) -> usize;

    // Mutations. All linear dimensions are millimeters.
    fn create_sketch(&mut self, plane: SketchPlane, name: &str) -> Result<Created, DocumentError>;
    fn add_rectangle(
        &mut self,
        sketch: EntityId,
        center: Point3,
        width_mm: f64,
        height_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn add_circle(
        &mut self,
        sketch: EntityId,
        center: Point3,
        radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn add_polygon(
        &mut self,
        sketch: EntityId,
        center: Point3,
        sides: u32,
        circumscribed_radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn extrude(
        &mut self,
        profile: EntityId,
        distance_mm: f64,
        direction: ExtrudeDirection,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn cut(
        &mut self,
        profile: EntityId,
        distance_mm: f64,
        direction: ExtrudeDirection,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn add_hole(
        &mut self,
        face: EntityId,
        center: Point3,
        diameter_mm: f64,
        depth: HoleDepth,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn fillet_edges(
        &mut self,
        body: EntityId,
        radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn chamfer_edges(
        &mut self,
        body: EntityId,
        distance_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn shell_body(
        &mut self,
        body: EntityId,
        thickness_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn pattern_linear(
        &mut self,
        source: EntityId,
        count: u32,
        spacing_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn pattern_circular(
        &mut self,
        source: EntityId,
        count: u32,
        angle_deg: f64,
        name: &str,
    ) -> Result<Created, DocumentError>;
    fn pattern_rectangular(
        &mut self,
        source: EntityId,
        counts: (u32, u32),
        spacing_mm: (f64, f64),
        name: &str,
    ) -> Result<Created, DocumentError>;
}

// Compile-time assertion: DesignDocument must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn DesignDocument) {}
};
