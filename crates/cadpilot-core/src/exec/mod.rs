//! Transactional execution of sanitized plans.

pub mod binding;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod executor;
pub mod memory;
pub mod transaction;

pub use binding::EntityBindings;
pub use dispatch::{execute_operation, OpOutcome};
pub use document::{
    Created, DesignDocument, DocumentError, EntityId, EntityKind, ExtrudeDirection, HoleDepth,
    Point3, SketchPlane, TimelineNode,
};
pub use error::ExecutionError;
pub use executor::{
    BoundingBox, BoundingBoxDelta, ExecutionResult, PlanExecutor, PreviewResult, TimelineEntry,
};
pub use memory::InMemoryDocument;
pub use transaction::{SandboxScope, Transaction};
