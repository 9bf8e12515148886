//! Implicit entity binding between operations.
//!
//! Plans rarely name their targets. Each handler records what it created
//! here, and later handlers resolve their inputs through a fixed chain:
//! explicit `target_ref` looked up by name, then the registry slot for
//! the kind, then the document's most recent entity of that kind. Only
//! when all three miss does execution abort.

use tracing::debug;

use super::document::{DesignDocument, EntityId, EntityKind};
use super::error::ExecutionError;
use crate::plan::Operation;

/// Per-run registry of the most recently created entities.
///
/// Owned by the executor and cleared at the start of every run; bindings
/// never leak between plans.
#[derive(Debug, Default, Clone)]
pub struct EntityBindings {
    last_sketch: Option<EntityId>,
    last_profile: Option<EntityId>,
}

impl EntityBindings {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn record_sketch(&mut self, id: EntityId) {
        self.last_sketch = Some(id);
    }

    pub fn record_profile(&mut self, id: EntityId) {
        self.last_profile = Some(id);
    }

    /// Resolve the entity an operation targets.
    ///
    /// An explicit `target_ref` is tried first as an exact name lookup;
    /// a miss falls through rather than failing, because generated
    /// references are frequently stale or invented.
    pub fn resolve(
        &self,
        doc: &dyn DesignDocument,
        kind: EntityKind,
        op: &Operation,
    ) -> Result<EntityId, ExecutionError> {
        if let Some(reference) = op.target_ref.as_deref() {
            if let Some(id) = doc.find_entity(kind, reference) {
                debug!(op_id = %op.op_id, %kind, reference, "resolved explicit target_ref");
                return Ok(id);
            }
        }
        let bound = match kind {
            EntityKind::Sketch => self.last_sketch,
            EntityKind::Profile => self.last_profile,
            _ => None,
        };
        if let Some(id) = bound {
            return Ok(id);
        }
        doc.most_recent_entity(kind)
            .ok_or_else(|| ExecutionError::MissingContext {
                op_id: op.op_id.clone(),
                kind,
            })
    }
}
