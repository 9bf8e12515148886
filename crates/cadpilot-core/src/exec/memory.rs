//! In-memory reference implementation of [`DesignDocument`].
//!
//! Holds a flat entity log instead of real geometry. Transactions are a
//! baseline index into the log (rollback truncates back to it); a sandbox
//! snapshots the whole log on entry and restores it on exit. Used by the
//! CLI and by tests; host integrations supply their own implementation.

use tracing::debug;
use uuid::Uuid;

use super::document::{
    Created, DesignDocument, DocumentError, EntityId, EntityKind, ExtrudeDirection, HoleDepth,
    Point3, SketchPlane, TimelineNode,
};

#[derive(Debug, Clone)]
struct EntityRecord {
    id: EntityId,
    kind: EntityKind,
    name: String,
}

#[derive(Debug)]
struct ActiveTransaction {
    label: String,
    baseline: usize,
}

#[derive(Debug)]
struct ActiveSandbox {
    label: String,
    saved: Vec<EntityRecord>,
}

/// Geometry-free document backed by an append-only entity log.
#[derive(Debug)]
pub struct InMemoryDocument {
    name: String,
    entities: Vec<EntityRecord>,
    transaction: Option<ActiveTransaction>,
    sandbox: Option<ActiveSandbox>,
}

impl InMemoryDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            transaction: None,
            sandbox: None,
        }
    }

    fn ensure_mutable(&self) -> Result<(), DocumentError> {
        if self.transaction.is_none() && self.sandbox.is_none() {
            return Err(DocumentError::Rejected(
                "mutation outside any transaction or sandbox".into(),
            ));
        }
        Ok(())
    }

    fn check_entity(&self, kind: EntityKind, id: EntityId) -> Result<(), DocumentError> {
        if self.entities.iter().any(|e| e.id == id && e.kind == kind) {
            Ok(())
        } else {
            Err(DocumentError::UnknownEntity { kind, id })
        }
    }

    fn record(&mut self, kind: EntityKind, name: &str) -> EntityId {
        let id = EntityId::new();
        self.entities.push(EntityRecord {
            id,
            kind,
            name: name.to_string(),
        });
        id
    }

    fn timeline_token() -> TimelineNode {
        let tag = Uuid::new_v4().simple().to_string();
        TimelineNode(format!("Timeline_Node_{}", &tag[..8]))
    }

    /// Record a feature-level entity together with a timeline token.
    fn record_feature(&mut self, name: &str) -> Created {
        let id = self.record(EntityKind::Feature, name);
        Created {
            id,
            timeline: Some(Self::timeline_token()),
        }
    }
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new("untitled")
    }
}

impl DesignDocument for InMemoryDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_transaction(&mut self, label: &str) -> Result<(), DocumentError> {
        if self.transaction.is_some() {
            return Err(DocumentError::TransactionAlreadyActive);
        }
        debug!(document = %self.name, label, "transaction begin");
        self.transaction = Some(ActiveTransaction {
            label: label.to_string(),
            baseline: self.entities.len(),
        });
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), DocumentError> {
        let txn = self
            .transaction
            .take()
            .ok_or(DocumentError::NoActiveTransaction)?;
        debug!(document = %self.name, label = %txn.label, "transaction commit");
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), DocumentError> {
        let txn = self
            .transaction
            .take()
            .ok_or(DocumentError::NoActiveTransaction)?;
        debug!(
            document = %self.name,
            label = %txn.label,
            discarded = self.entities.len() - txn.baseline,
            "transaction rollback"
        );
        self.entities.truncate(txn.baseline);
        Ok(())
    }

    fn enter_sandbox(&mut self, label: &str) -> Result<(), DocumentError> {
        if self.sandbox.is_some() {
            return Err(DocumentError::SandboxAlreadyActive);
        }
        debug!(document = %self.name, label, "sandbox enter");
        self.sandbox = Some(ActiveSandbox {
            label: label.to_string(),
            saved: self.entities.clone(),
        });
        Ok(())
    }

    fn leave_sandbox(&mut self) -> Result<(), DocumentError> {
        let sandbox = self.sandbox.take().ok_or(DocumentError::NoActiveSandbox)?;
        debug!(document = %self.name, label = %sandbox.label, "sandbox discard");
        self.entities = sandbox.saved;
        Ok(())
    }

    fn find_entity(&self, kind: EntityKind, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .rev()
            .find(|e| e.kind == kind && e.name == name)
            .map(|e| e.id)
    }

    fn most_recent_entity(&self, kind: EntityKind) -> Option<EntityId> {
        self.entities
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .map(|e| e.id)
    }

    fn entity_count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    fn create_sketch(&mut self, _plane: SketchPlane, name: &str) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        let id = self.record(EntityKind::Sketch, name);
        Ok(Created {
            id,
            timeline: Some(Self::timeline_token()),
        })
    }

    fn add_rectangle(
        &mut self,
        sketch: EntityId,
        _center: Point3,
        _width_mm: f64,
        _height_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Sketch, sketch)?;
        let id = self.record(EntityKind::Profile, name);
        Ok(Created { id, timeline: None })
    }

    fn add_circle(
        &mut self,
        sketch: EntityId,
        _center: Point3,
        _radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Sketch, sketch)?;
        let id = self.record(EntityKind::Profile, name);
        Ok(Created { id, timeline: None })
    }

    fn add_polygon(
        &mut self,
        sketch: EntityId,
        _center: Point3,
        _sides: u32,
        _circumscribed_radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Sketch, sketch)?;
        let id = self.record(EntityKind::Profile, name);
        Ok(Created { id, timeline: None })
    }

    fn extrude(
        &mut self,
        profile: EntityId,
        _distance_mm: f64,
        _direction: ExtrudeDirection,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Profile, profile)?;
        // A solid extrude yields a body and an addressable end face.
        self.record(EntityKind::Body, &format!("{name}_body"));
        self.record(EntityKind::Face, &format!("{name}_end"));
        Ok(self.record_feature(name))
    }

    fn cut(
        &mut self,
        profile: EntityId,
        _distance_mm: f64,
        _direction: ExtrudeDirection,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Profile, profile)?;
        Ok(self.record_feature(name))
    }

    fn add_hole(
        &mut self,
        face: EntityId,
        _center: Point3,
        _diameter_mm: f64,
        _depth: HoleDepth,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Face, face)?;
        Ok(self.record_feature(name))
    }

    fn fillet_edges(
        &mut self,
        body: EntityId,
        _radius_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Body, body)?;
        Ok(self.record_feature(name))
    }

    fn chamfer_edges(
        &mut self,
        body: EntityId,
        _distance_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Body, body)?;
        Ok(self.record_feature(name))
    }

    fn shell_body(
        &mut self,
        body: EntityId,
        _thickness_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Body, body)?;
        Ok(self.record_feature(name))
    }

    fn pattern_linear(
        &mut self,
        source: EntityId,
        _count: u32,
        _spacing_mm: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Feature, source)?;
        Ok(self.record_feature(name))
    }

    fn pattern_circular(
        &mut self,
        source: EntityId,
        _count: u32,
        _angle_deg: f64,
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Feature, source)?;
        Ok(self.record_feature(name))
    }

    fn pattern_rectangular(
        &mut self,
        source: EntityId,
        _counts: (u32, u32),
        _spacing_mm: (f64, f64),
        name: &str,
    ) -> Result<Created, DocumentError> {
        self.ensure_mutable()?;
        self.check_entity(EntityKind::Feature, source)?;
        Ok(self.record_feature(name))
    }
}
