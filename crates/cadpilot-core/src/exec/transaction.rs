//! RAII guards for document transactions and sandbox scopes.
//!
//! A dropped [`Transaction`] that was never committed rolls the document
//! back, so every early return and `?` inside the executor leaves the
//! document untouched. A [`SandboxScope`] is discarded unconditionally on
//! drop; sandbox work never survives the scope.

use tracing::{error, info};

use super::document::{DesignDocument, DocumentError};

/// Guard over an open document transaction. Rolls back on drop unless
/// [`commit`](Transaction::commit) was called.
pub struct Transaction<'a> {
    doc: &'a mut (dyn DesignDocument + 'a),
    label: String,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(
        doc: &'a mut (dyn DesignDocument + 'a),
        label: &str,
    ) -> Result<Self, DocumentError> {
        doc.begin_transaction(label)?;
        Ok(Self {
            doc,
            label: label.to_string(),
            committed: false,
        })
    }

    pub fn document(&mut self) -> &mut (dyn DesignDocument + 'a) {
        &mut *self.doc
    }

    pub fn commit(mut self) -> Result<(), DocumentError> {
        self.doc.commit_transaction()?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.doc.rollback_transaction() {
            Ok(()) => info!(label = %self.label, "transaction rolled back"),
            Err(err) => error!(label = %self.label, %err, "rollback failed"),
        }
    }
}

/// Guard over a sandbox scope. Leaving (and discarding) the sandbox
/// happens on drop; there is no way to keep sandbox mutations.
pub struct SandboxScope<'a> {
    doc: &'a mut (dyn DesignDocument + 'a),
    label: String,
}

impl<'a> SandboxScope<'a> {
    pub fn enter(
        doc: &'a mut (dyn DesignDocument + 'a),
        label: &str,
    ) -> Result<Self, DocumentError> {
        doc.enter_sandbox(label)?;
        Ok(Self {
            doc,
            label: label.to_string(),
        })
    }

    pub fn document(&mut self) -> &mut (dyn DesignDocument + 'a) {
        &mut *self.doc
    }
}

impl Drop for SandboxScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.doc.leave_sandbox() {
            error!(label = %self.label, %err, "failed to discard sandbox");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::document::{EntityKind, SketchPlane};
    use crate::exec::memory::InMemoryDocument;

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut doc = InMemoryDocument::new("test");
        {
            let mut txn = Transaction::begin(&mut doc, "plan_x").unwrap();
            txn.document()
                .create_sketch(SketchPlane::Xy, "Sketch_op_1")
                .unwrap();
        }
        assert_eq!(doc.entity_count(EntityKind::Sketch), 0);
    }

    #[test]
    fn committed_transaction_keeps_work() {
        let mut doc = InMemoryDocument::new("test");
        let mut txn = Transaction::begin(&mut doc, "plan_x").unwrap();
        txn.document()
            .create_sketch(SketchPlane::Xy, "Sketch_op_1")
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(doc.entity_count(EntityKind::Sketch), 1);
    }

    #[test]
    fn sandbox_scope_always_discards() {
        let mut doc = InMemoryDocument::new("test");
        {
            let mut scope = SandboxScope::enter(&mut doc, "preview").unwrap();
            scope
                .document()
                .create_sketch(SketchPlane::Xy, "Sketch_op_1")
                .unwrap();
        }
        assert_eq!(doc.entity_count(EntityKind::Sketch), 0);
    }
}
