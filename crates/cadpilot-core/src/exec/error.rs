use thiserror::Error;

use super::document::{DocumentError, EntityKind};

/// Failures raised while executing a sanitized plan. Any one of these
/// aborts the run and triggers transaction rollback; the executor
/// converts it into a failed result record at the boundary.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The operation tag is in the sanitizer's vocabulary but has no
    /// executable handler.
    #[error("unsupported operation type: {0:?}")]
    UnsupportedOperation(String),

    /// No entity of the required kind could be resolved, explicitly or
    /// implicitly.
    #[error("operation {op_id}: no target {kind} available")]
    MissingContext { op_id: String, kind: EntityKind },

    /// A required parameter is absent or malformed.
    #[error("operation {op_id}: {message}")]
    InvalidParams { op_id: String, message: String },

    /// The host document refused a mutation.
    #[error("operation {op_id}: {source}")]
    Rejected {
        op_id: String,
        #[source]
        source: DocumentError,
    },

    /// Transaction or sandbox bookkeeping failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}
