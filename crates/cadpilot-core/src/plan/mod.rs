//! Plan document model, sanitization, and the generator seam.

pub mod sanitizer;
pub mod source;
pub mod types;

pub use sanitizer::{PlanSanitizer, PlanStructureError, SanitizeOutcome};
pub use source::PlanSource;
pub use types::{
    is_expected_target_ref, is_valid_op_id, OpKind, Operation, Plan, PlanMetadata,
    UnknownOpKind, TARGET_REF_PREFIXES,
};
