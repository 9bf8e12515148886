//! Core engine for a CAD copilot: sanitize machine-generated modeling
//! plans, then execute them transactionally against a design document.
//!
//! The crate is split along the two trust boundaries:
//!
//! - [`plan`]: the JSON plan document model, the [`plan::PlanSanitizer`]
//!   that validates and normalizes untrusted plans (all dimensions end up
//!   in millimeters), and the [`plan::PlanSource`] seam to the external
//!   generator.
//! - [`exec`]: the [`exec::DesignDocument`] seam to the host CAD
//!   application, the [`exec::PlanExecutor`] that runs sanitized plans
//!   inside a rollback-on-error transaction, and sandboxed previews.
//!
//! Only sanitized plans reach the executor; the executor still validates
//! defensively because sanitization and execution may be separated by
//! user edits.

pub mod dimension;
pub mod exec;
pub mod plan;
pub mod profile;
pub mod settings;
pub mod units;

pub use exec::{DesignDocument, ExecutionResult, InMemoryDocument, PlanExecutor, PreviewResult};
pub use plan::{Plan, PlanSanitizer, SanitizeOutcome};
pub use profile::MachineProfile;
pub use settings::PlanLimits;
