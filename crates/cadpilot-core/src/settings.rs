//! Plan-level limits and defaults.
//!
//! An explicit configuration object passed into the sanitizer and
//! executor constructors; there is no process-wide settings state.

use serde::{Deserialize, Serialize};

/// Limits applied during sanitization and safety checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// Maximum number of operations a single plan may carry.
    pub max_operations: usize,
    /// Natural-language prompt length ceiling; longer prompts are truncated.
    pub max_prompt_chars: usize,
    /// Advisory ceiling on a plan's estimated execution time.
    pub max_estimated_duration_secs: f64,
    /// Advisory ceiling on pattern instance counts.
    pub max_pattern_count: i64,
    /// Unit assumed when plan metadata does not declare one.
    pub default_units: String,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_operations: 50,
            max_prompt_chars: 2000,
            max_estimated_duration_secs: 300.0,
            max_pattern_count: 100,
            default_units: "mm".to_string(),
        }
    }
}
