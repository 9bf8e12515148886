//! Handlers for the plan-facing subcommands.
//!
//! Implements:
//! - `cadpilot sanitize <file>` -- validate and normalize a raw plan
//! - `cadpilot preview <file>`  -- sanitize, then preview in a sandbox
//! - `cadpilot execute <file>`  -- sanitize, then execute transactionally
//!
//! All three print a pretty JSON record to stdout and fail with a nonzero
//! exit code when the plan is invalid or execution fails.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use cadpilot_core::plan::{Plan, PlanSanitizer, SanitizeOutcome};
use cadpilot_core::{InMemoryDocument, PlanExecutor};

use crate::config::CadpilotConfig;

fn read_raw_plan(file: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read plan file: {}", file.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("plan file is not valid JSON: {}", file.display()))
}

fn sanitize_file(config: &CadpilotConfig, file: &Path, strict: bool) -> Result<SanitizeOutcome> {
    let raw = read_raw_plan(file)?;
    let sanitizer = PlanSanitizer::new(config.machine.clone(), config.limits.clone());
    Ok(sanitizer.sanitize(&raw, strict))
}

/// Sanitize and require a valid plan, or fail with the error count.
fn sanitized_plan(config: &CadpilotConfig, file: &Path, strict: bool) -> Result<Plan> {
    let outcome = sanitize_file(config, file, strict)?;
    if !outcome.is_valid {
        for message in outcome.messages() {
            eprintln!("  {message}");
        }
        bail!(
            "plan failed sanitization: {} error(s), {} warning(s)",
            outcome.errors.len(),
            outcome.warnings.len()
        );
    }
    // is_valid implies a structurally sound plan.
    outcome
        .plan
        .context("sanitizer returned a valid outcome without a plan")
}

// -----------------------------------------------------------------------
// cadpilot sanitize <file>
// -----------------------------------------------------------------------

pub fn cmd_sanitize(config: &CadpilotConfig, file: &Path, strict: bool) -> Result<()> {
    let outcome = sanitize_file(config, file, strict)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_valid {
        bail!("plan failed sanitization with {} error(s)", outcome.errors.len());
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cadpilot preview <file>
// -----------------------------------------------------------------------

pub fn cmd_preview(config: &CadpilotConfig, file: &Path, strict: bool) -> Result<()> {
    let plan = sanitized_plan(config, file, strict)?;
    let mut doc = InMemoryDocument::new("preview");
    let mut executor = PlanExecutor::new();

    let result = executor.preview_plan_in_sandbox(&mut doc, &plan);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!("preview failed for plan {}", result.plan_id);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// cadpilot execute <file>
// -----------------------------------------------------------------------

pub fn cmd_execute(config: &CadpilotConfig, file: &Path, strict: bool) -> Result<()> {
    let plan = sanitized_plan(config, file, strict)?;
    let mut doc = InMemoryDocument::new("cadpilot");
    let mut executor = PlanExecutor::new();

    let result = executor.execute_plan(&mut doc, &plan);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!("execution failed for plan {}", result.plan_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn config() -> CadpilotConfig {
        CadpilotConfig {
            machine: Default::default(),
            limits: Default::default(),
        }
    }

    fn plan_file(dir: &tempfile::TempDir, value: &Value) -> std::path::PathBuf {
        let path = dir.path().join("plan.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{value}").unwrap();
        path
    }

    #[test]
    fn execute_succeeds_for_a_valid_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = plan_file(
            &dir,
            &json!({
                "plan_id": "cli_plan",
                "metadata": {},
                "operations": [
                    {"op_id": "op_1", "op": "create_sketch", "params": {}},
                    {"op_id": "op_2", "op": "draw_rectangle", "params": {}},
                    {"op_id": "op_3", "op": "extrude", "params": {}}
                ]
            }),
        );
        assert!(cmd_execute(&config(), &path, false).is_ok());
        assert!(cmd_preview(&config(), &path, false).is_ok());
        assert!(cmd_sanitize(&config(), &path, false).is_ok());
    }

    #[test]
    fn sanitize_fails_for_a_structurally_broken_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = plan_file(&dir, &json!({"plan_id": "x"}));
        assert!(cmd_sanitize(&config(), &path, false).is_err());
    }

    #[test]
    fn execute_fails_for_an_unreadable_file() {
        let err = cmd_execute(&config(), Path::new("/nonexistent/plan.json"), false).unwrap_err();
        assert!(err.to_string().contains("failed to read plan file"));
    }

    #[test]
    fn strict_mode_rejects_plans_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = plan_file(
            &dir,
            &json!({
                "plan_id": "strict_plan",
                "metadata": {},
                "operations": [
                    {"op_id": "op_1", "op": "create_sketch", "params": {}},
                    {"op_id": "op_2", "op": "draw_circle", "params": {
                        // Sub-minimum tool diameter draws a warning.
                        "diameter": {"value": 0.2, "unit": "mm"}
                    }}
                ]
            }),
        );
        assert!(cmd_execute(&config(), &path, false).is_ok());
        assert!(cmd_execute(&config(), &path, true).is_err());
    }
}
