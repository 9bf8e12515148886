//! The `PlanSource` trait -- the seam to the external natural-language
//! plan generator.
//!
//! The generation service (an LLM client with its own retry/backoff and
//! timeouts) lives entirely outside this core and outside any transaction
//! scope. The core only consumes its output: a JSON plan document treated
//! as untrusted input and re-validated by the sanitizer regardless of any
//! upstream validation.

use anyhow::Result;
use serde_json::Value;

/// Adapter interface for services that turn a natural-language request
/// into a structured plan document.
///
/// Object-safe so callers can hold `Box<dyn PlanSource>`.
pub trait PlanSource {
    /// Human-readable name for this source (e.g. "llm-service").
    fn name(&self) -> &str;

    /// Produce a raw plan document for the given prompt.
    ///
    /// The returned value is untrusted; it must be passed through
    /// [`super::PlanSanitizer::sanitize`] before execution.
    fn generate(&self, prompt: &str) -> Result<Value>;
}

// Compile-time assertion: PlanSource must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanSource) {}
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A source that returns a fixed document, proving the trait can be
    /// implemented and used as `dyn PlanSource`.
    struct CannedSource(Value);

    impl PlanSource for CannedSource {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate(&self, _prompt: &str) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn canned_source_is_object_safe_and_usable() {
        let source: Box<dyn PlanSource> = Box::new(CannedSource(json!({
            "plan_id": "p1",
            "metadata": {},
            "operations": [{"op_id": "op_1", "op": "create_sketch", "params": {}}]
        })));
        assert_eq!(source.name(), "canned");

        let raw = source.generate("a plate").unwrap();
        let outcome = crate::plan::PlanSanitizer::default().sanitize(&raw, false);
        assert!(outcome.is_valid);
    }
}
