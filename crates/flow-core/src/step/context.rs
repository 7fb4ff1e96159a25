//! The per-Run shared resource bag steps use to exchange opaque values.
//!
//! Lifetime equals the Run; `cleanup` is called unconditionally on every
//! exit path of [`crate::engine::StepEngine::execute`], regardless of the
//! workflow's final status.

use std::collections::HashMap;

use serde_json::Value;

pub struct RunContext {
    pub run_id: String,
    shared: HashMap<String, Value>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), shared: HashMap::new() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.shared.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.shared.get(key)
    }

    /// Copies only the keys in `allow_list` that are present, so handles or
    /// other non-serializable handles stashed for cross-step use never leak
    /// into the Run's public `results`.
    pub fn take_allowed(&self, allow_list: &[&str]) -> HashMap<String, Value> {
        allow_list.iter()
                  .filter_map(|k| self.shared.get(*k).map(|v| (k.to_string(), v.clone())))
                  .collect()
    }

    pub fn cleanup(&mut self) {
        self.shared.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_allowed_filters_to_declared_keys() {
        let mut ctx = RunContext::new("run-1");
        ctx.set("payment_url", Value::String("https://pay".into()));
        ctx.set("internal_handle", Value::String("secret".into()));

        let results = ctx.take_allowed(&["payment_url", "vep_pdf_path"]);
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("payment_url"));
        assert!(!results.contains_key("internal_handle"));
    }

    #[test]
    fn cleanup_clears_all_entries() {
        let mut ctx = RunContext::new("run-1");
        ctx.set("a", Value::Bool(true));
        ctx.cleanup();
        assert!(ctx.get("a").is_none());
    }
}
