//! Solver configuration.
//!
//! The teacher crate threads ad hoc `serde_json::Value` blobs through its CLI
//! (`--code-config`, `--primal-dual-config`) straight into each solver backend's
//! constructor. This crate's knobs are few and fixed, so they are a typed struct
//! instead, but the same "defaults overridden by a JSON object" shape is kept:
//! [`SolverConfig::merge_json`] overlays a partial `serde_json::Value` the CLI
//! accepts with `--solver-config`.

use crate::util::Weight;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// tolerance used throughout the matching engine; `spec.md` §4.3 names `1e-10` as
    /// the example value. Exposed for tests that need a looser tolerance on
    /// ill-conditioned instances, but production callers should leave this at the default.
    pub epsilon: Weight,

    /// safety cap on primal-dual outer-loop iterations before the matching engine
    /// gives up with `NumericalFailure` instead of looping forever (`spec.md` §4.3,
    /// §7: "O(n^3)").
    pub max_matching_iterations: usize,

    /// number of LP connectivity-repair retries (`spec.md` §4.5, §7: "default n repairs")
    /// before giving up with `NumericalFailure`. `None` means "use the vertex count",
    /// matching the spec's default.
    pub max_connectivity_repairs: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: crate::util::EPSILON,
            max_matching_iterations: 0, // 0 means "derive from graph size", see resolved()
            max_connectivity_repairs: None,
        }
    }
}

impl SolverConfig {
    /// overlay a partial JSON object onto the defaults, the same shape as the
    /// teacher's `--primal-dual-config '{"...": ...}'` CLI convention.
    pub fn merge_json(mut self, overlay: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if overlay.is_null() {
            return Ok(self);
        }
        let mut value = serde_json::to_value(&self)?;
        merge_json_objects(&mut value, overlay);
        self = serde_json::from_value(value)?;
        Ok(self)
    }

    /// resolve the size-dependent defaults (iteration cap, repair bound) against a
    /// concrete vertex count, per `spec.md` §4.3/§7.
    pub fn resolved(&self, vertex_num: usize) -> ResolvedConfig {
        let safety_cap = if self.max_matching_iterations == 0 {
            // spec.md §4.3: "O(n^3)"
            (vertex_num.max(1)).pow(3).max(64)
        } else {
            self.max_matching_iterations
        };
        ResolvedConfig {
            epsilon: self.epsilon,
            max_matching_iterations: safety_cap,
            max_connectivity_repairs: self.max_connectivity_repairs.unwrap_or(vertex_num.max(1)),
        }
    }
}

/// [`SolverConfig`] with every size-dependent default resolved against a specific
/// instance; this is what the matching engine and the LP loop actually read.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedConfig {
    pub epsilon: Weight,
    pub max_matching_iterations: usize,
    pub max_connectivity_repairs: usize,
}

fn merge_json_objects(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                merge_json_objects(base_map.entry(key.clone()).or_insert(serde_json::Value::Null), overlay_value);
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_against_vertex_count() {
        let config = SolverConfig::default();
        let resolved = config.resolved(10);
        assert_eq!(resolved.max_connectivity_repairs, 10);
        assert!(resolved.max_matching_iterations >= 1000);
    }

    #[test]
    fn merge_json_overrides_only_named_fields() {
        let config = SolverConfig::default();
        let overlay = serde_json::json!({"epsilon": 1e-6});
        let merged = config.merge_json(&overlay).unwrap();
        assert_eq!(merged.epsilon, 1e-6);
        assert_eq!(merged.max_connectivity_repairs, None);
    }
}
