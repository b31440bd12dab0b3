//! Caller-facing engine configuration (§9 open question: an optional
//! iteration/query cap, since the core search has no intrinsic bound).

/// Tunables for an `AttackEngine` run. All optional; `Default` reproduces
/// the spec's unbounded core search exactly.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Abort with `AttackError::Cancelled` once the oracle has answered
    /// this many `check_conformant` calls. `None` means no cap.
    pub max_queries: Option<u64>,
}

impl EngineConfig {
    pub fn with_max_queries(max_queries: u64) -> Self {
        Self {
            max_queries: Some(max_queries),
        }
    }
}
