//! Error taxonomy for the oracle boundary and the attack engine.

use thiserror::Error;

/// Why the engine stopped without reaching a solution despite not failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller-supplied cancellation closure returned `true`.
    Requested,
    /// `EngineConfig::max_queries` was reached.
    QueryBudgetExhausted,
}

/// Errors an `Oracle` implementation may raise from `check_conformant`.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle I/O failure: {0}")]
    Io(String),
    #[error("oracle protocol error: {0}")]
    Protocol(String),
}

/// Errors the attack engine can terminate with.
#[derive(Debug, Error)]
pub enum AttackError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("step 3 narrowing produced an empty interval set")]
    NoCandidates,

    #[error("s0 has no modular inverse mod n")]
    NotInvertible,

    #[error("expected a {expected_bytes}-byte value, got {actual_bytes}")]
    InputTooLarge {
        expected_bytes: usize,
        actual_bytes: usize,
    },

    #[error("ciphertext is not smaller than the modulus")]
    CiphertextOutOfRange,

    #[error("attack cancelled ({reason:?}) after {iterations} iterations, {oracle_queries} oracle queries")]
    Cancelled {
        reason: CancelReason,
        iterations: u64,
        oracle_queries: u64,
    },
}
