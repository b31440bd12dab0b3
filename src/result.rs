//! The result extractor (§4.5): what a successful attack hands back.

use num_bigint::BigInt;

/// The outcome of a successful attack run.
#[derive(Debug, Clone)]
pub struct AttackOutcome {
    /// The recovered plaintext, as an integer.
    pub solution_int: BigInt,
    /// The recovered plaintext's big-endian encoding, leading zeros
    /// stripped. Still includes the `0x00 0x02 ... 0x00` PKCS#1 v1.5
    /// framing; unwrapping that framing is a caller concern (§4.5).
    pub solution_bytes: Vec<u8>,
    /// The blinding multiplier found in step 1 (`1` if blinding was
    /// skipped because the target was already conformant).
    pub s0: BigInt,
    /// Number of step-4 iterations performed.
    pub iterations: u64,
    /// Total oracle queries issued over the run.
    pub oracle_queries: u64,
}

impl AttackOutcome {
    pub fn new(solution_int: BigInt, s0: BigInt, iterations: u64, oracle_queries: u64) -> Self {
        let solution_bytes = solution_int.to_bytes_be().1;
        Self {
            solution_int,
            solution_bytes,
            s0,
            iterations,
            oracle_queries,
        }
    }
}
