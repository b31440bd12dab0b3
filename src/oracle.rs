//! The padding-validity oracle abstraction (§4.2).
//!
//! Kept as a single trait with a tag method rather than an inheritance
//! hierarchy of ciphertext/plaintext oracle types — the design note in the
//! spec calls this out explicitly as the simpler, idiomatic choice.

use std::sync::atomic::{AtomicU64, Ordering};

use num_bigint::BigInt;

use crate::error::OracleError;

/// An RSA public key, as the oracle sees it.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub n: BigInt,
    pub e: BigInt,
}

/// Abstract padding-validity oracle over a candidate ciphertext (or,
/// in plaintext-oracle mode, directly over a candidate plaintext).
pub trait Oracle {
    fn public_key(&self) -> &PublicKey;
    fn block_size(&self) -> usize;

    /// `true` if this oracle interprets the bytes it's given as an
    /// already-decrypted plaintext rather than a ciphertext to decrypt
    /// first. See `builder::prepare`.
    fn is_plaintext_oracle(&self) -> bool;

    /// Does `bytes` (exactly `block_size()` long, big-endian) decrypt to
    /// (or, in plaintext mode, directly represent) a PKCS#1 v1.5 type-2
    /// conformant plaintext?
    fn check_conformant(&self, bytes: &[u8]) -> Result<bool, OracleError>;

    /// Monotonic count of `check_conformant` calls so far.
    fn query_count(&self) -> u64;
}

fn is_type2_conformant(plaintext: &[u8], k: usize) -> bool {
    plaintext.len() == k && plaintext[0] == 0x00 && plaintext[1] == 0x02
}

/// A real RSA private key, used to decrypt each candidate before checking
/// its padding. This is the oracle an attacker has access to in practice:
/// "does this ciphertext decrypt to something padding-conformant" is
/// exactly what a TLS server's decryption-error behavior leaks.
pub struct CiphertextOracle {
    public: PublicKey,
    d: BigInt,
    block_size: usize,
    queries: AtomicU64,
}

impl CiphertextOracle {
    pub fn new(n: BigInt, e: BigInt, d: BigInt, block_size: usize) -> Self {
        Self {
            public: PublicKey { n, e },
            d,
            block_size,
            queries: AtomicU64::new(0),
        }
    }
}

impl Oracle for CiphertextOracle {
    fn public_key(&self) -> &PublicKey {
        &self.public
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn is_plaintext_oracle(&self) -> bool {
        false
    }

    fn check_conformant(&self, bytes: &[u8]) -> Result<bool, OracleError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let c = BigInt::from_bytes_be(num_bigint::Sign::Plus, bytes);
        let m = c.modpow(&self.d, &self.public.n);
        let (_, plain_be) = m.to_bytes_be();
        // m's big-endian encoding drops leading zero bytes; pad back out to
        // the block size before checking the 0x00 0x02 marker.
        let mut padded = vec![0u8; self.block_size.saturating_sub(plain_be.len())];
        padded.extend_from_slice(&plain_be);
        Ok(is_type2_conformant(&padded, self.block_size))
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

/// An oracle that checks an already-decrypted candidate plaintext
/// directly, without performing RSA decryption. Exists so the engine can
/// be exercised against a trusted PKCS#1 decoder without needing a full
/// RSA private key in test code (§4.3's stated rationale).
pub struct PlaintextOracle {
    public: PublicKey,
    block_size: usize,
    queries: AtomicU64,
}

impl PlaintextOracle {
    pub fn new(n: BigInt, e: BigInt, block_size: usize) -> Self {
        Self {
            public: PublicKey { n, e },
            block_size,
            queries: AtomicU64::new(0),
        }
    }
}

impl Oracle for PlaintextOracle {
    fn public_key(&self) -> &PublicKey {
        &self.public
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn is_plaintext_oracle(&self) -> bool {
        true
    }

    fn check_conformant(&self, bytes: &[u8]) -> Result<bool, OracleError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(is_type2_conformant(bytes, self.block_size))
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}
