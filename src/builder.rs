//! The ciphertext builder (§4.3): turns a candidate multiplier into the
//! next query, as a modulus-wide byte string.

use num_bigint::BigInt;

use crate::bigint::to_fixed_width_bytes;
use crate::error::AttackError;
use crate::oracle::Oracle;

/// `t = m * s^e mod n` for a ciphertext oracle, or `t = m * s mod n` for a
/// plaintext oracle, serialized as exactly `block_size()` big-endian bytes.
pub fn prepare(oracle: &dyn Oracle, m: &BigInt, s: &BigInt) -> Result<Vec<u8>, AttackError> {
    let key = oracle.public_key();
    let t = if oracle.is_plaintext_oracle() {
        (m * s) % &key.n
    } else {
        let s_to_e = s.modpow(&key.e, &key.n);
        (m * s_to_e) % &key.n
    };
    to_fixed_width_bytes(&t, oracle.block_size())
}

/// Serialize `v mod n` without multiplying by any blinding factor.
pub fn prepare_raw(oracle: &dyn Oracle, v: &BigInt) -> Result<Vec<u8>, AttackError> {
    let key = oracle.public_key();
    let t = v % &key.n;
    let t = if t.sign() == num_bigint::Sign::Minus {
        t + &key.n
    } else {
        t
    };
    to_fixed_width_bytes(&t, oracle.block_size())
}
