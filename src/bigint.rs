//! Arbitrary-precision integer helpers shared by the rest of the engine.
//!
//! The heavy lifting is `num-bigint`/`num-integer`; this module only adds the
//! handful of operations the Bleichenbacher search needs and that aren't a
//! direct method call: a modular inverse that returns `Result` instead of
//! looping forever on a non-invertible input, and fixed-width big-endian
//! serialization that matches the PKCS#1 block-size convention.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::AttackError;

/// `a^-1 mod m`, via the same iterative extended-Euclidean loop the rest of
/// this codebase's ancestry uses, generalized to fail instead of spin when
/// `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Result<BigInt, AttackError> {
    if m.is_one() {
        return Ok(BigInt::zero());
    }

    let m_orig = m.clone();
    let (mut a, mut m, mut x, mut inv) = (a.clone(), m_orig.clone(), BigInt::zero(), BigInt::one());

    while a > BigInt::one() {
        if m.is_zero() {
            return Err(AttackError::NotInvertible);
        }
        let (div, rem) = a.div_rem(&m);
        inv -= div * &x;
        a = rem;
        std::mem::swap(&mut a, &mut m);
        std::mem::swap(&mut x, &mut inv);
    }

    if a != BigInt::one() {
        return Err(AttackError::NotInvertible);
    }

    while inv < BigInt::zero() {
        inv += &m_orig;
    }

    Ok(inv)
}

/// Ceiling division for non-negative `x`, positive `y`: `ceil(x / y)`.
pub fn ceil_div(x: &BigInt, y: &BigInt) -> BigInt {
    x.div_ceil(y)
}

/// Floor division for non-negative `x`, positive `y`: `floor(x / y)`.
pub fn floor_div(x: &BigInt, y: &BigInt) -> BigInt {
    x.div_floor(y)
}

/// Serialize `v` as exactly `width` big-endian bytes, left-padded with
/// zeros. Fails if `v` is negative or does not fit in `width` bytes.
pub fn to_fixed_width_bytes(v: &BigInt, width: usize) -> Result<Vec<u8>, AttackError> {
    if v.sign() == Sign::Minus {
        return Err(AttackError::InputTooLarge {
            expected_bytes: width,
            actual_bytes: 0,
        });
    }
    let (_, be) = v.to_bytes_be();
    if be.len() > width {
        return Err(AttackError::InputTooLarge {
            expected_bytes: width,
            actual_bytes: be.len(),
        });
    }
    let mut out = vec![0u8; width - be.len()];
    out.extend_from_slice(&be);
    Ok(out)
}
