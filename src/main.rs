//! Demo CLI: generates a toy RSA keypair, PKCS#1 v1.5-pads a message,
//! encrypts it, and recovers it with the Bleichenbacher engine against a
//! locally simulated oracle. Exercises the library the way an external
//! TLS-testing harness would, minus the TLS handshake itself.

use anyhow::{anyhow, Result};
use clap::Parser;
use indicatif::ProgressBar;
use num_bigint::{BigInt, Sign, ToBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use openssl::bn::BigNum;

use bleichenbacher::{AttackEngine, CiphertextOracle, EngineConfig};

/// Recover an RSA PKCS#1 v1.5 plaintext via a Bleichenbacher padding
/// oracle attack against a locally generated demo key.
#[derive(Parser, Debug)]
struct Args {
    /// RSA modulus size in bits for the demo key pair.
    #[arg(long, default_value_t = 256)]
    bits: i32,

    /// Message to PKCS#1 v1.5-pad and encrypt.
    #[arg(long, default_value = "kick it, CC")]
    message: String,

    /// Cap on oracle queries before giving up.
    #[arg(long)]
    max_queries: Option<u64>,
}

fn prime(bits: i32) -> Result<BigInt> {
    let mut big = BigNum::new()?;
    big.generate_prime(bits, false, None, None)?;
    let dec = big.to_dec_str()?;
    Ok(dec.parse()?)
}

fn invmod(a: &BigInt, m: &BigInt) -> BigInt {
    let m_orig = m.clone();
    let (mut a, mut m, mut x, mut inv) = (a.clone(), m_orig.clone(), BigInt::zero(), BigInt::one());
    while a > BigInt::one() {
        let (div, rem) = a.div_rem(&m);
        inv -= div * &x;
        a = rem;
        std::mem::swap(&mut a, &mut m);
        std::mem::swap(&mut x, &mut inv);
    }
    while inv < BigInt::zero() {
        inv += &m_orig;
    }
    inv
}

/// Generate a toy RSA key pair `(e, d, n)` with `e = 3`.
fn generate_keypair(bits: i32) -> Result<(BigInt, BigInt, BigInt)> {
    let e: BigInt = 3.to_bigint().unwrap();
    loop {
        let p = prime(bits)?;
        let q = prime(bits)?;
        let et = (&p - 1) * (&q - 1);
        if (&et % &e).is_zero() {
            continue;
        }
        let n = &p * &q;
        let d = invmod(&e, &et);
        return Ok((e, d, n));
    }
}

fn pkcs1_pad(message: &[u8], block_bytes: usize) -> Result<Vec<u8>> {
    if message.len() + 11 > block_bytes {
        return Err(anyhow!("message too long for this modulus"));
    }
    let mut padded = vec![0x00, 0x02];
    padded.extend(std::iter::repeat(0xffu8).take(block_bytes - 3 - message.len()));
    padded.push(0x00);
    padded.extend_from_slice(message);
    Ok(padded)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("generating {}-bit demo RSA key pair", args.bits);
    let (e, d, n) = generate_keypair(args.bits)?;
    let k = n.bits().div_ceil(8) as usize;

    let padded = pkcs1_pad(args.message.as_bytes(), k)?;
    let m = BigInt::from_bytes_be(Sign::Plus, &padded);
    let c = m.modpow(&e, &n);
    let ciphertext_bytes = c.to_bytes_be().1;

    let oracle = CiphertextOracle::new(n.clone(), e.clone(), d, k);
    let config = match args.max_queries {
        Some(max) => EngineConfig::with_max_queries(max),
        None => EngineConfig::default(),
    };

    let mut engine = AttackEngine::new(&ciphertext_bytes, n, e, k, true, &oracle, config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("running Bleichenbacher attack...");
    let outcome = engine.run();
    spinner.finish_and_clear();

    let outcome = outcome?;
    println!(
        "recovered {} bytes after {} iterations, {} oracle queries",
        outcome.solution_bytes.len(),
        outcome.iterations,
        outcome.oracle_queries
    );

    let padded = outcome.solution_bytes;
    let index = padded
        .iter()
        .skip(1)
        .position(|&b| b == 0x00)
        .ok_or_else(|| anyhow!("recovered plaintext has no PKCS#1 v1.5 terminator"))?
        + 2;
    let message = std::str::from_utf8(&padded[index..])?;
    println!("message: {message}");
    assert_eq!(message.as_bytes(), args.message.as_bytes());

    Ok(())
}
