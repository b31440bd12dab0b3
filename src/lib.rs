//! Core cryptanalytic engine for a Bleichenbacher-style adaptive
//! chosen-ciphertext attack against RSA PKCS#1 v1.5 encryption.
//!
//! This crate recovers the plaintext behind an RSA ciphertext given
//! access to a padding-validity oracle: something that, for a candidate
//! ciphertext, reports whether it decrypts to a PKCS#1 v1.5 type-2
//! conformant plaintext. It does not perform any network I/O, TLS
//! handshaking, or X.509 parsing itself — those are the concern of
//! whatever harness supplies an `Oracle` implementation.

pub mod bigint;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod oracle;
pub mod result;

pub use config::EngineConfig;
pub use engine::AttackEngine;
pub use error::{AttackError, CancelReason, OracleError};
pub use oracle::{CiphertextOracle, Oracle, PlaintextOracle, PublicKey};
pub use result::AttackOutcome;
