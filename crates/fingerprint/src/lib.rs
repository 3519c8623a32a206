//! Fingerprint Engine - passive WAF identification
//!
//! This crate provides:
//! - The signature database (built-in table or JSON file)
//! - The detection engine that matches one baseline response against it
//! - Evidence-based confidence scoring

mod builtin;
mod engine;
mod signatures;

pub use engine::{detect, score_for, DetectionEngine, BASE_SCORE, MAX_SCORE, SCORE_PER_MATCH};
pub use signatures::{SignatureDatabase, SignaturePattern, SignatureRecord, SignatureSpec};
