//! Waffer Common - Shared types and traits
//!
//! This crate provides the core types, traits, and errors used across
//! the Waffer WAF fingerprinting workspace.
//!
//! Key pieces:
//! - Typed HTTP response and fetch outcome consumed by the detection engine
//! - Strongly-typed detection report with a stable JSON shape
//! - `Fetcher` / `Fingerprinter` seams between I/O and matching logic

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{WafferError, WafferResult};
pub use traits::{Fetcher, Fingerprinter};
pub use types::{
    DetectionCandidate, DetectionMethod, DetectionReport, Evidence, EvidenceChannel, FetchMethod,
    FetchOptions, FetchOutcome, HeaderList, HttpResponse, NO_RESPONSE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
