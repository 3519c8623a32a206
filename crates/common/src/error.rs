//! Error types for Waffer
//!
//! Library crates return `WafferResult`; binaries wrap these in `anyhow`.

use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum WafferError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Fingerprinting error: {0}")]
    Fingerprint(String),
}

impl WafferError {
    /// Whether this error came from the transport rather than local input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WafferError::Network(_) | WafferError::Timeout(_) | WafferError::InvalidTarget(_)
        )
    }
}

/// Result type alias for Waffer operations
pub type WafferResult<T> = Result<T, WafferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(WafferError::Timeout("10s".into()).is_transport());
        assert!(WafferError::Network("refused".into()).is_transport());
        assert!(!WafferError::Fingerprint("dup".into()).is_transport());
    }

    #[test]
    fn json_errors_convert() {
        let err: WafferError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
