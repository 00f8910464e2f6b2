//! Unified error types for the signing pipeline
//!
//! Every stage reports failures through [`RelayError`] so a caller can tell
//! which stage failed and retry the whole round from composition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all pipeline operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayError {
    pub code: ErrorCode,
    pub stage: Option<Stage>,
    pub message: String,
    pub details: Option<String>,
}

impl RelayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            stage: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Tag the error with the stage it escaped from. An existing stage is kept.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage.get_or_insert(stage);
        self
    }

    // Convenience constructors
    pub fn malformed_call(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedCall, msg)
    }

    pub fn chain_state_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ChainStateUnavailable, msg)
    }

    pub fn key_locked(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::KeyLocked, msg)
    }

    pub fn key_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::KeyNotFound, msg)
    }

    pub fn signature_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureMismatch, msg)
    }

    pub fn stale_envelope(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::StaleEnvelopeRejected, msg)
    }

    pub fn submission_rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubmissionRejected, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// True for rejections caused by chain state moving on after composition.
    pub fn is_stale(&self) -> bool {
        self.code == ErrorCode::StaleEnvelopeRejected
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.code)?;
        if let Some(stage) = self.stage {
            write!(f, " ({})", stage)?;
        }
        write!(f, " {}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for RelayError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Protocol errors
    MalformedCall,
    ChainStateUnavailable,
    KeyLocked,
    KeyNotFound,
    SignatureMismatch,
    StaleEnvelopeRejected,
    SubmissionRejected,

    // Input errors
    InvalidInput,
    InvalidAddress,
    InvalidMnemonic,

    // Parse errors
    ParseError,
    HexError,
    JsonError,

    // Crypto errors
    CryptoError,

    // Network errors
    NetworkError,
    Timeout,

    // Internal
    Internal,
}

/// Pipeline stage an error escaped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Compose,
    Sign,
    Attach,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Compose => "compose",
            Stage::Sign => "sign",
            Stage::Attach => "attach",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Result type alias for pipeline operations
pub type RelayResult<T> = Result<T, RelayError>;

// Conversions from common error types

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for RelayError {
    fn from(e: hex::FromHexError) -> Self {
        RelayError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<codec::Error> for RelayError {
    fn from(e: codec::Error) -> Self {
        RelayError::new(ErrorCode::ParseError, format!("SCALE decode failed: {}", e))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            RelayError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            RelayError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

/// Decode a hex artifact, tolerating a leading `0x`.
pub(crate) fn decode_hex(input: &str) -> RelayResult<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(body)?)
}
