//! Signature Schemes
//!
//! Accounts sign with one of the schemes of Substrate's `MultiSignature`:
//!
//! - `ed25519`: tag `0x00`
//! - `sr25519`: tag `0x01`, the default for new accounts
//!
//! A detached [`Signature`] carries its scheme tag so a process holding only the
//! signature and the address can verify it.

pub mod ed25519;
pub mod sr25519;
pub mod traits;

pub use ed25519::Ed25519Curve;
pub use sr25519::Sr25519Curve;
pub use traits::SignatureCurve;

use crate::error::{decode_hex, RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// MARK: - Scheme

/// Supported signature schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ed25519,
    Sr25519,
}

impl SignatureScheme {
    /// `MultiSignature` variant index
    pub fn tag(&self) -> u8 {
        match self {
            Self::Ed25519 => 0x00,
            Self::Sr25519 => 0x01,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Ed25519),
            0x01 => Some(Self::Sr25519),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Sr25519 => "sr25519",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ed25519" => Some(Self::Ed25519),
            "sr25519" => Some(Self::Sr25519),
            _ => None,
        }
    }

    /// Derive secret material and public key from a 32-byte seed
    pub fn keypair_from_seed(&self, seed: &[u8]) -> Result<(Vec<u8>, [u8; 32]), CurveError> {
        match self {
            Self::Ed25519 => Ed25519Curve::keypair_from_seed(seed).map(|(sk, pk)| (sk.to_vec(), pk)),
            Self::Sr25519 => Sr25519Curve::keypair_from_seed(seed).map(|(sk, pk)| (sk.to_vec(), pk)),
        }
    }

    pub fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<[u8; 64], CurveError> {
        match self {
            Self::Ed25519 => Ed25519Curve::sign(secret_key, message),
            Self::Sr25519 => Sr25519Curve::sign(secret_key, message),
        }
    }

    pub fn verify(&self, public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<bool, CurveError> {
        match self {
            Self::Ed25519 => Ed25519Curve::verify(public_key, message, signature),
            Self::Sr25519 => Sr25519Curve::verify(public_key, message, signature),
        }
    }

    /// Hard-derive a child seed (`//junction`)
    pub fn derive_hard(&self, seed: &[u8; 32], chain_code: &[u8; 32]) -> Result<[u8; 32], CurveError> {
        match self {
            Self::Ed25519 => Ed25519Curve::derive_hard(seed, chain_code),
            Self::Sr25519 => Sr25519Curve::derive_hard(seed, chain_code),
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// MARK: - Detached signature

/// A signature produced in isolation from the bytes it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub scheme: SignatureScheme,
    #[serde(with = "crate::utils::serde_hex::bytes64")]
    pub bytes: [u8; 64],
}

impl Signature {
    pub fn new(scheme: SignatureScheme, bytes: [u8; 64]) -> Self {
        Self { scheme, bytes }
    }

    /// `MultiSignature` encoding: scheme tag followed by the raw signature
    pub fn encode(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = self.scheme.tag();
        out[1..].copy_from_slice(&self.bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> RelayResult<Self> {
        if bytes.len() != 65 {
            return Err(RelayError::parse_error(format!(
                "Signature must be 65 bytes (tag + 64), got {}",
                bytes.len()
            )));
        }
        let scheme = SignatureScheme::from_tag(bytes[0]).ok_or_else(|| {
            RelayError::parse_error(format!("Unknown signature scheme tag: 0x{:02x}", bytes[0]))
        })?;
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&bytes[1..]);
        Ok(Self::new(scheme, raw))
    }

    /// Hex transport form (`0x`-prefixed, tagged)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }

    pub fn from_hex(s: &str) -> RelayResult<Self> {
        Self::decode(&decode_hex(s)?)
    }

    /// Check this signature against `message` and a 32-byte public key
    pub fn verify(&self, public_key: &[u8; 32], message: &[u8]) -> bool {
        self.scheme
            .verify(public_key, message, &self.bytes)
            .unwrap_or(false)
    }
}

// MARK: - Errors

/// Errors raised by scheme implementations
#[derive(Debug, Clone, thiserror::Error)]
pub enum CurveError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl From<CurveError> for RelayError {
    fn from(e: CurveError) -> Self {
        RelayError::crypto_error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_tags() {
        for scheme in [SignatureScheme::Ed25519, SignatureScheme::Sr25519] {
            assert_eq!(SignatureScheme::from_tag(scheme.tag()), Some(scheme));
            assert_eq!(SignatureScheme::from_name(scheme.name()), Some(scheme));
        }
        assert_eq!(SignatureScheme::from_tag(0x02), None);
    }

    #[test]
    fn test_signature_hex_transport() {
        let (sk, pk) = SignatureScheme::Sr25519.keypair_from_seed(&[9u8; 32]).unwrap();
        let raw = SignatureScheme::Sr25519.sign(&sk, b"bytes").unwrap();
        let sig = Signature::new(SignatureScheme::Sr25519, raw);

        let hex = sig.to_hex();
        assert!(hex.starts_with("0x01"));
        assert_eq!(hex.len(), 2 + 65 * 2);

        let parsed = Signature::from_hex(&hex).unwrap();
        assert_eq!(parsed, sig);
        assert!(parsed.verify(&pk, b"bytes"));
    }

    #[test]
    fn test_signature_rejects_unknown_tag() {
        let mut encoded = [0u8; 65];
        encoded[0] = 0x02; // ecdsa is not supported here
        assert!(Signature::decode(&encoded).is_err());
        assert!(Signature::decode(&encoded[..10]).is_err());
    }

    #[test]
    fn test_scheme_mismatch_does_not_verify() {
        let (sk, pk) = SignatureScheme::Ed25519.keypair_from_seed(&[5u8; 32]).unwrap();
        let raw = SignatureScheme::Ed25519.sign(&sk, b"bytes").unwrap();
        let mislabeled = Signature::new(SignatureScheme::Sr25519, raw);
        assert!(!mislabeled.verify(&pk, b"bytes"));
    }
}
