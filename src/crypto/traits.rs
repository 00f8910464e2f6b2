//! Signature Scheme Traits
//!
//! Common interface for the schemes an account can sign extrinsics with.

use super::CurveError;

/// Core trait for a signature scheme
pub trait SignatureCurve {
    /// Secret material kept inside custody
    type SecretKey: AsRef<[u8]>;

    /// Generate a keypair from a 32-byte seed
    fn keypair_from_seed(seed: &[u8]) -> Result<(Self::SecretKey, [u8; 32]), CurveError>;

    /// Sign a message with secret material produced by `keypair_from_seed`
    fn sign(secret_key: &[u8], message: &[u8]) -> Result<[u8; 64], CurveError>;

    /// Verify a signature; malformed keys are errors, bad signatures are `Ok(false)`
    fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<bool, CurveError>;

    /// Seed of the hard child at `chain_code`
    fn derive_hard(seed: &[u8; 32], chain_code: &[u8; 32]) -> Result<[u8; 32], CurveError>;
}

/// Take the leading 32 bytes of a seed
pub(crate) fn seed32(seed: &[u8]) -> Result<[u8; 32], CurveError> {
    if seed.len() < 32 {
        return Err(CurveError::InvalidSeed(format!(
            "Seed must be at least 32 bytes, got {}",
            seed.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&seed[..32]);
    Ok(out)
}
