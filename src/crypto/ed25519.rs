//! Ed25519 (RFC 8032)
//!
//! Accepted by Substrate's `MultiSignature` alongside sr25519.

use super::traits::seed32;
use super::{CurveError, SignatureCurve};
use crate::types::blake2_256;
use codec::Encode;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub struct Ed25519Curve;

impl SignatureCurve for Ed25519Curve {
    type SecretKey = [u8; 32];

    fn keypair_from_seed(seed: &[u8]) -> Result<(Self::SecretKey, [u8; 32]), CurveError> {
        let sk_bytes = seed32(seed)?;
        let signing_key = SigningKey::from_bytes(&sk_bytes);
        Ok((sk_bytes, signing_key.verifying_key().to_bytes()))
    }

    fn sign(secret_key: &[u8], message: &[u8]) -> Result<[u8; 64], CurveError> {
        let sk_bytes: [u8; 32] = secret_key.try_into().map_err(|_| {
            CurveError::InvalidPrivateKey(format!(
                "Private key must be 32 bytes, got {}",
                secret_key.len()
            ))
        })?;
        let signing_key = SigningKey::from_bytes(&sk_bytes);
        Ok(signing_key.sign(message).to_bytes())
    }

    fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<bool, CurveError> {
        let verifying_key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_bytes(signature);
        Ok(verifying_key.verify(message, &sig).is_ok())
    }

    fn derive_hard(seed: &[u8; 32], chain_code: &[u8; 32]) -> Result<[u8; 32], CurveError> {
        Ok(("Ed25519HDKD", seed, chain_code).using_encoded(blake2_256))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_sign_verify() {
        let (sk, pk) = Ed25519Curve::keypair_from_seed(&[42u8; 32]).unwrap();
        let signature = Ed25519Curve::sign(&sk, b"payload").unwrap();

        assert!(Ed25519Curve::verify(&pk, b"payload", &signature).unwrap());
        assert!(!Ed25519Curve::verify(&pk, b"payload!", &signature).unwrap());
    }

    #[test]
    fn test_ed25519_signatures_are_deterministic() {
        let (sk, _) = Ed25519Curve::keypair_from_seed(&[3u8; 32]).unwrap();
        assert_eq!(
            Ed25519Curve::sign(&sk, b"m").unwrap(),
            Ed25519Curve::sign(&sk, b"m").unwrap()
        );
    }

    #[test]
    fn test_ed25519_hard_derivation() {
        let child = Ed25519Curve::derive_hard(&[1u8; 32], &[2u8; 32]).unwrap();
        assert_eq!(child, Ed25519Curve::derive_hard(&[1u8; 32], &[2u8; 32]).unwrap());
        assert_ne!(child, Ed25519Curve::derive_hard(&[1u8; 32], &[3u8; 32]).unwrap());
    }

    #[test]
    fn test_ed25519_rejects_wrong_key_length() {
        assert!(matches!(
            Ed25519Curve::sign(&[0u8; 31], b"m"),
            Err(CurveError::InvalidPrivateKey(_))
        ));
    }
}
