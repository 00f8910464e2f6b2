//! Sr25519 (Schnorr on Ristretto255)
//!
//! Default account scheme of Substrate chains. Signatures are randomized, so two
//! signatures over the same payload differ but both verify.

use super::traits::seed32;
use super::{CurveError, SignatureCurve};
use schnorrkel::derive::ChainCode;
use schnorrkel::{signing_context, ExpansionMode, MiniSecretKey, PublicKey, SecretKey, Signature};

/// Substrate signing context
const SUBSTRATE_SIGNING_CONTEXT: &[u8] = b"substrate";

pub struct Sr25519Curve;

impl SignatureCurve for Sr25519Curve {
    // Expanded secret key (key ‖ nonce)
    type SecretKey = [u8; 64];

    fn keypair_from_seed(seed: &[u8]) -> Result<(Self::SecretKey, [u8; 32]), CurveError> {
        let mini = MiniSecretKey::from_bytes(&seed32(seed)?)
            .map_err(|e| CurveError::InvalidSeed(format!("Invalid mini secret: {:?}", e)))?;
        let keypair = mini.expand_to_keypair(ExpansionMode::Ed25519);
        Ok((keypair.secret.to_bytes(), keypair.public.to_bytes()))
    }

    fn sign(secret_key: &[u8], message: &[u8]) -> Result<[u8; 64], CurveError> {
        let secret = SecretKey::from_bytes(secret_key)
            .map_err(|e| CurveError::InvalidPrivateKey(format!("Invalid secret key: {:?}", e)))?;
        let keypair = secret.to_keypair();
        let context = signing_context(SUBSTRATE_SIGNING_CONTEXT);
        Ok(keypair.sign(context.bytes(message)).to_bytes())
    }

    fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<bool, CurveError> {
        let pk = PublicKey::from_bytes(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(format!("Invalid public key: {:?}", e)))?;
        // A signature without the schnorrkel marker bit is simply not ours
        let sig = match Signature::from_bytes(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let context = signing_context(SUBSTRATE_SIGNING_CONTEXT);
        Ok(pk.verify(context.bytes(message), &sig).is_ok())
    }

    fn derive_hard(seed: &[u8; 32], chain_code: &[u8; 32]) -> Result<[u8; 32], CurveError> {
        let mini = MiniSecretKey::from_bytes(seed)
            .map_err(|e| CurveError::InvalidSeed(format!("Invalid mini secret: {:?}", e)))?;
        let secret = mini.expand(ExpansionMode::Ed25519);
        let (child, _) = secret.hard_derive_mini_secret_key(Some(ChainCode(*chain_code)), b"");
        Ok(child.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sr25519_sign_verify() {
        let (sk, pk) = Sr25519Curve::keypair_from_seed(&[42u8; 32]).unwrap();
        let signature = Sr25519Curve::sign(&sk, b"payload").unwrap();

        assert!(Sr25519Curve::verify(&pk, b"payload", &signature).unwrap());
        assert!(!Sr25519Curve::verify(&pk, b"other payload", &signature).unwrap());
    }

    #[test]
    fn test_sr25519_deterministic_keys() {
        let (_, pk1) = Sr25519Curve::keypair_from_seed(&[7u8; 32]).unwrap();
        let (_, pk2) = Sr25519Curve::keypair_from_seed(&[7u8; 32]).unwrap();
        assert_eq!(pk1, pk2);
    }

    #[test]
    fn test_sr25519_garbage_signature_is_false() {
        let (_, pk) = Sr25519Curve::keypair_from_seed(&[1u8; 32]).unwrap();
        assert!(!Sr25519Curve::verify(&pk, b"payload", &[0u8; 64]).unwrap());
    }

    #[test]
    fn test_sr25519_hard_derivation_changes_key() {
        let child = Sr25519Curve::derive_hard(&[7u8; 32], &[0u8; 32]).unwrap();
        let (_, parent_pk) = Sr25519Curve::keypair_from_seed(&[7u8; 32]).unwrap();
        let (_, child_pk) = Sr25519Curve::keypair_from_seed(&child).unwrap();
        assert_ne!(parent_pk, child_pk);
        assert_eq!(child, Sr25519Curve::derive_hard(&[7u8; 32], &[0u8; 32]).unwrap());
    }

    #[test]
    fn test_sr25519_short_seed() {
        assert!(matches!(
            Sr25519Curve::keypair_from_seed(&[1u8; 16]),
            Err(CurveError::InvalidSeed(_))
        ));
    }
}
