//! Mnemonic key material
//!
//! BIP-39 phrases turned into 32-byte seeds the Substrate way: the phrase's
//! *entropy* (not the BIP-39 seed) goes through PBKDF2-HMAC-SHA512 with salt
//! `"mnemonic" ‖ password`, and the first 32 bytes become the mini secret.
//!
//! Secret URIs follow `<phrase>[//hard...][///password]`. A URI that starts
//! with `//` derives from the development phrase, so `//Alice` is the usual
//! development account. Soft junctions are not supported.

use crate::crypto::SignatureScheme;
use crate::error::{RelayError, RelayResult};
use crate::types::blake2_256;
use bip39::Mnemonic;
use codec::Encode;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

/// Phrase behind the well-known development accounts
pub const DEV_PHRASE: &str = "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

const PBKDF2_ROUNDS: u32 = 2048;

type HmacSha512 = Hmac<Sha512>;

/// Fresh 12-word phrase from OS randomness
pub fn generate_phrase() -> RelayResult<Zeroizing<String>> {
    let mut entropy = Zeroizing::new([0u8; 16]);
    OsRng.fill_bytes(&mut entropy[..]);

    let mnemonic = Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| RelayError::crypto_error(format!("Failed to create mnemonic: {}", e)))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Substrate mini secret of `phrase` under an optional BIP-39 password
pub fn mini_secret_from_phrase(phrase: &str, password: &str) -> RelayResult<Zeroizing<[u8; 32]>> {
    let mnemonic = Mnemonic::parse(phrase).map_err(|e| RelayError::invalid_mnemonic(format!("Invalid mnemonic: {}", e)))?;
    let entropy = Zeroizing::new(mnemonic.to_entropy());

    let salt = Zeroizing::new(format!("mnemonic{}", password));
    let stretched = pbkdf2_sha512(&entropy, salt.as_bytes(), PBKDF2_ROUNDS)?;

    let mut seed = Zeroizing::new([0u8; 32]);
    seed.copy_from_slice(&stretched[..32]);
    Ok(seed)
}

/// Seed for a secret URI under `scheme`, with hard junctions applied
pub fn seed_from_uri(scheme: SignatureScheme, uri: &str) -> RelayResult<Zeroizing<[u8; 32]>> {
    let (rest, password) = match uri.split_once("///") {
        Some((rest, password)) => (rest, password),
        None => (uri, ""),
    };
    let (phrase, path) = match rest.find('/') {
        Some(idx) => (rest[..idx].trim(), &rest[idx..]),
        None => (rest.trim(), ""),
    };
    let phrase = if phrase.is_empty() { DEV_PHRASE } else { phrase };

    let junctions = parse_hard_path(path)?;
    let mut seed = mini_secret_from_phrase(phrase, password)?;
    for junction in junctions {
        let derived = scheme.derive_hard(&seed, &chain_code(junction))?;
        seed = Zeroizing::new(derived);
    }
    Ok(seed)
}

/// `//a//b` → `["a", "b"]`
fn parse_hard_path(path: &str) -> RelayResult<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = path.split("//");
    if parts.next() != Some("") {
        return Err(RelayError::invalid_input("Soft derivation junctions are not supported"));
    }
    parts
        .map(|junction| {
            if junction.is_empty() {
                Err(RelayError::invalid_input("Empty derivation junction"))
            } else if junction.contains('/') {
                Err(RelayError::invalid_input("Soft derivation junctions are not supported"))
            } else {
                Ok(junction)
            }
        })
        .collect()
}

/// Numeric junctions encode as `u64`, others as SCALE strings. Encodings
/// longer than 32 bytes are hashed.
fn chain_code(junction: &str) -> [u8; 32] {
    let encoded = match junction.parse::<u64>() {
        Ok(index) => index.encode(),
        Err(_) => junction.encode(),
    };
    if encoded.len() > 32 {
        return blake2_256(&encoded);
    }
    let mut code = [0u8; 32];
    code[..encoded.len()].copy_from_slice(&encoded);
    code
}

/// Single-block PBKDF2; the output length equals the SHA-512 digest size
fn pbkdf2_sha512(password: &[u8], salt: &[u8], rounds: u32) -> RelayResult<Zeroizing<[u8; 64]>> {
    let keyed = HmacSha512::new_from_slice(password).map_err(|e| RelayError::crypto_error(e.to_string()))?;

    let mut mac = keyed.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block = [0u8; 64];
    block.copy_from_slice(&mac.finalize().into_bytes());

    let mut out = Zeroizing::new(block);
    for _ in 1..rounds {
        let mut mac = keyed.clone();
        mac.update(&block);
        block.copy_from_slice(&mac.finalize().into_bytes());
        for (acc, byte) in out.iter_mut().zip(block.iter()) {
            *acc ^= byte;
        }
    }
    block.zeroize();
    Ok(out)
}
