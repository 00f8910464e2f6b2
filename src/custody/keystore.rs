//! Encrypted Keystore
//!
//! Key seeds at rest, sealed with:
//! - AES-256-GCM for authenticated encryption
//! - Argon2id for key derivation from the passphrase
//! - A random salt and nonce per keystore
//!
//! The address and scheme are stored in the clear; only the seed is secret.

#![allow(deprecated)] // GenericArray::from_slice deprecated in generic-array 1.x

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::SignatureScheme;
use crate::error::{RelayError, RelayResult};
use crate::types::Address;

const KEYSTORE_VERSION: u8 = 1;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Key derivation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // 64 MiB, 3 iterations, 4 lanes
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and throwaway dev keys
    pub fn light() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Exportable, passphrase-sealed key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeystore {
    pub version: u8,
    pub address: Address,
    pub scheme: SignatureScheme,
    /// Salt for key derivation (32 bytes, base64)
    pub salt: String,
    /// AES-GCM nonce (12 bytes, base64)
    pub nonce: String,
    /// Sealed seed plus auth tag (base64)
    pub ciphertext: String,
    pub kdf_params: KdfParams,
}

impl EncryptedKeystore {
    /// Seal `seed` under `passphrase`. An empty passphrase is allowed.
    pub fn seal(
        scheme: SignatureScheme,
        seed: &[u8; 32],
        address: Address,
        passphrase: &str,
        kdf_params: KdfParams,
    ) -> RelayResult<Self> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let key = derive_key(passphrase, &salt, &kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| RelayError::crypto_error(format!("Failed to create cipher: {}", e)))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), &seed[..])
            .map_err(|e| RelayError::crypto_error(format!("Encryption failed: {}", e)))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            address,
            scheme,
            salt: base64_encode(&salt),
            nonce: base64_encode(&nonce_bytes),
            ciphertext: base64_encode(&ciphertext),
            kdf_params,
        })
    }

    /// Recover the seed. A wrong passphrase fails with `KeyLocked`.
    pub(crate) fn open(&self, passphrase: &str) -> RelayResult<Zeroizing<[u8; 32]>> {
        if self.version != KEYSTORE_VERSION {
            return Err(RelayError::invalid_input(format!(
                "Unsupported keystore version: {}",
                self.version
            )));
        }

        let salt = base64_decode(&self.salt)?;
        let nonce_bytes = base64_decode(&self.nonce)?;
        let ciphertext = base64_decode(&self.ciphertext)?;

        if salt.len() != SALT_LEN {
            return Err(RelayError::invalid_input("Invalid salt length"));
        }
        if nonce_bytes.len() != NONCE_LEN {
            return Err(RelayError::invalid_input("Invalid nonce length"));
        }

        let key = derive_key(passphrase, &salt, &self.kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| RelayError::crypto_error(format!("Failed to create cipher: {}", e)))?;

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
                .map_err(|_| {
                    RelayError::key_locked(format!(
                        "Passphrase rejected for {} (or keystore corrupted)",
                        self.address
                    ))
                })?,
        );

        if plaintext.len() != 32 {
            return Err(RelayError::crypto_error("Keystore seed has wrong length"));
        }
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&plaintext);
        Ok(seed)
    }

    pub fn to_json(&self) -> RelayResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> RelayResult<Self> {
        serde_json::from_str(json).map_err(|e| RelayError::parse_error(format!("Invalid keystore JSON: {}", e)))
    }
}

/// Derive the AES key from the passphrase using Argon2id
fn derive_key(passphrase: &str, salt: &[u8], params: &KdfParams) -> RelayResult<Zeroizing<[u8; 32]>> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let argon2_params = Params::new(params.memory_cost, params.time_cost, params.parallelism, Some(32))
        .map_err(|e| RelayError::crypto_error(format!("Invalid KDF params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| RelayError::crypto_error(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn base64_decode(s: &str) -> RelayResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| RelayError::parse_error(format!("Invalid base64: {}", e)))
}
