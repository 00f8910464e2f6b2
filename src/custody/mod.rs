//! Key Custody
//!
//! Owns key material. Keys rest as [`EncryptedKeystore`]s; signing needs an
//! [`UnlockToken`] from [`KeyCustody::unlock`]. Custody signs opaque payload
//! bytes and never inspects them.

pub mod keystore;
pub mod mnemonic;
pub mod session;

pub use keystore::{EncryptedKeystore, KdfParams};
pub use session::UnlockToken;

use crate::crypto::{Signature, SignatureScheme};
use crate::error::{RelayError, RelayResult};
use crate::types::{AccountId, Address, SUBSTRATE_SS58_PREFIX};
use crate::{log_debug, log_info};
use rand::{rngs::OsRng, RngCore};
use session::SessionTable;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

/// Keystore registry plus the unlock sessions opened against it
pub struct KeyCustody {
    keystores: RwLock<HashMap<AccountId, EncryptedKeystore>>,
    sessions: SessionTable,
    kdf_params: KdfParams,
    ss58_prefix: u16,
}

impl Default for KeyCustody {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyCustody {
    pub fn new() -> Self {
        Self {
            keystores: RwLock::new(HashMap::new()),
            sessions: SessionTable::default(),
            kdf_params: KdfParams::default(),
            ss58_prefix: SUBSTRATE_SS58_PREFIX,
        }
    }

    /// KDF parameters used when sealing new keys
    pub fn with_kdf_params(mut self, kdf_params: KdfParams) -> Self {
        self.kdf_params = kdf_params;
        self
    }

    /// Network prefix for addresses of new keys
    pub fn with_ss58_prefix(mut self, ss58_prefix: u16) -> Self {
        self.ss58_prefix = ss58_prefix;
        self
    }

    /// Create a keypair from an OS-random seed
    pub fn generate(&self, scheme: SignatureScheme, passphrase: &str) -> RelayResult<Address> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut seed[..]);
        self.import_seed(scheme, &seed[..], passphrase)
    }

    /// Create a keypair from a fresh 12-word phrase. The phrase is handed back
    /// once for the user to record; custody keeps only the sealed seed.
    pub fn generate_mnemonic(
        &self,
        scheme: SignatureScheme,
        passphrase: &str,
    ) -> RelayResult<(Zeroizing<String>, Address)> {
        let phrase = mnemonic::generate_phrase()?;
        let address = self.import_mnemonic(scheme, &phrase, passphrase)?;
        Ok((phrase, address))
    }

    /// Register key material from a secret URI (`<phrase>[//hard...][///password]`)
    pub fn import_mnemonic(&self, scheme: SignatureScheme, uri: &str, passphrase: &str) -> RelayResult<Address> {
        let seed = mnemonic::seed_from_uri(scheme, uri)?;
        self.import_seed(scheme, &seed[..], passphrase)
    }

    /// Register deterministic key material from a 32-byte seed
    pub fn import_seed(&self, scheme: SignatureScheme, seed: &[u8], passphrase: &str) -> RelayResult<Address> {
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(
            seed.try_into()
                .map_err(|_| RelayError::invalid_input(format!("Seed must be 32 bytes, got {}", seed.len())))?,
        );
        let (mut secret, public) = scheme.keypair_from_seed(&seed[..])?;
        secret.zeroize();

        let address = Address::new(public, self.ss58_prefix)?;
        let keystore = EncryptedKeystore::seal(scheme, &seed, address, passphrase, self.kdf_params)?;
        self.insert(keystore)?;

        log_info!("custody", "Key registered", address = address, scheme = scheme);
        Ok(address)
    }

    /// Register a keystore exported by another custody process
    pub fn import(&self, keystore: EncryptedKeystore) -> RelayResult<Address> {
        let address = keystore.address;
        self.insert(keystore)?;
        log_info!("custody", "Keystore imported", address = address);
        Ok(address)
    }

    /// The sealed keystore of `address`; secret material stays encrypted
    pub fn export(&self, address: &Address) -> RelayResult<EncryptedKeystore> {
        self.keystores
            .read()
            .map_err(|_| RelayError::internal("Keystore lock poisoned"))?
            .get(&address.account_id)
            .cloned()
            .ok_or_else(|| RelayError::key_not_found(format!("No key material for {}", address)))
    }

    /// Managed addresses in SS58 order
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self
            .keystores
            .read()
            .map(|k| k.values().map(|ks| ks.address).collect())
            .unwrap_or_default();
        addresses.sort_by_key(|a| a.to_ss58());
        addresses
    }

    /// Forget key material and revoke its sessions
    pub fn remove(&self, address: &Address) -> RelayResult<()> {
        let removed = self
            .keystores
            .write()
            .map_err(|_| RelayError::internal("Keystore lock poisoned"))?
            .remove(&address.account_id);
        if removed.is_none() {
            return Err(RelayError::key_not_found(format!("No key material for {}", address)));
        }
        self.sessions.revoke_account(&address.account_id)?;
        log_info!("custody", "Key removed", address = address);
        Ok(())
    }

    /// Decrypt the keystore into a session valid for `ttl`
    pub fn unlock(&self, address: &Address, passphrase: &str, ttl: Duration) -> RelayResult<UnlockToken> {
        let keystore = self.export(address)?;
        let seed = keystore.open(passphrase)?;
        let (mut secret, public) = keystore.scheme.keypair_from_seed(&seed[..])?;

        if public != address.account_id {
            secret.zeroize();
            return Err(RelayError::crypto_error(format!(
                "Keystore for {} derives a different public key",
                address
            )));
        }

        let token = self.sessions.open(keystore.address, keystore.scheme, secret, ttl)?;
        log_debug!("custody", "Unlocked", address = address, ttl_secs = ttl.as_secs());
        Ok(token)
    }

    /// Revoke one token. Returns whether it was live.
    pub fn lock(&self, token: &UnlockToken) -> RelayResult<bool> {
        self.sessions.revoke(token)
    }

    /// Revoke every session of `address`
    pub fn lock_all(&self, address: &Address) -> RelayResult<usize> {
        self.sessions.revoke_account(&address.account_id)
    }

    /// Drop sessions past their deadline
    pub fn cleanup_expired(&self) -> RelayResult<usize> {
        self.sessions.cleanup_expired()
    }

    /// Sign opaque payload bytes
    pub fn sign(&self, token: &UnlockToken, payload: &[u8]) -> RelayResult<Signature> {
        let known = self
            .keystores
            .read()
            .map_err(|_| RelayError::internal("Keystore lock poisoned"))?
            .contains_key(&token.address.account_id);
        if !known {
            return Err(RelayError::key_not_found(format!("No key material for {}", token.address)));
        }

        self.sessions.with_secret(token, |scheme, secret| {
            let raw = scheme.sign(secret, payload)?;
            Ok(Signature::new(scheme, raw))
        })
    }

    fn insert(&self, keystore: EncryptedKeystore) -> RelayResult<()> {
        self.keystores
            .write()
            .map_err(|_| RelayError::internal("Keystore lock poisoned"))?
            .insert(keystore.address.account_id, keystore);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::Arc;
    use std::thread;

    fn custody() -> KeyCustody {
        KeyCustody::new().with_kdf_params(KdfParams::light())
    }

    #[test]
    fn test_sign_requires_unlock() {
        let custody = custody();
        let address = custody.generate(SignatureScheme::Sr25519, "pw").unwrap();

        let token = custody.unlock(&address, "pw", Duration::from_secs(60)).unwrap();
        let signature = custody.sign(&token, b"payload").unwrap();
        assert!(signature.verify(address.public_key(), b"payload"));

        assert!(custody.lock(&token).unwrap());
        assert_eq!(custody.sign(&token, b"payload").unwrap_err().code, ErrorCode::KeyLocked);
    }

    #[test]
    fn test_wrong_passphrase() {
        let custody = custody();
        let address = custody.generate(SignatureScheme::Ed25519, "pw").unwrap();
        let err = custody.unlock(&address, "nope", Duration::from_secs(60)).unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyLocked);
    }

    #[test]
    fn test_unknown_address() {
        let custody = custody();
        let stranger = Address::substrate([5; 32]);
        assert_eq!(
            custody.unlock(&stranger, "", Duration::from_secs(1)).unwrap_err().code,
            ErrorCode::KeyNotFound
        );
        assert_eq!(custody.export(&stranger).unwrap_err().code, ErrorCode::KeyNotFound);
    }

    #[test]
    fn test_removed_key_is_not_found() {
        let custody = custody();
        let address = custody.generate(SignatureScheme::Sr25519, "").unwrap();
        let token = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();

        custody.remove(&address).unwrap();
        assert_eq!(custody.sign(&token, b"x").unwrap_err().code, ErrorCode::KeyNotFound);
        assert!(custody.addresses().is_empty());
    }

    #[test]
    fn test_import_seed_is_deterministic() {
        let a = custody().import_seed(SignatureScheme::Ed25519, &[1; 32], "").unwrap();
        let b = custody().import_seed(SignatureScheme::Ed25519, &[1; 32], "other").unwrap();
        assert_eq!(a, b);

        assert_eq!(
            custody().import_seed(SignatureScheme::Ed25519, &[1; 16], "").unwrap_err().code,
            ErrorCode::InvalidInput
        );
    }

    #[test]
    fn test_mnemonic_accounts() {
        let custody = custody();
        let alice = custody.import_mnemonic(SignatureScheme::Sr25519, "//Alice", "").unwrap();
        assert_eq!(alice.to_ss58(), "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY");

        let (phrase, address) = custody.generate_mnemonic(SignatureScheme::Sr25519, "pw").unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert_eq!(self::custody().import_mnemonic(SignatureScheme::Sr25519, &phrase, "").unwrap(), address);

        let token = custody.unlock(&address, "pw", Duration::from_secs(60)).unwrap();
        let signature = custody.sign(&token, b"from phrase").unwrap();
        assert!(signature.verify(address.public_key(), b"from phrase"));

        assert_eq!(
            custody.import_mnemonic(SignatureScheme::Sr25519, "twelve words that are not bip39", "").unwrap_err().code,
            ErrorCode::InvalidMnemonic
        );
    }

    #[test]
    fn test_unlock_rejects_unbounded_ttl() {
        let custody = custody();
        let address = custody.generate(SignatureScheme::Sr25519, "").unwrap();
        let err = custody.unlock(&address, "", Duration::MAX).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let token = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();
        assert!(custody.sign(&token, b"still usable").is_ok());
    }

    #[test]
    fn test_export_import_between_processes() {
        let source = custody();
        let address = source.generate(SignatureScheme::Sr25519, "pw").unwrap();
        let exported = source.export(&address).unwrap().to_json().unwrap();

        let target = custody();
        let imported = target.import(EncryptedKeystore::from_json(&exported).unwrap()).unwrap();
        assert_eq!(imported, address);

        let token = target.unlock(&address, "pw", Duration::from_secs(60)).unwrap();
        let signature = target.sign(&token, b"moved").unwrap();
        assert!(signature.verify(address.public_key(), b"moved"));
    }

    #[test]
    fn test_lock_all() {
        let custody = custody();
        let address = custody.generate(SignatureScheme::Sr25519, "").unwrap();
        let t1 = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();
        let t2 = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();

        assert_eq!(custody.lock_all(&address).unwrap(), 2);
        assert_eq!(custody.sign(&t1, b"x").unwrap_err().code, ErrorCode::KeyLocked);
        assert_eq!(custody.sign(&t2, b"x").unwrap_err().code, ErrorCode::KeyLocked);
    }

    #[test]
    fn test_concurrent_signing() {
        let custody = Arc::new(custody());
        let address = custody.generate(SignatureScheme::Sr25519, "").unwrap();
        let token = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let custody = Arc::clone(&custody);
                let token = token.clone();
                thread::spawn(move || custody.sign(&token, &[i; 16]).unwrap())
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let signature = handle.join().unwrap();
            assert!(signature.verify(address.public_key(), &[i as u8; 16]));
        }
    }
}
