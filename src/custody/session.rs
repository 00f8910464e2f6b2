//! Unlock sessions
//!
//! An unlock produces a token bound to one address and a deadline. The
//! decrypted secret lives only in the session table and is zeroized when the
//! session ends.

use crate::crypto::SignatureScheme;
use crate::error::{RelayError, RelayResult};
use crate::types::{AccountId, Address};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Capability to sign for one address until it expires or is revoked
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnlockToken {
    pub address: Address,
    id: String,
}

impl UnlockToken {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for UnlockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockToken")
            .field("address", &self.address)
            .field("id", &format_args!("{}...", &self.id[..8.min(self.id.len())]))
            .finish()
    }
}

struct Session {
    account_id: AccountId,
    scheme: SignatureScheme,
    secret: SecretBox<Vec<u8>>,
    expires_at: Instant,
}

#[derive(Default)]
pub(crate) struct SessionTable {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionTable {
    pub fn open(&self, address: Address, scheme: SignatureScheme, secret: Vec<u8>, ttl: Duration) -> RelayResult<UnlockToken> {
        let secret = SecretBox::new(Box::new(secret));
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| RelayError::invalid_input(format!("Unlock ttl of {}s is out of range", ttl.as_secs())))?;

        let id = generate_token_id();
        let session = Session {
            account_id: address.account_id,
            scheme,
            secret,
            expires_at,
        };

        self.sessions
            .write()
            .map_err(|_| RelayError::internal("Session table lock poisoned"))?
            .insert(id.clone(), session);

        Ok(UnlockToken { address, id })
    }

    /// Run `f` with the session's scheme and secret. Unknown, expired or
    /// mismatched tokens fail with `KeyLocked`.
    pub fn with_secret<R>(
        &self,
        token: &UnlockToken,
        f: impl FnOnce(SignatureScheme, &[u8]) -> RelayResult<R>,
    ) -> RelayResult<R> {
        {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| RelayError::internal("Session table lock poisoned"))?;

            let session = sessions
                .get(&token.id)
                .ok_or_else(|| RelayError::key_locked(format!("No unlock session for {}", token.address)))?;

            if session.account_id != token.address.account_id {
                return Err(RelayError::key_locked(format!(
                    "Unlock token does not belong to {}",
                    token.address
                )));
            }

            if Instant::now() < session.expires_at {
                return f(session.scheme, session.secret.expose_secret());
            }
        }

        self.revoke(token)?;
        Err(RelayError::key_locked(format!("Unlock session for {} expired", token.address)))
    }

    pub fn revoke(&self, token: &UnlockToken) -> RelayResult<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::internal("Session table lock poisoned"))?;
        Ok(sessions.remove(&token.id).is_some())
    }

    /// Revoke every session of an account
    pub fn revoke_account(&self, account_id: &AccountId) -> RelayResult<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::internal("Session table lock poisoned"))?;
        let before = sessions.len();
        sessions.retain(|_, s| &s.account_id != account_id);
        Ok(before - sessions.len())
    }

    /// Drop expired sessions
    pub fn cleanup_expired(&self) -> RelayResult<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RelayError::internal("Session table lock poisoned"))?;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok(before - sessions.len())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

fn generate_token_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
