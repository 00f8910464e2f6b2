//! Shared types
//!
//! Values that cross stage boundaries. SS58 format:
//! https://docs.substrate.io/reference/address-formats/

use crate::error::{RelayError, RelayResult};
use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte account identifier (the public key)
pub type AccountId = [u8; 32];

/// 32-byte block or genesis hash
pub type H256 = [u8; 32];

/// Generic Substrate / dev-chain SS58 prefix
pub const SUBSTRATE_SS58_PREFIX: u16 = 42;

/// Highest prefix the two-byte SS58 form can carry
pub const MAX_SS58_PREFIX: u16 = 16_383;

/// Account address: SS58 network prefix plus public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub account_id: AccountId,
    ss58_prefix: u16,
}

impl Address {
    /// Fails for prefixes the SS58 form cannot carry
    pub fn new(account_id: AccountId, ss58_prefix: u16) -> RelayResult<Self> {
        if ss58_prefix > MAX_SS58_PREFIX {
            return Err(RelayError::invalid_address(format!(
                "SS58 prefix {} exceeds {}",
                ss58_prefix, MAX_SS58_PREFIX
            )));
        }
        Ok(Self { account_id, ss58_prefix })
    }

    /// Address on the generic Substrate prefix (`5...` addresses)
    pub fn substrate(account_id: AccountId) -> Self {
        Self {
            account_id,
            ss58_prefix: SUBSTRATE_SS58_PREFIX,
        }
    }

    pub fn ss58_prefix(&self) -> u16 {
        self.ss58_prefix
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.account_id
    }

    /// Parse from SS58 encoded string
    pub fn from_ss58(s: &str) -> RelayResult<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| RelayError::invalid_address(format!("Invalid base58: {}", e)))?;

        if bytes.is_empty() {
            return Err(RelayError::invalid_address("Empty address"));
        }

        let (prefix, prefix_len) = match bytes[0] {
            0..=63 => (bytes[0] as u16, 1),
            64..=127 => {
                if bytes.len() < 2 {
                    return Err(RelayError::invalid_address("Address too short"));
                }
                let lower = ((bytes[0] as u16) << 2 | (bytes[1] as u16) >> 6) & 0xff;
                let upper = (bytes[1] & 0x3f) as u16;
                (lower | upper << 8, 2)
            }
            _ => return Err(RelayError::invalid_address("Invalid SS58 prefix")),
        };

        if bytes.len() != prefix_len + 32 + 2 {
            return Err(RelayError::invalid_address(format!(
                "Invalid address length: {}",
                bytes.len()
            )));
        }

        let body_end = prefix_len + 32;
        let checksum = ss58_checksum(&bytes[..body_end]);
        if bytes[body_end..] != checksum {
            return Err(RelayError::invalid_address("Invalid checksum"));
        }

        let mut account_id = [0u8; 32];
        account_id.copy_from_slice(&bytes[prefix_len..body_end]);

        Self::new(account_id, prefix)
    }

    /// Encode to SS58 string
    pub fn to_ss58(&self) -> String {
        let prefix = self.ss58_prefix;
        let mut data = Vec::with_capacity(36);

        if prefix < 64 {
            data.push(prefix as u8);
        } else {
            data.push((((prefix & 0b1111_1100) >> 2) | 0b0100_0000) as u8);
            data.push(((prefix >> 8) | ((prefix & 0b11) << 6)) as u8);
        }

        data.extend_from_slice(&self.account_id);
        let checksum = ss58_checksum(&data);
        data.extend_from_slice(&checksum);

        bs58::encode(data).into_string()
    }

    /// Same key, different network prefix
    pub fn with_prefix(self, ss58_prefix: u16) -> RelayResult<Self> {
        Self::new(self.account_id, ss58_prefix)
    }
}

/// First 2 bytes of Blake2b-512("SS58PRE" ‖ data)
fn ss58_checksum(data: &[u8]) -> [u8; 2] {
    const SS58_PREFIX: &[u8] = b"SS58PRE";

    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    let hash = hasher.finalize();

    [hash[0], hash[1]]
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_ss58())
    }
}

impl FromStr for Address {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ss58(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_ss58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_ss58(&s).map_err(serde::de::Error::custom)
    }
}

/// Blake2b-256, Substrate's default hasher
pub fn blake2_256(data: &[u8]) -> H256 {
    use blake2::digest::consts::U32;
    use blake2::Blake2b;

    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
