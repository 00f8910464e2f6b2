//! Signing Payload
//!
//! The canonical bytes a signer signs. Field order is a wire contract:
//!
//! | field              | encoding                              |
//! |--------------------|---------------------------------------|
//! | spec version       | u32 LE                                |
//! | tx version         | u32 LE                                |
//! | sender             | u16 LE SS58 prefix, 32-byte key       |
//! | block hash         | 32 bytes                              |
//! | block number       | compact                               |
//! | era                | `0x00` or 2 bytes                     |
//! | genesis hash       | 32 bytes                              |
//! | call               | compact length, bytes                 |
//! | nonce              | compact                               |
//! | signed extensions  | compact count, compact length + UTF-8 |
//! | tip                | compact u128                          |
//! | format version     | u8                                    |
//!
//! Payload bytes are signed as-is, with no pre-hashing of long payloads.

use crate::chain::ChainFacts;
use crate::codec::UnsignedCall;
use crate::error::{decode_hex, RelayError, RelayResult};
use crate::log_warn;
use crate::types::{Address, H256};
use codec::{Compact, Decode, Encode};
use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::era::Era;

/// Extrinsic format version
pub const FORMAT_VERSION: u8 = 4;

/// Signed extensions of a FRAME node template runtime, in order
pub const DEFAULT_SIGNED_EXTENSIONS: [&str; 8] = [
    "CheckNonZeroSender",
    "CheckSpecVersion",
    "CheckTxVersion",
    "CheckGenesis",
    "CheckMortality",
    "CheckNonce",
    "CheckWeight",
    "ChargeTransactionPayment",
];

pub fn default_signed_extensions() -> Vec<String> {
    DEFAULT_SIGNED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

// MARK: - Policies

/// What to do when the chain cannot report the account nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoncePolicy {
    /// Assume a fresh account and use nonce 0
    #[default]
    ZeroWhenAbsent,
    /// Fail with `ChainStateUnavailable`
    Strict,
}

impl NoncePolicy {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "zero-when-absent" | "zero_when_absent" | "zero" => Some(Self::ZeroWhenAbsent),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Requested lifetime of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mortality {
    Immortal,
    /// Requested period in blocks, rounded down to a power of two
    Mortal(u64),
}

impl Default for Mortality {
    fn default() -> Self {
        Mortality::Mortal(64)
    }
}

/// Builder settings that are not chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadConfig {
    pub mortality: Mortality,
    pub nonce_policy: NoncePolicy,
    pub tip: u128,
    pub signed_extensions: Vec<String>,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            mortality: Mortality::default(),
            nonce_policy: NoncePolicy::default(),
            tip: 0,
            signed_extensions: default_signed_extensions(),
        }
    }
}

// MARK: - Checkpoint

/// Chain-side constants a node resolves at validation time
///
/// Together with a signed envelope these reconstruct the exact payload that was
/// signed. For immortal eras the checkpoint is the genesis block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCheckpoint {
    pub spec_version: u32,
    pub tx_version: u32,
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub genesis_hash: H256,
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub block_hash: H256,
    pub block_number: u64,
}

impl ChainCheckpoint {
    /// Checkpoint for an era composed against `facts`
    pub fn from_facts(facts: &ChainFacts, era: &Era) -> Self {
        let (block_hash, block_number) = if era.is_immortal() {
            (facts.genesis_hash, 0)
        } else {
            (facts.block_hash, facts.block_number)
        };
        Self {
            spec_version: facts.spec_version,
            tx_version: facts.tx_version,
            genesis_hash: facts.genesis_hash,
            block_hash,
            block_number,
        }
    }
}

// MARK: - Payload

/// Everything a signer commits to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    pub spec_version: u32,
    pub tx_version: u32,
    pub sender: Address,
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub block_hash: H256,
    pub block_number: u64,
    pub era: Era,
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub genesis_hash: H256,
    #[serde(with = "crate::utils::serde_hex::vec")]
    pub call: Vec<u8>,
    pub nonce: u64,
    pub signed_extensions: Vec<String>,
    pub tip: u128,
    pub format_version: u8,
}

impl SigningPayload {
    /// The bytes a signer signs
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.call.len());
        self.spec_version.encode_to(&mut out);
        self.tx_version.encode_to(&mut out);
        self.sender.ss58_prefix().encode_to(&mut out);
        out.extend_from_slice(&self.sender.account_id);
        out.extend_from_slice(&self.block_hash);
        Compact(self.block_number).encode_to(&mut out);
        out.extend_from_slice(&self.era.encode());
        out.extend_from_slice(&self.genesis_hash);
        self.call.encode_to(&mut out);
        Compact(self.nonce).encode_to(&mut out);
        self.signed_extensions.encode_to(&mut out);
        Compact(self.tip).encode_to(&mut out);
        out.push(self.format_version);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.canonical_bytes()))
    }

    /// Parse canonical bytes. The whole input must be consumed.
    pub fn decode(bytes: &[u8]) -> RelayResult<Self> {
        let mut input = bytes;

        let spec_version = u32::decode(&mut input)?;
        let tx_version = u32::decode(&mut input)?;
        let ss58_prefix = u16::decode(&mut input)?;
        let account_id = <[u8; 32]>::decode(&mut input)?;
        let block_hash = <[u8; 32]>::decode(&mut input)?;
        let block_number = Compact::<u64>::decode(&mut input)?.0;
        let era = Era::decode(&mut input)?;
        let genesis_hash = <[u8; 32]>::decode(&mut input)?;
        let call = Vec::<u8>::decode(&mut input)?;
        let nonce = Compact::<u64>::decode(&mut input)?.0;
        let signed_extensions = Vec::<String>::decode(&mut input)?;
        let tip = Compact::<u128>::decode(&mut input)?.0;
        let format_version = u8::decode(&mut input)?;

        if format_version != FORMAT_VERSION {
            return Err(RelayError::parse_error(format!(
                "Unsupported payload format version {}",
                format_version
            )));
        }
        if !input.is_empty() {
            return Err(RelayError::parse_error(format!(
                "{} trailing bytes after signing payload",
                input.len()
            )));
        }

        Ok(Self {
            spec_version,
            tx_version,
            sender: Address::new(account_id, ss58_prefix)?,
            block_hash,
            block_number,
            era,
            genesis_hash,
            call,
            nonce,
            signed_extensions,
            tip,
            format_version,
        })
    }

    pub fn from_hex(payload_hex: &str) -> RelayResult<Self> {
        Self::decode(&decode_hex(payload_hex)?)
    }

    /// Rebuild the payload a signed envelope committed to
    pub fn reconstruct(
        envelope: &Envelope,
        checkpoint: &ChainCheckpoint,
        signed_extensions: &[String],
    ) -> RelayResult<Self> {
        let signed = envelope
            .signed
            .as_ref()
            .ok_or_else(|| RelayError::invalid_input("Cannot reconstruct a payload from an unsigned envelope"))?;

        let (block_hash, block_number) = if signed.era.is_immortal() {
            (checkpoint.genesis_hash, 0)
        } else {
            (checkpoint.block_hash, checkpoint.block_number)
        };

        Ok(Self {
            spec_version: checkpoint.spec_version,
            tx_version: checkpoint.tx_version,
            sender: envelope.address,
            block_hash,
            block_number,
            era: signed.era,
            genesis_hash: checkpoint.genesis_hash,
            call: envelope.call.bytes().to_vec(),
            nonce: signed.nonce,
            signed_extensions: signed_extensions.to_vec(),
            tip: signed.tip,
            format_version: envelope.format_version,
        })
    }

    /// Checkpoint this payload was anchored to
    pub fn checkpoint(&self) -> ChainCheckpoint {
        ChainCheckpoint {
            spec_version: self.spec_version,
            tx_version: self.tx_version,
            genesis_hash: self.genesis_hash,
            block_hash: self.block_hash,
            block_number: self.block_number,
        }
    }
}

// MARK: - Builder

/// Combines an encoded call with a chain snapshot into a [`SigningPayload`]
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    config: PayloadConfig,
}

impl PayloadBuilder {
    pub fn new(config: PayloadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PayloadConfig {
        &self.config
    }

    /// Deterministic: identical inputs give byte-identical payloads
    pub fn build(&self, call: &UnsignedCall, facts: &ChainFacts, sender: &Address) -> RelayResult<SigningPayload> {
        let era = match self.config.mortality {
            Mortality::Immortal => Era::Immortal,
            Mortality::Mortal(period) => Era::mortal(period, facts.block_number)?,
        };
        let nonce = self.resolve_nonce(facts, sender)?;
        let checkpoint = ChainCheckpoint::from_facts(facts, &era);

        Ok(SigningPayload {
            spec_version: facts.spec_version,
            tx_version: facts.tx_version,
            sender: *sender,
            block_hash: checkpoint.block_hash,
            block_number: checkpoint.block_number,
            era,
            genesis_hash: facts.genesis_hash,
            call: call.bytes().to_vec(),
            nonce,
            signed_extensions: self.config.signed_extensions.clone(),
            tip: self.config.tip,
            format_version: FORMAT_VERSION,
        })
    }

    fn resolve_nonce(&self, facts: &ChainFacts, sender: &Address) -> RelayResult<u64> {
        match (facts.account_nonce, self.config.nonce_policy) {
            (Some(nonce), _) => Ok(nonce),
            (None, NoncePolicy::ZeroWhenAbsent) => {
                log_warn!("payload", "Account nonce unavailable, assuming 0", sender = sender, nonce = 0);
                Ok(0)
            }
            (None, NoncePolicy::Strict) => Err(RelayError::chain_state_unavailable(format!(
                "Account nonce unavailable for {}",
                sender
            ))),
        }
    }
}
