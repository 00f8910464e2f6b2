//! Envelope
//!
//! An unsigned call plus the sender address, optionally carrying a detached
//! signature with the era, nonce and tip it was produced for.
//!
//! Wire layout (signed, the v4 extrinsic format):
//!
//! ```text
//! compact(len) ‖ 0x84 ‖ 0x00 ‖ key(32) ‖ tag ‖ sig(64) ‖ era ‖ compact(nonce) ‖ compact(tip) ‖ call
//! ```
//!
//! Unsigned envelopes use version byte `0x04` and omit the signature block.

use crate::chain::ChainFacts;
use crate::codec::{CallRegistry, UnsignedCall};
use crate::crypto::Signature;
use crate::error::{decode_hex, RelayError, RelayResult};
use crate::types::{blake2_256, Address, H256};
use codec::{Compact, Decode, Encode};

use super::era::Era;
use super::payload::{ChainCheckpoint, SigningPayload, FORMAT_VERSION};

/// High bit of the version byte marks a signed envelope
const SIGNED_FLAG: u8 = 0b1000_0000;

/// `MultiAddress::Id` variant index
const ADDRESS_ID: u8 = 0x00;

/// Signature block of a signed envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPart {
    pub signature: Signature,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub address: Address,
    pub call: UnsignedCall,
    pub format_version: u8,
    pub signed: Option<SignedPart>,
}

impl Envelope {
    pub fn unsigned(address: Address, call: UnsignedCall) -> Self {
        Self {
            address,
            call,
            format_version: FORMAT_VERSION,
            signed: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    fn version_byte(&self) -> u8 {
        if self.is_signed() {
            self.format_version | SIGNED_FLAG
        } else {
            self.format_version
        }
    }

    /// Length-prefixed wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(110 + self.call.bytes().len());
        body.push(self.version_byte());
        body.push(ADDRESS_ID);
        body.extend_from_slice(&self.address.account_id);

        if let Some(signed) = &self.signed {
            body.extend_from_slice(&signed.signature.encode());
            body.extend_from_slice(&signed.era.encode());
            Compact(signed.nonce).encode_to(&mut body);
            Compact(signed.tip).encode_to(&mut body);
        }
        body.extend_from_slice(self.call.bytes());

        let mut out = Compact(body.len() as u32).encode();
        out.extend_from_slice(&body);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }

    /// Parse wire bytes. The SS58 prefix is not on the wire and is supplied by
    /// the caller; the call is decoded against `registry`.
    pub fn decode(bytes: &[u8], registry: &CallRegistry, ss58_prefix: u16) -> RelayResult<Self> {
        let mut input = bytes;
        let declared = Compact::<u32>::decode(&mut input)?.0 as usize;
        if declared != input.len() {
            return Err(RelayError::parse_error(format!(
                "Envelope declares {} bytes but carries {}",
                declared,
                input.len()
            )));
        }

        let version = u8::decode(&mut input)?;
        let format_version = version & !SIGNED_FLAG;
        if format_version != FORMAT_VERSION {
            return Err(RelayError::parse_error(format!(
                "Unsupported envelope version 0x{:02x}",
                version
            )));
        }

        let address_kind = u8::decode(&mut input)?;
        if address_kind != ADDRESS_ID {
            return Err(RelayError::parse_error(format!(
                "Unsupported sender address variant {}",
                address_kind
            )));
        }
        let account_id = <[u8; 32]>::decode(&mut input)?;

        let signed = if version & SIGNED_FLAG != 0 {
            let raw_signature = <[u8; 65]>::decode(&mut input)?;
            let signature = Signature::decode(&raw_signature)?;
            let era = Era::decode(&mut input)?;
            let nonce = Compact::<u64>::decode(&mut input)?.0;
            let tip = Compact::<u128>::decode(&mut input)?.0;
            Some(SignedPart { signature, era, nonce, tip })
        } else {
            None
        };

        let call = registry.decode(input)?;

        Ok(Self {
            address: Address::new(account_id, ss58_prefix)?,
            call,
            format_version,
            signed,
        })
    }

    pub fn from_hex(envelope_hex: &str, registry: &CallRegistry, ss58_prefix: u16) -> RelayResult<Self> {
        Self::decode(&decode_hex(envelope_hex)?, registry, ss58_prefix)
    }

    /// Blake2-256 of the wire bytes, the hash a node reports on acceptance
    pub fn tx_hash(&self) -> H256 {
        blake2_256(&self.encode())
    }

    /// Attach a detached signature produced over `payload`.
    ///
    /// The signature must verify against the payload's canonical bytes under the
    /// envelope's address, and the payload must describe this envelope's sender
    /// and call. The era, nonce and tip are taken from the payload. Attaching to
    /// an already signed envelope replaces its signature after the same checks.
    pub fn attach(&self, signature: &Signature, payload: &SigningPayload) -> RelayResult<Envelope> {
        if payload.sender != self.address {
            return Err(RelayError::signature_mismatch(format!(
                "Payload sender {} does not match envelope address {}",
                payload.sender, self.address
            )));
        }
        if payload.call != self.call.bytes() {
            return Err(RelayError::signature_mismatch(format!(
                "Payload call does not match envelope call {}",
                self.call.label
            )));
        }
        if payload.format_version != self.format_version {
            return Err(RelayError::signature_mismatch(format!(
                "Payload format version {} does not match envelope version {}",
                payload.format_version, self.format_version
            )));
        }
        if !signature.verify(self.address.public_key(), &payload.canonical_bytes()) {
            return Err(RelayError::signature_mismatch(format!(
                "{} signature does not verify for {}",
                signature.scheme, self.address
            )));
        }

        Ok(Envelope {
            signed: Some(SignedPart {
                signature: *signature,
                era: payload.era,
                nonce: payload.nonce,
                tip: payload.tip,
            }),
            ..self.clone()
        })
    }

    /// Check the embedded signature against the payload rebuilt from
    /// `checkpoint`
    pub fn verify(&self, checkpoint: &ChainCheckpoint, signed_extensions: &[String]) -> RelayResult<()> {
        let payload = SigningPayload::reconstruct(self, checkpoint, signed_extensions)?;
        let signed = self
            .signed
            .as_ref()
            .ok_or_else(|| RelayError::invalid_input("Envelope is not signed"))?;

        if signed.signature.verify(self.address.public_key(), &payload.canonical_bytes()) {
            Ok(())
        } else {
            Err(RelayError::signature_mismatch(format!(
                "Envelope signature does not verify for {} at block {}",
                self.address, checkpoint.block_number
            )))
        }
    }

    /// Local stale check against current chain state: the nonce must not be
    /// consumed and the current block must be inside the era window anchored
    /// at `checkpoint`.
    pub fn check_freshness(&self, checkpoint: &ChainCheckpoint, facts: &ChainFacts) -> RelayResult<()> {
        let signed = self
            .signed
            .as_ref()
            .ok_or_else(|| RelayError::invalid_input("Envelope is not signed"))?;

        if let Some(account_nonce) = facts.account_nonce {
            if signed.nonce < account_nonce {
                return Err(RelayError::stale_envelope(format!(
                    "Nonce {} already used, account is at {}",
                    signed.nonce, account_nonce
                )));
            }
        }

        let window = signed.era.window(checkpoint.block_number);
        if !window.contains(facts.block_number) {
            return Err(RelayError::stale_envelope(format!(
                "Block {} is outside the era window [{}, {})",
                facts.block_number, window.birth, window.death
            )));
        }
        Ok(())
    }
}
