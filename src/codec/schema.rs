//! Call schemas and argument values

use crate::types::{AccountId, H256};
use codec::{Compact, Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::CodecError;

/// Position of a call in the runtime: pallet index and call index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub pallet_index: u8,
    pub call_index: u8,
}

impl MethodId {
    pub fn new(pallet_index: u8, call_index: u8) -> Self {
        Self { pallet_index, call_index }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}", self.pallet_index, self.call_index)
    }
}

/// Wire type of a call argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    U8,
    U16,
    U32,
    U64,
    U128,
    Bool,
    /// `Compact<u128>`
    Compact,
    /// Raw 32-byte account id
    AccountId,
    /// `MultiAddress::Id(AccountId)`
    MultiAddress,
    H256,
    /// Length-prefixed byte vector
    Bytes,
}

/// A call argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Bool(bool),
    Compact(u128),
    AccountId(#[serde(with = "crate::utils::serde_hex::bytes32")] AccountId),
    MultiAddress(#[serde(with = "crate::utils::serde_hex::bytes32")] AccountId),
    H256(#[serde(with = "crate::utils::serde_hex::bytes32")] H256),
    Bytes(#[serde(with = "crate::utils::serde_hex::vec")] Vec<u8>),
}

/// `MultiAddress::Id` variant index
const MULTI_ADDRESS_ID: u8 = 0x00;

impl ArgValue {
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::U8(_) => ArgType::U8,
            Self::U16(_) => ArgType::U16,
            Self::U32(_) => ArgType::U32,
            Self::U64(_) => ArgType::U64,
            Self::U128(_) => ArgType::U128,
            Self::Bool(_) => ArgType::Bool,
            Self::Compact(_) => ArgType::Compact,
            Self::AccountId(_) => ArgType::AccountId,
            Self::MultiAddress(_) => ArgType::MultiAddress,
            Self::H256(_) => ArgType::H256,
            Self::Bytes(_) => ArgType::Bytes,
        }
    }

    pub(crate) fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::U8(v) => v.encode_to(out),
            Self::U16(v) => v.encode_to(out),
            Self::U32(v) => v.encode_to(out),
            Self::U64(v) => v.encode_to(out),
            Self::U128(v) => v.encode_to(out),
            Self::Bool(v) => v.encode_to(out),
            Self::Compact(v) => Compact(*v).encode_to(out),
            Self::AccountId(id) | Self::H256(id) => out.extend_from_slice(id),
            Self::MultiAddress(id) => {
                out.push(MULTI_ADDRESS_ID);
                out.extend_from_slice(id);
            }
            Self::Bytes(bytes) => bytes.encode_to(out),
        }
    }

    pub(crate) fn decode_from(ty: ArgType, input: &mut &[u8]) -> Result<Self, CodecError> {
        let value = match ty {
            ArgType::U8 => Self::U8(u8::decode(input)?),
            ArgType::U16 => Self::U16(u16::decode(input)?),
            ArgType::U32 => Self::U32(u32::decode(input)?),
            ArgType::U64 => Self::U64(u64::decode(input)?),
            ArgType::U128 => Self::U128(u128::decode(input)?),
            ArgType::Bool => Self::Bool(bool::decode(input)?),
            ArgType::Compact => Self::Compact(Compact::<u128>::decode(input)?.0),
            ArgType::AccountId => Self::AccountId(<[u8; 32]>::decode(input)?),
            ArgType::H256 => Self::H256(<[u8; 32]>::decode(input)?),
            ArgType::MultiAddress => {
                let variant = u8::decode(input)?;
                if variant != MULTI_ADDRESS_ID {
                    return Err(CodecError::UnsupportedAddress(variant));
                }
                Self::MultiAddress(<[u8; 32]>::decode(input)?)
            }
            ArgType::Bytes => Self::Bytes(Vec::<u8>::decode(input)?),
        };
        Ok(value)
    }
}

/// Named, typed argument slot of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSchema {
    pub name: String,
    pub ty: ArgType,
}

/// Schema of one dispatchable call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSchema {
    pub pallet: String,
    pub name: String,
    pub id: MethodId,
    pub args: Vec<ArgSchema>,
}

impl MethodSchema {
    pub fn new(pallet: impl Into<String>, name: impl Into<String>, id: MethodId) -> Self {
        Self {
            pallet: pallet.into(),
            name: name.into(),
            id,
            args: Vec::new(),
        }
    }

    /// Append an argument slot
    pub fn arg(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.args.push(ArgSchema { name: name.into(), ty });
        self
    }

    /// `Pallet.method` label
    pub fn label(&self) -> String {
        format!("{}.{}", self.pallet, self.name)
    }
}
