//! Call Codec
//!
//! Schema-driven SCALE encoding of dispatchable calls. A call is encoded as
//! `pallet_index ‖ call_index ‖ args...`, each argument laid out by the type
//! its schema declares. Adding a method means registering a schema; the
//! payload and envelope formats do not change.

pub mod schema;

pub use schema::{ArgSchema, ArgType, ArgValue, MethodId, MethodSchema};

use crate::error::{decode_hex, RelayError, RelayResult};
use std::collections::HashMap;

/// Errors raised while encoding or decoding calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("No method registered at index {0}")]
    UnknownIndex(MethodId),

    #[error("Method {method} already registered at {id}")]
    DuplicateMethod { method: String, id: MethodId },

    #[error("{method} takes {expected} arguments, got {got}")]
    ArityMismatch { method: String, expected: usize, got: usize },

    #[error("{method}: argument `{arg}` expects {expected:?}, got {got:?}")]
    TypeMismatch { method: String, arg: String, expected: ArgType, got: ArgType },

    #[error("Unsupported MultiAddress variant {0}")]
    UnsupportedAddress(u8),

    #[error("{method}: {count} trailing bytes after last argument")]
    TrailingBytes { method: String, count: usize },

    #[error("Invalid SCALE data: {0}")]
    Scale(String),
}

impl From<codec::Error> for CodecError {
    fn from(e: codec::Error) -> Self {
        CodecError::Scale(e.to_string())
    }
}

impl From<CodecError> for RelayError {
    fn from(e: CodecError) -> Self {
        RelayError::malformed_call(e.to_string())
    }
}

/// A composed call: method, ordered arguments, and their canonical bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCall {
    pub method: MethodId,
    pub label: String,
    pub args: Vec<ArgValue>,
    bytes: Vec<u8>,
}

impl UnsignedCall {
    /// Canonical encoding
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }
}

/// Registry of method schemas, looked up by label or by index
#[derive(Debug, Clone, Default)]
pub struct CallRegistry {
    by_id: HashMap<MethodId, MethodSchema>,
    by_label: HashMap<String, MethodId>,
}

impl CallRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the common calls of a Substrate node template runtime
    pub fn substrate_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            MethodSchema::new("System", "remark", MethodId::new(0, 0)).arg("remark", ArgType::Bytes),
            MethodSchema::new("Balances", "transfer_allow_death", MethodId::new(5, 0))
                .arg("dest", ArgType::MultiAddress)
                .arg("value", ArgType::Compact),
            MethodSchema::new("Balances", "transfer_keep_alive", MethodId::new(5, 3))
                .arg("dest", ArgType::MultiAddress)
                .arg("value", ArgType::Compact),
        ];
        for schema in defaults {
            // Static table with distinct indices
            let _ = registry.register(schema);
        }
        registry
    }

    /// Add a method schema. Labels and indices must both be unique.
    pub fn register(&mut self, schema: MethodSchema) -> Result<(), CodecError> {
        let label = schema.label();
        if self.by_id.contains_key(&schema.id) || self.by_label.contains_key(&label) {
            return Err(CodecError::DuplicateMethod { method: label, id: schema.id });
        }
        self.by_label.insert(label, schema.id);
        self.by_id.insert(schema.id, schema);
        Ok(())
    }

    /// Builder-style `register`
    pub fn with(mut self, schema: MethodSchema) -> Result<Self, CodecError> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn schema(&self, label: &str) -> Option<&MethodSchema> {
        self.by_label.get(label).and_then(|id| self.by_id.get(id))
    }

    pub fn schema_by_id(&self, id: MethodId) -> Option<&MethodSchema> {
        self.by_id.get(&id)
    }

    /// Encode `label(args...)`. Deterministic: the bytes depend only on the
    /// schema and the arguments.
    pub fn encode(&self, label: &str, args: Vec<ArgValue>) -> RelayResult<UnsignedCall> {
        let schema = self
            .schema(label)
            .ok_or_else(|| CodecError::UnknownMethod(label.to_string()))?;

        if schema.args.len() != args.len() {
            return Err(CodecError::ArityMismatch {
                method: schema.label(),
                expected: schema.args.len(),
                got: args.len(),
            }
            .into());
        }

        let mut bytes = vec![schema.id.pallet_index, schema.id.call_index];
        for (slot, value) in schema.args.iter().zip(&args) {
            if slot.ty != value.arg_type() {
                return Err(CodecError::TypeMismatch {
                    method: schema.label(),
                    arg: slot.name.clone(),
                    expected: slot.ty,
                    got: value.arg_type(),
                }
                .into());
            }
            value.encode_to(&mut bytes);
        }

        Ok(UnsignedCall {
            method: schema.id,
            label: schema.label(),
            args,
            bytes,
        })
    }

    /// Decode call bytes back into method and arguments. The whole input must be
    /// consumed.
    pub fn decode(&self, bytes: &[u8]) -> RelayResult<UnsignedCall> {
        if bytes.len() < 2 {
            return Err(CodecError::Scale(format!("call is {} bytes, need at least 2", bytes.len())).into());
        }

        let id = MethodId::new(bytes[0], bytes[1]);
        let schema = self.schema_by_id(id).ok_or(CodecError::UnknownIndex(id))?;

        let mut input = &bytes[2..];
        let mut args = Vec::with_capacity(schema.args.len());
        for slot in &schema.args {
            let value = ArgValue::decode_from(slot.ty, &mut input).map_err(|e| match e {
                CodecError::Scale(msg) => CodecError::Scale(format!("{}.{}: {}", schema.label(), slot.name, msg)),
                other => other,
            })?;
            args.push(value);
        }

        if !input.is_empty() {
            return Err(CodecError::TrailingBytes {
                method: schema.label(),
                count: input.len(),
            }
            .into());
        }

        Ok(UnsignedCall {
            method: id,
            label: schema.label(),
            args,
            bytes: bytes.to_vec(),
        })
    }

    /// Decode a hex-encoded call artifact
    pub fn decode_hex(&self, call_hex: &str) -> RelayResult<UnsignedCall> {
        let bytes = decode_hex(call_hex)?;
        self.decode(&bytes)
    }
}
