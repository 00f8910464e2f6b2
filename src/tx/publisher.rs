//! Publisher
//!
//! Hands signed envelope bytes to a node and reports what it said. Publishing
//! never retries; a stale rejection means the caller starts a new round.

use crate::api::rpc::{parse_h256, JsonRpcClient, RpcErrorObject};
use crate::error::{RelayError, RelayResult};
use crate::types::H256;
use crate::{log_error, log_info, log_warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::envelope::Envelope;

/// Why a node refused an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Nonce consumed or era expired; rebuild from fresh chain state
    Stale,
    Invalid,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReason {
    pub kind: RejectKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted {
        #[serde(with = "crate::utils::serde_hex::bytes32")]
        tx_hash: H256,
    },
    Rejected(RejectReason),
}

impl SubmissionOutcome {
    /// Map a rejection to the matching pipeline error, message kept verbatim
    pub fn into_result(self) -> RelayResult<H256> {
        match self {
            SubmissionOutcome::Accepted { tx_hash } => Ok(tx_hash),
            SubmissionOutcome::Rejected(RejectReason {
                kind: RejectKind::Stale,
                message,
            }) => Err(RelayError::stale_envelope(message)),
            SubmissionOutcome::Rejected(RejectReason { message, .. }) => Err(RelayError::submission_rejected(message)),
        }
    }
}

/// Submits signed envelope bytes
pub trait Publisher {
    fn submit(&self, envelope: &[u8]) -> RelayResult<SubmissionOutcome>;
}

impl<T: Publisher + ?Sized> Publisher for &T {
    fn submit(&self, envelope: &[u8]) -> RelayResult<SubmissionOutcome> {
        (**self).submit(envelope)
    }
}

/// Submit a signed envelope and map the outcome. Unsigned envelopes are never
/// handed to the publisher.
pub fn publish<P: Publisher + ?Sized>(publisher: &P, envelope: &Envelope) -> RelayResult<H256> {
    if !envelope.is_signed() {
        return Err(RelayError::invalid_input("Refusing to publish an unsigned envelope"));
    }

    let bytes = envelope.encode();
    let outcome = publisher.submit(&bytes).map_err(|e| {
        log_error!(
            "publisher",
            "Submission did not reach the node",
            sender = envelope.address,
            method = envelope.call.label,
            error = e,
        );
        e
    })?;
    match outcome {
        SubmissionOutcome::Accepted { tx_hash } => {
            log_info!(
                "publisher",
                "Envelope accepted",
                sender = envelope.address,
                tx_hash = format!("0x{}", hex::encode(tx_hash)),
            );
            Ok(tx_hash)
        }
        SubmissionOutcome::Rejected(reason) => {
            log_warn!(
                "publisher",
                "Envelope rejected",
                sender = envelope.address,
                kind = format!("{:?}", reason.kind),
                reason = reason.message,
            );
            SubmissionOutcome::Rejected(reason).into_result()
        }
    }
}

// =============================================================================
// JSON-RPC
// =============================================================================

/// `Invalid Transaction` error code of `author_submitExtrinsic`
const INVALID_TRANSACTION: i64 = 1010;

const STALE_MARKERS: [&str; 3] = ["outdated", "stale", "ancient birth block"];

/// Publisher backed by a node's `author_submitExtrinsic`
pub struct JsonRpcPublisher {
    client: JsonRpcClient,
}

impl JsonRpcPublisher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        Ok(Self {
            client: JsonRpcClient::new(url, timeout)?,
        })
    }

    pub fn from_client(client: JsonRpcClient) -> Self {
        Self { client }
    }
}

impl Publisher for JsonRpcPublisher {
    fn submit(&self, envelope: &[u8]) -> RelayResult<SubmissionOutcome> {
        let envelope_hex = format!("0x{}", hex::encode(envelope));
        let reply: Result<String, RpcErrorObject> =
            self.client.request("author_submitExtrinsic", json!([envelope_hex]))?;

        match reply {
            Ok(hash) => Ok(SubmissionOutcome::Accepted {
                tx_hash: parse_h256(&hash)?,
            }),
            Err(error) => Ok(SubmissionOutcome::Rejected(classify_rejection(&error))),
        }
    }
}

/// Sort a node error into a [`RejectReason`]
pub fn classify_rejection(error: &RpcErrorObject) -> RejectReason {
    let message = error.describe();
    let lowered = message.to_lowercase();

    let kind = if STALE_MARKERS.iter().any(|m| lowered.contains(m)) {
        RejectKind::Stale
    } else if error.code == INVALID_TRANSACTION {
        RejectKind::Invalid
    } else {
        RejectKind::Other
    };

    RejectReason { kind, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ArgValue, CallRegistry};
    use crate::crypto::{Signature, SignatureScheme};
    use crate::error::ErrorCode;
    use crate::tx::envelope::SignedPart;
    use crate::tx::era::Era;
    use crate::types::Address;
    use serde_json::Value;
    use std::cell::RefCell;

    struct Scripted {
        outcome: SubmissionOutcome,
        seen: RefCell<Vec<Vec<u8>>>,
    }

    impl Publisher for Scripted {
        fn submit(&self, envelope: &[u8]) -> RelayResult<SubmissionOutcome> {
            self.seen.borrow_mut().push(envelope.to_vec());
            Ok(self.outcome.clone())
        }
    }

    fn rpc_error(code: i64, data: &str) -> RpcErrorObject {
        RpcErrorObject {
            code,
            message: "Invalid Transaction".to_string(),
            data: Some(Value::String(data.to_string())),
        }
    }

    #[test]
    fn test_classify_rejection() {
        assert_eq!(classify_rejection(&rpc_error(1010, "Transaction is outdated")).kind, RejectKind::Stale);
        assert_eq!(
            classify_rejection(&rpc_error(1010, "Transaction has an ancient birth block")).kind,
            RejectKind::Stale
        );
        assert_eq!(
            classify_rejection(&rpc_error(1010, "Transaction has a bad signature")).kind,
            RejectKind::Invalid
        );
        assert_eq!(classify_rejection(&rpc_error(1012, "Priority is too low")).kind, RejectKind::Other);
    }

    #[test]
    fn test_outcome_mapping_keeps_message() {
        let stale = SubmissionOutcome::Rejected(RejectReason {
            kind: RejectKind::Stale,
            message: "Transaction is outdated".to_string(),
        });
        let err = stale.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::StaleEnvelopeRejected);
        assert_eq!(err.message, "Transaction is outdated");

        let invalid = SubmissionOutcome::Rejected(RejectReason {
            kind: RejectKind::Invalid,
            message: "bad signature".to_string(),
        });
        assert_eq!(invalid.into_result().unwrap_err().code, ErrorCode::SubmissionRejected);
    }

    struct Unreachable;

    impl Publisher for Unreachable {
        fn submit(&self, _envelope: &[u8]) -> RelayResult<SubmissionOutcome> {
            Err(RelayError::network("Connection failed"))
        }
    }

    #[test]
    fn test_transport_failure_is_returned() {
        let call = CallRegistry::substrate_defaults()
            .encode("System.remark", vec![ArgValue::Bytes(vec![1])])
            .unwrap();
        let mut envelope = Envelope::unsigned(Address::substrate([1; 32]), call);
        envelope.signed = Some(SignedPart {
            signature: Signature::new(SignatureScheme::Sr25519, [0; 64]),
            era: Era::Immortal,
            nonce: 0,
            tip: 0,
        });

        let err = publish(&Unreachable, &envelope).unwrap_err();
        assert_eq!(err.code, ErrorCode::NetworkError);
        assert_eq!(err.message, "Connection failed");
    }

    #[test]
    fn test_unsigned_envelope_never_submitted() {
        let call = CallRegistry::substrate_defaults()
            .encode("System.remark", vec![ArgValue::Bytes(vec![])])
            .unwrap();
        let envelope = Envelope::unsigned(Address::substrate([1; 32]), call);
        let publisher = Scripted {
            outcome: SubmissionOutcome::Accepted { tx_hash: [0; 32] },
            seen: RefCell::new(Vec::new()),
        };

        let err = publish(&publisher, &envelope).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(publisher.seen.borrow().is_empty());
    }
}
