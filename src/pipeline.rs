//! Signing Round
//!
//! One transaction, four stages. Each stage takes and returns hex artifacts so
//! it can run in its own process:
//!
//! 1. `compose`: chain facts + call → unsigned envelope, signing payload
//! 2. `sign`: payload bytes + unlock token → detached signature
//! 3. `attach`: unsigned envelope + signature + payload → signed envelope
//! 4. `publish`: signed envelope → transaction hash
//!
//! A failed round is never repaired in place. On `StaleEnvelopeRejected` the
//! caller starts again from `compose`.

use crate::chain::ChainStateSource;
use crate::codec::{ArgValue, CallRegistry};
use crate::config::RelayConfig;
use crate::crypto::Signature;
use crate::custody::{KeyCustody, UnlockToken};
use crate::error::{RelayError, RelayResult, Stage};
use crate::tx::envelope::Envelope;
use crate::tx::payload::{ChainCheckpoint, PayloadBuilder, SigningPayload};
use crate::tx::publisher::{publish as submit_envelope, Publisher};
use crate::types::{Address, H256};
use crate::{log_debug, log_info};
use serde::{Deserialize, Serialize};

/// Output of the compose stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedRound {
    pub sender: Address,
    pub method: String,
    pub call_hex: String,
    pub payload_hex: String,
    pub envelope_hex: String,
    pub checkpoint: ChainCheckpoint,
}

/// Output of a complete round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReceipt {
    #[serde(with = "crate::utils::serde_hex::bytes32")]
    pub tx_hash: H256,
    pub nonce: u64,
    pub envelope_hex: String,
}

/// Stage functions sharing one call registry and payload builder
pub struct SigningRound {
    registry: CallRegistry,
    builder: PayloadBuilder,
    ss58_prefix: u16,
}

impl SigningRound {
    pub fn new(registry: CallRegistry, builder: PayloadBuilder, ss58_prefix: u16) -> Self {
        Self {
            registry,
            builder,
            ss58_prefix,
        }
    }

    pub fn from_config(registry: CallRegistry, config: &RelayConfig) -> Self {
        Self::new(registry, PayloadBuilder::new(config.payload_config()), config.ss58_prefix)
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    pub fn builder(&self) -> &PayloadBuilder {
        &self.builder
    }

    /// Encode the call, take a fresh chain snapshot and build the payload
    pub fn compose(
        &self,
        chain: &dyn ChainStateSource,
        sender: &Address,
        method: &str,
        args: Vec<ArgValue>,
    ) -> RelayResult<ComposedRound> {
        self.compose_inner(chain, sender, method, args)
            .map_err(|e| e.with_stage(Stage::Compose))
    }

    fn compose_inner(
        &self,
        chain: &dyn ChainStateSource,
        sender: &Address,
        method: &str,
        args: Vec<ArgValue>,
    ) -> RelayResult<ComposedRound> {
        // The envelope wire format drops the prefix; the payload must use the
        // one the attach stage will decode with
        let sender = &sender.with_prefix(self.ss58_prefix)?;
        let call = self.registry.encode(method, args)?;
        let facts = chain.facts(sender)?;
        let payload = self.builder.build(&call, &facts, sender)?;
        let envelope = Envelope::unsigned(*sender, call);

        log_info!(
            "pipeline",
            "Composed",
            sender = sender,
            method = method,
            block = facts.block_number,
            nonce = payload.nonce,
        );

        Ok(ComposedRound {
            sender: *sender,
            method: method.to_string(),
            call_hex: envelope.call.to_hex(),
            payload_hex: payload.to_hex(),
            envelope_hex: envelope.to_hex(),
            checkpoint: payload.checkpoint(),
        })
    }

    /// Sign payload bytes. Custody sees nothing but the bytes.
    pub fn sign(&self, custody: &KeyCustody, token: &UnlockToken, payload_hex: &str) -> RelayResult<String> {
        let sign = || -> RelayResult<String> {
            let bytes = crate::error::decode_hex(payload_hex)?;
            let signature = custody.sign(token, &bytes)?;
            log_debug!("pipeline", "Signed", signer = token.address, signature = signature.to_hex());
            Ok(signature.to_hex())
        };
        sign().map_err(|e| e.with_stage(Stage::Sign))
    }

    /// Verify the signature and produce the signed envelope
    pub fn attach(&self, envelope_hex: &str, signature_hex: &str, payload_hex: &str) -> RelayResult<String> {
        let attach = || -> RelayResult<String> {
            let envelope = Envelope::from_hex(envelope_hex, &self.registry, self.ss58_prefix)?;
            let signature = Signature::from_hex(signature_hex)?;
            let payload = SigningPayload::from_hex(payload_hex)?;
            let signed = envelope.attach(&signature, &payload)?;
            Ok(signed.to_hex())
        };
        attach().map_err(|e| e.with_stage(Stage::Attach))
    }

    /// Submit a signed envelope. Never retries.
    pub fn publish(&self, publisher: &dyn Publisher, envelope_hex: &str) -> RelayResult<H256> {
        let publish = || -> RelayResult<H256> {
            let envelope = Envelope::from_hex(envelope_hex, &self.registry, self.ss58_prefix)?;
            submit_envelope(publisher, &envelope)
        };
        publish().map_err(|e| e.with_stage(Stage::Publish))
    }

    /// One complete round for the token's address
    pub fn run(
        &self,
        chain: &dyn ChainStateSource,
        custody: &KeyCustody,
        token: &UnlockToken,
        publisher: &dyn Publisher,
        method: &str,
        args: Vec<ArgValue>,
    ) -> RelayResult<RoundReceipt> {
        let composed = self.compose(chain, &token.address, method, args)?;
        let signature_hex = self.sign(custody, token, &composed.payload_hex)?;
        let envelope_hex = self.attach(&composed.envelope_hex, &signature_hex, &composed.payload_hex)?;
        let tx_hash = self.publish(publisher, &envelope_hex)?;

        let nonce = SigningPayload::from_hex(&composed.payload_hex)
            .map(|p| p.nonce)
            .map_err(|e| RelayError::internal(format!("Composed payload no longer parses: {}", e)))?;

        Ok(RoundReceipt {
            tx_hash,
            nonce,
            envelope_hex,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainFacts;
    use crate::crypto::SignatureScheme;
    use crate::custody::KdfParams;
    use crate::error::ErrorCode;
    use std::time::Duration;

    struct FixedChain(ChainFacts);

    impl ChainStateSource for FixedChain {
        fn facts(&self, _address: &Address) -> RelayResult<ChainFacts> {
            Ok(self.0.clone())
        }
    }

    struct DownChain;

    impl ChainStateSource for DownChain {
        fn facts(&self, _address: &Address) -> RelayResult<ChainFacts> {
            Err(RelayError::chain_state_unavailable("node unreachable"))
        }
    }

    fn facts() -> ChainFacts {
        ChainFacts {
            genesis_hash: [0x11; 32],
            spec_version: 1,
            tx_version: 1,
            block_number: 10,
            block_hash: [0x22; 32],
            account_nonce: Some(4),
        }
    }

    fn round() -> SigningRound {
        SigningRound::new(CallRegistry::substrate_defaults(), PayloadBuilder::default(), 42)
    }

    #[test]
    fn test_stages_exchange_hex() {
        let custody = KeyCustody::new().with_kdf_params(KdfParams::light());
        let address = custody.generate(SignatureScheme::Sr25519, "").unwrap();
        let token = custody.unlock(&address, "", Duration::from_secs(60)).unwrap();

        let round = round();
        let composed = round
            .compose(
                &FixedChain(facts()),
                &address,
                "System.remark",
                vec![ArgValue::Bytes(b"hi".to_vec())],
            )
            .unwrap();
        assert!(composed.payload_hex.starts_with("0x"));

        let signature_hex = round.sign(&custody, &token, &composed.payload_hex).unwrap();
        let signed_hex = round
            .attach(&composed.envelope_hex, &signature_hex, &composed.payload_hex)
            .unwrap();

        let signed = Envelope::from_hex(&signed_hex, round.registry(), 42).unwrap();
        assert_eq!(signed.signed.as_ref().unwrap().nonce, 4);
        signed.verify(&composed.checkpoint, &round.builder().config().signed_extensions).unwrap();
    }

    #[test]
    fn test_errors_carry_stage() {
        let round = round();
        let err = round
            .compose(&DownChain, &Address::substrate([1; 32]), "System.remark", vec![ArgValue::Bytes(vec![])])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ChainStateUnavailable);
        assert_eq!(err.stage, Some(Stage::Compose));

        let err = round
            .compose(&FixedChain(facts()), &Address::substrate([1; 32]), "Nope.nothing", vec![])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedCall);

        let err = round.attach("0x00", "0x00", "0x00").unwrap_err();
        assert_eq!(err.stage, Some(Stage::Attach));
    }
}
