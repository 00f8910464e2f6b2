//! In-memory chain shared by the integration tests
//!
//! Acts as both the chain state source and the publisher. Submissions are
//! checked the way a node would: signature against the payload rebuilt from
//! the era's birth block, then the nonce.

#![allow(dead_code)]

use detached_extrinsic::{
    blake2_256, AccountId, Address, ArgType, CallRegistry, ChainCheckpoint, ChainFacts, ChainStateSource, Envelope,
    MethodId, MethodSchema, Publisher, RejectKind, RejectReason, RelayResult, SubmissionOutcome, H256,
};
use std::collections::HashMap;
use std::sync::Mutex;

pub const ALICE_SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

/// Secret seed of the `//Alice` development account (sr25519)
pub const ALICE_SEED: &str = "e5be9a5092b81bca64be81d212e7f2f9eba183bb7a90954f7b76361f6edb5c0a";

pub const GENESIS: H256 = [0x9a; 32];
pub const SPEC_VERSION: u32 = 100;
pub const TX_VERSION: u32 = 1;

/// Call registry with the node template defaults plus `Pogrs.mint`
pub fn registry() -> CallRegistry {
    CallRegistry::substrate_defaults()
        .with(
            MethodSchema::new("Pogrs", "mint", MethodId::new(8, 0))
                .arg("amount", ArgType::Compact)
                .arg("to", ArgType::AccountId),
        )
        .expect("mint index is free")
}

pub fn block_hash(number: u64) -> H256 {
    if number == 0 {
        GENESIS
    } else {
        blake2_256(&number.to_le_bytes())
    }
}

struct State {
    block_number: u64,
    nonces: HashMap<AccountId, u64>,
    report_nonce: bool,
    accepted: Vec<H256>,
}

pub struct SimulatedChain {
    registry: CallRegistry,
    extensions: Vec<String>,
    state: Mutex<State>,
}

impl SimulatedChain {
    pub fn new(block_number: u64, extensions: Vec<String>) -> Self {
        Self {
            registry: registry(),
            extensions,
            state: Mutex::new(State {
                block_number,
                nonces: HashMap::new(),
                report_nonce: true,
                accepted: Vec::new(),
            }),
        }
    }

    pub fn set_block(&self, number: u64) {
        self.state.lock().unwrap().block_number = number;
    }

    pub fn set_nonce(&self, account: &AccountId, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(*account, nonce);
    }

    pub fn nonce(&self, account: &AccountId) -> u64 {
        *self.state.lock().unwrap().nonces.get(account).unwrap_or(&0)
    }

    /// Make the nonce query fail, as a node without the account RPC would
    pub fn hide_nonce(&self) {
        self.state.lock().unwrap().report_nonce = false;
    }

    pub fn accepted(&self) -> Vec<H256> {
        self.state.lock().unwrap().accepted.clone()
    }

    fn reject(kind: RejectKind, message: &str) -> SubmissionOutcome {
        SubmissionOutcome::Rejected(RejectReason {
            kind,
            message: message.to_string(),
        })
    }
}

impl ChainStateSource for SimulatedChain {
    fn facts(&self, address: &Address) -> RelayResult<ChainFacts> {
        let state = self.state.lock().unwrap();
        let nonce = *state.nonces.get(&address.account_id).unwrap_or(&0);
        Ok(ChainFacts {
            genesis_hash: GENESIS,
            spec_version: SPEC_VERSION,
            tx_version: TX_VERSION,
            block_number: state.block_number,
            block_hash: block_hash(state.block_number),
            account_nonce: state.report_nonce.then_some(nonce),
        })
    }
}

impl Publisher for SimulatedChain {
    fn submit(&self, bytes: &[u8]) -> RelayResult<SubmissionOutcome> {
        let envelope = match Envelope::decode(bytes, &self.registry, 42) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(Self::reject(RejectKind::Invalid, &e.message)),
        };
        let Some(signed) = envelope.signed.clone() else {
            return Ok(Self::reject(RejectKind::Invalid, "Unsigned extrinsic"));
        };

        let mut state = self.state.lock().unwrap();
        let birth = signed.era.birth(state.block_number);
        let checkpoint = ChainCheckpoint {
            spec_version: SPEC_VERSION,
            tx_version: TX_VERSION,
            genesis_hash: GENESIS,
            block_hash: block_hash(birth),
            block_number: birth,
        };

        if envelope.verify(&checkpoint, &self.extensions).is_err() {
            return Ok(Self::reject(RejectKind::Invalid, "Transaction has a bad signature"));
        }

        let expected = *state.nonces.get(&envelope.address.account_id).unwrap_or(&0);
        if signed.nonce < expected {
            return Ok(Self::reject(RejectKind::Stale, "Transaction is outdated"));
        }
        if signed.nonce > expected {
            return Ok(Self::reject(RejectKind::Other, "Transaction will be valid in the future"));
        }

        state.nonces.insert(envelope.address.account_id, expected + 1);
        let tx_hash = blake2_256(bytes);
        state.accepted.push(tx_hash);
        Ok(SubmissionOutcome::Accepted { tx_hash })
    }
}
