//! Detached Extrinsic Signing
//!
//! Splits a Substrate transaction into stages that exchange only hex artifacts,
//! so key custody, composition, signing and publishing can run in separate
//! processes.
//!
//! # Architecture
//!
//! This crate provides:
//! - **codec**: Schema-driven SCALE encoding of calls
//! - **chain**: Live chain facts (genesis, runtime versions, block, nonce)
//! - **tx**: Signing payloads, eras, envelopes and publishing
//! - **custody**: Encrypted keystores and unlock-token signing
//! - **pipeline**: The four stages wired together
//! - **config**: Environment-driven settings
//!
//! # Security
//!
//! Key seeds rest encrypted (AES-256-GCM, Argon2id). Unlocked secrets live in
//! `secrecy` boxes and are zeroized when their session ends. The signer sees
//! only payload bytes.
//!
//! # Example
//!
//! ```rust,ignore
//! use detached_extrinsic::{CallRegistry, KeyCustody, RelayConfig, SigningRound};
//!
//! let config = RelayConfig::from_env()?;
//! let chain = JsonRpcChainState::from_config(&config)?;
//! let publisher = JsonRpcPublisher::new(config.rpc_url.clone(), config.request_timeout())?;
//! let round = SigningRound::from_config(CallRegistry::substrate_defaults(), &config);
//!
//! let token = custody.unlock(&address, passphrase, Duration::from_secs(60))?;
//! let receipt = round.run(&chain, &custody, &token, &publisher, "System.remark", args)?;
//! ```

pub mod api;
pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod custody;
pub mod error;
pub mod pipeline;
pub mod tx;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use chain::{ChainFacts, ChainStateSource, JsonRpcChainState};
pub use crate::codec::{ArgType, ArgValue, CallRegistry, MethodId, MethodSchema, UnsignedCall};
pub use config::RelayConfig;
pub use crypto::{Signature, SignatureScheme};
pub use custody::{EncryptedKeystore, KdfParams, KeyCustody, UnlockToken};
pub use error::{ErrorCode, RelayError, RelayResult, Stage};
pub use pipeline::{ComposedRound, RoundReceipt, SigningRound};
pub use tx::{
    ChainCheckpoint, Envelope, Era, JsonRpcPublisher, Mortality, NoncePolicy, PayloadBuilder, PayloadConfig,
    Publisher, RejectKind, RejectReason, SigningPayload, SubmissionOutcome,
};
pub use types::{blake2_256, AccountId, Address, H256};
