//! Transaction Module
//!
//! Payload construction, envelopes, detached signature attachment and
//! publishing.

pub mod envelope;
pub mod era;
pub mod payload;
pub mod publisher;

pub use envelope::{Envelope, SignedPart};
pub use era::{Era, MortalityWindow};
pub use payload::{
    default_signed_extensions, ChainCheckpoint, Mortality, NoncePolicy, PayloadBuilder, PayloadConfig,
    SigningPayload, DEFAULT_SIGNED_EXTENSIONS, FORMAT_VERSION,
};
pub use publisher::{publish, JsonRpcPublisher, Publisher, RejectKind, RejectReason, SubmissionOutcome};
