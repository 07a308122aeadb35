#![warn(missing_docs)]
//! Wire protocol and remote calls for the game server.
//!
//! Every call is a signed [`RequestEnvelope`] built by an
//! [`EnvelopeBuilder`] and sent through an [`RpcTransport`]. The
//! [`RpcClient`] ties these together with the [`FailurePolicy`].

pub mod codec;
mod crypto;
mod device;
mod envelope;
mod failure;
pub mod hashing;
pub mod protocol;
mod replay;
mod rpc;
mod signature;

pub use codec::compute_schema_hash;
pub use crypto::{Blake3Sealer, SignatureEncryptor};
pub use device::{
    ActivityStatus, DeviceCharacteristics, DeviceInfo, DeviceProfile, GpsSatellite, LocationFix,
    SensorReadings, VersionData,
};
pub use envelope::{EnvelopeBuilder, SessionSigningState, MS_SINCE_LAST_FIX};
pub use failure::{
    FailureCounter, FailureDecision, FailurePolicy, PolicyState, MAX_RETRIES, RELOGIN_EVERY,
    RETRY_DELAY,
};
pub use protocol::{
    AuthInfo, AuthTicket, EnvelopeAuth, Request, RequestEnvelope, RequestType, ResponseEnvelope,
    RpcMessage,
};
pub use replay::{RecordedExchange, RecordingTransport, ReplayRecord, ReplayTransport};
pub use rpc::{
    decode_return, ApiError, CallOutcome, RpcClient, RpcTransport, SignedPosition,
    TransportError,
};
pub use signature::{normalize, AndroidGpsInfo, SensorInfo, Signature};
