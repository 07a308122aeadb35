//! Message encoding and decoding.
//!
//! Envelopes, sub-request messages and their returns are all postcard-encoded.

use crate::protocol::{RequestType, ENVELOPE_REQUEST_ID, ENVELOPE_STATUS_CODE};
use anyhow::{Context, Result};
use blake3::Hash;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Compute schema hash from protocol definitions.
///
/// Recorded exchange files carry this hash so that a recording made against
/// a different protocol layout is rejected instead of misdecoded.
pub fn compute_schema_hash() -> u64 {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&ENVELOPE_STATUS_CODE.to_le_bytes());
    hasher.update(&ENVELOPE_REQUEST_ID.to_le_bytes());

    // Message type names (deterministic)
    hasher.update(b"RequestEnvelope");
    hasher.update(b"ResponseEnvelope");
    hasher.update(b"Signature");
    hasher.update(b"AuthTicket");
    hasher.update(b"AuthInfo");

    let hash: Hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(prefix)
}

/// Serialize any wire value to postcard bytes.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).context("Failed to serialize wire value")
}

/// Deserialize a wire value from postcard bytes.
pub fn from_bytes<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    postcard::from_bytes(data).context("Failed to deserialize wire value")
}

/// Decode the return of one sub-request.
pub fn decode_return<T: DeserializeOwned>(data: &[u8], request_type: RequestType) -> Result<T> {
    postcard::from_bytes(data).with_context(|| format!("Failed to decode {request_type:?} return"))
}
