//! Envelope assembly and signing.
//!
//! An [`EnvelopeBuilder`] is a snapshot of everything an envelope needs
//! (auth, position, device) and turns a list of sub-requests into a signed
//! [`RequestEnvelope`]. Every envelope built in one process shares the same
//! session hash, held in [`SessionSigningState`].

use crate::codec;
use crate::crypto::SignatureEncryptor;
use crate::device::DeviceCharacteristics;
use crate::hashing;
use crate::protocol::{
    AuthInfo, AuthTicket, EnvelopeAuth, Jwt, PlatformRequest, PlatformRequestType, Request,
    RequestEnvelope, RpcMessage, AUTH_INFO_JWT_UNKNOWN2, ENVELOPE_REQUEST_ID,
    ENVELOPE_STATUS_CODE,
};
use crate::signature::{DeviceSection, Signature};
use anyhow::Context;
use pogo_core::AuthProvider;
use rand::{Rng, RngCore};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Range of the randomized `ms_since_last_locationfix` value.
pub const MS_SINCE_LAST_FIX: std::ops::Range<i64> = 500..1000;

/// Session-lifetime signing state.
///
/// The 32-byte session hash is generated on first use and never changes
/// afterwards. Clones share the same hash.
#[derive(Debug, Clone, Default)]
pub struct SessionSigningState {
    session_hash: Arc<OnceLock<[u8; 32]>>,
}

static PROCESS_SIGNING_STATE: OnceLock<SessionSigningState> = OnceLock::new();

impl SessionSigningState {
    /// A fresh, independent state. Mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state shared by the whole process.
    pub fn process() -> Self {
        PROCESS_SIGNING_STATE.get_or_init(Self::new).clone()
    }

    /// The session hash, generated on first call.
    pub fn session_hash(&self) -> [u8; 32] {
        *self.session_hash.get_or_init(|| {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            debug!("Generated session signing hash");
            bytes
        })
    }

    /// Whether the hash has been generated yet.
    pub fn is_initialized(&self) -> bool {
        self.session_hash.get().is_some()
    }
}

/// Builds signed envelopes for one auth/position snapshot.
#[derive(Clone)]
pub struct EnvelopeBuilder {
    auth_token: String,
    provider: AuthProvider,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    device: Arc<dyn DeviceCharacteristics>,
    encryptor: Arc<dyn SignatureEncryptor>,
    auth_ticket: Option<AuthTicket>,
    signing: SessionSigningState,
}

impl std::fmt::Debug for EnvelopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeBuilder")
            .field("provider", &self.provider)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("accuracy", &self.accuracy)
            .field("has_ticket", &self.auth_ticket.is_some())
            .finish_non_exhaustive()
    }
}

impl EnvelopeBuilder {
    /// Create a builder.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth_token: impl Into<String>,
        provider: AuthProvider,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        device: Arc<dyn DeviceCharacteristics>,
        encryptor: Arc<dyn SignatureEncryptor>,
        auth_ticket: Option<AuthTicket>,
    ) -> Self {
        Self {
            auth_token: auth_token.into(),
            provider,
            latitude,
            longitude,
            accuracy,
            device,
            encryptor,
            auth_ticket,
            signing: SessionSigningState::process(),
        }
    }

    /// Use a specific signing state instead of the process-wide one.
    pub fn with_signing_state(mut self, signing: SessionSigningState) -> Self {
        self.signing = signing;
        self
    }

    /// Envelope for the first call of a session, authenticated with the raw
    /// provider token.
    pub fn build_initial_envelope(&self, requests: Vec<Request>) -> anyhow::Result<RequestEnvelope> {
        let auth = EnvelopeAuth::Info(AuthInfo {
            provider: self.provider.wire_name().to_string(),
            token: Jwt {
                contents: self.auth_token.clone(),
                unknown2: AUTH_INFO_JWT_UNKNOWN2,
            },
        });
        self.sign(self.unsigned(requests, auth))
    }

    /// Envelope for every later call, authenticated with the auth ticket.
    ///
    /// Without a ticket this falls back to the initial form.
    pub fn build_envelope(&self, requests: Vec<Request>) -> anyhow::Result<RequestEnvelope> {
        match &self.auth_ticket {
            Some(ticket) => {
                let auth = EnvelopeAuth::Ticket(ticket.clone());
                self.sign(self.unsigned(requests, auth))
            }
            None => {
                debug!("No auth ticket yet, building envelope with auth info");
                self.build_initial_envelope(requests)
            }
        }
    }

    /// Envelope carrying a single typed message.
    pub fn build_single<M: RpcMessage>(&self, message: &M) -> anyhow::Result<RequestEnvelope> {
        self.build_envelope(vec![Request::new(message)?])
    }

    fn unsigned(&self, requests: Vec<Request>, auth: EnvelopeAuth) -> RequestEnvelope {
        RequestEnvelope {
            status_code: ENVELOPE_STATUS_CODE,
            request_id: ENVELOPE_REQUEST_ID,
            requests,
            platform_requests: Vec::new(),
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            auth,
            ms_since_last_locationfix: rand::thread_rng().gen_range(MS_SINCE_LAST_FIX),
        }
    }

    fn sign(&self, mut envelope: RequestEnvelope) -> anyhow::Result<RequestEnvelope> {
        let session_hash = self.signing.session_hash();
        let auth_seed = envelope
            .auth
            .seed_bytes()
            .context("Failed to serialize auth seed")?;

        let device = {
            let mut rng = rand::thread_rng();
            DeviceSection::read(self.device.as_ref(), &mut rng)
        };

        let request_hash = envelope
            .requests
            .iter()
            .map(|request| {
                let bytes = request.to_bytes()?;
                Ok(hashing::request_hash(&auth_seed, &bytes, device.hash_seed))
            })
            .collect::<anyhow::Result<Vec<u64>>>()?;

        let signature = Signature {
            location_hash1: hashing::location_hash1(
                &auth_seed,
                envelope.latitude,
                envelope.longitude,
                envelope.accuracy,
                device.hash_seed,
            ),
            location_hash2: hashing::location_hash2(
                envelope.latitude,
                envelope.longitude,
                envelope.accuracy,
                device.hash_seed,
            ),
            session_hash,
            version_hash: device.version_hash,
            timestamp: unix_millis(),
            timestamp_since_start: device.time_snapshot,
            device_info: device.device_info,
            activity_status: device.activity_status,
            gps_info: device.gps_info,
            location_fix: device.location_fix,
            request_hash,
            sensor_info: device.sensor_info,
        };

        let plaintext = codec::to_bytes(&signature).context("Failed to serialize signature")?;
        // The sealer takes a 32-bit timestamp; the device snapshot is truncated.
        let sealed = self
            .encryptor
            .seal(&plaintext, device.time_snapshot as u32);

        trace!(
            requests = envelope.requests.len(),
            signature_len = sealed.len(),
            "Signed envelope"
        );

        envelope.platform_requests.push(PlatformRequest {
            request_type: PlatformRequestType::SendEncryptedSignature,
            request_message: sealed,
        });
        Ok(envelope)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Blake3Sealer;
    use crate::device::DeviceProfile;
    use crate::protocol::{GetInventoryMessage, GetPlayerMessage, LevelUpRewardsMessage};

    /// Passes the signature through unsealed so tests can inspect it.
    struct PlainSealer;

    impl SignatureEncryptor for PlainSealer {
        fn seal(&self, plaintext: &[u8], _timestamp: u32) -> Vec<u8> {
            plaintext.to_vec()
        }
    }

    fn ticket() -> AuthTicket {
        AuthTicket {
            start: vec![1, 2, 3],
            expire_timestamp_ms: 1_000,
            end: vec![4, 5, 6],
        }
    }

    fn builder(ticket: Option<AuthTicket>) -> EnvelopeBuilder {
        EnvelopeBuilder::new(
            "token",
            AuthProvider::Google,
            51.5,
            -0.12,
            5.0,
            Arc::new(DeviceProfile::default()),
            Arc::new(PlainSealer),
            ticket,
        )
        .with_signing_state(SessionSigningState::new())
    }

    fn signature_of(envelope: &RequestEnvelope) -> Signature {
        assert_eq!(envelope.platform_requests.len(), 1);
        let platform = &envelope.platform_requests[0];
        assert_eq!(
            platform.request_type,
            PlatformRequestType::SendEncryptedSignature
        );
        codec::from_bytes(&platform.request_message).expect("signature decodes")
    }

    fn requests() -> Vec<Request> {
        vec![
            Request::new(&GetPlayerMessage::default()).unwrap(),
            Request::new(&GetInventoryMessage::default()).unwrap(),
            Request::new(&LevelUpRewardsMessage { level: 3 }).unwrap(),
        ]
    }

    #[test]
    fn initial_envelope_uses_auth_info() {
        let envelope = builder(Some(ticket()))
            .build_initial_envelope(requests())
            .unwrap();
        let info = envelope.auth_info().expect("auth info");
        assert!(envelope.auth_ticket().is_none());
        assert_eq!(info.provider, "google");
        assert_eq!(info.token.contents, "token");
        assert_eq!(info.token.unknown2, 14);
        assert_eq!(envelope.status_code, 2);
        assert_eq!(envelope.request_id, 1_469_378_659_230_941_192);
        assert!((500..1000).contains(&envelope.ms_since_last_locationfix));
    }

    #[test]
    fn later_envelope_uses_ticket() {
        let envelope = builder(Some(ticket())).build_envelope(requests()).unwrap();
        assert_eq!(envelope.auth_ticket(), Some(&ticket()));
        assert!(envelope.auth_info().is_none());
    }

    #[test]
    fn envelope_without_ticket_falls_back_to_auth_info() {
        let envelope = builder(None).build_envelope(requests()).unwrap();
        assert!(envelope.auth_info().is_some());
        assert!(envelope.auth_ticket().is_none());
    }

    #[test]
    fn request_hashes_follow_request_order() {
        let envelope = builder(Some(ticket())).build_envelope(requests()).unwrap();
        let signature = signature_of(&envelope);
        let seed = codec::to_bytes(&ticket()).unwrap();
        let hash_seed = DeviceProfile::default().version.hash_seed;

        let expected: Vec<u64> = envelope
            .requests
            .iter()
            .map(|r| hashing::request_hash(&seed, &r.to_bytes().unwrap(), hash_seed))
            .collect();
        assert_eq!(signature.request_hash.len(), 3);
        assert_eq!(signature.request_hash, expected);
    }

    #[test]
    fn location_hashes_use_envelope_position() {
        let envelope = builder(Some(ticket())).build_envelope(requests()).unwrap();
        let signature = signature_of(&envelope);
        let seed = codec::to_bytes(&ticket()).unwrap();
        let hash_seed = DeviceProfile::default().version.hash_seed;
        assert_eq!(
            signature.location_hash1,
            hashing::location_hash1(&seed, 51.5, -0.12, 5.0, hash_seed)
        );
        assert_eq!(
            signature.location_hash2,
            hashing::location_hash2(51.5, -0.12, 5.0, hash_seed)
        );
    }

    #[test]
    fn session_hash_is_stable_across_builders() {
        let signing = SessionSigningState::new();
        assert!(!signing.is_initialized());

        let first = builder(None).with_signing_state(signing.clone());
        let second = builder(Some(ticket())).with_signing_state(signing.clone());

        let a = signature_of(&first.build_envelope(requests()).unwrap());
        let b = signature_of(&second.build_envelope(requests()).unwrap());
        assert!(signing.is_initialized());
        assert_eq!(a.session_hash, b.session_hash);
        assert_eq!(a.session_hash, signing.session_hash());
    }

    #[test]
    fn independent_states_get_different_hashes() {
        assert_ne!(
            SessionSigningState::new().session_hash(),
            SessionSigningState::new().session_hash()
        );
    }

    #[test]
    fn process_state_is_shared() {
        assert_eq!(
            SessionSigningState::process().session_hash(),
            SessionSigningState::process().session_hash()
        );
    }

    #[test]
    fn blake3_sealed_signature_opens() {
        let builder = EnvelopeBuilder::new(
            "token",
            AuthProvider::Ptc,
            0.0,
            0.0,
            1.0,
            Arc::new(DeviceProfile::default()),
            Arc::new(Blake3Sealer),
            None,
        );
        let envelope = builder.build_single(&GetPlayerMessage::default()).unwrap();
        let sealed = &envelope.platform_requests[0].request_message;
        // The device snapshot may have advanced by a few ms since signing.
        let opened = (0u32..1000).find_map(|ts| Blake3Sealer.open(sealed, ts));
        let signature: Signature = codec::from_bytes(&opened.expect("opens")).unwrap();
        assert_eq!(signature.request_hash.len(), 1);
    }
}
