//! In-process game server answering envelopes from a [`FixtureWorld`].
//!
//! Failures are scripted: the next `n` sends can fail at the transport, the
//! next `n` can be answered as expired, and individual tokens can be marked
//! expired. Every envelope received is kept for inspection.

use crate::call_log::{CallLog, CallRecord};
use crate::fixtures::FixtureWorld;
use anyhow::Result;
use async_trait::async_trait;
use pogo_core::{AuthProvider, FortType, InventoryDelta};
use pogo_net::codec;
use pogo_net::protocol::{
    CatchPokemonResponse, CatchStatus, CheckAwardedBadgesResponse, DownloadItemTemplatesResponse,
    DownloadSettingsMessage, DownloadSettingsResponse, EncounterResponse, EncounterStatus,
    EvolvePokemonResponse, FortDetailsMessage, FortDetailsResponse, FortSearchResponse,
    FortSearchResult, GetHatchedEggsResponse, GetInventoryResponse, GetPlayerResponse,
    LevelUpRewardsResponse, OperationResult, PlayerUpdateResponse, ReleasePokemonResponse,
    UpgradePokemonResponse, UseItemCaptureResponse, UseItemEggIncubatorResponse, STATUS_OK_RPC,
    STATUS_INVALID_AUTH_TOKEN,
};
use pogo_net::{
    AuthTicket, EnvelopeAuth, Request, RequestEnvelope, RequestType, ResponseEnvelope,
    RpcTransport, TransportError,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Lifetime stamped on issued tickets.
pub const TICKET_LIFETIME_MS: u64 = 30 * 60 * 1000;

#[derive(Default)]
struct ScriptState {
    world: FixtureWorld,
    reject_logins: bool,
    tokens_issued: u32,
    expired_tokens: HashSet<String>,
    failures_pending: u32,
    ticketed_failures_pending: u32,
    expiries_pending: u32,
    ticket: Option<AuthTicket>,
    tickets_issued: u32,
    overrides: HashMap<RequestType, Vec<u8>>,
    sent: Vec<RequestEnvelope>,
    logins: Vec<(AuthProvider, String)>,
    call_log: Option<CallLog>,
}

/// Scripted game server.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
}

impl ScriptedTransport {
    /// Server answering from `world`.
    pub fn new(world: FixtureWorld) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                world,
                ..ScriptState::default()
            }),
        }
    }

    /// Also log every answered envelope to a JSONL file at `path`.
    pub fn with_call_log<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.state.get_mut().call_log = Some(CallLog::create(path)?);
        Ok(self)
    }

    /// Fail the next `count` sends with a connection error.
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.failures_pending = count;
    }

    /// Fail the next `count` ticketed sends with a connection error; session
    /// opens still succeed.
    pub async fn fail_ticketed_next(&self, count: u32) {
        self.state.lock().await.ticketed_failures_pending = count;
    }

    /// Answer the next `count` sends with the expired-token status.
    pub async fn expire_next(&self, count: u32) {
        self.state.lock().await.expiries_pending = count;
    }

    /// Treat `token` as expired whenever it is presented.
    pub async fn expire_token(&self, token: &str) {
        self.state.lock().await.expired_tokens.insert(token.to_string());
    }

    /// Make the auth provider issue no token.
    pub async fn reject_logins(&self, reject: bool) {
        self.state.lock().await.reject_logins = reject;
    }

    /// Replace the answer to every `request_type` sub-request.
    pub async fn set_response<R: Serialize>(&self, request_type: RequestType, response: &R) -> Result<()> {
        let bytes = codec::to_bytes(response)?;
        self.state.lock().await.overrides.insert(request_type, bytes);
        Ok(())
    }

    /// Change the world the server answers from.
    pub async fn update_world(&self, update: impl FnOnce(&mut FixtureWorld)) {
        update(&mut self.state.lock().await.world);
    }

    /// Every envelope received, in order.
    pub async fn sent(&self) -> Vec<RequestEnvelope> {
        self.state.lock().await.sent.clone()
    }

    /// Sub-request types of every envelope received.
    pub async fn sent_request_types(&self) -> Vec<Vec<RequestType>> {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .map(RequestEnvelope::request_types)
            .collect()
    }

    /// Number of envelopes received whose first sub-request is `request_type`.
    pub async fn count_of(&self, request_type: RequestType) -> usize {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .filter(|e| e.requests.first().map(|r| r.request_type) == Some(request_type))
            .count()
    }

    /// Provider logins seen, with usernames.
    pub async fn logins(&self) -> Vec<(AuthProvider, String)> {
        self.state.lock().await.logins.clone()
    }

    /// Number of tickets issued so far.
    pub async fn tickets_issued(&self) -> u32 {
        self.state.lock().await.tickets_issued
    }

    /// Forget received envelopes and logins.
    pub async fn clear_history(&self) {
        let mut state = self.state.lock().await;
        state.sent.clear();
        state.logins.clear();
    }
}

impl ScriptState {
    fn issue_ticket(&mut self) -> AuthTicket {
        self.tickets_issued += 1;
        let ticket = AuthTicket {
            start: self.tickets_issued.to_be_bytes().to_vec(),
            expire_timestamp_ms: TICKET_LIFETIME_MS * u64::from(self.tickets_issued),
            end: b"fixture".to_vec(),
        };
        self.ticket = Some(ticket.clone());
        ticket
    }

    fn answer(&mut self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope> {
        let expired = |status| ResponseEnvelope {
            status_code: status,
            request_id: envelope.request_id,
            auth_ticket: None,
            returns: Vec::new(),
        };

        if self.expiries_pending > 0 {
            self.expiries_pending -= 1;
            return Ok(expired(STATUS_INVALID_AUTH_TOKEN));
        }

        let auth_ticket = match &envelope.auth {
            EnvelopeAuth::Info(info) => {
                if self.expired_tokens.contains(&info.token.contents) {
                    return Ok(expired(STATUS_INVALID_AUTH_TOKEN));
                }
                Some(self.issue_ticket())
            }
            EnvelopeAuth::Ticket(ticket) => {
                if self.ticket.as_ref() != Some(ticket) {
                    debug!("Stale auth ticket presented");
                    return Ok(expired(STATUS_INVALID_AUTH_TOKEN));
                }
                None
            }
        };

        let returns = envelope
            .requests
            .iter()
            .map(|request| self.respond(request))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResponseEnvelope {
            status_code: STATUS_OK_RPC,
            request_id: envelope.request_id,
            auth_ticket,
            returns,
        })
    }

    fn respond(&self, request: &Request) -> Result<Vec<u8>> {
        if let Some(bytes) = self.overrides.get(&request.request_type) {
            return Ok(bytes.clone());
        }
        let world = &self.world;
        match request.request_type {
            RequestType::PlayerUpdate => codec::to_bytes(&PlayerUpdateResponse {
                forts: world.map_objects.forts_of_type(FortType::Checkpoint).cloned().collect(),
            }),
            RequestType::GetPlayer => codec::to_bytes(&GetPlayerResponse {
                success: true,
                player_data: Some(world.player.clone()),
            }),
            RequestType::GetInventory => codec::to_bytes(&GetInventoryResponse {
                success: true,
                inventory_delta: InventoryDelta {
                    original_timestamp_ms: 0,
                    new_timestamp_ms: 1,
                    inventory_items: world.inventory.clone(),
                },
            }),
            RequestType::DownloadSettings => {
                let message: DownloadSettingsMessage = codec::from_bytes(&request.request_message)?;
                let settings = (message.hash != world.settings_hash).then(|| world.settings.clone());
                codec::to_bytes(&DownloadSettingsResponse {
                    hash: world.settings_hash.clone(),
                    settings,
                })
            }
            RequestType::DownloadItemTemplates => codec::to_bytes(&DownloadItemTemplatesResponse {
                success: true,
                item_templates: world.item_templates.clone(),
                timestamp_ms: 1,
            }),
            RequestType::GetMapObjects => codec::to_bytes(&world.map_objects),
            RequestType::GetHatchedEggs => codec::to_bytes(&GetHatchedEggsResponse {
                success: true,
                ..GetHatchedEggsResponse::default()
            }),
            RequestType::CheckAwardedBadges => codec::to_bytes(&CheckAwardedBadgesResponse {
                success: true,
                ..CheckAwardedBadgesResponse::default()
            }),
            RequestType::LevelUpRewards => codec::to_bytes(&LevelUpRewardsResponse {
                result: OperationResult::Success,
                ..LevelUpRewardsResponse::default()
            }),
            RequestType::Encounter => codec::to_bytes(&EncounterResponse {
                status: EncounterStatus::EncounterSuccess,
                capture_probability: vec![0.5, 0.7, 0.9],
                ..EncounterResponse::default()
            }),
            RequestType::CatchPokemon => codec::to_bytes(&CatchPokemonResponse {
                status: CatchStatus::CatchSuccess,
                captured_pokemon_id: 5000,
                capture_award_xp: vec![100],
                ..CatchPokemonResponse::default()
            }),
            RequestType::UseItemCapture => codec::to_bytes(&UseItemCaptureResponse {
                success: true,
                item_capture_mult: 1.5,
                item_flee_mult: 1.0,
            }),
            RequestType::UpgradePokemon => codec::to_bytes(&UpgradePokemonResponse {
                result: OperationResult::Success,
                ..UpgradePokemonResponse::default()
            }),
            RequestType::EvolvePokemon => codec::to_bytes(&EvolvePokemonResponse {
                result: OperationResult::Success,
                experience_awarded: 500,
                ..EvolvePokemonResponse::default()
            }),
            RequestType::ReleasePokemon => codec::to_bytes(&ReleasePokemonResponse {
                result: OperationResult::Success,
                candy_awarded: 1,
            }),
            RequestType::FortDetails => {
                let message: FortDetailsMessage = codec::from_bytes(&request.request_message)?;
                codec::to_bytes(&FortDetailsResponse {
                    fort_id: message.fort_id,
                    name: "Fixture Stop".into(),
                    latitude: message.latitude,
                    longitude: message.longitude,
                    fort_type: FortType::Checkpoint,
                    ..FortDetailsResponse::default()
                })
            }
            RequestType::FortSearch => codec::to_bytes(&FortSearchResponse {
                result: FortSearchResult::Success,
                experience_awarded: 50,
                ..FortSearchResponse::default()
            }),
            RequestType::UseItemEggIncubator => codec::to_bytes(&UseItemEggIncubatorResponse {
                result: OperationResult::Success,
                ..UseItemEggIncubatorResponse::default()
            }),
        }
    }

    fn log(&mut self, envelope: &RequestEnvelope, status: Option<i32>) {
        let seq = self.sent.len() as u64 - 1;
        if let Some(log) = self.call_log.as_mut() {
            let record = CallRecord {
                seq,
                requests: envelope.request_types(),
                ticketed: envelope.auth_ticket().is_some(),
                status,
            };
            if let Err(err) = log.write(&record) {
                warn!(error = %err, "Could not write call log");
            }
        }
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn authenticate(
        &self,
        provider: AuthProvider,
        username: &str,
        _secret: &str,
    ) -> Result<Option<String>, TransportError> {
        let mut state = self.state.lock().await;
        state.logins.push((provider, username.to_string()));
        if state.reject_logins {
            return Ok(None);
        }
        state.tokens_issued += 1;
        Ok(Some(format!("token-{}", state.tokens_issued)))
    }

    async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let mut state = self.state.lock().await;
        state.sent.push(envelope.clone());

        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            state.log(&envelope, None);
            return Err(TransportError::Connection("scripted failure".into()));
        }
        if state.ticketed_failures_pending > 0 && envelope.auth_ticket().is_some() {
            state.ticketed_failures_pending -= 1;
            state.log(&envelope, None);
            return Err(TransportError::Connection("scripted rpc failure".into()));
        }

        let response = state
            .answer(&envelope)
            .map_err(|err| TransportError::Malformed(format!("{err:#}")))?;
        state.log(&envelope, Some(response.status_code));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixtureDevice, IdentitySealer};
    use pogo_net::protocol::{DownloadItemTemplatesMessage, GetPlayerMessage};
    use pogo_net::{decode_return, ApiError, RpcClient, SessionSigningState};
    use std::sync::Arc;

    fn client(transport: &Arc<ScriptedTransport>) -> RpcClient {
        RpcClient::new(
            transport.clone(),
            Arc::new(FixtureDevice::default()),
            Arc::new(IdentitySealer),
        )
        .with_signing_state(SessionSigningState::new())
    }

    fn get_player() -> Vec<Request> {
        vec![Request::new(&GetPlayerMessage::default()).unwrap()]
    }

    #[tokio::test]
    async fn login_issues_ticket_and_answers_calls() {
        let transport = Arc::new(ScriptedTransport::new(FixtureWorld::default()));
        let client = client(&transport);

        let token = client.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap();
        assert_eq!(token.as_deref(), Some("token-1"));
        assert!(client.has_ticket().await);

        let returns = client.call(get_player()).await.unwrap();
        let profile: GetPlayerResponse = decode_return(&returns, 0, RequestType::GetPlayer).unwrap();
        assert_eq!(profile.player_data.unwrap().username, "ash");

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].auth_info().is_some());
        assert!(sent[1].auth_ticket().is_some());
        assert_eq!(transport.tickets_issued().await, 1);
        assert_eq!(transport.logins().await, vec![(AuthProvider::Ptc, "ash".to_string())]);
    }

    #[tokio::test]
    async fn scripted_failures_and_expiry() {
        let transport = Arc::new(ScriptedTransport::new(FixtureWorld::default()));
        let client = client(&transport);
        client.login(AuthProvider::Google, "ash", "pikachu").await.unwrap();

        transport.fail_next(1).await;
        assert!(matches!(
            client.call(get_player()).await,
            Err(ApiError::Transport(TransportError::Connection(_)))
        ));

        transport.expire_next(1).await;
        assert!(matches!(
            client.call(get_player()).await,
            Err(ApiError::AccessTokenExpired)
        ));

        assert!(client.call(get_player()).await.is_ok());

        transport.fail_ticketed_next(2).await;
        assert!(client.call(get_player()).await.is_err());
        client.login(AuthProvider::Google, "ash", "pikachu").await.unwrap();
        assert!(client.call(get_player()).await.is_err());
        assert!(client.call(get_player()).await.is_ok());
    }

    #[tokio::test]
    async fn item_templates_come_from_the_world() {
        let world = FixtureWorld::default();
        let templates = world.item_templates.clone();
        let transport = Arc::new(ScriptedTransport::new(world));
        let client = client(&transport);
        client.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap();

        let returns = client
            .call(vec![Request::new(&DownloadItemTemplatesMessage::default()).unwrap()])
            .await
            .unwrap();
        let response: DownloadItemTemplatesResponse =
            decode_return(&returns, 0, RequestType::DownloadItemTemplates).unwrap();
        assert!(response.success);
        assert!(!response.item_templates.is_empty());
        assert_eq!(response.item_templates, templates);
    }

    #[tokio::test]
    async fn expired_token_is_refused_at_session_open() {
        let transport = Arc::new(ScriptedTransport::new(FixtureWorld::default()));
        transport.expire_token("stale").await;
        let client = client(&transport);
        assert!(matches!(
            client.resume(AuthProvider::Ptc, "stale".into()).await,
            Err(ApiError::AccessTokenExpired)
        ));
        assert_eq!(transport.tickets_issued().await, 0);
    }

    #[tokio::test]
    async fn rejected_login_yields_no_token() {
        let transport = Arc::new(ScriptedTransport::new(FixtureWorld::default()));
        transport.reject_logins(true).await;
        let client = client(&transport);
        assert_eq!(client.login(AuthProvider::Ptc, "ash", "x").await.unwrap(), None);
        assert!(transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn call_log_records_each_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        let transport = Arc::new(
            ScriptedTransport::new(FixtureWorld::default())
                .with_call_log(&path)
                .unwrap(),
        );
        let client = client(&transport);
        client.login(AuthProvider::Ptc, "ash", "pikachu").await.unwrap();
        transport.fail_next(1).await;
        let _ = client.call(get_player()).await;

        let records = CallLog::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].ticketed);
        assert_eq!(records[0].status, Some(STATUS_OK_RPC));
        assert!(records[1].ticketed);
        assert_eq!(records[1].status, None);
    }
}
