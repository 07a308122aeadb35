//! Protocol message definitions for client-server communication.
//!
//! Every game action is a sub-request (`Request`) carrying a postcard-encoded
//! message. Sub-requests travel inside a signed [`RequestEnvelope`]; the server
//! answers with a [`ResponseEnvelope`] holding one encoded return per
//! sub-request, in the same order.

use crate::codec;
use pogo_core::{
    EggIncubator, FortData, FortType, GlobalSettings, InventoryDelta, ItemId, ItemTemplate,
    MapCell, PlayerData, PokemonData,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Status code stamped on every outgoing envelope.
pub const ENVELOPE_STATUS_CODE: i32 = 2;

/// Request id stamped on every outgoing envelope.
pub const ENVELOPE_REQUEST_ID: u64 = 1_469_378_659_230_941_192;

/// Constant carried in the JWT block of the auth info.
pub const AUTH_INFO_JWT_UNKNOWN2: i32 = 14;

/// Response status: success.
pub const STATUS_OK: i32 = 1;

/// Response status: success, RPC payload attached.
pub const STATUS_OK_RPC: i32 = 2;

/// Response status: the access token was rejected as expired.
pub const STATUS_INVALID_AUTH_TOKEN: i32 = 102;

/// Maximum number of sub-requests accepted in one envelope.
pub const MAX_SUB_REQUESTS: usize = 16;

/// Game action selector of a sub-request.
///
/// Discriminants match the server's request type numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum RequestType {
    /// Push the player's position.
    PlayerUpdate = 1,
    /// Fetch the player profile.
    GetPlayer = 2,
    /// Fetch the inventory.
    GetInventory = 4,
    /// Fetch global settings.
    DownloadSettings = 5,
    /// Fetch item/pokemon/move templates.
    DownloadItemTemplates = 6,
    /// Spin a pokestop.
    FortSearch = 101,
    /// Start an encounter.
    Encounter = 102,
    /// Throw a ball.
    CatchPokemon = 103,
    /// Fetch fort details.
    FortDetails = 104,
    /// Fetch the world state around the player.
    GetMapObjects = 106,
    /// Transfer a creature.
    ReleasePokemon = 112,
    /// Use a berry during an encounter.
    UseItemCapture = 114,
    /// Evolve a creature.
    EvolvePokemon = 125,
    /// Collect hatched eggs.
    GetHatchedEggs = 126,
    /// Collect level-up rewards.
    LevelUpRewards = 128,
    /// Collect awarded badges.
    CheckAwardedBadges = 129,
    /// Put an egg into an incubator.
    UseItemEggIncubator = 140,
    /// Power up a creature.
    UpgradePokemon = 147,
}

/// One game action inside an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Action selector.
    pub request_type: RequestType,
    /// Encoded action message.
    pub request_message: Vec<u8>,
}

impl Request {
    /// Encode a typed message into a sub-request.
    pub fn new<M: RpcMessage>(message: &M) -> anyhow::Result<Self> {
        Ok(Self {
            request_type: M::REQUEST_TYPE,
            request_message: codec::to_bytes(message)?,
        })
    }

    /// Serialized form used for request hashing.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        codec::to_bytes(self)
    }
}

/// Platform-level sub-request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PlatformRequestType {
    /// Unset.
    Unset = 0,
    /// Carries the sealed signature blob.
    SendEncryptedSignature = 6,
}

/// Platform-level sub-request, appended after the game sub-requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRequest {
    /// Platform request type.
    pub request_type: PlatformRequestType,
    /// Opaque payload.
    pub request_message: Vec<u8>,
}

/// Server-issued ticket replacing raw credentials after the first call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTicket {
    /// Leading opaque bytes.
    pub start: Vec<u8>,
    /// Expiry time.
    pub expire_timestamp_ms: u64,
    /// Trailing opaque bytes.
    pub end: Vec<u8>,
}

/// Raw credentials sent on the first call of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Provider name (`ptc` or `google`).
    pub provider: String,
    /// Provider token.
    pub token: Jwt,
}

/// Provider token block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwt {
    /// Token contents.
    pub contents: String,
    /// Fixed protocol constant.
    pub unknown2: i32,
}

/// Authentication attached to an envelope: exactly one of the two forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeAuth {
    /// Raw provider credentials, used by the initial call.
    Info(AuthInfo),
    /// Server-issued ticket, used by every later call.
    Ticket(AuthTicket),
}

impl EnvelopeAuth {
    /// Serialized bytes of the active auth block, used as the hashing seed.
    pub fn seed_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            EnvelopeAuth::Info(info) => codec::to_bytes(info),
            EnvelopeAuth::Ticket(ticket) => codec::to_bytes(ticket),
        }
    }
}

/// Top-level signed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Always [`ENVELOPE_STATUS_CODE`].
    pub status_code: i32,
    /// Always [`ENVELOPE_REQUEST_ID`].
    pub request_id: u64,
    /// Game sub-requests, in order.
    pub requests: Vec<Request>,
    /// Platform sub-requests; the signature lands here.
    pub platform_requests: Vec<PlatformRequest>,
    /// Claimed latitude.
    pub latitude: f64,
    /// Claimed longitude.
    pub longitude: f64,
    /// Claimed horizontal accuracy.
    pub accuracy: f64,
    /// Authentication.
    pub auth: EnvelopeAuth,
    /// Randomized age of the last location fix.
    pub ms_since_last_locationfix: i64,
}

impl RequestEnvelope {
    /// The auth ticket, when this envelope carries one.
    pub fn auth_ticket(&self) -> Option<&AuthTicket> {
        match &self.auth {
            EnvelopeAuth::Ticket(ticket) => Some(ticket),
            EnvelopeAuth::Info(_) => None,
        }
    }

    /// The auth info, when this envelope carries one.
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        match &self.auth {
            EnvelopeAuth::Info(info) => Some(info),
            EnvelopeAuth::Ticket(_) => None,
        }
    }

    /// Request types in envelope order.
    pub fn request_types(&self) -> Vec<RequestType> {
        self.requests.iter().map(|r| r.request_type).collect()
    }
}

/// Top-level response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Status code; see the `STATUS_*` constants.
    pub status_code: i32,
    /// Echo of the request id.
    pub request_id: u64,
    /// Ticket to use from now on, when the server issues one.
    pub auth_ticket: Option<AuthTicket>,
    /// One encoded return per sub-request, in order.
    pub returns: Vec<Vec<u8>>,
}

impl ResponseEnvelope {
    /// Whether the status code denotes success.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, STATUS_OK | STATUS_OK_RPC)
    }

    /// Verify structural limits against the `sent` sub-requests.
    ///
    /// Fewer returns than sub-requests is not checked here; the caller
    /// reports the first one without a return.
    pub fn verify(&self, sent: usize) -> Result<(), &'static str> {
        if self.returns.len() > MAX_SUB_REQUESTS {
            return Err("Too many returns in response");
        }
        if self.returns.len() > sent {
            return Err("More returns than sub-requests");
        }
        Ok(())
    }
}

/// A typed game action that can be carried as a sub-request.
pub trait RpcMessage: Serialize {
    /// Sub-request selector.
    const REQUEST_TYPE: RequestType;
    /// Type of the matching return.
    type Response: DeserializeOwned;
}

macro_rules! rpc_message {
    ($message:ty => $request_type:ident, $response:ty) => {
        impl RpcMessage for $message {
            const REQUEST_TYPE: RequestType = RequestType::$request_type;
            type Response = $response;
        }
    };
}

/// Push the player's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdateMessage {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Altitude.
    pub altitude: f64,
}

/// Fetch the player profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetPlayerMessage {}

/// Fetch the inventory since a timestamp (`0` for everything).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetInventoryMessage {
    /// Return entries modified after this time.
    pub last_timestamp_ms: i64,
}

/// Fetch global settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadSettingsMessage {
    /// Hash of the settings the client already has.
    pub hash: String,
}

/// Fetch templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadItemTemplatesMessage {}

/// Fetch the world state around a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMapObjectsMessage {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Only return cells changed after this time.
    pub since_timestamp_ms: i64,
}

/// Collect hatched eggs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetHatchedEggsMessage {}

/// Collect awarded badges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckAwardedBadgesMessage {}

/// Collect level-up rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpRewardsMessage {
    /// Level reached.
    pub level: i32,
}

/// Start an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterMessage {
    /// Encounter identity.
    pub encounter_id: u64,
    /// Spawn point.
    pub spawn_point_id: String,
    /// Player latitude.
    pub player_latitude: f64,
    /// Player longitude.
    pub player_longitude: f64,
}

/// Throw a ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchPokemonMessage {
    /// Encounter identity.
    pub encounter_id: u64,
    /// Ball used.
    pub pokeball: ItemId,
    /// Reticle size in `[0, 1.95)`.
    pub normalized_reticle_size: f64,
    /// Spawn point.
    pub spawn_point_id: String,
    /// Whether the throw hit.
    pub hit_pokemon: bool,
    /// Spin in `[0, 1)`.
    pub spin_modifier: f64,
    /// Hit position.
    pub normalized_hit_position: f64,
}

/// Use a berry during an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseItemCaptureMessage {
    /// Item used.
    pub item_id: ItemId,
    /// Encounter identity.
    pub encounter_id: u64,
    /// Spawn point.
    pub spawn_point_id: String,
}

/// Power up a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradePokemonMessage {
    /// Creature instance id.
    pub pokemon_id: u64,
}

/// Evolve a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvePokemonMessage {
    /// Creature instance id.
    pub pokemon_id: u64,
}

/// Transfer a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePokemonMessage {
    /// Creature instance id.
    pub pokemon_id: u64,
}

/// Fetch fort details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortDetailsMessage {
    /// Fort id.
    pub fort_id: String,
    /// Fort latitude.
    pub latitude: f64,
    /// Fort longitude.
    pub longitude: f64,
}

/// Spin a pokestop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortSearchMessage {
    /// Fort id.
    pub fort_id: String,
    /// Fort latitude.
    pub fort_latitude: f64,
    /// Fort longitude.
    pub fort_longitude: f64,
    /// Player latitude.
    pub player_latitude: f64,
    /// Player longitude.
    pub player_longitude: f64,
}

/// Put an egg into an incubator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseItemEggIncubatorMessage {
    /// Incubator id.
    pub item_id: String,
    /// Egg instance id.
    pub pokemon_id: u64,
}

/// Generic result of a creature or item operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// Server left the result unset.
    #[default]
    Unset,
    /// Operation applied.
    Success,
    /// Operation refused with a server-specific code.
    Failed {
        /// Server result code.
        code: u32,
    },
}

/// Player update return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdateResponse {
    /// Forts around the new position.
    pub forts: Vec<FortData>,
}

/// Player profile return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetPlayerResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Profile.
    pub player_data: Option<PlayerData>,
}

/// Inventory return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetInventoryResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Entries.
    pub inventory_delta: InventoryDelta,
}

/// Settings return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadSettingsResponse {
    /// Hash of the returned settings.
    pub hash: String,
    /// Settings, absent when the client hash is current.
    pub settings: Option<GlobalSettings>,
}

/// Templates return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadItemTemplatesResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Templates.
    pub item_templates: Vec<ItemTemplate>,
    /// Server time of the template set.
    pub timestamp_ms: u64,
}

/// Status of a map objects fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapObjectsStatus {
    /// Unset.
    #[default]
    Unset,
    /// Cells returned.
    Success,
    /// Position rejected.
    LocationUnset,
}

/// Map objects return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMapObjectsResponse {
    /// Fetch status.
    pub status: MapObjectsStatus,
    /// Cells around the player.
    pub map_cells: Vec<MapCell>,
}

impl GetMapObjectsResponse {
    /// All catchable creatures across cells.
    pub fn catchable_pokemons(&self) -> impl Iterator<Item = &pogo_core::MapPokemon> {
        self.map_cells.iter().flat_map(|c| c.catchable_pokemons.iter())
    }

    /// All nearby creatures across cells, in cell order.
    pub fn nearby_pokemons(&self) -> impl Iterator<Item = &pogo_core::NearbyPokemon> {
        self.map_cells.iter().flat_map(|c| c.nearby_pokemons.iter())
    }

    /// All forts of one subtype across cells.
    pub fn forts_of_type(&self, fort_type: FortType) -> impl Iterator<Item = &FortData> {
        self.map_cells
            .iter()
            .flat_map(|c| c.forts.iter())
            .filter(move |f| f.fort_type == fort_type)
    }
}

/// Hatched eggs return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetHatchedEggsResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Creatures that hatched.
    pub pokemon_id: Vec<u64>,
    /// Experience per hatch.
    pub experience_awarded: Vec<i32>,
    /// Candy per hatch.
    pub candy_awarded: Vec<i32>,
    /// Stardust per hatch.
    pub stardust_awarded: Vec<i32>,
}

/// Awarded badges return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckAwardedBadgesResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Badge ids.
    pub awarded_badges: Vec<u32>,
    /// Badge levels.
    pub awarded_badge_levels: Vec<i32>,
}

/// An item stack granted by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAward {
    /// Item kind.
    pub item_id: ItemId,
    /// Count.
    pub item_count: i32,
}

/// Level-up rewards return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelUpRewardsResponse {
    /// Result.
    pub result: OperationResult,
    /// Items granted.
    pub items_awarded: Vec<ItemAward>,
    /// Items unlocked.
    pub items_unlocked: Vec<ItemId>,
}

/// Encounter status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterStatus {
    /// Server error.
    #[default]
    EncounterError,
    /// Encounter started.
    EncounterSuccess,
    /// Spawn not found.
    EncounterNotFound,
    /// Encounter closed.
    EncounterClosed,
    /// Creature fled.
    EncounterPokemonFled,
    /// Player too far away.
    EncounterNotInRange,
    /// Already encountered.
    EncounterAlreadyHappened,
    /// No room for another creature.
    PokemonInventoryFull,
}

/// Encounter return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterResponse {
    /// Status.
    pub status: EncounterStatus,
    /// Encountered creature.
    pub pokemon_data: Option<PokemonData>,
    /// Capture probability per ball kind.
    pub capture_probability: Vec<f32>,
}

/// Catch status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchStatus {
    /// Server error.
    #[default]
    CatchError,
    /// Caught.
    CatchSuccess,
    /// Broke out of the ball.
    CatchEscape,
    /// Fled.
    CatchFlee,
    /// Throw missed.
    CatchMissed,
}

/// Catch return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatchPokemonResponse {
    /// Status.
    pub status: CatchStatus,
    /// Miss percentage.
    pub miss_percent: f64,
    /// Instance id of the caught creature.
    pub captured_pokemon_id: u64,
    /// Experience per award reason.
    pub capture_award_xp: Vec<i32>,
}

/// Capture item return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UseItemCaptureResponse {
    /// Whether the item was applied.
    pub success: bool,
    /// Capture multiplier.
    pub item_capture_mult: f64,
    /// Flee multiplier.
    pub item_flee_mult: f64,
}

/// Power-up return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradePokemonResponse {
    /// Result.
    pub result: OperationResult,
    /// Creature after the upgrade.
    pub upgraded_pokemon: Option<PokemonData>,
}

/// Evolve return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolvePokemonResponse {
    /// Result.
    pub result: OperationResult,
    /// Creature after evolution.
    pub evolved_pokemon: Option<PokemonData>,
    /// Experience granted.
    pub experience_awarded: i32,
    /// Candy granted.
    pub candy_awarded: i32,
}

/// Transfer return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleasePokemonResponse {
    /// Result.
    pub result: OperationResult,
    /// Candy granted.
    pub candy_awarded: i32,
}

/// Fort details return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FortDetailsResponse {
    /// Fort id.
    pub fort_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Image urls.
    pub image_urls: Vec<String>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Subtype.
    pub fort_type: FortType,
}

/// Fort search result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FortSearchResult {
    /// Unset.
    #[default]
    NoResultSet,
    /// Items granted.
    Success,
    /// Player too far away.
    OutOfRange,
    /// Fort still cooling down.
    InCooldownPeriod,
    /// Bag full.
    InventoryFull,
}

/// Fort search return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FortSearchResponse {
    /// Result.
    pub result: FortSearchResult,
    /// Items granted.
    pub items_awarded: Vec<ItemAward>,
    /// Experience granted.
    pub experience_awarded: i32,
    /// Next time the fort can be searched.
    pub cooldown_complete_timestamp_ms: i64,
    /// Consecutive search counter.
    pub chain_hack_sequence_number: i32,
}

/// Incubator return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UseItemEggIncubatorResponse {
    /// Result.
    pub result: OperationResult,
    /// Incubator after use.
    pub egg_incubator: Option<EggIncubator>,
}

rpc_message!(PlayerUpdateMessage => PlayerUpdate, PlayerUpdateResponse);
rpc_message!(GetPlayerMessage => GetPlayer, GetPlayerResponse);
rpc_message!(GetInventoryMessage => GetInventory, GetInventoryResponse);
rpc_message!(DownloadSettingsMessage => DownloadSettings, DownloadSettingsResponse);
rpc_message!(DownloadItemTemplatesMessage => DownloadItemTemplates, DownloadItemTemplatesResponse);
rpc_message!(GetMapObjectsMessage => GetMapObjects, GetMapObjectsResponse);
rpc_message!(GetHatchedEggsMessage => GetHatchedEggs, GetHatchedEggsResponse);
rpc_message!(CheckAwardedBadgesMessage => CheckAwardedBadges, CheckAwardedBadgesResponse);
rpc_message!(LevelUpRewardsMessage => LevelUpRewards, LevelUpRewardsResponse);
rpc_message!(EncounterMessage => Encounter, EncounterResponse);
rpc_message!(CatchPokemonMessage => CatchPokemon, CatchPokemonResponse);
rpc_message!(UseItemCaptureMessage => UseItemCapture, UseItemCaptureResponse);
rpc_message!(UpgradePokemonMessage => UpgradePokemon, UpgradePokemonResponse);
rpc_message!(EvolvePokemonMessage => EvolvePokemon, EvolvePokemonResponse);
rpc_message!(ReleasePokemonMessage => ReleasePokemon, ReleasePokemonResponse);
rpc_message!(FortDetailsMessage => FortDetails, FortDetailsResponse);
rpc_message!(FortSearchMessage => FortSearch, FortSearchResponse);
rpc_message!(UseItemEggIncubatorMessage => UseItemEggIncubator, UseItemEggIncubatorResponse);

/// The five calls batched into every map poll.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObjectsBatch {
    /// World state request.
    pub map_objects: GetMapObjectsMessage,
    /// Inventory delta request.
    pub inventory: GetInventoryMessage,
    /// Settings request.
    pub settings: DownloadSettingsMessage,
}

impl MapObjectsBatch {
    /// Encode the batch in server order: map objects, hatched eggs, inventory,
    /// badges, settings.
    pub fn into_requests(self) -> anyhow::Result<Vec<Request>> {
        Ok(vec![
            Request::new(&self.map_objects)?,
            Request::new(&GetHatchedEggsMessage::default())?,
            Request::new(&self.inventory)?,
            Request::new(&CheckAwardedBadgesMessage::default())?,
            Request::new(&self.settings)?,
        ])
    }
}

/// Decoded returns of a [`MapObjectsBatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapObjectsBundle {
    /// World state.
    pub map_objects: GetMapObjectsResponse,
    /// Hatched eggs.
    pub hatched_eggs: GetHatchedEggsResponse,
    /// Inventory delta.
    pub inventory: GetInventoryResponse,
    /// Awarded badges.
    pub badges: CheckAwardedBadgesResponse,
    /// Settings.
    pub settings: DownloadSettingsResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_message_type() {
        let request = Request::new(&LevelUpRewardsMessage { level: 5 }).unwrap();
        assert_eq!(request.request_type, RequestType::LevelUpRewards);
        let decoded: LevelUpRewardsMessage = codec::from_bytes(&request.request_message).unwrap();
        assert_eq!(decoded.level, 5);
    }

    #[test]
    fn map_batch_order_is_fixed() {
        let batch = MapObjectsBatch {
            map_objects: GetMapObjectsMessage {
                latitude: 1.0,
                longitude: 2.0,
                since_timestamp_ms: 0,
            },
            inventory: GetInventoryMessage::default(),
            settings: DownloadSettingsMessage::default(),
        };
        let types: Vec<_> = batch
            .into_requests()
            .unwrap()
            .iter()
            .map(|r| r.request_type)
            .collect();
        assert_eq!(
            types,
            vec![
                RequestType::GetMapObjects,
                RequestType::GetHatchedEggs,
                RequestType::GetInventory,
                RequestType::CheckAwardedBadges,
                RequestType::DownloadSettings,
            ]
        );
    }

    #[test]
    fn response_success_codes() {
        let mut response = ResponseEnvelope {
            status_code: STATUS_OK,
            request_id: ENVELOPE_REQUEST_ID,
            auth_ticket: None,
            returns: vec![],
        };
        assert!(response.is_success());
        response.status_code = STATUS_OK_RPC;
        assert!(response.is_success());
        response.status_code = STATUS_INVALID_AUTH_TOKEN;
        assert!(!response.is_success());
    }

    #[test]
    fn response_verify_rejects_oversized_returns() {
        let response = ResponseEnvelope {
            status_code: STATUS_OK,
            request_id: 0,
            auth_ticket: None,
            returns: vec![Vec::new(); MAX_SUB_REQUESTS + 1],
        };
        assert!(response.verify(MAX_SUB_REQUESTS + 1).is_err());
    }

    #[test]
    fn response_verify_rejects_surplus_returns() {
        let mut response = ResponseEnvelope {
            status_code: STATUS_OK,
            request_id: 0,
            auth_ticket: None,
            returns: vec![Vec::new(); 3],
        };
        assert!(response.verify(2).is_err());
        assert!(response.verify(3).is_ok());
        response.returns.truncate(1);
        assert!(response.verify(3).is_ok());
    }
}
