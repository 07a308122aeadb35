//! Session lifecycle and the polling loop.
//!
//! [`SessionManager`] owns the auth session, the long-lived views and the
//! failure policy. Every remote call goes through [`SessionManager::execute`],
//! which turns [`CallOutcome::ReloginRequired`] into a full relogin and then
//! re-issues the call. A relogin that fails counts against the same policy
//! and stays pending until one succeeds.

use crate::cache::DataCache;
use crate::credentials::{CredentialStore, CredentialStoreExt, UserCredentials, AUTH_TOKEN, LAST_PROVIDER};
use crate::error::SessionError;
use crate::inventory::{player_stats, InventoryView};
use crate::location::{distance_meters, LocationFeed};
use crate::map_view::{MapUpdate, MapView};
use crate::templates::{self, ItemTemplates};
use pogo_core::{
    AuthProvider, EggIncubator, Geoposition, GlobalSettings, ItemId, ItemTemplate, PlayerData,
    PlayerStats, PokemonData, PokemonSettings,
};
use pogo_net::protocol::{
    CatchPokemonMessage, CatchPokemonResponse, DownloadItemTemplatesMessage,
    DownloadSettingsMessage, EncounterMessage, EncounterResponse, EvolvePokemonMessage,
    EvolvePokemonResponse, FortDetailsMessage, FortDetailsResponse, FortSearchMessage,
    FortSearchResponse, GetInventoryMessage, GetMapObjectsMessage, GetPlayerMessage,
    LevelUpRewardsMessage, LevelUpRewardsResponse, MapObjectsBatch, MapObjectsBundle,
    PlayerUpdateMessage, ReleasePokemonMessage, ReleasePokemonResponse, UpgradePokemonMessage,
    UpgradePokemonResponse, UseItemCaptureMessage, UseItemCaptureResponse,
    UseItemEggIncubatorMessage, UseItemEggIncubatorResponse,
};
use pogo_net::{
    decode_return, ApiError, CallOutcome, FailureDecision, FailurePolicy, Request, RequestType,
    RpcClient, RpcMessage, SignedPosition, MAX_RETRIES,
};
use rand::Rng;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

/// Cache key of the global settings.
pub const GAME_SETTINGS_KEY: &str = "GameSetting";
/// Cache key of the raw item templates.
pub const ITEM_TEMPLATES_KEY: &str = "itemTemplates";
/// Cache key of the species settings.
pub const POKEMON_SETTINGS_KEY: &str = "PokemonSettings";
/// Cache key of the power-up costs.
pub const UPGRADE_COSTS_KEY: &str = "PokemonUpgradeCosts";
/// Cache key of the move settings.
pub const MOVE_SETTINGS_KEY: &str = "MoveSettings";

/// Lifetime of every cached settings value.
pub fn settings_ttl() -> chrono::Duration {
    chrono::Duration::days(30)
}

/// Shortest timer period, used when the server sends no refresh interval.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(250);

const RETICLE_SCALE: f64 = 1.95;
const HIT_POSITION: f64 = 1.0;

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The minimum refresh interval had not elapsed, or the timer is off.
    Skipped,
    /// Map objects were fetched.
    Updated(MapUpdate),
}

/// Tuning for a [`SessionManager`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Where the data cache is persisted between runs.
    pub cache_path: Option<PathBuf>,
    /// Fixed timer period; by default the server's minimum refresh interval.
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
struct LoginState {
    provider: AuthProvider,
    credentials: UserCredentials,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One logged-in player and everything the client tracks for them.
pub struct SessionManager {
    client: RpcClient,
    policy: FailurePolicy,
    credentials: Arc<dyn CredentialStore>,
    location: LocationFeed,
    options: SessionOptions,
    cache: DataCache,
    login: Option<LoginState>,
    map: MapView,
    inventory: InventoryView,
    templates: ItemTemplates,
    settings: Option<GlobalSettings>,
    settings_hash: String,
    profile: Option<PlayerData>,
    stats: Option<PlayerStats>,
    last_update: Option<Instant>,
    timer_enabled: bool,
    tracker: Option<JoinHandle<()>>,
    relogin_pending: bool,
}

impl SessionManager {
    /// Session over `client`, not yet logged in.
    ///
    /// The data cache is loaded from `options.cache_path` when set; an
    /// unreadable file starts an empty cache.
    pub fn new(
        client: RpcClient,
        credentials: Arc<dyn CredentialStore>,
        location: LocationFeed,
        options: SessionOptions,
    ) -> Self {
        let cache = load_cache(&options);
        Self {
            client,
            policy: FailurePolicy::new(),
            credentials,
            location,
            options,
            cache,
            login: None,
            map: MapView::new(),
            inventory: InventoryView::new(),
            templates: ItemTemplates::default(),
            settings: None,
            settings_hash: String::new(),
            profile: None,
            stats: None,
            last_update: None,
            timer_enabled: false,
            tracker: None,
            relogin_pending: false,
        }
    }

    /// Replace the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Underlying RPC client.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Failure policy of this session.
    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Position feed the session follows.
    pub fn location(&self) -> &LocationFeed {
        &self.location
    }

    /// Catchable, nearby and pokestops.
    pub fn map(&self) -> &MapView {
        &self.map
    }

    /// Inventory collections.
    pub fn inventory(&self) -> &InventoryView {
        &self.inventory
    }

    /// Template lookups.
    pub fn templates(&self) -> &ItemTemplates {
        &self.templates
    }

    /// Global settings, once downloaded.
    pub fn settings(&self) -> Option<&GlobalSettings> {
        self.settings.as_ref()
    }

    /// Player profile, once fetched.
    pub fn profile(&self) -> Option<&PlayerData> {
        self.profile.as_ref()
    }

    /// Player stats, once fetched.
    pub fn player_stats(&self) -> Option<&PlayerStats> {
        self.stats.as_ref()
    }

    /// When map objects were last fetched.
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Whether the update timer is running.
    pub fn is_polling(&self) -> bool {
        self.timer_enabled
    }

    /// Whether the next call logs in again before it is sent.
    pub fn is_relogin_pending(&self) -> bool {
        self.relogin_pending
    }

    /// Whether the location tracker is attached to the feed.
    pub fn is_tracking_location(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Minimum interval between map refreshes.
    pub fn min_refresh(&self) -> Duration {
        self.settings
            .as_ref()
            .map(|s| s.map_settings.get_map_objects_min_refresh_seconds)
            .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Log in from stored state.
    ///
    /// Reloads the data cache and starts a fresh failure policy, then tries a
    /// stored token; if the server reports it expired, the stored credentials
    /// are used instead. Returns whether a session is open.
    #[instrument(skip_all)]
    pub async fn initialize_session(&mut self) -> Result<bool, SessionError> {
        self.cache = load_cache(&self.options);
        self.policy = FailurePolicy::with_retry_delay(self.policy.retry_delay());
        self.relogin_pending = false;

        let provider = self.credentials.last_provider()?.unwrap_or_default();
        let stored = self.credentials.user_credentials()?;
        self.login = stored.clone().map(|credentials| LoginState {
            provider,
            credentials,
        });

        if let Some(token) = self.credentials.get(AUTH_TOKEN)? {
            match self.client.resume(provider, token).await {
                Ok(()) => return Ok(true),
                Err(ApiError::AccessTokenExpired) => {
                    info!("Stored token expired, logging in with stored credentials");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let credentials = stored.ok_or(SessionError::NoStoredCredentials)?;
        self.login(provider, &credentials.username, &credentials.secret)
            .await
    }

    /// Log in with the given credentials.
    ///
    /// The issued token is stored even when absent. Provider and credentials
    /// are only persisted on success.
    #[instrument(skip(self, secret))]
    pub async fn login(
        &mut self,
        provider: AuthProvider,
        username: &str,
        secret: &str,
    ) -> Result<bool, SessionError> {
        let token = self.client.login(provider, username, secret).await?;
        self.credentials.set(AUTH_TOKEN, token.as_deref())?;
        if token.is_none() {
            warn!("Login yielded no token");
            return Ok(false);
        }

        let credentials = UserCredentials {
            username: username.to_string(),
            secret: secret.to_string(),
        };
        self.credentials.set(LAST_PROVIDER, Some(provider.wire_name()))?;
        self.credentials.set_user_credentials(Some(&credentials))?;
        self.login = Some(LoginState {
            provider,
            credentials,
        });
        self.relogin_pending = false;
        Ok(true)
    }

    /// Close the session.
    ///
    /// Credentials are kept only when the remember-login flag is set. The
    /// timer and location tracker stop and the map view empties.
    #[instrument(skip_all)]
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.relogin_pending = false;
        self.close_session().await
    }

    async fn close_session(&mut self) -> Result<(), SessionError> {
        self.credentials.set(AUTH_TOKEN, None)?;
        if !self.credentials.remember_login()? {
            self.credentials.set_user_credentials(None)?;
        }
        self.timer_enabled = false;
        self.stop_location_tracking();
        self.map.clear();
        self.client.logout().await;
        info!("Logged out");
        Ok(())
    }

    /// Log out, log in again with the credentials of the current login and
    /// restart the data updates.
    ///
    /// Returns `false` when the provider issued no token. When the relogin
    /// does not complete, the update timer is left as it was so later ticks
    /// can retry.
    pub fn relogin(&mut self) -> BoxFuture<'_, Result<bool, SessionError>> {
        Box::pin(
            async move {
                let login = self.login.clone().ok_or(SessionError::NoStoredCredentials)?;
                let was_polling = self.timer_enabled;
                self.close_session().await?;
                let restarted = self.restart_session(login).await;
                if !matches!(restarted, Ok(true)) {
                    self.timer_enabled = was_polling;
                }
                restarted
            }
            .instrument(info_span!("relogin")),
        )
    }

    async fn restart_session(&mut self, login: LoginState) -> Result<bool, SessionError> {
        let LoginState {
            provider,
            credentials,
        } = login;
        if !self
            .login(provider, &credentials.username, &credentials.secret)
            .await?
        {
            return Ok(false);
        }
        self.start_data_update().await?;
        self.update_profile().await?;
        self.update_player_stats(false).await?;
        self.last_update = Some(Instant::now());
        self.toggle_update_timer(true).await?;
        info!("Relogin complete");
        Ok(true)
    }

    /// Run a call under the failure policy, logging in again when needed.
    ///
    /// A relogin failing at the transport counts as a failure of the call,
    /// so the call is abandoned after [`MAX_RETRIES`] failures whether they
    /// happened on the call or on its relogins.
    pub async fn execute(&mut self, requests: Vec<Request>) -> Result<Vec<Vec<u8>>, SessionError> {
        loop {
            if self.relogin_pending {
                match self.relogin().await {
                    Ok(true) => debug!("Re-issuing call after relogin"),
                    Ok(false) => return Err(SessionError::ReloginFailed),
                    Err(SessionError::Api(err)) if err.is_retryable() => {
                        warn!(error = %err, "Relogin failed");
                        self.relogin_pending = true;
                        match self.policy.on_failure().await {
                            FailureDecision::Retry | FailureDecision::Reauthenticate => continue,
                            FailureDecision::Abort => {
                                self.policy.reset();
                                return Err(ApiError::RetriesExhausted {
                                    attempts: MAX_RETRIES,
                                }
                                .into());
                            }
                        }
                    }
                    Err(err) => return Err(err),
                }
            }
            match self.client.execute(&mut self.policy, requests.clone()).await? {
                CallOutcome::Completed(returns) => return Ok(returns),
                CallOutcome::ReloginRequired => self.relogin_pending = true,
            }
        }
    }

    /// Run one typed message through [`Self::execute`].
    pub async fn call<M>(&mut self, message: &M) -> Result<M::Response, SessionError>
    where
        M: RpcMessage + Sync,
    {
        let request = Request::new(message).map_err(ApiError::Codec)?;
        let returns = self.execute(vec![request]).await?;
        Ok(decode_return(&returns, 0, M::REQUEST_TYPE)?)
    }

    /// Start following the position feed, load settings and fetch the initial
    /// map, inventory and templates.
    #[instrument(skip_all)]
    pub async fn start_data_update(&mut self) -> Result<(), SessionError> {
        if self.client.token().await.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        self.apply_position(self.location.current()).await;

        let settings = match self.cache.get::<GlobalSettings>(GAME_SETTINGS_KEY) {
            Ok(Some(settings)) => settings,
            Ok(None) => self.download_settings().await?,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable cached settings");
                self.download_settings().await?
            }
        };
        let min_distance = f64::from(settings.map_settings.get_map_objects_min_distance_meters);
        self.settings = Some(settings);
        self.start_location_tracking(min_distance);

        self.update_map_objects().await?;
        self.update_inventory().await?;
        self.update_item_templates().await?;
        Ok(())
    }

    async fn download_settings(&mut self) -> Result<GlobalSettings, SessionError> {
        let response = self
            .call(&DownloadSettingsMessage {
                hash: self.settings_hash.clone(),
            })
            .await?;
        let settings = response.settings.ok_or(SessionError::MissingSettings)?;
        self.settings_hash = response.hash;
        self.cache.insert(GAME_SETTINGS_KEY, &settings, settings_ttl())?;
        Ok(settings)
    }

    async fn apply_position(&self, position: Geoposition) {
        let accuracy = self.client.position().await.accuracy;
        self.client
            .set_position(SignedPosition {
                latitude: position.latitude,
                longitude: position.longitude,
                altitude: position.altitude,
                accuracy,
            })
            .await;
    }

    fn start_location_tracking(&mut self, min_distance_meters: f64) {
        self.stop_location_tracking();
        let mut positions = self.location.subscribe();
        let client = self.client.clone();
        let task = async move {
            let mut last_pushed = *positions.borrow_and_update();
            while positions.changed().await.is_ok() {
                let position = *positions.borrow_and_update();
                if distance_meters(last_pushed, position) < min_distance_meters {
                    continue;
                }
                last_pushed = position;

                let accuracy = client.position().await.accuracy;
                client
                    .set_position(SignedPosition {
                        latitude: position.latitude,
                        longitude: position.longitude,
                        altitude: position.altitude,
                        accuracy,
                    })
                    .await;

                let push = client.clone();
                tokio::spawn(async move {
                    if let Err(err) = update_player_location(&push, position).await {
                        warn!(error = %err, "Player location push failed");
                    }
                });
            }
            debug!("Position feed closed");
        };
        self.tracker = Some(tokio::spawn(task.instrument(info_span!("location_tracker"))));
    }

    fn stop_location_tracking(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.abort();
        }
    }

    /// Fetch map objects, hatched eggs, inventory, badges and settings in one
    /// envelope and apply the world state to the map view.
    #[instrument(skip_all)]
    pub async fn update_map_objects(&mut self) -> Result<MapUpdate, SessionError> {
        let position = self.client.position().await;
        let batch = MapObjectsBatch {
            map_objects: GetMapObjectsMessage {
                latitude: position.latitude,
                longitude: position.longitude,
                since_timestamp_ms: 0,
            },
            inventory: GetInventoryMessage::default(),
            settings: DownloadSettingsMessage {
                hash: self.settings_hash.clone(),
            },
        };
        let returns = self
            .execute(batch.into_requests().map_err(ApiError::Codec)?)
            .await?;
        let bundle = MapObjectsBundle {
            map_objects: decode_return(&returns, 0, RequestType::GetMapObjects)?,
            hatched_eggs: decode_return(&returns, 1, RequestType::GetHatchedEggs)?,
            inventory: decode_return(&returns, 2, RequestType::GetInventory)?,
            badges: decode_return(&returns, 3, RequestType::CheckAwardedBadges)?,
            settings: decode_return(&returns, 4, RequestType::DownloadSettings)?,
        };
        self.last_update = Some(Instant::now());

        if let Some(settings) = bundle.settings.settings {
            self.settings_hash = bundle.settings.hash;
            self.cache.insert(GAME_SETTINGS_KEY, &settings, settings_ttl())?;
            self.settings = Some(settings);
        }
        if !bundle.hatched_eggs.pokemon_id.is_empty() {
            info!(count = bundle.hatched_eggs.pokemon_id.len(), "Eggs hatched");
        }

        let update = self.map.apply(&bundle.map_objects);
        debug!(
            catchable = self.map.catchable().len(),
            pokestops = self.map.pokestops().len(),
            "Map objects updated"
        );
        Ok(update)
    }

    /// One timer tick: refresh the map unless the minimum interval has not
    /// elapsed since the last fetch.
    pub async fn poll_tick(&mut self) -> Result<PollOutcome, SessionError> {
        if !self.timer_enabled {
            return Ok(PollOutcome::Skipped);
        }
        if let Some(last) = self.last_update {
            if last.elapsed() < self.min_refresh() {
                debug!("Skipping map refresh, minimum interval not elapsed");
                return Ok(PollOutcome::Skipped);
            }
        }
        Ok(PollOutcome::Updated(self.update_map_objects().await?))
    }

    /// Start or stop the update timer.
    ///
    /// Starting refreshes immediately when the minimum interval has already
    /// elapsed. Starting a running timer does nothing.
    pub async fn toggle_update_timer(&mut self, enabled: bool) -> Result<(), SessionError> {
        if !enabled {
            self.timer_enabled = false;
            return Ok(());
        }
        if self.timer_enabled {
            return Ok(());
        }
        let stale = self
            .last_update
            .map_or(true, |last| last.elapsed() > self.min_refresh());
        if stale {
            self.update_map_objects().await?;
        }
        self.timer_enabled = true;
        Ok(())
    }

    /// Drive the update timer until `shutdown` resolves or `max_ticks` ticks
    /// have run. Tick failures go to `on_error` and do not stop the loop.
    ///
    /// Returns the number of ticks run.
    pub async fn run<F>(
        &mut self,
        shutdown: F,
        max_ticks: Option<u64>,
        mut on_error: impl FnMut(&SessionError),
    ) -> u64
    where
        F: Future<Output = ()>,
    {
        let period = self
            .options
            .poll_interval
            .unwrap_or_else(|| self.min_refresh())
            .max(MIN_POLL_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut ticks = 0u64;
        info!(period_ms = period.as_millis() as u64, "Update loop started");
        loop {
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Update loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    ticks += 1;
                    match self.poll_tick().await {
                        Ok(outcome) => debug!(tick = ticks, ?outcome, "Tick done"),
                        Err(err) => {
                            error!(tick = ticks, error = %err, "Map refresh failed");
                            on_error(&err);
                        }
                    }
                }
            }
        }
        ticks
    }

    /// Fetch the player profile.
    #[instrument(skip_all)]
    pub async fn update_profile(&mut self) -> Result<Option<&PlayerData>, SessionError> {
        let response = self.call(&GetPlayerMessage::default()).await?;
        if let Some(profile) = response.player_data {
            self.profile = Some(profile);
        }
        Ok(self.profile.as_ref())
    }

    /// Fetch the player stats from the inventory.
    ///
    /// With `check_for_level_up`, a new or changed level collects its
    /// rewards, which are returned.
    #[instrument(skip(self))]
    pub async fn update_player_stats(
        &mut self,
        check_for_level_up: bool,
    ) -> Result<Option<LevelUpRewardsResponse>, SessionError> {
        let response = self.call(&GetInventoryMessage::default()).await?;
        let stats = player_stats(&response.inventory_delta.inventory_items)
            .ok_or(SessionError::MissingPlayerStats)?;
        let level_changed = self
            .stats
            .as_ref()
            .map_or(true, |old| old.level != stats.level);
        let level = stats.level;
        self.stats = Some(stats);

        if check_for_level_up && level_changed {
            info!(level, "Collecting level-up rewards");
            return Ok(Some(self.level_up_rewards(level).await?));
        }
        Ok(None)
    }

    /// Collect the rewards of `level`.
    pub async fn level_up_rewards(&mut self, level: i32) -> Result<LevelUpRewardsResponse, SessionError> {
        self.call(&LevelUpRewardsMessage { level }).await
    }

    /// Fetch the full inventory into the inventory view.
    #[instrument(skip_all)]
    pub async fn update_inventory(&mut self) -> Result<(), SessionError> {
        let response = self.call(&GetInventoryMessage::default()).await?;
        self.inventory.apply(&response.inventory_delta.inventory_items);
        Ok(())
    }

    /// Load templates and their derived tables, from cache or server.
    #[instrument(skip_all)]
    pub async fn update_item_templates(&mut self) -> Result<(), SessionError> {
        let item_templates: Vec<ItemTemplate> = match self.cache.get(ITEM_TEMPLATES_KEY) {
            Ok(Some(cached)) => cached,
            other => {
                if let Err(err) = other {
                    warn!(error = %err, "Discarding unreadable cached templates");
                }
                let response = self.call(&DownloadItemTemplatesMessage::default()).await?;
                self.cache
                    .insert(ITEM_TEMPLATES_KEY, &response.item_templates, settings_ttl())?;
                response.item_templates
            }
        };

        let source = &item_templates;
        let pokemon_settings = self
            .cache
            .get_or_fetch(POKEMON_SETTINGS_KEY, settings_ttl(), || async move {
                Ok::<_, SessionError>(templates::pokemon_settings(source))
            })
            .await?;
        let upgrade_costs = self
            .cache
            .get_or_fetch(UPGRADE_COSTS_KEY, settings_ttl(), || async move {
                templates::upgrade_costs(source).ok_or(SessionError::MissingUpgradeTemplate)
            })
            .await?;
        let move_settings = self
            .cache
            .get_or_fetch(MOVE_SETTINGS_KEY, settings_ttl(), || async move {
                Ok::<_, SessionError>(templates::move_settings(source))
            })
            .await?;

        self.templates = ItemTemplates {
            pokemon_settings,
            upgrade_costs,
            move_settings,
        };
        self.persist_cache();
        Ok(())
    }

    fn persist_cache(&self) {
        if let Some(path) = &self.options.cache_path {
            if let Err(err) = self.cache.save(path) {
                warn!(path = %path.display(), error = %err, "Could not persist data cache");
            }
        }
    }

    /// Species settings of a creature.
    pub fn extra_data_for_pokemon(&self, pokemon: &PokemonData) -> Result<&PokemonSettings, SessionError> {
        self.templates
            .extra_data_for_pokemon(pokemon.pokemon_id)
            .ok_or(SessionError::UnknownPokemon(pokemon.pokemon_id))
    }

    /// Incubator currently holding `egg`.
    pub fn incubator_for_egg(&self, egg: &PokemonData) -> Result<Arc<EggIncubator>, SessionError> {
        self.inventory
            .used_incubators()
            .iter()
            .find(|incubator| incubator.id == egg.egg_incubator_id)
            .cloned()
            .ok_or(SessionError::IncubatorNotFound { egg_id: egg.id })
    }

    /// Start an encounter at the player's position.
    #[instrument(skip(self))]
    pub async fn encounter_pokemon(
        &mut self,
        encounter_id: u64,
        spawn_point_id: &str,
    ) -> Result<EncounterResponse, SessionError> {
        let position = self.client.position().await;
        self.call(&EncounterMessage {
            encounter_id,
            spawn_point_id: spawn_point_id.to_string(),
            player_latitude: position.latitude,
            player_longitude: position.longitude,
        })
        .await
    }

    /// Throw a ball with a randomized reticle and spin.
    #[instrument(skip(self))]
    pub async fn catch_pokemon(
        &mut self,
        encounter_id: u64,
        spawn_point_id: &str,
        pokeball: ItemId,
        hit_pokemon: bool,
    ) -> Result<CatchPokemonResponse, SessionError> {
        let (normalized_reticle_size, spin_modifier) = {
            let mut rng = rand::thread_rng();
            (rng.gen::<f64>() * RETICLE_SCALE, rng.gen::<f64>())
        };
        self.call(&CatchPokemonMessage {
            encounter_id,
            pokeball,
            normalized_reticle_size,
            spawn_point_id: spawn_point_id.to_string(),
            hit_pokemon,
            spin_modifier,
            normalized_hit_position: HIT_POSITION,
        })
        .await
    }

    /// Use a berry during an encounter.
    #[instrument(skip(self))]
    pub async fn use_capture_item(
        &mut self,
        encounter_id: u64,
        spawn_point_id: &str,
        item_id: ItemId,
    ) -> Result<UseItemCaptureResponse, SessionError> {
        self.call(&UseItemCaptureMessage {
            item_id,
            encounter_id,
            spawn_point_id: spawn_point_id.to_string(),
        })
        .await
    }

    /// Power up a creature.
    pub async fn power_up_pokemon(&mut self, pokemon: &PokemonData) -> Result<UpgradePokemonResponse, SessionError> {
        self.call(&UpgradePokemonMessage {
            pokemon_id: pokemon.id,
        })
        .await
    }

    /// Evolve a creature.
    pub async fn evolve_pokemon(&mut self, pokemon: &PokemonData) -> Result<EvolvePokemonResponse, SessionError> {
        self.call(&EvolvePokemonMessage {
            pokemon_id: pokemon.id,
        })
        .await
    }

    /// Transfer a creature for candy.
    pub async fn transfer_pokemon(&mut self, pokemon_id: u64) -> Result<ReleasePokemonResponse, SessionError> {
        self.call(&ReleasePokemonMessage { pokemon_id }).await
    }

    /// Fetch fort details.
    pub async fn get_fort(
        &mut self,
        fort_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<FortDetailsResponse, SessionError> {
        self.call(&FortDetailsMessage {
            fort_id: fort_id.to_string(),
            latitude,
            longitude,
        })
        .await
    }

    /// Spin a pokestop from the player's position.
    #[instrument(skip(self))]
    pub async fn search_fort(
        &mut self,
        fort_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<FortSearchResponse, SessionError> {
        let position = self.client.position().await;
        self.call(&FortSearchMessage {
            fort_id: fort_id.to_string(),
            fort_latitude: latitude,
            fort_longitude: longitude,
            player_latitude: position.latitude,
            player_longitude: position.longitude,
        })
        .await
    }

    /// Put `egg` into `incubator`.
    pub async fn use_egg_incubator(
        &mut self,
        incubator: &EggIncubator,
        egg: &PokemonData,
    ) -> Result<UseItemEggIncubatorResponse, SessionError> {
        self.call(&UseItemEggIncubatorMessage {
            item_id: incubator.id.clone(),
            pokemon_id: egg.id,
        })
        .await
    }
}

fn load_cache(options: &SessionOptions) -> DataCache {
    match &options.cache_path {
        Some(path) => DataCache::load(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable data cache");
            DataCache::new()
        }),
        None => DataCache::new(),
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_location_tracking();
    }
}

/// Push one position to the server, single attempt.
async fn update_player_location(
    client: &RpcClient,
    position: Geoposition,
) -> Result<(), ApiError> {
    let request = Request::new(&PlayerUpdateMessage {
        latitude: position.latitude,
        longitude: position.longitude,
        altitude: position.altitude,
    })?;
    client.call(vec![request]).await?;
    debug!(
        latitude = position.latitude,
        longitude = position.longitude,
        "Pushed player location"
    );
    Ok(())
}
