#![warn(missing_docs)]
//! Game session client.
//!
//! [`SessionManager`] logs in, keeps the map and inventory views current and
//! issues the game actions. Remote calls go through [`pogo_net::RpcClient`];
//! stored credentials and cached settings survive restarts.

mod cache;
mod credentials;
mod error;
mod inventory;
mod location;
mod map_view;
pub mod reconcile;
mod session;
mod templates;

pub use cache::{CacheError, DataCache, CACHE_CAPACITY};
pub use credentials::{
    CredentialError, CredentialStore, CredentialStoreExt, FileCredentialStore,
    MemoryCredentialStore, UserCredentials, AUTH_TOKEN, LAST_PROVIDER, REMEMBER_LOGIN,
    USER_CREDENTIALS,
};
pub use error::SessionError;
pub use inventory::{aggregate_candies, player_stats, InventoryView};
pub use location::{distance_meters, LocationFeed};
pub use map_view::{MapUpdate, MapView, NEARBY_SLOTS};
pub use reconcile::ReconcileStats;
pub use session::{
    settings_ttl, PollOutcome, SessionManager, SessionOptions, GAME_SETTINGS_KEY,
    ITEM_TEMPLATES_KEY, MIN_POLL_PERIOD, MOVE_SETTINGS_KEY, POKEMON_SETTINGS_KEY,
    UPGRADE_COSTS_KEY,
};
pub use templates::{move_settings, pokemon_settings, upgrade_costs, ItemTemplates, UpgradeCost};
