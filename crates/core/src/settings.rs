//! Server-side settings and game templates.

use crate::{PokemonFamilyId, PokemonId};
use serde::{Deserialize, Serialize};

/// Settings downloaded from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Map refresh policy.
    pub map_settings: MapSettings,
    /// Minimum client version accepted by the server.
    pub minimum_client_version: String,
}

/// Map refresh policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    /// Radius in which creatures are visible.
    pub pokemon_visible_range: f64,
    /// Radius of the nearby list.
    pub poke_nav_range_meters: f64,
    /// Radius in which encounters can start.
    pub encounter_range_meters: f64,
    /// Minimum seconds between two map object fetches.
    pub get_map_objects_min_refresh_seconds: f32,
    /// Maximum seconds between two map object fetches.
    pub get_map_objects_max_refresh_seconds: f32,
    /// Minimum movement before a position update is worth sending.
    pub get_map_objects_min_distance_meters: f32,
}

/// One entry of the item templates download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Template id.
    pub template_id: String,
    /// Template body.
    pub payload: TemplatePayload,
}

/// Template body, one of several kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePayload {
    /// Species data.
    Pokemon(PokemonSettings),
    /// Move data.
    Move(MoveSettings),
    /// Power-up cost table.
    Upgrades(PokemonUpgradeSettings),
    /// Any other template the client does not use.
    Other,
}

/// Species data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonSettings {
    /// Species.
    pub pokemon_id: PokemonId,
    /// Evolution family.
    pub family_id: PokemonFamilyId,
    /// Candies needed to evolve.
    pub candy_to_evolve: i32,
    /// Primary type id.
    pub type_1: u16,
    /// Secondary type id.
    pub type_2: u16,
    /// Base attack.
    pub base_attack: i32,
    /// Base defense.
    pub base_defense: i32,
    /// Base stamina.
    pub base_stamina: i32,
    /// Species this one evolves into.
    pub evolution_ids: Vec<PokemonId>,
}

/// Move data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveSettings {
    /// Move id.
    pub movement_id: u16,
    /// Damage.
    pub power: f32,
    /// Animation duration.
    pub duration_ms: i32,
    /// Energy gained or spent.
    pub energy_delta: i32,
}

/// Power-up cost table, indexed by upgrade level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonUpgradeSettings {
    /// Upgrades available per player level.
    pub upgrades_per_level: i32,
    /// How far above the player level a creature may be upgraded.
    pub allowed_levels_above_player: i32,
    /// Candy cost per upgrade level.
    pub candy_cost: Vec<i32>,
    /// Stardust cost per upgrade level.
    pub stardust_cost: Vec<i32>,
}
