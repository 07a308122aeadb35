//! World-state records returned by the map objects call.

use crate::PokemonId;
use serde::{Deserialize, Serialize};

/// One map cell with everything spawned inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapCell {
    /// Cell identifier.
    pub s2_cell_id: u64,
    /// Server time the cell was sampled at.
    pub current_timestamp_ms: i64,
    /// Forts (gyms and pokestops).
    pub forts: Vec<FortData>,
    /// Creatures within catching range.
    pub catchable_pokemons: Vec<MapPokemon>,
    /// Creatures within detection range.
    pub nearby_pokemons: Vec<NearbyPokemon>,
}

/// A creature that can be encountered right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPokemon {
    /// Encounter identity, unique per spawn.
    pub encounter_id: u64,
    /// Spawn point the creature appeared at.
    pub spawn_point_id: String,
    /// Species.
    pub pokemon_id: PokemonId,
    /// Despawn time.
    pub expiration_timestamp_ms: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A creature detected nearby but not yet in range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyPokemon {
    /// Species, [`PokemonId::MISSING`] for placeholder slots.
    pub pokemon_id: PokemonId,
    /// Distance from the player.
    pub distance_in_meters: f32,
    /// Encounter identity.
    pub encounter_id: u64,
}

impl NearbyPokemon {
    /// Inert entry used to pad fixed slots.
    pub fn placeholder() -> Self {
        Self {
            pokemon_id: PokemonId::MISSING,
            distance_in_meters: 0.0,
            encounter_id: 0,
        }
    }

    /// Whether this is a padding entry.
    pub fn is_placeholder(&self) -> bool {
        !self.pokemon_id.is_set()
    }
}

/// Fort subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FortType {
    /// Gym.
    #[default]
    Gym,
    /// Pokestop.
    Checkpoint,
}

/// A fort on the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FortData {
    /// Fort id.
    pub id: String,
    /// Subtype.
    pub fort_type: FortType,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Whether the fort is interactable.
    pub enabled: bool,
    /// When the fort can be searched again.
    pub cooldown_complete_timestamp_ms: i64,
    /// Last modification time.
    pub last_modified_timestamp_ms: i64,
}

impl FortData {
    /// Whether this fort is a pokestop.
    pub fn is_pokestop(&self) -> bool {
        self.fort_type == FortType::Checkpoint
    }
}
