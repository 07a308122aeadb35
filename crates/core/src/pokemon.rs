//! Creatures, eggs, candies and related records.

use serde::{Deserialize, Serialize};

/// Species identifier. `0` means "missing".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PokemonId(pub u16);

impl PokemonId {
    /// Placeholder species used for empty slots.
    pub const MISSING: Self = Self(0);

    /// Whether this is a real species.
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

/// Evolution family identifier. Candies are shared across a family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PokemonFamilyId(pub u16);

impl PokemonFamilyId {
    /// Family not set by the server.
    pub const UNSET: Self = Self(0);

    /// Whether the server assigned a family.
    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

/// A creature (or egg) owned by the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonData {
    /// Unique instance id.
    pub id: u64,
    /// Species. Unset for eggs.
    pub pokemon_id: PokemonId,
    /// Combat power.
    pub cp: i32,
    /// Current stamina.
    pub stamina: i32,
    /// Maximum stamina.
    pub stamina_max: i32,
    /// Fast move id.
    pub move_1: u16,
    /// Charged move id.
    pub move_2: u16,
    /// Whether this record is an egg.
    pub is_egg: bool,
    /// Distance the egg needs to hatch.
    pub egg_km_walked_target: f64,
    /// Incubator currently holding the egg, empty when none.
    pub egg_incubator_id: String,
    /// Player-assigned nickname.
    pub nickname: String,
    /// Individual attack value.
    pub individual_attack: i32,
    /// Individual defense value.
    pub individual_defense: i32,
    /// Individual stamina value.
    pub individual_stamina: i32,
    /// Creation timestamp.
    pub creation_time_ms: u64,
}

/// Candy count for one family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candy {
    /// Family the candies belong to.
    pub family_id: PokemonFamilyId,
    /// Number of candies.
    pub candy: i32,
}

/// Pokedex progress for one species.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokedexEntry {
    /// Species.
    pub pokemon_id: PokemonId,
    /// Times seen.
    pub times_encountered: i32,
    /// Times caught.
    pub times_captured: i32,
}

/// An egg incubator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EggIncubator {
    /// Incubator instance id.
    pub id: String,
    /// Item kind of the incubator.
    pub item_id: crate::ItemId,
    /// Remaining uses (0 for unlimited).
    pub uses_remaining: i32,
    /// Egg currently incubated, `0` when free.
    pub pokemon_id: u64,
    /// Kilometers walked when incubation started.
    pub start_km_walked: f64,
    /// Kilometers walked at which the egg hatches.
    pub target_km_walked: f64,
}

impl EggIncubator {
    /// Whether an egg occupies this incubator.
    pub fn is_in_use(&self) -> bool {
        self.pokemon_id != 0
    }
}
