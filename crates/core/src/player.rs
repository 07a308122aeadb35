//! Player profile and progression.

use serde::{Deserialize, Serialize};

/// Team affiliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamColor {
    /// No team picked yet.
    #[default]
    Neutral,
    /// Mystic.
    Blue,
    /// Valor.
    Red,
    /// Instinct.
    Yellow,
}

/// In-game currency balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Currency name (e.g. `STARDUST`).
    pub name: String,
    /// Balance.
    pub amount: i32,
}

/// Player profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    /// Account name.
    pub username: String,
    /// Team.
    pub team: TeamColor,
    /// Creature storage capacity.
    pub max_pokemon_storage: i32,
    /// Item storage capacity.
    pub max_item_storage: i32,
    /// Currency balances.
    pub currencies: Vec<Currency>,
    /// Account creation time.
    pub creation_timestamp_ms: i64,
}

/// Progression stats, delivered as an inventory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Current level.
    pub level: i32,
    /// Total experience.
    pub experience: i64,
    /// Experience at which the current level started.
    pub prev_level_xp: i64,
    /// Experience required for the next level.
    pub next_level_xp: i64,
    /// Distance walked.
    pub km_walked: f32,
    /// Encounters so far.
    pub pokemons_encountered: i32,
    /// Captures so far.
    pub pokemons_captured: i32,
    /// Pokestop visits so far.
    pub poke_stop_visits: i32,
}
