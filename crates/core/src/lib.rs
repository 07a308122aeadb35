#![warn(missing_docs)]
//! Game data model shared across the workspace.
//!
//! These are plain records mirroring what the game server sends back. Nothing
//! here performs I/O; the wire layer lives in `pogo-net` and the session state
//! in `pogo-client`.

pub mod inventory;
pub mod item;
pub mod map;
pub mod player;
pub mod pokemon;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-export commonly used types
pub use inventory::{InventoryDelta, InventoryItem, InventoryItemData};
pub use item::{ItemData, ItemId, CATCH_ITEM_IDS};
pub use map::{FortData, FortType, MapCell, MapPokemon, NearbyPokemon};
pub use player::{Currency, PlayerData, PlayerStats, TeamColor};
pub use pokemon::{Candy, EggIncubator, PokedexEntry, PokemonData, PokemonFamilyId, PokemonId};
pub use settings::{
    GlobalSettings, ItemTemplate, MapSettings, MoveSettings, PokemonSettings,
    PokemonUpgradeSettings, TemplatePayload,
};

/// Identity provider used to obtain the access token for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Pokemon Trainer Club account.
    #[default]
    Ptc,
    /// Google account.
    Google,
}

impl AuthProvider {
    /// Provider name as carried in the envelope's auth info block.
    pub fn wire_name(self) -> &'static str {
        match self {
            AuthProvider::Ptc => "ptc",
            AuthProvider::Google => "google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Error returned when parsing an unknown [`AuthProvider`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown auth provider '{0}' (expected 'ptc' or 'google')")]
pub struct AuthProviderParseError(String);

impl FromStr for AuthProvider {
    type Err = AuthProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ptc" => Ok(AuthProvider::Ptc),
            "google" => Ok(AuthProvider::Google),
            other => Err(AuthProviderParseError(other.to_string())),
        }
    }
}

/// A position reported by the location provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geoposition {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
}

impl Geoposition {
    /// Create a new position.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_wire_names() {
        assert_eq!(AuthProvider::Ptc.wire_name(), "ptc");
        assert_eq!(AuthProvider::Google.wire_name(), "google");
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Google".parse::<AuthProvider>().unwrap(), AuthProvider::Google);
        assert_eq!(" ptc ".parse::<AuthProvider>().unwrap(), AuthProvider::Ptc);
        assert!("facebook".parse::<AuthProvider>().is_err());
    }

    #[test]
    fn provider_serializes_lowercase() {
        let json = serde_json::to_string(&AuthProvider::Google).unwrap();
        assert_eq!(json, "\"google\"");
    }
}
