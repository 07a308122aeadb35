//! Inventory delta records.
//!
//! Every inventory entry carries exactly one populated payload; the server
//! models this as a bag of optional fields, which is mirrored here.

use crate::{Candy, EggIncubator, ItemData, PlayerStats, PokedexEntry, PokemonData};
use serde::{Deserialize, Serialize};

/// A set of inventory entries returned by the inventory call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryDelta {
    /// Timestamp the delta was computed from.
    pub original_timestamp_ms: i64,
    /// Timestamp to pass on the next incremental request.
    pub new_timestamp_ms: i64,
    /// Entries.
    pub inventory_items: Vec<InventoryItem>,
}

/// One inventory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Last modification time.
    pub modified_timestamp_ms: i64,
    /// Payload.
    pub inventory_item_data: InventoryItemData,
}

/// Payload of an inventory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemData {
    /// Creature or egg.
    pub pokemon_data: Option<PokemonData>,
    /// Item stack.
    pub item: Option<ItemData>,
    /// Pokedex entry.
    pub pokedex_entry: Option<PokedexEntry>,
    /// Player progression.
    pub player_stats: Option<PlayerStats>,
    /// Candy for one family.
    pub candy: Option<Candy>,
    /// Incubators.
    pub egg_incubators: Option<Vec<EggIncubator>>,
}

impl InventoryItem {
    fn wrap(inventory_item_data: InventoryItemData) -> Self {
        Self {
            modified_timestamp_ms: 0,
            inventory_item_data,
        }
    }

    /// Entry holding a creature or egg.
    pub fn pokemon(data: PokemonData) -> Self {
        Self::wrap(InventoryItemData {
            pokemon_data: Some(data),
            ..Default::default()
        })
    }

    /// Entry holding an item stack.
    pub fn item(item: ItemData) -> Self {
        Self::wrap(InventoryItemData {
            item: Some(item),
            ..Default::default()
        })
    }

    /// Entry holding a pokedex record.
    pub fn pokedex(entry: PokedexEntry) -> Self {
        Self::wrap(InventoryItemData {
            pokedex_entry: Some(entry),
            ..Default::default()
        })
    }

    /// Entry holding player stats.
    pub fn player_stats(stats: PlayerStats) -> Self {
        Self::wrap(InventoryItemData {
            player_stats: Some(stats),
            ..Default::default()
        })
    }

    /// Entry holding a candy count.
    pub fn candy(candy: Candy) -> Self {
        Self::wrap(InventoryItemData {
            candy: Some(candy),
            ..Default::default()
        })
    }

    /// Entry holding incubators.
    pub fn incubators(incubators: Vec<EggIncubator>) -> Self {
        Self::wrap(InventoryItemData {
            egg_incubators: Some(incubators),
            ..Default::default()
        })
    }
}
