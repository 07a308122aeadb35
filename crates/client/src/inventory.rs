//! Long-lived view of the player's inventory.

use crate::reconcile::{update_with_comparer, update_with_key};
use pogo_core::{
    Candy, EggIncubator, InventoryItem, ItemData, PlayerStats, PokedexEntry, PokemonData,
    PokemonFamilyId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One candy entry per distinct, set family id; the first snapshot seen wins.
pub fn aggregate_candies<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Vec<Candy> {
    let mut seen: HashSet<PokemonFamilyId> = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| item.inventory_item_data.candy.as_ref())
        .filter(|candy| candy.family_id.is_set())
        .filter(|candy| seen.insert(candy.family_id))
        .cloned()
        .collect()
}

/// First player stats entry of an inventory.
pub fn player_stats<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Option<PlayerStats> {
    items
        .into_iter()
        .find_map(|item| item.inventory_item_data.player_stats.clone())
}

/// Items, creatures, eggs, incubators, pokedex and candies.
///
/// Entries are compared by value: an entry that did not change keeps its
/// `Arc` across refreshes, one that changed is replaced.
#[derive(Debug, Clone, Default)]
pub struct InventoryView {
    items: Vec<Arc<ItemData>>,
    catch_items: Vec<Arc<ItemData>>,
    free_incubators: Vec<Arc<EggIncubator>>,
    used_incubators: Vec<Arc<EggIncubator>>,
    pokemons: Vec<Arc<PokemonData>>,
    eggs: Vec<Arc<PokemonData>>,
    pokedex: Vec<Arc<PokedexEntry>>,
    candies: Vec<Arc<Candy>>,
}

impl InventoryView {
    /// Empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// All item stacks.
    pub fn items(&self) -> &[Arc<ItemData>] {
        &self.items
    }

    /// Balls and berries.
    pub fn catch_items(&self) -> &[Arc<ItemData>] {
        &self.catch_items
    }

    /// Incubators without an egg.
    pub fn free_incubators(&self) -> &[Arc<EggIncubator>] {
        &self.free_incubators
    }

    /// Incubators holding an egg.
    pub fn used_incubators(&self) -> &[Arc<EggIncubator>] {
        &self.used_incubators
    }

    /// Owned creatures (eggs excluded).
    pub fn pokemons(&self) -> &[Arc<PokemonData>] {
        &self.pokemons
    }

    /// Owned eggs.
    pub fn eggs(&self) -> &[Arc<PokemonData>] {
        &self.eggs
    }

    /// Pokedex entries.
    pub fn pokedex(&self) -> &[Arc<PokedexEntry>] {
        &self.pokedex
    }

    /// Candy per family.
    pub fn candies(&self) -> &[Arc<Candy>] {
        &self.candies
    }

    /// Candy balance of one family.
    pub fn candy_for(&self, family_id: PokemonFamilyId) -> Option<i32> {
        self.candies
            .iter()
            .find(|c| c.family_id == family_id)
            .map(|c| c.candy)
    }

    /// Creature by instance id.
    pub fn pokemon(&self, id: u64) -> Option<&Arc<PokemonData>> {
        self.pokemons.iter().find(|p| p.id == id)
    }

    /// Rebuild every collection from a full inventory.
    pub fn apply(&mut self, inventory: &[InventoryItem]) {
        let data = || inventory.iter().map(|i| &i.inventory_item_data);

        let mut kinds = HashSet::new();
        let items: Vec<ItemData> = data()
            .filter_map(|d| d.item.as_ref())
            .filter(|item| kinds.insert(item.item_id))
            .cloned()
            .collect();
        let catch_items: Vec<ItemData> = items
            .iter()
            .filter(|item| item.item_id.is_catch_item())
            .cloned()
            .collect();
        update_with_comparer(&mut self.items, items, PartialEq::eq);
        update_with_comparer(&mut self.catch_items, catch_items, PartialEq::eq);

        let (used, free): (Vec<EggIncubator>, Vec<EggIncubator>) = data()
            .filter_map(|d| d.egg_incubators.as_ref())
            .flatten()
            .cloned()
            .partition(EggIncubator::is_in_use);
        update_with_comparer(&mut self.free_incubators, free, PartialEq::eq);
        update_with_comparer(&mut self.used_incubators, used, PartialEq::eq);

        let creatures: Vec<&PokemonData> = data().filter_map(|d| d.pokemon_data.as_ref()).collect();
        let pokemons = creatures
            .iter()
            .filter(|p| p.pokemon_id.is_set())
            .map(|p| (*p).clone())
            .collect();
        let eggs = creatures
            .iter()
            .filter(|p| p.is_egg)
            .map(|p| (*p).clone())
            .collect();
        update_with_comparer(&mut self.pokemons, pokemons, PartialEq::eq);
        update_with_comparer(&mut self.eggs, eggs, PartialEq::eq);

        let pokedex = data().filter_map(|d| d.pokedex_entry.clone()).collect();
        update_with_comparer(&mut self.pokedex, pokedex, PartialEq::eq);

        let candies = aggregate_candies(inventory);
        // Family ids are unique after aggregation; a changed balance replaces the entry.
        self.candies.retain(|old| {
            candies
                .iter()
                .any(|new| new.family_id == old.family_id && new.candy == old.candy)
        });
        update_with_key(&mut self.candies, candies, |c| c.family_id);

        debug!(
            items = self.items.len(),
            pokemons = self.pokemons.len(),
            eggs = self.eggs.len(),
            candies = self.candies.len(),
            "Inventory view updated"
        );
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
