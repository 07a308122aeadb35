//! Long-lived view of the world around the player.

use crate::reconcile::{update_by_index_with, update_with_key, ReconcileStats};
use pogo_core::{FortData, FortType, MapPokemon, NearbyPokemon};
use pogo_net::protocol::GetMapObjectsResponse;
use std::sync::Arc;
use tracing::debug;

/// Minimum number of slots in the nearby list.
pub const NEARBY_SLOTS: usize = 3;

/// Creatures and pokestops around the player.
#[derive(Debug, Clone)]
pub struct MapView {
    catchable: Vec<Arc<MapPokemon>>,
    nearby: Vec<Arc<NearbyPokemon>>,
    pokestops: Vec<Arc<FortData>>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes made by one [`MapView::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapUpdate {
    /// Catchable list changes.
    pub catchable: ReconcileStats,
    /// Nearby list changes.
    pub nearby: ReconcileStats,
    /// Pokestop list changes.
    pub pokestops: ReconcileStats,
}

impl MapView {
    /// Empty view; the nearby list holds placeholders.
    pub fn new() -> Self {
        Self {
            catchable: Vec::new(),
            nearby: placeholders(),
            pokestops: Vec::new(),
        }
    }

    /// Creatures in catching range, keyed by encounter id.
    pub fn catchable(&self) -> &[Arc<MapPokemon>] {
        &self.catchable
    }

    /// Creatures in detection range; always at least [`NEARBY_SLOTS`] long.
    pub fn nearby(&self) -> &[Arc<NearbyPokemon>] {
        &self.nearby
    }

    /// Pokestops, keyed by fort id. Gyms are not tracked.
    pub fn pokestops(&self) -> &[Arc<FortData>] {
        &self.pokestops
    }

    /// Merge a map objects response into the view.
    pub fn apply(&mut self, response: &GetMapObjectsResponse) -> MapUpdate {
        let catchable = update_with_key(
            &mut self.catchable,
            response.catchable_pokemons().cloned().collect(),
            |p| p.encounter_id,
        );
        let nearby = update_by_index_with(
            &mut self.nearby,
            response.nearby_pokemons().cloned().collect(),
            NEARBY_SLOTS,
            NearbyPokemon::placeholder,
        );
        let pokestops = update_with_key(
            &mut self.pokestops,
            response.forts_of_type(FortType::Checkpoint).cloned().collect(),
            |f| f.id.clone(),
        );

        debug!(
            catchable = self.catchable.len(),
            nearby = self.nearby.iter().filter(|n| !n.is_placeholder()).count(),
            pokestops = self.pokestops.len(),
            "Map view updated"
        );

        MapUpdate {
            catchable,
            nearby,
            pokestops,
        }
    }

    /// Drop everything; the nearby list goes back to placeholders.
    pub fn clear(&mut self) {
        self.catchable.clear();
        self.nearby = placeholders();
        self.pokestops.clear();
    }
}

fn placeholders() -> Vec<Arc<NearbyPokemon>> {
    (0..NEARBY_SLOTS)
        .map(|_| Arc::new(NearbyPokemon::placeholder()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pogo_core::{MapCell, PokemonId};

    fn catchable(encounter_id: u64) -> MapPokemon {
        MapPokemon {
            encounter_id,
            spawn_point_id: format!("sp{encounter_id}"),
            pokemon_id: PokemonId(16),
            ..MapPokemon::default()
        }
    }

    fn fort(id: &str, fort_type: FortType) -> FortData {
        FortData {
            id: id.to_string(),
            fort_type,
            enabled: true,
            ..FortData::default()
        }
    }

    fn response(cells: Vec<MapCell>) -> GetMapObjectsResponse {
        GetMapObjectsResponse {
            map_cells: cells,
            ..GetMapObjectsResponse::default()
        }
    }

    #[test]
    fn new_view_has_placeholder_slots() {
        let view = MapView::new();
        assert_eq!(view.nearby().len(), NEARBY_SLOTS);
        assert!(view.nearby().iter().all(|n| n.is_placeholder()));
    }

    #[test]
    fn apply_filters_gyms_and_merges_cells() {
        let mut view = MapView::new();
        let update = view.apply(&response(vec![
            MapCell {
                catchable_pokemons: vec![catchable(1)],
                forts: vec![fort("stop-a", FortType::Checkpoint), fort("gym", FortType::Gym)],
                ..MapCell::default()
            },
            MapCell {
                catchable_pokemons: vec![catchable(2)],
                nearby_pokemons: vec![NearbyPokemon {
                    pokemon_id: PokemonId(19),
                    distance_in_meters: 40.0,
                    encounter_id: 9,
                }],
                ..MapCell::default()
            },
        ]));

        assert_eq!(update.catchable.added, 2);
        assert_eq!(view.catchable().len(), 2);
        assert_eq!(view.pokestops().len(), 1);
        assert_eq!(view.pokestops()[0].id, "stop-a");
        assert_eq!(view.nearby().len(), NEARBY_SLOTS);
        assert_eq!(view.nearby()[0].pokemon_id, PokemonId(19));
        assert!(view.nearby()[1].is_placeholder());
    }

    #[test]
    fn repeated_poll_keeps_references() {
        let mut view = MapView::new();
        let cell = MapCell {
            catchable_pokemons: vec![catchable(1)],
            ..MapCell::default()
        };
        view.apply(&response(vec![cell.clone()]));
        let first = Arc::clone(&view.catchable()[0]);

        let update = view.apply(&response(vec![cell]));
        assert!(!update.catchable.changed());
        assert!(Arc::ptr_eq(&first, &view.catchable()[0]));
    }

    #[test]
    fn clear_resets_nearby_slots() {
        let mut view = MapView::new();
        view.apply(&response(vec![MapCell {
            catchable_pokemons: vec![catchable(1)],
            ..MapCell::default()
        }]));
        view.clear();
        assert!(view.catchable().is_empty());
        assert_eq!(view.nearby().len(), NEARBY_SLOTS);
    }
}
