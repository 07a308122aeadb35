//! World-state fixture builders.

use pogo_core::{
    Candy, EggIncubator, FortData, FortType, GlobalSettings, InventoryItem, ItemData, ItemId,
    ItemTemplate, MapCell, MapPokemon, MapSettings, MoveSettings, NearbyPokemon, PlayerData,
    PlayerStats, PokedexEntry, PokemonData, PokemonFamilyId, PokemonId, PokemonSettings,
    PokemonUpgradeSettings, TemplatePayload,
};
use pogo_net::protocol::{GetMapObjectsResponse, MapObjectsStatus};

/// Everything the scripted server answers from.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureWorld {
    /// Profile returned by `GetPlayer`.
    pub player: PlayerData,
    /// Full inventory returned by `GetInventory`.
    pub inventory: Vec<InventoryItem>,
    /// World state returned by `GetMapObjects`.
    pub map_objects: GetMapObjectsResponse,
    /// Settings returned by `DownloadSettings`.
    pub settings: GlobalSettings,
    /// Hash of `settings`; a request carrying it gets no settings back.
    pub settings_hash: String,
    /// Templates returned by `DownloadItemTemplates`.
    pub item_templates: Vec<ItemTemplate>,
}

impl Default for FixtureWorld {
    fn default() -> Self {
        Self {
            player: fixture_player(),
            inventory: fixture_inventory(5),
            map_objects: fixture_map_objects(),
            settings: fixture_settings(10.0),
            settings_hash: "settings-v1".into(),
            item_templates: fixture_templates(),
        }
    }
}

/// Profile of the fixture trainer.
pub fn fixture_player() -> PlayerData {
    PlayerData {
        username: "ash".into(),
        max_pokemon_storage: 250,
        max_item_storage: 350,
        ..PlayerData::default()
    }
}

/// Settings whose minimum map refresh is `min_refresh_seconds`.
pub fn fixture_settings(min_refresh_seconds: f32) -> GlobalSettings {
    GlobalSettings {
        map_settings: MapSettings {
            pokemon_visible_range: 70.0,
            poke_nav_range_meters: 201.0,
            encounter_range_meters: 50.0,
            get_map_objects_min_refresh_seconds: min_refresh_seconds,
            get_map_objects_max_refresh_seconds: 30.0,
            get_map_objects_min_distance_meters: 10.0,
        },
        minimum_client_version: "0.31.0".into(),
    }
}

/// Egg number 900 sits in incubator `"inc-busy"`.
pub const FIXTURE_EGG_ID: u64 = 900;

/// Inventory with stats at `level`, balls, berries, two creatures, an
/// incubated egg, pokedex entries and candy.
pub fn fixture_inventory(level: i32) -> Vec<InventoryItem> {
    vec![
        InventoryItem::player_stats(PlayerStats {
            level,
            experience: 12_000,
            next_level_xp: 20_000,
            ..PlayerStats::default()
        }),
        InventoryItem::item(ItemData::new(ItemId::PokeBall, 30)),
        InventoryItem::item(ItemData::new(ItemId::GreatBall, 5)),
        InventoryItem::item(ItemData::new(ItemId::RazzBerry, 3)),
        InventoryItem::item(ItemData::new(ItemId::Potion, 10)),
        InventoryItem::incubators(vec![
            EggIncubator {
                id: "inc-free".into(),
                item_id: ItemId::IncubatorBasic,
                uses_remaining: 3,
                ..EggIncubator::default()
            },
            EggIncubator {
                id: "inc-busy".into(),
                item_id: ItemId::IncubatorBasicUnlimited,
                pokemon_id: FIXTURE_EGG_ID,
                target_km_walked: 5.0,
                ..EggIncubator::default()
            },
        ]),
        InventoryItem::pokemon(PokemonData {
            id: 101,
            pokemon_id: PokemonId(1),
            cp: 320,
            ..PokemonData::default()
        }),
        InventoryItem::pokemon(PokemonData {
            id: 102,
            pokemon_id: PokemonId(25),
            cp: 410,
            ..PokemonData::default()
        }),
        InventoryItem::pokemon(PokemonData {
            id: FIXTURE_EGG_ID,
            is_egg: true,
            egg_km_walked_target: 5.0,
            egg_incubator_id: "inc-busy".into(),
            ..PokemonData::default()
        }),
        InventoryItem::pokedex(PokedexEntry {
            pokemon_id: PokemonId(1),
            times_encountered: 4,
            times_captured: 1,
        }),
        InventoryItem::candy(Candy {
            family_id: PokemonFamilyId(1),
            candy: 40,
        }),
        InventoryItem::candy(Candy {
            family_id: PokemonFamilyId(25),
            candy: 12,
        }),
    ]
}

/// A catchable creature.
pub fn catchable(encounter_id: u64, species: u16) -> MapPokemon {
    MapPokemon {
        encounter_id,
        spawn_point_id: format!("spawn-{encounter_id}"),
        pokemon_id: PokemonId(species),
        expiration_timestamp_ms: 1_469_000_000_000,
        latitude: 40.7829,
        longitude: -73.9654,
    }
}

/// A nearby creature.
pub fn nearby(encounter_id: u64, species: u16, distance: f32) -> NearbyPokemon {
    NearbyPokemon {
        pokemon_id: PokemonId(species),
        distance_in_meters: distance,
        encounter_id,
    }
}

/// A fort of the given type.
pub fn fort(id: &str, fort_type: FortType) -> FortData {
    FortData {
        id: id.into(),
        fort_type,
        latitude: 40.7830,
        longitude: -73.9650,
        enabled: true,
        ..FortData::default()
    }
}

/// One cell holding the given entities.
pub fn map_objects(
    catchable: Vec<MapPokemon>,
    nearby: Vec<NearbyPokemon>,
    forts: Vec<FortData>,
) -> GetMapObjectsResponse {
    GetMapObjectsResponse {
        status: MapObjectsStatus::Success,
        map_cells: vec![MapCell {
            s2_cell_id: 9_926_595_610_352_287_744,
            current_timestamp_ms: 1_469_000_000_000,
            forts,
            catchable_pokemons: catchable,
            nearby_pokemons: nearby,
        }],
    }
}

/// Two catchable, two nearby, one pokestop and one gym.
pub fn fixture_map_objects() -> GetMapObjectsResponse {
    map_objects(
        vec![catchable(1001, 16), catchable(1002, 19)],
        vec![nearby(2001, 10, 120.0), nearby(2002, 13, 180.0)],
        vec![fort("stop-1", FortType::Checkpoint), fort("gym-1", FortType::Gym)],
    )
}

/// Species, upgrade and move templates, plus one unrelated entry.
pub fn fixture_templates() -> Vec<ItemTemplate> {
    vec![
        ItemTemplate {
            template_id: "V0001_POKEMON_BULBASAUR".into(),
            payload: TemplatePayload::Pokemon(PokemonSettings {
                pokemon_id: PokemonId(1),
                family_id: PokemonFamilyId(1),
                candy_to_evolve: 25,
                base_attack: 126,
                base_defense: 126,
                base_stamina: 90,
                evolution_ids: vec![PokemonId(2)],
                ..PokemonSettings::default()
            }),
        },
        ItemTemplate {
            template_id: "V0025_POKEMON_PIKACHU".into(),
            payload: TemplatePayload::Pokemon(PokemonSettings {
                pokemon_id: PokemonId(25),
                family_id: PokemonFamilyId(25),
                candy_to_evolve: 50,
                base_attack: 124,
                base_defense: 108,
                base_stamina: 70,
                evolution_ids: vec![PokemonId(26)],
                ..PokemonSettings::default()
            }),
        },
        ItemTemplate {
            template_id: "POKEMON_UPGRADE_SETTINGS".into(),
            payload: TemplatePayload::Upgrades(PokemonUpgradeSettings {
                upgrades_per_level: 2,
                allowed_levels_above_player: 2,
                candy_cost: vec![1, 1, 1, 2, 2],
                stardust_cost: vec![200, 200, 400, 400, 600],
            }),
        },
        ItemTemplate {
            template_id: "V0013_MOVE_WRAP".into(),
            payload: TemplatePayload::Move(MoveSettings {
                movement_id: 13,
                power: 25.0,
                duration_ms: 4000,
                energy_delta: 20,
            }),
        },
        ItemTemplate {
            template_id: "BADGE_TRAVEL_KM".into(),
            payload: TemplatePayload::Other,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_is_consistent() {
        let world = FixtureWorld::default();
        let eggs: Vec<_> = world
            .inventory
            .iter()
            .filter_map(|i| i.inventory_item_data.pokemon_data.as_ref())
            .filter(|p| p.is_egg)
            .collect();
        assert_eq!(eggs.len(), 1);
        assert_eq!(eggs[0].id, FIXTURE_EGG_ID);
        assert_eq!(world.map_objects.catchable_pokemons().count(), 2);
        assert_eq!(world.map_objects.forts_of_type(FortType::Checkpoint).count(), 1);
    }
}
