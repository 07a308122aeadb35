//! Data derived from the item templates download.

use pogo_core::{ItemTemplate, MoveSettings, PokemonId, PokemonSettings, TemplatePayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost of one power-up step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeCost {
    /// Candy needed.
    pub candy: i32,
    /// Stardust needed.
    pub stardust: i32,
}

/// Species settings with a family assigned.
pub fn pokemon_settings(templates: &[ItemTemplate]) -> Vec<PokemonSettings> {
    templates
        .iter()
        .filter_map(|t| match &t.payload {
            TemplatePayload::Pokemon(settings) if settings.family_id.is_set() => {
                Some(settings.clone())
            }
            _ => None,
        })
        .collect()
}

/// Power-up costs by upgrade level, from the first upgrade template.
pub fn upgrade_costs(templates: &[ItemTemplate]) -> Option<BTreeMap<usize, UpgradeCost>> {
    let upgrades = templates.iter().find_map(|t| match &t.payload {
        TemplatePayload::Upgrades(upgrades) => Some(upgrades),
        _ => None,
    })?;

    Some(
        upgrades
            .candy_cost
            .iter()
            .zip(&upgrades.stardust_cost)
            .enumerate()
            .map(|(level, (&candy, &stardust))| (level, UpgradeCost { candy, stardust }))
            .collect(),
    )
}

/// All move settings.
pub fn move_settings(templates: &[ItemTemplate]) -> Vec<MoveSettings> {
    templates
        .iter()
        .filter_map(|t| match &t.payload {
            TemplatePayload::Move(settings) => Some(settings.clone()),
            _ => None,
        })
        .collect()
}

/// Lookup tables built from the templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTemplates {
    /// Species settings.
    pub pokemon_settings: Vec<PokemonSettings>,
    /// Power-up costs by upgrade level.
    pub upgrade_costs: BTreeMap<usize, UpgradeCost>,
    /// Move settings.
    pub move_settings: Vec<MoveSettings>,
}

impl ItemTemplates {
    /// Species settings for `pokemon_id`.
    pub fn extra_data_for_pokemon(&self, pokemon_id: PokemonId) -> Option<&PokemonSettings> {
        self.pokemon_settings
            .iter()
            .find(|s| s.pokemon_id == pokemon_id)
    }

    /// Cost of the power-up at `level`.
    pub fn upgrade_cost(&self, level: usize) -> Option<UpgradeCost> {
        self.upgrade_costs.get(&level).copied()
    }

    /// Settings of one move.
    pub fn move_settings(&self, movement_id: u16) -> Option<&MoveSettings> {
        self.move_settings
            .iter()
            .find(|m| m.movement_id == movement_id)
    }

    /// Whether nothing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.pokemon_settings.is_empty()
            && self.upgrade_costs.is_empty()
            && self.move_settings.is_empty()
    }
}
