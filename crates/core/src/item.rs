//! Inventory items.

use serde::{Deserialize, Serialize};

/// Item kind identifier.
///
/// Discriminants match the numeric ids used by the game server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ItemId {
    /// Unknown or unset item.
    #[default]
    Unknown = 0,
    /// Poke Ball.
    PokeBall = 1,
    /// Great Ball.
    GreatBall = 2,
    /// Ultra Ball.
    UltraBall = 3,
    /// Master Ball.
    MasterBall = 4,
    /// Potion.
    Potion = 101,
    /// Super Potion.
    SuperPotion = 102,
    /// Hyper Potion.
    HyperPotion = 103,
    /// Max Potion.
    MaxPotion = 104,
    /// Revive.
    Revive = 201,
    /// Max Revive.
    MaxRevive = 202,
    /// Lucky Egg.
    LuckyEgg = 301,
    /// Incense.
    IncenseOrdinary = 401,
    /// Lure module.
    TroyDisk = 501,
    /// Razz Berry.
    RazzBerry = 701,
    /// Bluk Berry.
    BlukBerry = 702,
    /// Nanab Berry.
    NanabBerry = 703,
    /// Wepar Berry.
    WeparBerry = 704,
    /// Pinap Berry.
    PinapBerry = 705,
    /// Unlimited egg incubator.
    IncubatorBasicUnlimited = 901,
    /// Limited-use egg incubator.
    IncubatorBasic = 902,
}

/// Items that can be thrown or fed during an encounter.
pub const CATCH_ITEM_IDS: [ItemId; 9] = [
    ItemId::PokeBall,
    ItemId::GreatBall,
    ItemId::BlukBerry,
    ItemId::MasterBall,
    ItemId::NanabBerry,
    ItemId::PinapBerry,
    ItemId::RazzBerry,
    ItemId::UltraBall,
    ItemId::WeparBerry,
];

impl ItemId {
    /// Whether this item belongs to the catch allow-list.
    pub fn is_catch_item(self) -> bool {
        CATCH_ITEM_IDS.contains(&self)
    }

    /// Whether this item is a ball (as opposed to a berry).
    pub fn is_ball(self) -> bool {
        matches!(
            self,
            ItemId::PokeBall | ItemId::GreatBall | ItemId::UltraBall | ItemId::MasterBall
        )
    }
}

/// A stack of items held by the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    /// Item kind.
    pub item_id: ItemId,
    /// Number held.
    pub count: i32,
    /// Whether the player has not looked at this item yet.
    pub unseen: bool,
}

impl ItemData {
    /// Convenience constructor.
    pub fn new(item_id: ItemId, count: i32) -> Self {
        Self {
            item_id,
            count,
            unseen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_allow_list_has_balls_and_berries_only() {
        assert!(ItemId::PokeBall.is_catch_item());
        assert!(ItemId::RazzBerry.is_catch_item());
        assert!(!ItemId::Potion.is_catch_item());
        assert!(!ItemId::IncubatorBasic.is_catch_item());
        assert!(!ItemId::Unknown.is_catch_item());
    }

    #[test]
    fn berries_are_not_balls() {
        assert!(ItemId::MasterBall.is_ball());
        assert!(!ItemId::PinapBerry.is_ball());
    }
}
