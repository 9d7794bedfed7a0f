//! Entity types and ID parsing.
//!
//! Every game-data record is identified by `<prefix><number>`, where the
//! prefix selects the [`EntityType`] (`f01` is a faction, `mon03` a monster).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of game-data record, selected by ID prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// `f`: factions.
    Faction,
    /// `a`: actors (characters, NPCs).
    Actor,
    /// `i`: items.
    Item,
    /// `m`: missions.
    Mission,
    /// `e`: events.
    Event,
    /// `l`: locations.
    Location,
    /// `mon`: monsters.
    Monster,
    /// `q`: quests.
    Quest,
    /// `r`: resources.
    Resource,
    /// `s`: sectors.
    Sector,
}

/// Prefix table, longest prefix first so `mon` wins over `m`.
const PREFIXES: &[(&str, EntityType)] = &[
    ("mon", EntityType::Monster),
    ("f", EntityType::Faction),
    ("a", EntityType::Actor),
    ("i", EntityType::Item),
    ("m", EntityType::Mission),
    ("e", EntityType::Event),
    ("l", EntityType::Location),
    ("q", EntityType::Quest),
    ("r", EntityType::Resource),
    ("s", EntityType::Sector),
];

impl EntityType {
    /// All entity types in prefix-table order.
    pub const ALL: [EntityType; 10] = [
        EntityType::Faction,
        EntityType::Actor,
        EntityType::Item,
        EntityType::Mission,
        EntityType::Event,
        EntityType::Location,
        EntityType::Monster,
        EntityType::Quest,
        EntityType::Resource,
        EntityType::Sector,
    ];

    /// Returns the ID prefix for this type.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityType::Faction => "f",
            EntityType::Actor => "a",
            EntityType::Item => "i",
            EntityType::Mission => "m",
            EntityType::Event => "e",
            EntityType::Location => "l",
            EntityType::Monster => "mon",
            EntityType::Quest => "q",
            EntityType::Resource => "r",
            EntityType::Sector => "s",
        }
    }

    /// Returns the lowercase type name used in reports and configuration.
    pub fn name(self) -> &'static str {
        match self {
            EntityType::Faction => "faction",
            EntityType::Actor => "actor",
            EntityType::Item => "item",
            EntityType::Mission => "mission",
            EntityType::Event => "event",
            EntityType::Location => "location",
            EntityType::Monster => "monster",
            EntityType::Quest => "quest",
            EntityType::Resource => "resource",
            EntityType::Sector => "sector",
        }
    }

    /// Maps a field-name stem (`faction` in `faction_id`) to a type.
    pub fn from_field_stem(stem: &str) -> Option<EntityType> {
        let ty = match stem {
            "faction" => EntityType::Faction,
            "actor" | "character" | "npc" => EntityType::Actor,
            "item" => EntityType::Item,
            "mission" => EntityType::Mission,
            "event" => EntityType::Event,
            "location" | "area" | "place" => EntityType::Location,
            "monster" | "creature" => EntityType::Monster,
            "quest" => EntityType::Quest,
            "resource" => EntityType::Resource,
            "sector" => EntityType::Sector,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed entity ID such as `f01`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    entity_type: EntityType,
    raw: String,
}

impl EntityId {
    /// Parses `value` as `<prefix><digits>` with a numeric suffix of at least 1.
    ///
    /// Returns `None` for anything else, including uppercase prefixes,
    /// surrounding whitespace, and `f00`.
    pub fn parse(value: &str) -> Option<EntityId> {
        PREFIXES.iter().find_map(|(prefix, ty)| {
            let digits = value.strip_prefix(prefix)?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if digits.bytes().all(|b| b == b'0') {
                return None;
            }
            Some(EntityId {
                entity_type: *ty,
                raw: value.to_string(),
            })
        })
    }

    /// Type selected by the prefix.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The ID exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of digits in the numeric suffix.
    pub fn digit_count(&self) -> usize {
        self.raw.len() - self.entity_type.prefix().len()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_prefix() {
        for ty in EntityType::ALL {
            let raw = format!("{}01", ty.prefix());
            let id = EntityId::parse(&raw);
            assert_eq!(id.map(|i| i.entity_type()), Some(ty), "{raw}");
        }
    }

    #[test]
    fn monster_prefix_beats_mission() {
        let id = EntityId::parse("mon12");
        assert_eq!(id.map(|i| i.entity_type()), Some(EntityType::Monster));
        let id = EntityId::parse("m12");
        assert_eq!(id.map(|i| i.entity_type()), Some(EntityType::Mission));
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "f", "f00", "F01", "x01", "f01a", " f01", "f-1", "mon"] {
            assert!(EntityId::parse(raw).is_none(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn counts_suffix_digits() {
        let id = EntityId::parse("mon007");
        assert_eq!(id.map(|i| i.digit_count()), Some(3));
    }

    #[test]
    fn field_stems_map_to_types() {
        assert_eq!(EntityType::from_field_stem("npc"), Some(EntityType::Actor));
        assert_eq!(EntityType::from_field_stem("sector"), Some(EntityType::Sector));
        assert_eq!(EntityType::from_field_stem("leader"), None);
    }
}
