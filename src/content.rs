//! Read-only content tables.
//!
//! Templates are loaded once at startup and passed around by shared
//! reference; nothing in the simulation mutates them.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::common::{EntryId, Faction, SpellId};

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("unknown game object template {0}")]
    UnknownGameObject(EntryId),
    #[error("unknown creature template {0}")]
    UnknownCreature(EntryId),
    #[error("unknown spell {0}")]
    UnknownSpell(SpellId),
    #[error("failed to read content table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse content table: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameObjectType {
    Door,
    Button,
    QuestGiver,
    Chest,
    Generic,
    Trap,
    Chair,
    SpellFocus,
    Text,
    Goober,
    Transport,
    Camera,
    FishingNode,
    SummoningRitual,
    Mailbox,
    GuardPost,
    SpellCaster,
    MeetingStone,
    FlagStand,
    FishingHole,
    FlagDrop,
    CapturePoint,
    AuraGenerator,
}

/// Per-type tuning data, the tagged replacement for the `data0..data23`
/// column soup the original content format used.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum GoData {
    Door {
        #[serde(default)]
        start_open: bool,
        #[serde(default)]
        auto_close_millis: u64,
        #[serde(default)]
        linked_trap: EntryId,
    },
    Button {
        #[serde(default)]
        start_open: bool,
        #[serde(default)]
        auto_close_millis: u64,
        #[serde(default)]
        linked_trap: EntryId,
    },
    QuestGiver {
        #[serde(default)]
        gossip_id: u32,
    },
    Chest {
        #[serde(default)]
        loot_id: u32,
        #[serde(default)]
        restock_secs: u64,
        #[serde(default)]
        quest_id: u32,
        #[serde(default)]
        linked_trap: EntryId,
        #[serde(default)]
        group_loot_rules: bool,
    },
    Generic {},
    Trap {
        #[serde(default)]
        spell_id: SpellId,
        #[serde(default)]
        radius: f32,
        #[serde(default)]
        cooldown_secs: u64,
        #[serde(default)]
        charges: u32,
        #[serde(default)]
        start_delay_secs: u64,
    },
    Chair {
        #[serde(default)]
        slots: u32,
        #[serde(default)]
        height: u32,
    },
    SpellFocus {
        #[serde(default)]
        focus_id: u32,
        #[serde(default)]
        radius: f32,
    },
    Text {
        #[serde(default)]
        page_id: u32,
    },
    Goober {
        #[serde(default)]
        spell_id: SpellId,
        #[serde(default)]
        auto_close_millis: u64,
        #[serde(default)]
        quest_id: u32,
        #[serde(default)]
        event_id: u32,
    },
    Transport {
        #[serde(default)]
        pause_millis: u64,
    },
    Camera {
        #[serde(default)]
        cinematic_id: u32,
    },
    FishingNode {},
    SummoningRitual {
        #[serde(default)]
        required_participants: u32,
        #[serde(default)]
        spell_id: SpellId,
    },
    Mailbox {},
    GuardPost {},
    SpellCaster {
        #[serde(default)]
        spell_id: SpellId,
        #[serde(default)]
        charges: u32,
    },
    MeetingStone {
        #[serde(default)]
        min_level: u32,
        #[serde(default)]
        max_level: u32,
        #[serde(default)]
        spell_id: SpellId,
    },
    FlagStand {
        #[serde(default)]
        pickup_spell: SpellId,
        #[serde(default)]
        event_id: u32,
    },
    FishingHole {
        #[serde(default)]
        radius: f32,
        #[serde(default)]
        loot_id: u32,
        #[serde(default)]
        max_success_opens: u32,
    },
    FlagDrop {
        #[serde(default)]
        event_id: u32,
    },
    CapturePoint {
        #[serde(default)]
        radius: f32,
        #[serde(default)]
        capture_min_secs: u64,
        #[serde(default)]
        capture_max_secs: u64,
        #[serde(default)]
        max_superiority: u32,
        #[serde(default)]
        neutral_percent: f32,
    },
    AuraGenerator {
        #[serde(default)]
        aura_spell: SpellId,
        #[serde(default)]
        radius: f32,
    },
}

impl GoData {
    pub fn go_type(&self) -> GameObjectType {
        match self {
            GoData::Door { .. } => GameObjectType::Door,
            GoData::Button { .. } => GameObjectType::Button,
            GoData::QuestGiver { .. } => GameObjectType::QuestGiver,
            GoData::Chest { .. } => GameObjectType::Chest,
            GoData::Generic {} => GameObjectType::Generic,
            GoData::Trap { .. } => GameObjectType::Trap,
            GoData::Chair { .. } => GameObjectType::Chair,
            GoData::SpellFocus { .. } => GameObjectType::SpellFocus,
            GoData::Text { .. } => GameObjectType::Text,
            GoData::Goober { .. } => GameObjectType::Goober,
            GoData::Transport { .. } => GameObjectType::Transport,
            GoData::Camera { .. } => GameObjectType::Camera,
            GoData::FishingNode {} => GameObjectType::FishingNode,
            GoData::SummoningRitual { .. } => GameObjectType::SummoningRitual,
            GoData::Mailbox {} => GameObjectType::Mailbox,
            GoData::GuardPost {} => GameObjectType::GuardPost,
            GoData::SpellCaster { .. } => GameObjectType::SpellCaster,
            GoData::MeetingStone { .. } => GameObjectType::MeetingStone,
            GoData::FlagStand { .. } => GameObjectType::FlagStand,
            GoData::FishingHole { .. } => GameObjectType::FishingHole,
            GoData::FlagDrop { .. } => GameObjectType::FlagDrop,
            GoData::CapturePoint { .. } => GameObjectType::CapturePoint,
            GoData::AuraGenerator { .. } => GameObjectType::AuraGenerator,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameObjectTemplate {
    pub entry: EntryId,
    pub name: String,
    #[serde(default)]
    pub display_id: u32,
    #[serde(default = "default_size")]
    pub size: f32,
    pub data: GoData,
}

fn default_size() -> f32 {
    1.0
}

impl GameObjectTemplate {
    /// Battleground traps are keyed off this data convention instead of a
    /// dedicated type: no sensing radius, three second cooldown. They must
    /// only ever fire through their linked trigger.
    pub fn is_battleground_trap(&self) -> bool {
        matches!(
            self.data,
            GoData::Trap {
                radius,
                cooldown_secs,
                ..
            } if radius == 0.0 && cooldown_secs == 3
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatureTemplate {
    pub entry: EntryId,
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub base_health: f32,
    #[serde(default)]
    pub base_mana: f32,
    pub faction: Faction,
    /// Strength, agility, stamina, intellect, spirit.
    #[serde(default)]
    pub base_stats: [f32; 5],
}

fn default_level() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellTemplate {
    pub id: SpellId,
    pub name: String,
    /// Spell can only be cast by internal triggers, never by a player.
    #[serde(default)]
    pub trigger_only: bool,
}

#[derive(Debug, Default)]
pub struct ContentTables {
    pub gameobjects: HashMap<EntryId, GameObjectTemplate>,
    pub creatures: HashMap<EntryId, CreatureTemplate>,
    pub spells: HashMap<SpellId, SpellTemplate>,
}

impl ContentTables {
    /// Loads `gameobjects.json`, `creatures.json` and `spells.json` from the
    /// configured content directory.
    pub fn load(content_path: &str) -> Result<Self, ContentError> {
        let dir = Path::new(content_path);

        let gameobjects: Vec<GameObjectTemplate> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("gameobjects.json"))?)?;
        let creatures: Vec<CreatureTemplate> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("creatures.json"))?)?;
        let spells: Vec<SpellTemplate> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("spells.json"))?)?;

        tracing::info!(
            "Loaded {} game object, {} creature and {} spell templates",
            gameobjects.len(),
            creatures.len(),
            spells.len()
        );

        Ok(Self {
            gameobjects: gameobjects.into_iter().map(|t| (t.entry, t)).collect(),
            creatures: creatures.into_iter().map(|t| (t.entry, t)).collect(),
            spells: spells.into_iter().map(|t| (t.id, t)).collect(),
        })
    }

    pub fn gameobject(&self, entry: EntryId) -> Result<&GameObjectTemplate, ContentError> {
        self.gameobjects
            .get(&entry)
            .ok_or(ContentError::UnknownGameObject(entry))
    }

    pub fn creature(&self, entry: EntryId) -> Result<&CreatureTemplate, ContentError> {
        self.creatures
            .get(&entry)
            .ok_or(ContentError::UnknownCreature(entry))
    }

    pub fn spell(&self, id: SpellId) -> Result<&SpellTemplate, ContentError> {
        self.spells.get(&id).ok_or(ContentError::UnknownSpell(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_from_json() {
        let json = r#"{
            "entry": 2050,
            "name": "Defias Trap",
            "data": { "type": "Trap", "spell_id": 5133, "radius": 3.5, "cooldown_secs": 10 }
        }"#;

        let template: GameObjectTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.data.go_type(), GameObjectType::Trap);
        assert_eq!(template.size, 1.0);
        assert!(!template.is_battleground_trap());
    }

    #[test]
    fn battleground_trap_convention() {
        let json = r#"{
            "entry": 179785,
            "name": "Battleground Trap",
            "data": { "type": "Trap", "spell_id": 24390, "radius": 0.0, "cooldown_secs": 3 }
        }"#;

        let template: GameObjectTemplate = serde_json::from_str(json).unwrap();
        assert!(template.is_battleground_trap());
    }

    #[test]
    fn missing_lookups_are_content_errors() {
        let tables = ContentTables::default();
        assert!(matches!(
            tables.gameobject(1),
            Err(ContentError::UnknownGameObject(1))
        ));
        assert!(matches!(tables.spell(9), Err(ContentError::UnknownSpell(9))));
    }
}
