//! Shared data model for the nuztrack companion tool.
//!
//! Everything here is the *normalized* internal shape. Raw upstream payloads
//! live in `nuztrack-dex` and never cross a crate boundary.

pub mod keys;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lightweight `{name, id}` reference to a species, used in prospect lists
/// and hunting entries before full details are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRef {
    /// Upstream identifier, e.g. `"sand-veil"`.
    pub name: String,
    /// Human-readable form, e.g. `"Sand Veil"`.
    pub display_name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStat {
    pub name: String,
    pub value: u32,
}

/// A level-up move as it appears on a [`PokemonRecord`]. Full details are
/// fetched lazily as a [`MoveDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpMove {
    pub name: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDetail {
    pub name: String,
    pub power: Option<u32>,
    pub accuracy: Option<u32>,
    pub move_type: Option<String>,
    pub short_effect: String,
}

/// One node of an [`EvolutionView`]. `trigger` and `conditions` describe the
/// transition *into* this stage, so they are absent on a chain root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub species_id: u32,
    pub name: String,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// Derived view of where a species sits in its evolution tree. Recomputed from
/// the upstream chain on every fetch, never stored independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionView {
    pub current: EvolutionStage,
    #[serde(default)]
    pub previous: Option<EvolutionStage>,
    #[serde(default)]
    pub next: Vec<EvolutionStage>,
}

/// Normalized species record. Identity is the National Pokédex id; the record
/// is replaced wholesale on refetch, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub id: u32,
    pub name: String,
    pub genus: String,
    pub sprite: Option<String>,
    pub sprite_shiny: Option<String>,
    pub types: Vec<String>,
    pub abilities: Vec<AbilityRef>,
    pub stats: Vec<BaseStat>,
    pub flavor_text: String,
    pub moves: Vec<LevelUpMove>,
    /// `None` when the species is missing from its upstream evolution tree.
    pub evolution: Option<EvolutionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuntEntry {
    pub pokemon_id: u32,
    pub pokemon_name: String,
}

/// Area name -> ordered hunting entries, unique by `pokemon_id` within an
/// area. An area with no entries must not exist in the map.
pub type HuntingListMap = BTreeMap<String, Vec<HuntEntry>>;

/// pokemon id (stringified) -> `true`. Absence means "not liked"; entries are
/// removed rather than set to `false` so the persisted form stays compact.
pub type LikedPokemonMap = BTreeMap<String, bool>;

pub const TEAM_MOVE_SLOTS: usize = 4;
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Opaque creation-time token.
    pub id: String,
    pub species: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub level: u8,
    /// Links the member to a dex sprite when known.
    #[serde(default)]
    pub pokemon_id: Option<u32>,
    #[serde(default)]
    pub held_item: Option<String>,
    /// Fixed four slots; empty string means "unset".
    pub moves: [String; TEAM_MOVE_SLOTS],
    #[serde(default)]
    pub shiny: bool,
    #[serde(default)]
    pub types: Vec<String>,
}

impl TeamMember {
    pub fn new(species: impl Into<String>, level: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            species: species.into(),
            nickname: None,
            level: level.clamp(MIN_LEVEL, MAX_LEVEL),
            pokemon_id: None,
            held_item: None,
            moves: Default::default(),
            shiny: false,
            types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryGoal {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// AI-derived annotations; absent on manually added goals.
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub opponent_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StoryGoal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            level: None,
            opponent_count: None,
            notes: None,
        }
    }
}

/// A goal as parsed out of free text by the AI gateway, before it is given an
/// id and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedGoal {
    pub text: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub opponent_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ParsedGoal> for StoryGoal {
    fn from(parsed: ParsedGoal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: parsed.text,
            completed: false,
            level: parsed.level,
            opponent_count: parsed.opponent_count,
            notes: parsed.notes,
        }
    }
}
