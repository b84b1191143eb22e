//! Raw upstream reference-API payloads.
//!
//! Every field that has ever been observed missing or null upstream is an
//! `Option` or carries `#[serde(default)]`. These shapes stop at the
//! normalizer; nothing outside this crate sees them.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonPayload {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub stats: Vec<StatSlot>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub sprites: serde_json::Value,
    #[serde(default)]
    pub moves: Vec<MoveSlot>,
    #[serde(default)]
    pub species: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatSlot {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(default)]
    pub slot: u32,
    #[serde(rename = "type")]
    pub type_ref: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveSlot {
    #[serde(rename = "move")]
    pub move_ref: NamedResource,
    #[serde(default)]
    pub version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionGroupDetail {
    #[serde(default)]
    pub level_learned_at: u32,
    #[serde(default)]
    pub move_learn_method: NamedResource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesPayload {
    #[serde(default)]
    pub genera: Vec<GenusEntry>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    pub evolution_chain: Option<UrlResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenusEntry {
    #[serde(default)]
    pub genus: String,
    #[serde(default)]
    pub language: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlavorTextEntry {
    #[serde(default)]
    pub flavor_text: String,
    #[serde(default)]
    pub language: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlResource {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionChainPayload {
    pub chain: ChainLink,
}

/// Recursive evolution tree node. `evolution_details` describe the transition
/// *into* this node from its parent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainLink {
    #[serde(default)]
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetailPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvolutionDetailPayload {
    #[serde(default)]
    pub trigger: Option<NamedResource>,
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub item: Option<NamedResource>,
    #[serde(default)]
    pub held_item: Option<NamedResource>,
    #[serde(default)]
    pub known_move: Option<NamedResource>,
    /// 1 = female, 2 = male.
    #[serde(default)]
    pub gender: Option<u32>,
    #[serde(default)]
    pub min_affection: Option<u32>,
    #[serde(default)]
    pub min_happiness: Option<u32>,
    #[serde(default)]
    pub min_beauty: Option<u32>,
    #[serde(default)]
    pub time_of_day: String,
    #[serde(default)]
    pub location: Option<NamedResource>,
    #[serde(default)]
    pub party_species: Option<NamedResource>,
    #[serde(default)]
    pub trade_species: Option<NamedResource>,
    #[serde(default)]
    pub needs_overworld_rain: bool,
    #[serde(default)]
    pub turn_upside_down: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovePayload {
    pub name: String,
    #[serde(default)]
    pub power: Option<u32>,
    #[serde(default)]
    pub accuracy: Option<u32>,
    #[serde(rename = "type", default)]
    pub type_ref: Option<NamedResource>,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectEntry {
    #[serde(default)]
    pub short_effect: String,
    #[serde(default)]
    pub language: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeListingPayload {
    #[serde(default)]
    pub pokemon: Vec<TypePokemonSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypePokemonSlot {
    pub pokemon: NamedResource,
}

/// Extract the trailing numeric id from an upstream resource URL such as
/// `https://.../pokemon-species/133/`.
pub fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}
