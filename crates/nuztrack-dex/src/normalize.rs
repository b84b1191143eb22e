//! Conversion from raw upstream payloads into [`PokemonRecord`]s.

use nuztrack_schema::{
    AbilityRef, BaseStat, EvolutionStage, EvolutionView, LevelUpMove, PokemonRecord,
};

use crate::payload::{
    id_from_url, ChainLink, EvolutionDetailPayload, PokemonPayload, SpeciesPayload,
};

const LEVEL_UP_METHOD: &str = "level-up";

pub fn normalize(
    pokemon: PokemonPayload,
    species: Option<&SpeciesPayload>,
    chain: Option<&ChainLink>,
) -> PokemonRecord {
    let mut types: Vec<(u32, String)> = pokemon
        .types
        .iter()
        .map(|slot| (slot.slot, slot.type_ref.name.clone()))
        .collect();
    types.sort_by_key(|(slot, _)| *slot);

    let abilities = pokemon
        .abilities
        .iter()
        .map(|slot| AbilityRef {
            name: slot.ability.name.clone(),
            display_name: humanize(&slot.ability.name),
            is_hidden: slot.is_hidden,
        })
        .collect();

    let stats = pokemon
        .stats
        .iter()
        .map(|slot| BaseStat {
            name: slot.stat.name.clone(),
            value: slot.base_stat,
        })
        .collect();

    PokemonRecord {
        id: pokemon.id,
        name: pokemon.name.clone(),
        genus: species.map(english_genus).unwrap_or_default(),
        sprite: sprite_at(&pokemon.sprites, "/front_default"),
        sprite_shiny: sprite_at(&pokemon.sprites, "/front_shiny"),
        types: types.into_iter().map(|(_, name)| name).collect(),
        abilities,
        stats,
        flavor_text: species.map(english_flavor_text).unwrap_or_default(),
        moves: level_up_moves(&pokemon),
        evolution: chain.and_then(|chain| evolution_view(chain, pokemon.id)),
    }
}

fn sprite_at(sprites: &serde_json::Value, pointer: &str) -> Option<String> {
    sprites
        .pointer(pointer)
        .and_then(|value| value.as_str())
        .map(ToOwned::to_owned)
}

fn english_genus(species: &SpeciesPayload) -> String {
    species
        .genera
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| entry.genus.clone())
        .unwrap_or_default()
}

fn english_flavor_text(species: &SpeciesPayload) -> String {
    species
        .flavor_text_entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| clean_flavor_text(&entry.flavor_text))
        .unwrap_or_default()
}

// Upstream flavor text carries game-screen line breaks and form feeds.
fn clean_flavor_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Level-up moves, deduplicated by name (keeping the lowest learn level) and
/// ordered by level then name.
fn level_up_moves(pokemon: &PokemonPayload) -> Vec<LevelUpMove> {
    let mut moves: Vec<LevelUpMove> = Vec::new();
    for slot in &pokemon.moves {
        let Some(level) = slot
            .version_group_details
            .iter()
            .filter(|detail| detail.move_learn_method.name == LEVEL_UP_METHOD)
            .map(|detail| detail.level_learned_at)
            .min()
        else {
            continue;
        };
        match moves.iter_mut().find(|m| m.name == slot.move_ref.name) {
            Some(existing) => existing.level = existing.level.min(level),
            None => moves.push(LevelUpMove {
                name: slot.move_ref.name.clone(),
                level,
            }),
        }
    }
    moves.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
    moves
}

/// Locate `target_id` in the chain by depth-first search and derive the
/// three-part view. A tree that does not contain the target yields `None`;
/// data gaps upstream are expected and must degrade, not error.
pub fn evolution_view(chain: &ChainLink, target_id: u32) -> Option<EvolutionView> {
    let (parent, node) = find_node(chain, None, target_id)?;
    Some(EvolutionView {
        current: stage_for(node),
        previous: parent.map(|link| EvolutionStage {
            trigger: None,
            conditions: Vec::new(),
            ..stage_for(link)
        }),
        next: node.evolves_to.iter().map(stage_for).collect(),
    })
}

fn find_node<'a>(
    node: &'a ChainLink,
    parent: Option<&'a ChainLink>,
    target_id: u32,
) -> Option<(Option<&'a ChainLink>, &'a ChainLink)> {
    if id_from_url(&node.species.url) == Some(target_id) {
        return Some((parent, node));
    }
    node.evolves_to
        .iter()
        .find_map(|child| find_node(child, Some(node), target_id))
}

fn stage_for(link: &ChainLink) -> EvolutionStage {
    let (trigger, conditions) = match link.evolution_details.first() {
        Some(detail) => describe_transition(detail),
        None => (None, Vec::new()),
    };
    EvolutionStage {
        species_id: id_from_url(&link.species.url).unwrap_or_default(),
        name: link.species.name.clone(),
        trigger,
        conditions,
    }
}

/// Render one evolution-detail record as a trigger plus independent condition
/// strings. An explicit minimum level overrides the generic trigger name; the
/// remaining fields each contribute one condition, in a fixed order.
fn describe_transition(detail: &EvolutionDetailPayload) -> (Option<String>, Vec<String>) {
    let trigger = match detail.min_level {
        Some(level) => Some(format!("Level {level}")),
        None => detail
            .trigger
            .as_ref()
            .map(|trigger| humanize(&trigger.name)),
    };

    let mut conditions = Vec::new();
    if let Some(item) = &detail.item {
        conditions.push(format!("Use {}", humanize(&item.name)));
    }
    if let Some(item) = &detail.held_item {
        conditions.push(format!("Holding {}", humanize(&item.name)));
    }
    if let Some(known_move) = &detail.known_move {
        conditions.push(format!("Knows {}", humanize(&known_move.name)));
    }
    match detail.gender {
        Some(1) => conditions.push("Female only".to_string()),
        Some(2) => conditions.push("Male only".to_string()),
        _ => {}
    }
    if let Some(min) = detail.min_affection {
        conditions.push(format!("Affection {min}+"));
    }
    if let Some(min) = detail.min_happiness {
        conditions.push(format!("Happiness {min}+"));
    }
    if let Some(min) = detail.min_beauty {
        conditions.push(format!("Beauty {min}+"));
    }
    match detail.time_of_day.as_str() {
        "" => {}
        "day" => conditions.push("During the day".to_string()),
        "night" => conditions.push("At night".to_string()),
        other => conditions.push(format!("During {other}")),
    }
    if let Some(location) = &detail.location {
        conditions.push(format!("At {}", humanize(&location.name)));
    }
    if let Some(species) = &detail.party_species {
        conditions.push(format!("With {} in party", humanize(&species.name)));
    }
    if let Some(species) = &detail.trade_species {
        conditions.push(format!("Traded for {}", humanize(&species.name)));
    }
    if detail.needs_overworld_rain {
        conditions.push("While raining".to_string());
    }
    if detail.turn_upside_down {
        conditions.push("Console held upside down".to_string());
    }

    (trigger, conditions)
}

/// `"thunder-stone"` -> `"Thunder Stone"`.
pub fn humanize(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shape probe for cached records. The legacy cache shape stored `abilities`
/// as an array of plain strings; such entries must be purged and refetched.
pub fn record_shape_current(value: &serde_json::Value) -> bool {
    match value.get("abilities").and_then(|a| a.as_array()) {
        Some(abilities) => abilities.iter().all(|entry| entry.is_object()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain_fixture() -> ChainLink {
        // eevee (133) -> vaporeon (134) / jolteon (135); jolteon kept childless
        serde_json::from_value(json!({
            "species": {"name": "eevee", "url": "https://x/api/v2/pokemon-species/133/"},
            "evolution_details": [],
            "evolves_to": [
                {
                    "species": {"name": "vaporeon", "url": "https://x/api/v2/pokemon-species/134/"},
                    "evolution_details": [{
                        "trigger": {"name": "use-item", "url": ""},
                        "item": {"name": "water-stone", "url": ""}
                    }],
                    "evolves_to": []
                },
                {
                    "species": {"name": "jolteon", "url": "https://x/api/v2/pokemon-species/135/"},
                    "evolution_details": [{
                        "trigger": {"name": "use-item", "url": ""},
                        "item": {"name": "thunder-stone", "url": ""}
                    }],
                    "evolves_to": []
                }
            ]
        }))
        .expect("chain fixture")
    }

    #[test]
    fn evolution_view_for_root_has_no_previous() {
        let view = evolution_view(&chain_fixture(), 133).expect("view");
        assert_eq!(view.current.name, "eevee");
        assert!(view.previous.is_none());
        assert_eq!(view.next.len(), 2);
        assert_eq!(view.next[0].name, "vaporeon");
        assert_eq!(view.next[0].trigger.as_deref(), Some("Use Item"));
        assert_eq!(view.next[0].conditions, vec!["Use Water Stone".to_string()]);
    }

    #[test]
    fn evolution_view_for_leaf_has_previous_and_no_next() {
        let view = evolution_view(&chain_fixture(), 135).expect("view");
        assert_eq!(view.current.name, "jolteon");
        assert_eq!(view.current.trigger.as_deref(), Some("Use Item"));
        assert_eq!(
            view.previous.as_ref().map(|s| s.name.as_str()),
            Some("eevee")
        );
        assert!(view.next.is_empty());
    }

    #[test]
    fn evolution_view_missing_target_degrades_to_none() {
        assert!(evolution_view(&chain_fixture(), 906).is_none());
    }

    #[test]
    fn min_level_overrides_trigger_name() {
        let detail: EvolutionDetailPayload = serde_json::from_value(json!({
            "trigger": {"name": "level-up", "url": ""},
            "min_level": 36
        }))
        .expect("detail");
        let (trigger, conditions) = describe_transition(&detail);
        assert_eq!(trigger.as_deref(), Some("Level 36"));
        assert!(conditions.is_empty());
    }

    #[test]
    fn conditions_render_in_declared_order() {
        let detail: EvolutionDetailPayload = serde_json::from_value(json!({
            "trigger": {"name": "level-up", "url": ""},
            "held_item": {"name": "razor-claw", "url": ""},
            "min_happiness": 220,
            "time_of_day": "night",
            "needs_overworld_rain": true
        }))
        .expect("detail");
        let (trigger, conditions) = describe_transition(&detail);
        assert_eq!(trigger.as_deref(), Some("Level Up"));
        assert_eq!(
            conditions,
            vec![
                "Holding Razor Claw".to_string(),
                "Happiness 220+".to_string(),
                "At night".to_string(),
                "While raining".to_string(),
            ]
        );
    }

    #[test]
    fn level_up_moves_filter_dedupe_and_sort() {
        let pokemon: PokemonPayload = serde_json::from_value(json!({
            "id": 25,
            "name": "pikachu",
            "moves": [
                {
                    "move": {"name": "thunderbolt", "url": ""},
                    "version_group_details": [
                        {"level_learned_at": 42, "move_learn_method": {"name": "level-up", "url": ""}},
                        {"level_learned_at": 36, "move_learn_method": {"name": "level-up", "url": ""}},
                        {"level_learned_at": 0, "move_learn_method": {"name": "machine", "url": ""}}
                    ]
                },
                {
                    "move": {"name": "tail-whip", "url": ""},
                    "version_group_details": [
                        {"level_learned_at": 3, "move_learn_method": {"name": "level-up", "url": ""}}
                    ]
                },
                {
                    "move": {"name": "surf", "url": ""},
                    "version_group_details": [
                        {"level_learned_at": 0, "move_learn_method": {"name": "machine", "url": ""}}
                    ]
                }
            ]
        }))
        .expect("payload");

        let moves = level_up_moves(&pokemon);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].name, "tail-whip");
        assert_eq!(moves[0].level, 3);
        assert_eq!(moves[1].name, "thunderbolt");
        assert_eq!(moves[1].level, 36);
    }

    #[test]
    fn humanize_title_cases_hyphenated_slugs() {
        assert_eq!(humanize("thunder-stone"), "Thunder Stone");
        assert_eq!(humanize("level-up"), "Level Up");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn shape_probe_rejects_legacy_string_abilities() {
        let legacy = json!({"abilities": ["static", "lightning-rod"]});
        assert!(!record_shape_current(&legacy));

        let current = json!({"abilities": [
            {"name": "static", "display_name": "Static", "is_hidden": false}
        ]});
        assert!(record_shape_current(&current));

        assert!(record_shape_current(&json!({"abilities": []})));
        assert!(!record_shape_current(&json!({"name": "pikachu"})));
    }

    #[test]
    fn flavor_text_whitespace_is_collapsed() {
        assert_eq!(
            clean_flavor_text("When several of\nthese POK\u{e9}MON\u{c}gather"),
            "When several of these POK\u{e9}MON gather"
        );
    }
}
