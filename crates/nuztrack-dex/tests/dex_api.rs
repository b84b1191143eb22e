use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nuztrack_dex::{DexClient, DexError, MOVE_DETAIL_ERROR};
use nuztrack_storage::{LocalStore, MemoryStore};

fn pikachu_payload(server_uri: &str) -> serde_json::Value {
    json!({
        "id": 25,
        "name": "pikachu",
        "stats": [
            {"base_stat": 35, "stat": {"name": "hp", "url": ""}},
            {"base_stat": 90, "stat": {"name": "speed", "url": ""}}
        ],
        "types": [
            {"slot": 1, "type": {"name": "electric", "url": ""}}
        ],
        "abilities": [
            {"ability": {"name": "static", "url": ""}, "is_hidden": false},
            {"ability": {"name": "lightning-rod", "url": ""}, "is_hidden": true}
        ],
        "sprites": {
            "front_default": "https://sprites/25.png",
            "front_shiny": "https://sprites/25-shiny.png"
        },
        "moves": [
            {
                "move": {"name": "thunder-shock", "url": ""},
                "version_group_details": [
                    {"level_learned_at": 1, "move_learn_method": {"name": "level-up", "url": ""}}
                ]
            }
        ],
        "species": {"name": "pikachu", "url": format!("{server_uri}/pokemon-species/25/")}
    })
}

fn pikachu_species(server_uri: &str) -> serde_json::Value {
    json!({
        "genera": [
            {"genus": "Mouse Pok\u{e9}mon", "language": {"name": "en", "url": ""}}
        ],
        "flavor_text_entries": [
            {"flavor_text": "Stores\nelectricity.", "language": {"name": "en", "url": ""}}
        ],
        "evolution_chain": {"url": format!("{server_uri}/evolution-chain/10/")}
    })
}

fn pikachu_chain() -> serde_json::Value {
    json!({
        "chain": {
            "species": {"name": "pichu", "url": "https://x/api/v2/pokemon-species/172/"},
            "evolution_details": [],
            "evolves_to": [{
                "species": {"name": "pikachu", "url": "https://x/api/v2/pokemon-species/25/"},
                "evolution_details": [{
                    "trigger": {"name": "level-up", "url": ""},
                    "min_happiness": 220
                }],
                "evolves_to": [{
                    "species": {"name": "raichu", "url": "https://x/api/v2/pokemon-species/26/"},
                    "evolution_details": [{
                        "trigger": {"name": "use-item", "url": ""},
                        "item": {"name": "thunder-stone", "url": ""}
                    }],
                    "evolves_to": []
                }]
            }]
        }
    })
}

async fn mount_pikachu(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_payload(&server.uri())))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon-species/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_species(&server.uri())))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/evolution-chain/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_chain()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_normalizes_full_record() {
    let server = MockServer::start().await;
    mount_pikachu(&server).await;

    let store = Arc::new(MemoryStore::new());
    let client = DexClient::new(server.uri(), store);

    let record = client.pokemon("Pikachu").await.expect("record");
    assert_eq!(record.id, 25);
    assert_eq!(record.name, "pikachu");
    assert_eq!(record.genus, "Mouse Pok\u{e9}mon");
    assert_eq!(record.flavor_text, "Stores electricity.");
    assert_eq!(record.types, vec!["electric".to_string()]);
    assert_eq!(record.sprite.as_deref(), Some("https://sprites/25.png"));
    assert_eq!(record.abilities.len(), 2);
    assert_eq!(record.abilities[1].display_name, "Lightning Rod");
    assert!(record.abilities[1].is_hidden);
    assert_eq!(record.moves.len(), 1);
    assert_eq!(record.moves[0].level, 1);

    let evolution = record.evolution.expect("evolution view");
    assert_eq!(evolution.current.name, "pikachu");
    assert_eq!(evolution.current.trigger.as_deref(), Some("Level Up"));
    assert_eq!(evolution.current.conditions, vec!["Happiness 220+".to_string()]);
    assert_eq!(
        evolution.previous.as_ref().map(|s| s.name.as_str()),
        Some("pichu")
    );
    assert_eq!(evolution.next.len(), 1);
    assert_eq!(evolution.next[0].name, "raichu");
    assert_eq!(evolution.next[0].conditions, vec!["Use Thunder Stone".to_string()]);
}

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_payload(&server.uri())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon-species/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_species(&server.uri())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/evolution-chain/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_chain()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = DexClient::new(server.uri(), store);

    let first = client.pokemon("pikachu").await.expect("first fetch");
    let second = client.pokemon("Pikachu").await.expect("cached fetch");
    assert_eq!(first, second);
}

#[tokio::test]
async fn legacy_cache_shape_forces_a_refetch() {
    let server = MockServer::start().await;
    mount_pikachu(&server).await;

    let store = Arc::new(MemoryStore::new());
    let legacy_entry = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": {
            "id": 25,
            "name": "pikachu",
            "abilities": ["static", "lightning-rod"]
        }
    });
    store
        .set("dex:pokemon:pikachu", &legacy_entry.to_string())
        .expect("seed legacy entry");

    let client = DexClient::new(server.uri(), store.clone() as Arc<dyn LocalStore>);
    let record = client.pokemon("pikachu").await.expect("refetched record");
    assert_eq!(record.abilities[0].name, "static");
    assert_eq!(record.abilities[0].display_name, "Static");

    // The cache now holds the current shape.
    let cached = store
        .get("dex:pokemon:pikachu")
        .expect("get")
        .expect("present");
    let value: serde_json::Value = serde_json::from_str(&cached).expect("json");
    assert!(value["data"]["abilities"][0].is_object());
}

#[tokio::test]
async fn unknown_species_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/missingno"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let err = client.pokemon("MissingNo").await.expect_err("not found");
    assert!(matches!(err, DexError::NotFound(_)));
    assert!(err.to_string().contains("MissingNo"));
}

#[tokio::test]
async fn upstream_failure_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": "backend unavailable"})),
        )
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let err = client.pokemon("pikachu").await.expect_err("upstream error");
    match err {
        DexError::Upstream { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "backend unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn species_failure_degrades_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_payload(&server.uri())))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon-species/pikachu"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let record = client.pokemon("pikachu").await.expect("partial record");
    assert_eq!(record.id, 25);
    assert_eq!(record.genus, "");
    assert!(record.evolution.is_none());
}

#[tokio::test]
async fn move_detail_failure_degrades_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/move/thunder-shock"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let detail = client.move_detail("thunder-shock").await;
    assert_eq!(detail.name, "thunder-shock");
    assert!(detail.power.is_none());
    assert!(detail.accuracy.is_none());
    assert!(detail.move_type.is_none());
    assert_eq!(detail.short_effect, MOVE_DETAIL_ERROR);
}

#[tokio::test]
async fn move_detail_success_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/move/thunder-shock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "thunder-shock",
            "power": 40,
            "accuracy": 100,
            "type": {"name": "electric", "url": ""},
            "effect_entries": [
                {"short_effect": "Has a 10% chance to paralyze.", "language": {"name": "en", "url": ""}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let first = client.move_detail("thunder-shock").await;
    let second = client.move_detail("thunder-shock").await;
    assert_eq!(first, second);
    assert_eq!(first.power, Some(40));
    assert_eq!(first.move_type.as_deref(), Some("electric"));
}

#[tokio::test]
async fn candidates_by_type_are_ordered_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/electric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pokemon": [
                {"pokemon": {"name": "raichu", "url": "https://x/api/v2/pokemon/26/"}},
                {"pokemon": {"name": "pikachu", "url": "https://x/api/v2/pokemon/25/"}},
                {"pokemon": {"name": "broken", "url": "https://x/api/v2/pokemon/oops/"}}
            ]
        })))
        .mount(&server)
        .await;

    let client = DexClient::new(server.uri(), Arc::new(MemoryStore::new()));
    let candidates = client.candidates_by_type("Electric").await.expect("candidates");
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "pikachu");
    assert_eq!(candidates[1].id, 26);
}
