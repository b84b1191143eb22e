//! Reference-data client and normalizer.
//!
//! Fetches species, evolution-chain, and move payloads from the upstream
//! reference API, normalizes them into [`PokemonRecord`]s, and caches the
//! result for 24 hours keyed by canonical slug. Partial upstream failures
//! (a missing species entry, a broken evolution tree, one dead move page)
//! degrade the record instead of failing it.

pub mod canonical;
pub mod normalize;
pub mod payload;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use nuztrack_schema::{CandidateRef, MoveDetail, PokemonRecord};
use nuztrack_storage::{KeyedCache, LocalStore};

pub use canonical::canonical_slug;
pub use normalize::{evolution_view, humanize, record_shape_current};

use payload::{
    id_from_url, EvolutionChainPayload, MovePayload, PokemonPayload, SpeciesPayload,
    TypeListingPayload,
};

pub const MOVE_DETAIL_ERROR: &str = "Error fetching details";

/// Public PokeAPI instance; tests and self-hosted mirrors override it.
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

#[derive(Debug, Error)]
pub enum DexError {
    #[error("no reference entry for '{0}'")]
    NotFound(String),
    #[error("reference api error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("reference api request failed: {0}")]
    Network(String),
    #[error("malformed reference payload: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct DexClient {
    http: reqwest::Client,
    api_base: String,
    cache: KeyedCache,
}

impl DexClient {
    pub fn new(api_base: impl Into<String>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            cache: KeyedCache::reference(store),
        }
    }

    /// Fetch a normalized record by display name or numeric id.
    ///
    /// The cached copy is probed for the legacy shape before use; a stale or
    /// unparsable entry is purged and refetched rather than returned.
    pub async fn pokemon(&self, ident: &str) -> Result<PokemonRecord, DexError> {
        let slug = canonical_slug(ident);
        let key = format!("dex:pokemon:{slug}");

        if let Some(raw) = self.cache.get::<serde_json::Value>(&key) {
            if record_shape_current(&raw) {
                match serde_json::from_value::<PokemonRecord>(raw) {
                    Ok(record) => return Ok(record),
                    Err(error) => debug!(%slug, %error, "cached record no longer parses"),
                }
            } else {
                debug!(%slug, "purging legacy-shape cache entry");
            }
            self.cache.invalidate(&key);
        }

        let record = self.fetch_record(&slug, ident).await?;
        self.cache.set(&key, &record);
        Ok(record)
    }

    async fn fetch_record(&self, slug: &str, ident: &str) -> Result<PokemonRecord, DexError> {
        let pokemon: PokemonPayload = self
            .get_json(&format!("{}/pokemon/{slug}", self.api_base), ident)
            .await?;

        // Species and chain data enrich the record but must not sink it.
        let species = self.fetch_species(&pokemon).await;
        let chain = match &species {
            Some(species) => self.fetch_chain(species).await,
            None => None,
        };

        Ok(normalize::normalize(
            pokemon,
            species.as_ref(),
            chain.as_ref().map(|payload| &payload.chain),
        ))
    }

    async fn fetch_species(&self, pokemon: &PokemonPayload) -> Option<SpeciesPayload> {
        let ident = if pokemon.species.name.is_empty() {
            pokemon.id.to_string()
        } else {
            pokemon.species.name.clone()
        };
        let url = format!("{}/pokemon-species/{ident}", self.api_base);
        match self.get_json(&url, &ident).await {
            Ok(species) => Some(species),
            Err(error) => {
                warn!(species = %ident, %error, "species fetch failed, continuing without");
                None
            }
        }
    }

    async fn fetch_chain(&self, species: &SpeciesPayload) -> Option<EvolutionChainPayload> {
        let chain_id = species
            .evolution_chain
            .as_ref()
            .and_then(|resource| id_from_url(&resource.url))?;
        let url = format!("{}/evolution-chain/{chain_id}", self.api_base);
        match self.get_json(&url, &chain_id.to_string()).await {
            Ok(chain) => Some(chain),
            Err(error) => {
                warn!(chain_id, %error, "evolution chain fetch failed, continuing without");
                None
            }
        }
    }

    /// Full move details, cached. Never fails: a miss degrades to a
    /// placeholder record so one dead move page cannot break a move list.
    pub async fn move_detail(&self, move_name: &str) -> MoveDetail {
        let key = format!("dex:move:{move_name}");
        if let Some(detail) = self.cache.get::<MoveDetail>(&key) {
            return detail;
        }

        let url = format!("{}/move/{move_name}", self.api_base);
        match self.get_json::<MovePayload>(&url, move_name).await {
            Ok(payload) => {
                let detail = MoveDetail {
                    name: payload.name.clone(),
                    power: payload.power,
                    accuracy: payload.accuracy,
                    move_type: payload.type_ref.as_ref().map(|t| t.name.clone()),
                    short_effect: payload
                        .effect_entries
                        .iter()
                        .find(|entry| entry.language.name == "en")
                        .map(|entry| entry.short_effect.clone())
                        .unwrap_or_default(),
                };
                self.cache.set(&key, &detail);
                detail
            }
            Err(error) => {
                warn!(move_name, %error, "move detail fetch failed, using placeholder");
                MoveDetail {
                    name: move_name.to_string(),
                    power: None,
                    accuracy: None,
                    move_type: None,
                    short_effect: MOVE_DETAIL_ERROR.to_string(),
                }
            }
        }
    }

    /// Candidate list for a type filter, ordered by dex id.
    pub async fn candidates_by_type(&self, type_name: &str) -> Result<Vec<CandidateRef>, DexError> {
        let slug = canonical_slug(type_name);
        let url = format!("{}/type/{slug}", self.api_base);
        let listing: TypeListingPayload = self.get_json(&url, type_name).await?;

        let mut candidates: Vec<CandidateRef> = listing
            .pokemon
            .iter()
            .filter_map(|slot| {
                Some(CandidateRef {
                    name: slot.pokemon.name.clone(),
                    id: id_from_url(&slot.pokemon.url)?,
                })
            })
            .collect();
        candidates.sort_by_key(|candidate| candidate.id);
        Ok(candidates)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, DexError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| DexError::Network(error.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DexError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DexError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&message),
            });
        }

        response
            .json()
            .await
            .map_err(|error| DexError::Malformed(error.to_string()))
    }
}

/// Pull the `error` field out of a JSON error body when present.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}
