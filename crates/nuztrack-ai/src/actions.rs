//! High-level AI actions layered on [`AiGateway`](crate::AiGateway) with
//! fingerprint-keyed result caching for the expensive list generators.

use std::sync::Arc;

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use nuztrack_schema::{CandidateRef, ParsedGoal};
use nuztrack_storage::{cache::KeyedCache, LocalStore};

use crate::{AiError, AiGateway};

const ACTION_PROSPECT_LIST: &str = "prospect-list";
const ACTION_COMPLEMENT: &str = "team-complement";
const ACTION_PARSE_GOALS: &str = "parse-story-goals";

pub struct AiActions {
    gateway: Arc<dyn AiGateway>,
    cache: KeyedCache,
}

impl AiActions {
    pub fn new(gateway: Arc<dyn AiGateway>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            gateway,
            cache: KeyedCache::ai_lists(store),
        }
    }

    pub fn is_available(&self) -> bool {
        self.gateway.is_available()
    }

    /// Turn a free-form prompt into a candidate list. Results are cached per
    /// prompt fingerprint so repeating a query skips the gateway.
    pub async fn prospect_list_from_prompt(
        &self,
        prompt: &str,
    ) -> Result<Vec<CandidateRef>, AiError> {
        let key = format!("ai:prospects:{}", fingerprint(&[prompt]));
        if let Some(cached) = self.cache.get::<Vec<CandidateRef>>(&key) {
            debug!(key, "prospect list served from cache");
            return Ok(cached);
        }

        let value = self
            .gateway
            .generate(ACTION_PROSPECT_LIST, json!({ "prompt": prompt }))
            .await?;
        let list: Vec<CandidateRef> = serde_json::from_value(value)
            .map_err(|error| AiError::InvalidJson(error.to_string()))?;
        self.cache.set(&key, &list);
        Ok(list)
    }

    /// Suggest candidates that round out the given team. The cache key is a
    /// fingerprint over the sorted species list, so team order never causes a
    /// spurious miss.
    pub async fn complement_suggestions(
        &self,
        team_species: &[String],
    ) -> Result<Vec<CandidateRef>, AiError> {
        let mut sorted: Vec<&str> = team_species.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let key = format!("ai:complement:{}", fingerprint(&sorted));
        if let Some(cached) = self.cache.get::<Vec<CandidateRef>>(&key) {
            debug!(key, "complement suggestions served from cache");
            return Ok(cached);
        }

        let value = self
            .gateway
            .generate(ACTION_COMPLEMENT, json!({ "team": team_species }))
            .await?;
        let list: Vec<CandidateRef> = serde_json::from_value(value)
            .map_err(|error| AiError::InvalidJson(error.to_string()))?;
        self.cache.set(&key, &list);
        Ok(list)
    }

    /// Parse a pasted walkthrough blob into structured goals. Never cached:
    /// the same text pasted twice is intentionally re-parsed.
    pub async fn parse_story_goals(&self, text: &str) -> Result<Vec<ParsedGoal>, AiError> {
        let value = self
            .gateway
            .generate(ACTION_PARSE_GOALS, json!({ "text": text }))
            .await?;
        serde_json::from_value(value).map_err(|error| AiError::InvalidJson(error.to_string()))
    }
}

fn fingerprint<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
