//! Candidate-browsing session controller.
//!
//! A prospector session holds one candidate list and a cursor into it, plus
//! the loaded detail record for the pokemon under the cursor. All async work
//! is guarded by a request generation: every new search or detail fetch bumps
//! the generation, and a resolution whose generation is no longer current is
//! discarded without touching state. A slow response can therefore never
//! overwrite the result of a newer request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use nuztrack_ai::{AiActions, AiError};
use nuztrack_dex::{DexClient, DexError};
use nuztrack_schema::{CandidateRef, PokemonRecord};
use nuztrack_stores::{ListenerId, Observable};

pub const EMPTY_FILTER: &str = "No Pokémon match that filter.";
pub const EMPTY_PROMPT: &str = "The AI couldn't find any matches for that prompt.";
pub const EMPTY_SUGGESTION: &str = "The AI had no suggestions for this team.";
pub const EMPTY_NAME: &str = "No Pokémon found with that name.";

/// Reference-data side of a session: type listings and full records.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn candidates_by_type(&self, type_slug: &str) -> Result<Vec<CandidateRef>, DexError>;
    async fn detail(&self, ident: &str) -> Result<PokemonRecord, DexError>;
}

#[async_trait]
impl ReferenceSource for DexClient {
    async fn candidates_by_type(&self, type_slug: &str) -> Result<Vec<CandidateRef>, DexError> {
        DexClient::candidates_by_type(self, type_slug).await
    }

    async fn detail(&self, ident: &str) -> Result<PokemonRecord, DexError> {
        self.pokemon(ident).await
    }
}

/// Generative side of a session: prompt and team-complement candidate lists.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn candidates_from_prompt(&self, prompt: &str) -> Result<Vec<CandidateRef>, AiError>;
    async fn complement_for_team(&self, team: &[String]) -> Result<Vec<CandidateRef>, AiError>;
}

#[async_trait]
impl SuggestionSource for AiActions {
    async fn candidates_from_prompt(&self, prompt: &str) -> Result<Vec<CandidateRef>, AiError> {
        self.prospect_list_from_prompt(prompt).await
    }

    async fn complement_for_team(&self, team: &[String]) -> Result<Vec<CandidateRef>, AiError> {
        self.complement_suggestions(team).await
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProspectorState {
    pub prospect_list: Vec<CandidateRef>,
    pub current_index: usize,
    pub prospect: Option<PokemonRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

pub struct Prospector {
    obs: Observable<ProspectorState>,
    generation: AtomicU64,
    dex: Arc<dyn ReferenceSource>,
    ai: Arc<dyn SuggestionSource>,
}

impl Prospector {
    pub fn new(dex: Arc<dyn ReferenceSource>, ai: Arc<dyn SuggestionSource>) -> Self {
        Self {
            obs: Observable::ephemeral(ProspectorState::default()),
            generation: AtomicU64::new(0),
            dex,
            ai,
        }
    }

    pub fn snapshot(&self) -> ProspectorState {
        self.obs.snapshot()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(ProspectorState) + Send + Sync + 'static,
    ) -> ListenerId {
        self.obs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.obs.unsubscribe(id)
    }

    /// Search by type filter, e.g. `"water"`.
    pub async fn search_by_filter(&self, type_slug: &str) {
        let generation = self.begin();
        let result = self.dex.candidates_by_type(type_slug).await;
        self.finish_list_search(generation, map_dex_list(result), EMPTY_FILTER)
            .await;
    }

    /// Search with a free-form prompt via the AI gateway.
    pub async fn search_by_prompt(&self, prompt: &str) {
        let generation = self.begin();
        let result = self.ai.candidates_from_prompt(prompt).await;
        self.finish_list_search(generation, map_ai_list(result), EMPTY_PROMPT)
            .await;
    }

    /// Ask the AI for candidates that complement the given team.
    pub async fn search_by_suggestion(&self, team_species: &[String]) {
        let generation = self.begin();
        let result = self.ai.complement_for_team(team_species).await;
        self.finish_list_search(generation, map_ai_list(result), EMPTY_SUGGESTION)
            .await;
    }

    /// Look one pokemon up by name; the list becomes that single candidate.
    pub async fn search_by_name(&self, name: &str) {
        let generation = self.begin();
        match self.dex.detail(name).await {
            Ok(record) => {
                if self.is_stale(generation) {
                    return;
                }
                self.obs.update(|state| {
                    state.prospect_list = vec![CandidateRef {
                        name: record.name.clone(),
                        id: record.id,
                    }];
                    state.current_index = 0;
                    state.prospect = Some(record);
                    state.is_loading = false;
                    state.error = None;
                });
            }
            Err(DexError::NotFound(_)) => {
                self.settle_empty(generation, EMPTY_NAME);
            }
            Err(error) => {
                self.settle_failure(generation, error.to_string());
            }
        }
    }

    /// Step the cursor with wraparound. Ignored while a request is in flight
    /// or when there is nothing to step between.
    pub async fn navigate(&self, direction: Direction) {
        let state = self.obs.snapshot();
        if state.is_loading || state.prospect_list.len() < 2 {
            return;
        }
        let n = state.prospect_list.len();
        let index = match direction {
            Direction::Next => (state.current_index + 1) % n,
            Direction::Previous => (state.current_index + n - 1) % n,
        };
        self.load_detail_at(index).await;
    }

    /// Jump the cursor to `index`. Re-selecting the already-loaded candidate
    /// is a no-op; out-of-range indices are ignored.
    pub async fn set_current_index(&self, index: usize) {
        let state = self.obs.snapshot();
        if index >= state.prospect_list.len() {
            return;
        }
        if index == state.current_index && state.prospect.is_some() {
            return;
        }
        self.load_detail_at(index).await;
    }

    async fn load_detail_at(&self, index: usize) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.load_detail_with(generation, index).await;
    }

    /// Fetch the detail record for the candidate at `index` under an
    /// already-claimed generation, so a list search and the detail fetch it
    /// triggers count as one request.
    async fn load_detail_with(&self, generation: u64, index: usize) {
        if self.is_stale(generation) {
            return;
        }
        let candidate = {
            let mut picked = None;
            self.obs.update(|state| {
                if let Some(c) = state.prospect_list.get(index) {
                    picked = Some(c.clone());
                    state.current_index = index;
                    // The old candidate's record must never show against the
                    // new index; the detail is absent until its fetch lands.
                    state.prospect = None;
                    state.is_loading = true;
                    state.error = None;
                }
            });
            match picked {
                Some(candidate) => candidate,
                None => return,
            }
        };

        match self.dex.detail(&candidate.name).await {
            Ok(record) => {
                if self.is_stale(generation) {
                    debug!(name = %candidate.name, "discarding stale detail response");
                    return;
                }
                self.obs.update(|state| {
                    state.prospect = Some(record.clone());
                    state.is_loading = false;
                    state.error = None;
                });
            }
            Err(error) => {
                if self.is_stale(generation) {
                    return;
                }
                warn!(name = %candidate.name, %error, "prospect detail fetch failed");
                // The list survives a detail failure so the user can step to
                // a different candidate.
                self.obs.update(|state| {
                    state.prospect = None;
                    state.is_loading = false;
                    state.error = Some(format!("Couldn't load details for {}.", candidate.name));
                });
            }
        }
    }

    /// Start a new search: claim a generation and reset the whole session.
    /// A failed list fetch leaves the list cleared; only detail fetches keep
    /// it intact.
    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.obs.update(|state| {
            state.prospect_list = Vec::new();
            state.current_index = 0;
            state.prospect = None;
            state.is_loading = true;
            state.error = None;
        });
        generation
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    async fn finish_list_search(
        &self,
        generation: u64,
        result: Result<Vec<CandidateRef>, String>,
        empty_message: &str,
    ) {
        if self.is_stale(generation) {
            debug!("discarding stale search response");
            return;
        }
        match result {
            Ok(list) if list.is_empty() => self.settle_empty(generation, empty_message),
            Ok(list) => {
                self.obs.update(|state| {
                    state.prospect_list = list;
                    state.current_index = 0;
                    state.prospect = None;
                    state.error = None;
                    // Still loading: the first candidate's detail comes next.
                });
                self.load_detail_with(generation, 0).await;
            }
            Err(message) => self.settle_failure(generation, message),
        }
    }

    fn settle_empty(&self, generation: u64, message: &str) {
        if self.is_stale(generation) {
            return;
        }
        self.obs.update(|state| {
            state.prospect_list = Vec::new();
            state.current_index = 0;
            state.prospect = None;
            state.is_loading = false;
            state.error = Some(message.to_owned());
        });
    }

    fn settle_failure(&self, generation: u64, message: String) {
        if self.is_stale(generation) {
            return;
        }
        self.obs.update(|state| {
            state.prospect = None;
            state.is_loading = false;
            state.error = Some(message);
        });
    }
}

fn map_dex_list(result: Result<Vec<CandidateRef>, DexError>) -> Result<Vec<CandidateRef>, String> {
    result.map_err(|error| error.to_string())
}

fn map_ai_list(result: Result<Vec<CandidateRef>, AiError>) -> Result<Vec<CandidateRef>, String> {
    result.map_err(|error| error.to_string())
}
