//! Observable domain stores.
//!
//! Each store wraps one [`Observable`] over one persisted key and exposes the
//! domain mutations for that slice of run state. Mutators return `bool`: did
//! the state actually change. A `false` means no persistence and no listener
//! notification happened.

pub mod observable;

use std::sync::Arc;

use nuztrack_schema::{
    keys, HuntEntry, HuntingListMap, LikedPokemonMap, ParsedGoal, StoryGoal, TeamMember,
    TEAM_MOVE_SLOTS,
};
use nuztrack_storage::LocalStore;

pub use observable::{ListenerId, Observable};

/// Per-area hunting list: which candidates the player still wants to find in
/// each route or area.
pub struct HuntingListStore {
    obs: Observable<HuntingListMap>,
}

impl HuntingListStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            obs: Observable::persisted(store, keys::HUNTING_LIST, HuntingListMap::new()),
        }
    }

    pub fn snapshot(&self) -> HuntingListMap {
        self.obs.snapshot()
    }

    pub fn subscribe(&self, listener: impl Fn(HuntingListMap) + Send + Sync + 'static) -> ListenerId {
        self.obs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.obs.unsubscribe(id)
    }

    /// Add one entry under `area`. Adding a pokemon already listed for that
    /// area is a no-op; the same pokemon may appear under different areas.
    pub fn add(&self, area: &str, entry: HuntEntry) -> bool {
        self.obs.update(|map| {
            let entries = map.entry(area.to_owned()).or_default();
            if entries.iter().all(|e| e.pokemon_id != entry.pokemon_id) {
                entries.push(entry);
            }
        })
    }

    /// Add a whole candidate list under `area` in one state transition, so
    /// subscribers see a single notification. Duplicates within the batch and
    /// against the existing list are dropped.
    pub fn add_many(&self, area: &str, entries: &[HuntEntry]) -> bool {
        self.obs.update(|map| {
            let existing = map.entry(area.to_owned()).or_default();
            for entry in entries {
                if existing.iter().all(|e| e.pokemon_id != entry.pokemon_id) {
                    existing.push(entry.clone());
                }
            }
            if existing.is_empty() {
                map.remove(area);
            }
        })
    }

    /// Remove one entry. When the last entry of an area goes, the area key
    /// goes with it.
    pub fn remove(&self, area: &str, pokemon_id: u32) -> bool {
        self.obs.update(|map| {
            let Some(entries) = map.get_mut(area) else {
                return;
            };
            entries.retain(|e| e.pokemon_id != pokemon_id);
            if entries.is_empty() {
                map.remove(area);
            }
        })
    }

    pub fn clear_area(&self, area: &str) -> bool {
        self.obs.update(|map| {
            map.remove(area);
        })
    }
}

/// The active team roster.
pub struct TeamStore {
    obs: Observable<Vec<TeamMember>>,
}

impl TeamStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            obs: Observable::persisted(store, keys::TEAM, Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<TeamMember> {
        self.obs.snapshot()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(Vec<TeamMember>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.obs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.obs.unsubscribe(id)
    }

    pub fn species(&self) -> Vec<String> {
        self.obs
            .snapshot()
            .into_iter()
            .map(|member| member.species)
            .collect()
    }

    pub fn add_member(&self, member: TeamMember) -> bool {
        self.obs.update(|team| team.push(member))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.obs.update(|team| team.retain(|m| m.id != id))
    }

    pub fn set_nickname(&self, id: &str, nickname: Option<String>) -> bool {
        self.with_member(id, |member| member.nickname = nickname)
    }

    /// Levels outside 1..=100 are clamped, not rejected.
    pub fn set_level(&self, id: &str, level: u8) -> bool {
        self.with_member(id, |member| {
            member.level = level.clamp(nuztrack_schema::MIN_LEVEL, nuztrack_schema::MAX_LEVEL)
        })
    }

    pub fn set_item(&self, id: &str, held_item: Option<String>) -> bool {
        self.with_member(id, |member| member.held_item = held_item)
    }

    /// `slot` is 0-based; out-of-range slots are ignored.
    pub fn set_move(&self, id: &str, slot: usize, name: &str) -> bool {
        if slot >= TEAM_MOVE_SLOTS {
            return false;
        }
        self.with_member(id, |member| member.moves[slot] = name.to_owned())
    }

    pub fn toggle_shiny(&self, id: &str) -> bool {
        self.with_member(id, |member| member.shiny = !member.shiny)
    }

    fn with_member(&self, id: &str, mutate: impl FnOnce(&mut TeamMember)) -> bool {
        self.obs.update(|team| {
            if let Some(member) = team.iter_mut().find(|m| m.id == id) {
                mutate(member);
            }
        })
    }
}

/// Ordered story goal checklist.
pub struct StoryGoalStore {
    obs: Observable<Vec<StoryGoal>>,
}

impl StoryGoalStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            obs: Observable::persisted(store, keys::STORY_GOALS, Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<StoryGoal> {
        self.obs.snapshot()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(Vec<StoryGoal>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.obs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.obs.unsubscribe(id)
    }

    pub fn add(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.obs.update(|goals| goals.push(StoryGoal::new(trimmed)))
    }

    /// Append a parsed batch in one state transition.
    pub fn add_parsed(&self, parsed: &[ParsedGoal]) -> bool {
        if parsed.is_empty() {
            return false;
        }
        self.obs.update(|goals| {
            goals.extend(parsed.iter().cloned().map(StoryGoal::from));
        })
    }

    pub fn toggle(&self, id: &str) -> bool {
        self.obs.update(|goals| {
            if let Some(goal) = goals.iter_mut().find(|g| g.id == id) {
                goal.completed = !goal.completed;
            }
        })
    }

    pub fn remove(&self, id: &str) -> bool {
        self.obs.update(|goals| goals.retain(|g| g.id != id))
    }
}

/// Liked-pokemon flags, keyed by stringified dex id. Unliking removes the
/// entry instead of writing `false`.
pub struct LikedStore {
    obs: Observable<LikedPokemonMap>,
}

impl LikedStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            obs: Observable::persisted(store, keys::LIKED_MAP, LikedPokemonMap::new()),
        }
    }

    pub fn snapshot(&self) -> LikedPokemonMap {
        self.obs.snapshot()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(LikedPokemonMap) + Send + Sync + 'static,
    ) -> ListenerId {
        self.obs.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.obs.unsubscribe(id)
    }

    pub fn is_liked(&self, pokemon_id: u32) -> bool {
        self.obs
            .snapshot()
            .get(&pokemon_id.to_string())
            .copied()
            .unwrap_or(false)
    }

    pub fn like(&self, pokemon_id: u32) -> bool {
        self.obs
            .update(|map| {
                map.insert(pokemon_id.to_string(), true);
            })
    }

    pub fn unlike(&self, pokemon_id: u32) -> bool {
        self.obs.update(|map| {
            map.remove(&pokemon_id.to_string());
        })
    }

    pub fn toggle(&self, pokemon_id: u32) -> bool {
        if self.is_liked(pokemon_id) {
            self.unlike(pokemon_id)
        } else {
            self.like(pokemon_id)
        }
    }
}
