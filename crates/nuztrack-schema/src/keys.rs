//! Persisted-storage key names.
//!
//! Each store owns exactly one of these keys and is the only writer for it.

pub const CURRENT_LOCATION: &str = "current-location";
pub const TEAM: &str = "team";
pub const CAUGHT_MAP: &str = "caught-map";
pub const COMPLETED_BATTLES: &str = "completed-battles";
pub const STORY_GOALS: &str = "story-goals";
pub const CHAT_HISTORY: &str = "chat-history";
pub const LIKED_MAP: &str = "liked-map";
pub const HUNTING_LIST: &str = "hunting-list";
pub const LANGUAGE: &str = "language";

/// Keys gathered into a transfer bundle by `lock()` and replaced by
/// `unlock()`. Cache keys are deliberately excluded.
pub const TRANSFER_WHITELIST: &[&str] = &[
    CURRENT_LOCATION,
    TEAM,
    CAUGHT_MAP,
    COMPLETED_BATTLES,
    STORY_GOALS,
    CHAT_HISTORY,
    LIKED_MAP,
    HUNTING_LIST,
    LANGUAGE,
];
