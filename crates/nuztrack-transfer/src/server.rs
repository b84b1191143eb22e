//! The transfer server: an in-memory bundle store behind two routes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn lock_ttl() -> TimeDelta {
    TimeDelta::hours(1)
}

// Collision retries are bounded so a nearly-full PIN space degrades into an
// error instead of a spin.
const PIN_ATTEMPTS: usize = 100;
pub const PIN_SPACE: u32 = 10_000;

struct LockBundle {
    payload: Map<String, Value>,
    expires_at: DateTime<Utc>,
}

/// In-memory PIN-to-bundle table. Every operation sweeps expired bundles
/// first, so an expired PIN is indistinguishable from one that never existed.
#[derive(Default)]
pub struct LockStore {
    bundles: Mutex<HashMap<String, LockBundle>>,
}

impl LockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a bundle and mint a fresh 4-digit PIN for it.
    pub fn put(&self, payload: Map<String, Value>) -> Option<String> {
        self.put_at(payload, Utc::now())
    }

    pub fn put_at(&self, payload: Map<String, Value>, now: DateTime<Utc>) -> Option<String> {
        let mut bundles = self.lock_bundles();
        sweep(&mut bundles, now);

        let mut rng = rand::thread_rng();
        for _ in 0..PIN_ATTEMPTS {
            let pin = format!("{:04}", rng.gen_range(0..PIN_SPACE));
            if bundles.contains_key(&pin) {
                continue;
            }
            bundles.insert(
                pin.clone(),
                LockBundle {
                    payload,
                    expires_at: now + lock_ttl(),
                },
            );
            return Some(pin);
        }
        None
    }

    /// Redeem a PIN. The bundle is removed on success, so a second redeem of
    /// the same PIN fails.
    pub fn take(&self, pin: &str) -> Option<Map<String, Value>> {
        self.take_at(pin, Utc::now())
    }

    pub fn take_at(&self, pin: &str, now: DateTime<Utc>) -> Option<Map<String, Value>> {
        let mut bundles = self.lock_bundles();
        sweep(&mut bundles, now);
        bundles.remove(pin).map(|bundle| bundle.payload)
    }

    pub fn len(&self) -> usize {
        self.lock_bundles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock still holds the last fully written table.
    fn lock_bundles(&self) -> MutexGuard<'_, HashMap<String, LockBundle>> {
        self.bundles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep(bundles: &mut HashMap<String, LockBundle>, now: DateTime<Utc>) {
    bundles.retain(|_, bundle| bundle.expires_at > now);
}

#[derive(Deserialize)]
struct UnlockQuery {
    pin: String,
}

pub fn create_router(store: Arc<LockStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/locks", post(create_lock).get(redeem_lock))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub async fn serve(store: Arc<LockStore>, addr: &str) -> Result<()> {
    let app = create_router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("transfer server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn create_lock(
    State(store): State<Arc<LockStore>>,
    Json(payload): Json<Map<String, Value>>,
) -> (StatusCode, Json<Value>) {
    if payload.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "empty transfer bundle" })),
        );
    }
    match store.put(payload) {
        Some(pin) => (StatusCode::OK, Json(json!({ "pin": pin }))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no free pins available" })),
        ),
    }
}

async fn redeem_lock(
    State(store): State<Arc<LockStore>>,
    Query(query): Query<UnlockQuery>,
) -> (StatusCode, Json<Value>) {
    match store.take(&query.pin) {
        Some(payload) => (StatusCode::OK, Json(Value::Object(payload))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "invalid or expired pin" })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(key: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_owned(), Value::String("[]".to_owned()));
        map
    }

    #[test]
    fn pins_are_four_digits_and_unique() {
        let store = LockStore::new();
        let a = store.put(bundle("team")).expect("pin a");
        let b = store.put(bundle("team")).expect("pin b");
        assert_eq!(a.len(), 4);
        assert!(a.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn redeem_is_single_use() {
        let store = LockStore::new();
        let pin = store.put(bundle("team")).expect("pin");
        assert!(store.take(&pin).is_some());
        assert!(store.take(&pin).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn expired_bundles_are_swept() {
        let store = LockStore::new();
        let t0 = Utc::now();
        let pin = store.put_at(bundle("team"), t0).expect("pin");

        // Still live at the boundary.
        let at_limit = t0 + lock_ttl();
        assert!(store.take_at(&pin, at_limit - TimeDelta::milliseconds(1)).is_some());

        let pin = store.put_at(bundle("team"), t0).expect("pin");
        assert!(store.take_at(&pin, at_limit).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_frees_pins_for_reuse() {
        let store = LockStore::new();
        let t0 = Utc::now();
        store.put_at(bundle("team"), t0).expect("pin");
        store.put_at(bundle("liked-map"), t0).expect("pin");

        // A later put sweeps both expired bundles out.
        store
            .put_at(bundle("hunting-list"), t0 + lock_ttl() + TimeDelta::seconds(1))
            .expect("pin");
        assert_eq!(store.len(), 1);
    }
}
