//! Client side of a transfer: bundling local state up and applying a
//! redeemed bundle back down.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use nuztrack_schema::keys::TRANSFER_WHITELIST;
use nuztrack_storage::LocalStore;

use crate::TransferError;

#[derive(serde::Deserialize)]
struct LockResponse {
    pin: String,
}

#[derive(serde::Deserialize)]
struct RemoteError {
    #[serde(default)]
    error: String,
}

pub struct TransferClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn LocalStore>,
}

impl TransferClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            store,
        }
    }

    /// Bundle all whitelisted state keys and lock them on the server. Values
    /// travel as raw stored text so an unknown shape survives the round trip
    /// untouched.
    pub async fn lock(&self) -> Result<String, TransferError> {
        let mut bundle = Map::new();
        for key in TRANSFER_WHITELIST {
            if let Some(raw) = self.store.get(key)? {
                bundle.insert((*key).to_owned(), Value::String(raw));
            }
        }
        if bundle.is_empty() {
            return Err(TransferError::NothingToLock);
        }

        let response = self
            .http
            .post(format!("{}/locks", self.base_url))
            .json(&bundle)
            .send()
            .await
            .map_err(|error| TransferError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.remote_error(status.as_u16(), response).await);
        }
        let parsed: LockResponse = response
            .json()
            .await
            .map_err(|error| TransferError::Malformed(error.to_string()))?;
        info!(keys = bundle.len(), "locked run state for transfer");
        Ok(parsed.pin)
    }

    /// Redeem a PIN and replace local state with the bundle. The PIN format
    /// is checked before any request goes out.
    pub async fn unlock(&self, pin: &str) -> Result<usize, TransferError> {
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(TransferError::InvalidPinFormat);
        }

        let response = self
            .http
            .get(format!("{}/locks", self.base_url))
            .query(&[("pin", pin)])
            .send()
            .await
            .map_err(|error| TransferError::Network(error.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(TransferError::InvalidOrExpiredPin);
        }
        if !status.is_success() {
            return Err(self.remote_error(status.as_u16(), response).await);
        }

        let bundle: Map<String, Value> = response
            .json()
            .await
            .map_err(|error| TransferError::Malformed(error.to_string()))?;

        // Clear every whitelisted key first so keys absent from the bundle
        // do not survive as stale local state.
        for key in TRANSFER_WHITELIST {
            self.store.remove(key)?;
        }
        let mut applied = 0;
        for (key, value) in &bundle {
            if !TRANSFER_WHITELIST.contains(&key.as_str()) {
                warn!(key, "ignoring unexpected key in transfer bundle");
                continue;
            }
            match value {
                Value::String(raw) => {
                    self.store.set(key, raw)?;
                    applied += 1;
                }
                other => {
                    warn!(key, "ignoring non-string value in transfer bundle: {other}");
                }
            }
        }
        info!(applied, "applied transferred run state");
        Ok(applied)
    }

    async fn remote_error(&self, status: u16, response: reqwest::Response) -> TransferError {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RemoteError>(&text)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| text.trim().to_owned());
        TransferError::Remote { status, message }
    }
}
