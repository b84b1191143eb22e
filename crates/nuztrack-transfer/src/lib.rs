//! PIN-based device-to-device state transfer.
//!
//! One device locks its run state into a short-lived server-side bundle and
//! reads back a 4-digit PIN; another device redeems the PIN to pull the
//! bundle down and replace its own state. PINs are single use and expire
//! after an hour.

pub mod client;
pub mod server;

use thiserror::Error;

pub use client::TransferClient;
pub use server::{serve, LockStore};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("nothing to transfer: no run state is stored")]
    NothingToLock,
    #[error("a PIN is exactly four digits")]
    InvalidPinFormat,
    #[error("invalid or expired pin")]
    InvalidOrExpiredPin,
    #[error("transfer server error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("transfer request failed: {0}")]
    Network(String),
    #[error(transparent)]
    Storage(#[from] nuztrack_storage::StorageError),
    #[error("malformed transfer response: {0}")]
    Malformed(String),
}
