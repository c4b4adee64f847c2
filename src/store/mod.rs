// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Durable storage of the last known state of every light.
//!
//! The cache only needs two operations from its store: an unconditional
//! upsert keyed by device id, and a full scan. The restoration pass reads
//! through [`StateStore::snapshot`], which skips records that cannot be
//! decoded instead of failing the whole read. [`SledStateStore`] persists
//! records on disk; [`MemoryStateStore`] keeps them in memory for tests and
//! ephemeral runs.
//!
//! # Examples
//!
//! ```
//! use light_state_cache::store::{MemoryStateStore, StateStore};
//! use light_state_cache::types::{DeviceId, DeviceState, LightState};
//!
//! let store = MemoryStateStore::new();
//! let id = DeviceId::new("light.kitchen").unwrap();
//!
//! store.upsert(&DeviceState::new(id.clone(), LightState::On)).unwrap();
//! store.upsert(&DeviceState::new(id.clone(), LightState::Off)).unwrap();
//!
//! let all = store.scan().unwrap();
//! assert_eq!(all.len(), 1);
//! assert_eq!(all[0].state, LightState::Off);
//! ```

mod memory;
mod sled_store;

pub use memory::MemoryStateStore;
pub use sled_store::SledStateStore;

use crate::error::StoreError;
use crate::types::{DeviceId, DeviceState};

/// A full read of the store that tolerates unreadable records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Every record that could be decoded, ordered by device id.
    pub records: Vec<DeviceState>,
    /// Keys of the records that could not be decoded.
    pub skipped: Vec<String>,
}

/// Storage for cached device states.
///
/// Implementations must tolerate an `upsert` running concurrently with a
/// `scan`. The scan does not need to observe such a concurrent write.
pub trait StateStore: Send + Sync {
    /// Inserts or overwrites the record for `state.device_id`.
    ///
    /// The write must be durable when this returns.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record cannot be encoded or written.
    fn upsert(&self, state: &DeviceState) -> Result<(), StoreError>;

    /// Returns every stored record, ordered by device id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or holds a
    /// record that cannot be decoded.
    fn scan(&self) -> Result<Vec<DeviceState>, StoreError>;

    /// Returns every record that can be decoded, and the keys of those
    /// that cannot.
    ///
    /// Stores that never hold undecodable records can keep the default,
    /// which is a plain [`scan`](StateStore::scan).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only if the store itself cannot be read.
    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            records: self.scan()?,
            skipped: Vec::new(),
        })
    }

    /// Returns the record for a single device, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceState>, StoreError>;
}
