// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent state store backed by sled.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Snapshot, StateStore};
use crate::error::StoreError;
use crate::types::{DeviceId, DeviceState, LightState};

/// Name of the tree holding one record per device.
const TREE_NAME: &str = "light_state";

/// Value stored under a device id key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    state: LightState,
    updated_at: DateTime<Utc>,
}

/// A [`StateStore`] persisted in a sled database.
///
/// Records live in a single tree keyed by the UTF-8 bytes of the device id,
/// with a JSON value holding the state and the time it was accepted. Every
/// upsert is flushed to disk before returning, so an upsert costs one sled
/// flush: a write of the dirty pages and an fsync.
///
/// # Examples
///
/// ```no_run
/// use light_state_cache::store::{SledStateStore, StateStore};
///
/// # fn example() -> Result<(), light_state_cache::error::StoreError> {
/// let store = SledStateStore::open("/data/light_state_cache.db")?;
/// for record in store.scan()? {
///     println!("{} = {}", record.device_id, record.state);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SledStateStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStateStore {
    /// Opens (or creates) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        tracing::info!(path = %path.display(), "Opened state store");
        Self::from_db(db)
    }

    /// Opens a throwaway database that is removed when dropped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the database cannot be created.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<DeviceState, StoreError> {
        let key = std::str::from_utf8(key)
            .map_err(|_| StoreError::InvalidKey(String::from_utf8_lossy(key).into_owned()))?;
        let device_id = DeviceId::new(key).map_err(|_| StoreError::InvalidKey(key.to_string()))?;
        let record: StoredRecord = serde_json::from_slice(value)?;
        Ok(DeviceState::with_timestamp(
            device_id,
            record.state,
            record.updated_at,
        ))
    }
}

impl StateStore for SledStateStore {
    fn upsert(&self, state: &DeviceState) -> Result<(), StoreError> {
        let record = StoredRecord {
            state: state.state.clone(),
            updated_at: state.updated_at,
        };
        let value = serde_json::to_vec(&record)?;
        self.tree.insert(state.device_id.as_str().as_bytes(), value)?;
        self.tree.flush()?;
        Ok(())
    }

    fn scan(&self) -> Result<Vec<DeviceState>, StoreError> {
        self.tree
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                Self::decode(&key, &value)
            })
            .collect()
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut snapshot = Snapshot::default();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            match Self::decode(&key, &value) {
                Ok(record) => snapshot.records.push(record),
                Err(e) => {
                    let key = String::from_utf8_lossy(&key).into_owned();
                    tracing::warn!(key = %key, error = %e, "Skipping unreadable record");
                    snapshot.skipped.push(key);
                }
            }
        }
        Ok(snapshot)
    }

    fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceState>, StoreError> {
        self.tree
            .get(device_id.as_str().as_bytes())?
            .map(|value| Self::decode(device_id.as_str().as_bytes(), &value))
            .transpose()
    }
}

impl std::fmt::Debug for SledStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStateStore")
            .field("tree", &TREE_NAME)
            .field("records", &self.tree.len())
            .field("was_recovered", &self.db.was_recovered())
            .finish()
    }
}
