// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory state store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::StateStore;
use crate::error::StoreError;
use crate::types::{DeviceId, DeviceState};

/// A [`StateStore`] that keeps records in memory.
///
/// Nothing survives a restart. Used by tests and when no database path is
/// configured.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: RwLock<BTreeMap<DeviceId, DeviceState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn upsert(&self, state: &DeviceState) -> Result<(), StoreError> {
        self.records
            .write()
            .insert(state.device_id.clone(), state.clone());
        Ok(())
    }

    fn scan(&self) -> Result<Vec<DeviceState>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceState>, StoreError> {
        Ok(self.records.read().get(device_id).cloned())
    }
}
