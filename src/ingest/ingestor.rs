// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gated writes to the state store.

use std::sync::Arc;

use crate::outage::OutageMonitor;
use crate::store::StateStore;
use crate::types::{DeviceId, DeviceState, LightState};

/// Result of ingesting one device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The state was written to the store.
    Stored,
    /// The outage gate was closed; the state was discarded.
    Dropped,
    /// The store rejected the write.
    Failed,
}

/// Writes device states to the store while no outage is in progress.
///
/// States reported while the UPS is on battery or while a restoration pass
/// runs are dropped: lights flicker and report transient states during a
/// power cut, and the restoration pass itself produces state echoes.
///
/// The gate is checked, then the store written, without holding the
/// monitor lock. This is sound as long as ingestion and the UPS transitions
/// that close the gate are driven from the same task, which is what
/// [`Service`](crate::service::Service) does.
#[derive(Debug)]
pub struct Ingestor<S> {
    store: Arc<S>,
    monitor: Arc<OutageMonitor>,
}

impl<S: StateStore> Ingestor<S> {
    /// Creates an ingestor writing to `store` under the gate of `monitor`.
    #[must_use]
    pub fn new(store: Arc<S>, monitor: Arc<OutageMonitor>) -> Self {
        Self { store, monitor }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Records the reported state of a device.
    ///
    /// Never fails: store errors are logged and reported as
    /// [`IngestOutcome::Failed`].
    pub fn ingest(&self, device_id: DeviceId, state: LightState) -> IngestOutcome {
        if !self.monitor.accepts_ingestion() {
            tracing::debug!(
                device = %device_id,
                state = %state,
                phase = %self.monitor.phase(),
                "Outage in progress, dropping state"
            );
            return IngestOutcome::Dropped;
        }

        let record = DeviceState::new(device_id, state);
        match self.store.upsert(&record) {
            Ok(()) => {
                tracing::info!(device = %record.device_id, state = %record.state, "Stored state");
                IngestOutcome::Stored
            }
            Err(e) => {
                tracing::error!(device = %record.device_id, error = %e, "Failed to store state");
                IngestOutcome::Failed
            }
        }
    }
}
