// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached state of a single light.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeviceId, LightState};

/// Last known state of one device, as held in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// The device this state belongs to.
    pub device_id: DeviceId,
    /// The last accepted state.
    pub state: LightState,
    /// When the state was accepted.
    pub updated_at: DateTime<Utc>,
}

impl DeviceState {
    /// Creates a state record stamped with the current time.
    #[must_use]
    pub fn new(device_id: DeviceId, state: LightState) -> Self {
        Self::with_timestamp(device_id, state, Utc::now())
    }

    /// Creates a state record with an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(
        device_id: DeviceId,
        state: LightState,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id,
            state,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stamps_current_time() {
        let before = Utc::now();
        let state = DeviceState::new(DeviceId::new("light.hall").unwrap(), LightState::On);
        assert!(state.updated_at >= before);
        assert!(state.updated_at <= Utc::now());
    }
}
