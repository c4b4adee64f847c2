// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the cache.
//!
//! - [`DeviceId`]: identifier of a cached light
//! - [`LightState`]: the on/off (or other) token a light reported
//! - [`DeviceState`]: a stored record tying the two together

mod device_id;
mod device_state;
mod light_state;

pub use device_id::DeviceId;
pub use device_state::DeviceState;
pub use light_state::LightState;
