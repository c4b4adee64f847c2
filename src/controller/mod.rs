// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device control API.
//!
//! A [`DeviceController`] applies one state to one device with a single
//! remote call. It never retries on its own: the restoration pass owns the
//! retry budget and spacing.
//!
//! - [`HomeAssistantController`]: calls the Home Assistant REST API
//!   (requires the `http` feature)

#[cfg(feature = "http")]
mod home_assistant;

#[cfg(feature = "http")]
pub use home_assistant::{ControllerConfig, HomeAssistantController};

use std::future::Future;

use crate::error::ControlError;
use crate::types::{DeviceId, LightState};

/// Sets the state of a device through an external API.
pub trait DeviceController: Send + Sync {
    /// Sends one command setting `device_id` to `state`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError` if the call fails or the API answers with
    /// anything but success. The error is never fatal; the caller decides
    /// whether to try again.
    fn set_state(
        &self,
        device_id: &DeviceId,
        state: &LightState,
    ) -> impl Future<Output = Result<(), ControlError>> + Send;
}
