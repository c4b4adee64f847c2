// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe bus plumbing.
//!
//! The cache consumes a stream of [`BusMessage`]s from a
//! `tokio::sync::mpsc` channel. [`MqttBus`] (requires the `mqtt` feature)
//! feeds that channel from an MQTT broker; tests feed it directly.

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttBus, MqttBusBuilder};

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// The topic the message was published on.
    pub topic: String,
    /// The UTF-8 payload.
    pub payload: String,
}

impl BusMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
