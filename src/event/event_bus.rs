// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for outage events.

use tokio::sync::broadcast;

use super::OutageEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Fan-out of [`OutageEvent`]s to any number of subscribers.
///
/// # Capacity
///
/// The bus has a fixed capacity (default 64). A subscriber that falls that
/// far behind loses the oldest events and receives `RecvError::Lagged`.
/// Outages produce three events each, so this only happens to a subscriber
/// that stopped reading.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OutageEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    ///
    /// A capacity of 0 is raised to 1.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutageEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to all subscribers.
    ///
    /// Without subscribers the event is discarded.
    pub fn publish(&self, event: OutageEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(event = kind, receivers, "Published outage event"),
            Err(_) => tracing::trace!(event = kind, "No subscriber for outage event"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
