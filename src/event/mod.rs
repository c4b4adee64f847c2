// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outage lifecycle events.
//!
//! The service publishes an [`OutageEvent`] on every power transition and
//! at the end of each restoration pass. The [`EventBus`] uses tokio's
//! broadcast channel so that alerting, logging and tests can all listen to
//! the same stream.
//!
//! # Examples
//!
//! ```
//! use light_state_cache::event::{EventBus, OutageEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(OutageEvent::power_lost());
//! assert!(rx.try_recv().unwrap().is_power_lost());
//! ```

mod event_bus;
mod outage_event;

pub use event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};
pub use outage_event::OutageEvent;
