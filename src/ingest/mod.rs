// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning bus messages into cached states.
//!
//! [`TopicLayout`] decides what a [`BusMessage`](crate::bus::BusMessage)
//! is about:
//!
//! ```text
//! light_state_cache/light.kitchen  "on"        → Route::DeviceState
//! NUT/ups/status                   "OB DISCHRG" → Route::UpsStatus
//! anything else                                 → Route::Ignored
//! ```
//!
//! [`Ingestor`] writes device states to the store while the outage gate is
//! open and drops them otherwise.

mod ingestor;
mod topic;

pub use ingestor::{IngestOutcome, Ingestor};
pub use topic::{Route, TopicLayout};
