// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power outage tracking.
//!
//! The [`OutageMonitor`] is the gate of the whole cache. It follows the
//! UPS through a three-phase cycle:
//!
//! ```text
//!   Normal ──OB──▶ OnBattery ──OL──▶ Restoring ──pass done──▶ Normal
//! ```
//!
//! Ingestion is only allowed in [`PowerPhase::Normal`]. A restoration pass
//! is only started by the `OnBattery → Restoring` edge, so at most one
//! pass is ever in flight.

mod monitor;
mod ups_status;

pub use monitor::{OutageMonitor, OutageState, PowerPhase, Transition};
pub use ups_status::UpsStatus;
