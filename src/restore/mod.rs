// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replaying cached states after a power outage.
//!
//! A restoration pass waits a grace period for the lights to rejoin the
//! network, takes one snapshot of the state store and sends every cached
//! state back through the [`DeviceController`](crate::controller::DeviceController).
//! Each device gets a bounded number of attempts governed by a
//! [`RetryPolicy`]; a device that exhausts its budget is recorded in the
//! [`RestoreReport`] and the pass moves on.

mod policy;
mod report;
mod restorer;

pub use policy::RetryPolicy;
pub use report::{RestoreFailure, RestoreReport};
pub use restorer::Restorer;
