// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Alerts written to the tracing log.

use chrono::{DateTime, Utc};

use super::PowerAlert;
use crate::restore::RestoreReport;

/// Logs outage notifications through `tracing`.
///
/// Transitions are logged at info level. A pass with failures is logged at
/// warn level, with one line per device left unrestored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlert;

impl LogAlert {
    /// Creates a log alert.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PowerAlert for LogAlert {
    async fn power_lost(&self, at: DateTime<Utc>) {
        tracing::info!(alert = "power_lost", at = %at, "Power lost, UPS on battery");
    }

    async fn power_restored(&self, at: DateTime<Utc>) {
        tracing::info!(alert = "power_restored", at = %at, "Power restored, restoring lights");
    }

    async fn restore_finished(&self, at: DateTime<Utc>, report: &RestoreReport) {
        if report.is_success() {
            tracing::info!(alert = "restore_finished", at = %at, "{}", report.summary());
            return;
        }

        tracing::warn!(alert = "restore_finished", at = %at, "{}", report.summary());
        for failure in &report.failed {
            tracing::warn!(
                device = %failure.device_id,
                state = %failure.state,
                attempts = failure.attempts,
                error = %failure.last_error,
                "Light not restored"
            );
        }
    }
}
