// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outage event types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::restore::RestoreReport;

/// Events emitted over the course of an outage.
///
/// Serialized with an `event` tag, which is the payload shape sent by
/// webhook alerts:
///
/// ```json
/// {"event": "power_lost", "at": "2026-01-04T21:13:09Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutageEvent {
    /// The UPS switched to battery. Ingestion is suspended.
    PowerLost {
        /// When the transition happened.
        at: DateTime<Utc>,
    },

    /// The UPS is back on line. A restoration pass has been scheduled.
    PowerRestored {
        /// When the transition happened.
        at: DateTime<Utc>,
    },

    /// A restoration pass finished and ingestion resumed.
    RestoreFinished {
        /// When the pass ended.
        at: DateTime<Utc>,
        /// What the pass achieved.
        report: RestoreReport,
    },
}

impl OutageEvent {
    /// Creates a power lost event stamped now.
    #[must_use]
    pub fn power_lost() -> Self {
        Self::PowerLost { at: Utc::now() }
    }

    /// Creates a power restored event stamped now.
    #[must_use]
    pub fn power_restored() -> Self {
        Self::PowerRestored { at: Utc::now() }
    }

    /// Creates a restore finished event stamped now.
    #[must_use]
    pub fn restore_finished(report: RestoreReport) -> Self {
        Self::RestoreFinished {
            at: Utc::now(),
            report,
        }
    }

    /// Returns when the event happened.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::PowerLost { at }
            | Self::PowerRestored { at }
            | Self::RestoreFinished { at, .. } => *at,
        }
    }

    /// Returns the `event` tag the event serializes with.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PowerLost { .. } => "power_lost",
            Self::PowerRestored { .. } => "power_restored",
            Self::RestoreFinished { .. } => "restore_finished",
        }
    }

    /// Returns `true` for [`OutageEvent::PowerLost`].
    #[must_use]
    pub fn is_power_lost(&self) -> bool {
        matches!(self, Self::PowerLost { .. })
    }

    /// Returns `true` for [`OutageEvent::PowerRestored`].
    #[must_use]
    pub fn is_power_restored(&self) -> bool {
        matches!(self, Self::PowerRestored { .. })
    }

    /// Returns the report of a finished pass.
    #[must_use]
    pub fn report(&self) -> Option<&RestoreReport> {
        match self {
            Self::RestoreFinished { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Returns a short human readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PowerLost { .. } => "Power lost, UPS on battery".to_string(),
            Self::PowerRestored { .. } => "Power restored, restoring lights".to_string(),
            Self::RestoreFinished { report, .. } => report.summary(),
        }
    }
}
