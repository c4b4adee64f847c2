// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outcome of a restoration pass.

use std::time::Duration;

use serde::Serialize;

use crate::types::{DeviceId, LightState};

/// A device the pass could not restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    /// The device that was not restored.
    pub device_id: DeviceId,
    /// The state that should have been applied.
    pub state: LightState,
    /// How many controller calls were made.
    pub attempts: u32,
    /// The error of the last call.
    pub last_error: String,
}

/// Summary of one restoration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Devices whose state was applied.
    pub restored: Vec<DeviceId>,
    /// Devices that exhausted their attempts or failed permanently.
    pub failed: Vec<RestoreFailure>,
    /// Keys of cached records that could not be decoded and were left out.
    pub skipped: Vec<String>,
    /// Set when the store could not be read; nothing was attempted.
    pub scan_error: Option<String>,
    /// Wall time of the pass, grace period included.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl RestoreReport {
    /// Returns true if every cached record was read and restored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.scan_error.is_none()
    }

    /// Returns the number of devices attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.restored.len() + self.failed.len()
    }

    /// Returns a one-line human readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(error) = &self.scan_error {
            return format!("Restore skipped, state store unreadable: {error}");
        }
        let mut summary = format!(
            "Restored {} of {} lights in {:.1}s",
            self.restored.len(),
            self.total(),
            self.elapsed.as_secs_f32()
        );
        if !self.skipped.is_empty() {
            summary.push_str(&format!(", {} unreadable skipped", self.skipped.len()));
        }
        summary
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: &str) -> RestoreFailure {
        RestoreFailure {
            device_id: DeviceId::new(id).unwrap(),
            state: LightState::On,
            attempts: 12,
            last_error: "controller unavailable: offline".to_string(),
        }
    }

    #[test]
    fn empty_report_is_success() {
        let report = RestoreReport::default();
        assert!(report.is_success());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn failures_are_counted() {
        let report = RestoreReport {
            restored: vec![DeviceId::new("light.a").unwrap()],
            failed: vec![failure("light.b")],
            elapsed: Duration::from_millis(2500),
            ..RestoreReport::default()
        };
        assert!(!report.is_success());
        assert_eq!(report.total(), 2);
        assert_eq!(report.summary(), "Restored 1 of 2 lights in 2.5s");
    }

    #[test]
    fn skipped_records_are_not_success() {
        let report = RestoreReport {
            restored: vec![DeviceId::new("light.a").unwrap()],
            skipped: vec!["light.zz".to_string()],
            elapsed: Duration::from_secs(1),
            ..RestoreReport::default()
        };
        assert!(!report.is_success());
        assert_eq!(report.total(), 1);
        assert_eq!(report.summary(), "Restored 1 of 1 lights in 1.0s, 1 unreadable skipped");
    }

    #[test]
    fn scan_error_summary() {
        let report = RestoreReport {
            scan_error: Some("database error".to_string()),
            ..RestoreReport::default()
        };
        assert!(!report.is_success());
        assert!(report.summary().contains("unreadable"));
    }

    #[test]
    fn serializes_elapsed_as_millis() {
        let report = RestoreReport {
            elapsed: Duration::from_millis(1234),
            ..RestoreReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], 1234);
        assert_eq!(json["restored"], serde_json::json!([]));
    }
}
