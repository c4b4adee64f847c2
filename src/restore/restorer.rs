// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The restoration pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{RestoreFailure, RestoreReport, RetryPolicy};
use crate::controller::DeviceController;
use crate::outage::OutageMonitor;
use crate::store::StateStore;
use crate::types::DeviceState;

/// Closes the outage window when dropped, including on unwind.
struct OutageWindow<'a> {
    monitor: &'a OutageMonitor,
}

impl Drop for OutageWindow<'_> {
    fn drop(&mut self) {
        self.monitor.restore_complete();
    }
}

/// Replays cached states through a device controller.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use light_state_cache::controller::ControllerConfig;
/// use light_state_cache::restore::{Restorer, RetryPolicy};
/// use light_state_cache::store::SledStateStore;
///
/// # async fn example() -> light_state_cache::Result<()> {
/// let store = Arc::new(SledStateStore::open("/data/light_state_cache.db")?);
/// let controller = Arc::new(ControllerConfig::default().into_controller()?);
///
/// let restorer = Restorer::new(store, controller)
///     .with_grace_period(Duration::from_secs(10))
///     .with_policy(RetryPolicy::new().with_max_attempts(5));
///
/// let report = restorer.restore_all().await;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
pub struct Restorer<S, C> {
    store: Arc<S>,
    controller: Arc<C>,
    policy: RetryPolicy,
    grace_period: Duration,
}

impl<S: StateStore, C: DeviceController> Restorer<S, C> {
    /// Default wait before the first command, giving lights time to rejoin
    /// the network.
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

    /// Creates a restorer with the default grace period and retry policy.
    #[must_use]
    pub fn new(store: Arc<S>, controller: Arc<C>) -> Self {
        Self {
            store,
            controller,
            policy: RetryPolicy::default(),
            grace_period: Self::DEFAULT_GRACE_PERIOD,
        }
    }

    /// Sets the per-device retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the wait before the first command.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Returns the per-device retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the wait before the first command.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Returns the store the pass reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs a pass inside the outage window held by `monitor`.
    ///
    /// The monitor is moved back to normal when the pass ends, whatever
    /// its outcome, and also if the pass panics.
    pub async fn run(&self, monitor: &OutageMonitor) -> RestoreReport {
        let _window = OutageWindow { monitor };
        self.restore_all().await
    }

    /// Waits the grace period, then applies every cached state once.
    ///
    /// Does not touch the outage monitor.
    pub async fn restore_all(&self) -> RestoreReport {
        let started = Instant::now();

        if !self.grace_period.is_zero() {
            tracing::info!(
                grace_secs = self.grace_period.as_secs_f32(),
                "Waiting for lights to rejoin the network"
            );
            tokio::time::sleep(self.grace_period).await;
        }

        let snapshot = match self.store.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Cannot read cached states, nothing restored");
                return RestoreReport {
                    scan_error: Some(e.to_string()),
                    elapsed: started.elapsed(),
                    ..RestoreReport::default()
                };
            }
        };

        tracing::info!(
            devices = snapshot.records.len(),
            skipped = snapshot.skipped.len(),
            "Restoring light states"
        );

        let mut report = RestoreReport {
            skipped: snapshot.skipped,
            ..RestoreReport::default()
        };
        for record in snapshot.records {
            match self.restore_device(&record).await {
                Ok(_) => report.restored.push(record.device_id),
                Err(failure) => report.failed.push(failure),
            }
        }
        report.elapsed = started.elapsed();

        if report.is_success() {
            tracing::info!(restored = report.restored.len(), "Restoration pass complete");
        } else {
            tracing::warn!(
                restored = report.restored.len(),
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "Restoration pass complete with failures"
            );
        }

        report
    }

    /// Applies one cached state, retrying per the policy.
    ///
    /// Returns the number of attempts on success.
    async fn restore_device(&self, record: &DeviceState) -> Result<u32, RestoreFailure> {
        let device = &record.device_id;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.controller.set_state(device, &record.state).await {
                Ok(()) => {
                    tracing::info!(
                        device = %device,
                        state = %record.state,
                        attempt,
                        "Restored device"
                    );
                    return Ok(attempt);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || !self.policy.should_retry(attempt) {
                tracing::error!(
                    device = %device,
                    state = %record.state,
                    attempts = attempt,
                    error = %error,
                    "Giving up on device"
                );
                return Err(RestoreFailure {
                    device_id: device.clone(),
                    state: record.state.clone(),
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = self.policy.delay_after_attempt(attempt);
            tracing::warn!(
                device = %device,
                attempt,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Restore attempt failed"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl<S, C> std::fmt::Debug for Restorer<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Restorer")
            .field("policy", &self.policy)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}
