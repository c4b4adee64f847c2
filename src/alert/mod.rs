// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outage notifications.
//!
//! A [`PowerAlert`] is told about each outage transition and about the
//! outcome of each restoration pass. Alerts never fail: delivery problems
//! are logged by the implementation and swallowed.
//!
//! - [`LogAlert`]: writes the notification to the tracing log
//! - [`WebhookAlert`]: posts it as JSON to a URL (requires the `http`
//!   feature)
//!
//! Alerts compose: `Option<A>` alerts only when set, and a pair `(A, B)`
//! notifies both in order.
//!
//! [`spawn_alerts`] drives an alert from an [`EventBus`](crate::event::EventBus)
//! subscription so that slow deliveries never hold up the dispatch loop.

mod logging;
#[cfg(feature = "http")]
mod webhook;

pub use logging::LogAlert;
#[cfg(feature = "http")]
pub use webhook::WebhookAlert;

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::event::OutageEvent;
use crate::restore::RestoreReport;

/// Receives outage notifications.
pub trait PowerAlert: Send + Sync {
    /// The UPS switched to battery.
    fn power_lost(&self, at: DateTime<Utc>) -> impl Future<Output = ()> + Send;

    /// The UPS is back on line and restoration is about to start.
    fn power_restored(&self, at: DateTime<Utc>) -> impl Future<Output = ()> + Send;

    /// A restoration pass finished.
    fn restore_finished(
        &self,
        at: DateTime<Utc>,
        report: &RestoreReport,
    ) -> impl Future<Output = ()> + Send;

    /// Routes an event to the matching method.
    fn notify(&self, event: &OutageEvent) -> impl Future<Output = ()> + Send {
        async move {
            match event {
                OutageEvent::PowerLost { at } => self.power_lost(*at).await,
                OutageEvent::PowerRestored { at } => self.power_restored(*at).await,
                OutageEvent::RestoreFinished { at, report } => {
                    self.restore_finished(*at, report).await;
                }
            }
        }
    }
}

impl<A: PowerAlert> PowerAlert for Option<A> {
    async fn power_lost(&self, at: DateTime<Utc>) {
        if let Some(alert) = self {
            alert.power_lost(at).await;
        }
    }

    async fn power_restored(&self, at: DateTime<Utc>) {
        if let Some(alert) = self {
            alert.power_restored(at).await;
        }
    }

    async fn restore_finished(&self, at: DateTime<Utc>, report: &RestoreReport) {
        if let Some(alert) = self {
            alert.restore_finished(at, report).await;
        }
    }
}

impl<A: PowerAlert, B: PowerAlert> PowerAlert for (A, B) {
    async fn power_lost(&self, at: DateTime<Utc>) {
        self.0.power_lost(at).await;
        self.1.power_lost(at).await;
    }

    async fn power_restored(&self, at: DateTime<Utc>) {
        self.0.power_restored(at).await;
        self.1.power_restored(at).await;
    }

    async fn restore_finished(&self, at: DateTime<Utc>, report: &RestoreReport) {
        self.0.restore_finished(at, report).await;
        self.1.restore_finished(at, report).await;
    }
}

/// Spawns a task feeding every event from `events` to `alert`.
///
/// The task ends when the bus is dropped. A lagging subscription skips the
/// lost events with a warning.
pub fn spawn_alerts<A>(alert: A, mut events: broadcast::Receiver<OutageEvent>) -> JoinHandle<()>
where
    A: PowerAlert + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => alert.notify(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Alert delivery lagging, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, stopping alerts");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::event::EventBus;

    #[derive(Default, Clone)]
    struct RecordingAlert {
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RecordingAlert {
        fn seen(&self) -> Vec<&'static str> {
            self.seen.lock().clone()
        }
    }

    impl PowerAlert for RecordingAlert {
        async fn power_lost(&self, _at: DateTime<Utc>) {
            self.seen.lock().push("lost");
        }

        async fn power_restored(&self, _at: DateTime<Utc>) {
            self.seen.lock().push("restored");
        }

        async fn restore_finished(&self, _at: DateTime<Utc>, _report: &RestoreReport) {
            self.seen.lock().push("finished");
        }
    }

    #[tokio::test]
    async fn notify_routes_each_event() {
        let alert = RecordingAlert::default();

        alert.notify(&OutageEvent::power_lost()).await;
        alert.notify(&OutageEvent::power_restored()).await;
        alert
            .notify(&OutageEvent::restore_finished(RestoreReport::default()))
            .await;

        assert_eq!(alert.seen(), ["lost", "restored", "finished"]);
    }

    #[tokio::test]
    async fn pair_notifies_both_and_none_is_silent() {
        let first = RecordingAlert::default();
        let second = RecordingAlert::default();
        let pair = (first.clone(), Some(second.clone()));

        pair.notify(&OutageEvent::power_lost()).await;
        None::<RecordingAlert>.notify(&OutageEvent::power_lost()).await;

        assert_eq!(first.seen(), ["lost"]);
        assert_eq!(second.seen(), ["lost"]);
    }

    #[tokio::test]
    async fn spawned_alerts_follow_bus_until_closed() {
        let bus = EventBus::new();
        let alert = RecordingAlert::default();
        let task = spawn_alerts(alert.clone(), bus.subscribe());

        bus.publish(OutageEvent::power_lost());
        bus.publish(OutageEvent::power_restored());
        drop(bus);

        task.await.unwrap();
        assert_eq!(alert.seen(), ["lost", "restored"]);
    }
}
