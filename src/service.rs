// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dispatch loop tying the cache together.
//!
//! [`Service`] consumes bus messages one at a time. Device states go to the
//! [`Ingestor`]; UPS statuses drive the [`OutageMonitor`]. When the monitor
//! reports [`Transition::RestoreStarted`] the service spawns the
//! [`Restorer`] as its own task, so the dispatch loop keeps draining the bus
//! (and dropping device states) while the lights are restored.
//!
//! ```text
//!  mpsc::Receiver<BusMessage>
//!            │
//!       Service::handle ──▶ TopicLayout::classify
//!            │
//!     ┌──────┴───────────┐
//!  Ingestor          OutageMonitor ──RestoreStarted──▶ tokio::spawn(Restorer::run)
//!     │                  │                                   │
//!  StateStore         EventBus ◀────────RestoreFinished──────┘
//! ```
//!
//! Store writes are synchronous: a [`SledStateStore`](crate::store::SledStateStore)
//! upsert flushes to disk before returning. Messages are still handled one
//! at a time so that the last state received for a light is the one kept.
//! On a multi-threaded runtime [`Service::run`] handles each message inside
//! [`tokio::task::block_in_place`], so the flush does not hold up the
//! restoration pass or the MQTT event loop.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{self, JoinHandle};

use crate::bus::BusMessage;
use crate::controller::DeviceController;
use crate::error::{ProtocolError, Result};
use crate::event::{EventBus, OutageEvent};
use crate::ingest::{IngestOutcome, Ingestor, Route, TopicLayout};
use crate::outage::{OutageMonitor, Transition, UpsStatus};
use crate::restore::{RestoreReport, Restorer};
use crate::store::StateStore;

/// What [`Service::handle`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The message carried a device state.
    Ingested(IngestOutcome),
    /// The message carried a UPS status.
    Power(Transition),
    /// The message was not for the cache.
    Ignored,
}

/// The light state cache service.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use light_state_cache::bus::BusMessage;
/// use light_state_cache::controller::DeviceController;
/// use light_state_cache::error::ControlError;
/// use light_state_cache::ingest::TopicLayout;
/// use light_state_cache::restore::Restorer;
/// use light_state_cache::service::Service;
/// use light_state_cache::store::MemoryStateStore;
/// use light_state_cache::types::{DeviceId, LightState};
///
/// struct NoopController;
///
/// impl DeviceController for NoopController {
///     async fn set_state(&self, _: &DeviceId, _: &LightState) -> Result<(), ControlError> {
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = Arc::new(MemoryStateStore::new());
/// let restorer = Restorer::new(Arc::clone(&store), Arc::new(NoopController));
/// let service = Service::new(TopicLayout::default(), restorer);
///
/// service.handle(&BusMessage::new("light_state_cache/light.kitchen", "on"));
/// assert_eq!(store.len(), 1);
/// # }
/// ```
pub struct Service<S, C> {
    layout: TopicLayout,
    monitor: Arc<OutageMonitor>,
    ingestor: Ingestor<S>,
    restorer: Arc<Restorer<S, C>>,
    events: EventBus,
    restore_task: Mutex<Option<JoinHandle<RestoreReport>>>,
}

impl<S, C> Service<S, C>
where
    S: StateStore + 'static,
    C: DeviceController + 'static,
{
    /// Creates a service restoring through `restorer` into the store it
    /// reads from.
    #[must_use]
    pub fn new(layout: TopicLayout, restorer: Restorer<S, C>) -> Self {
        let monitor = Arc::new(OutageMonitor::new());
        let ingestor = Ingestor::new(Arc::clone(restorer.store()), Arc::clone(&monitor));
        Self {
            layout,
            monitor,
            ingestor,
            restorer: Arc::new(restorer),
            events: EventBus::new(),
            restore_task: Mutex::new(None),
        }
    }

    /// Publishes outage events on `events` instead of a private bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Returns the topic layout.
    #[must_use]
    pub fn layout(&self) -> &TopicLayout {
        &self.layout
    }

    /// Returns the outage monitor.
    #[must_use]
    pub fn monitor(&self) -> &Arc<OutageMonitor> {
        &self.monitor
    }

    /// Subscribes to outage events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutageEvent> {
        self.events.subscribe()
    }

    /// Handles one bus message.
    ///
    /// Must be called from within a tokio runtime: a power-restored
    /// transition spawns the restoration pass.
    pub fn handle(&self, message: &BusMessage) -> Dispatch {
        tracing::debug!(topic = %message.topic, payload = %message.payload, "Received message");

        match self.layout.classify(message) {
            Route::DeviceState { device_id, state } => {
                Dispatch::Ingested(self.ingestor.ingest(device_id, state))
            }
            Route::UpsStatus(status) => Dispatch::Power(self.handle_ups(status)),
            Route::Ignored(reason) => {
                tracing::debug!(topic = %message.topic, reason, "Ignoring message");
                Dispatch::Ignored
            }
        }
    }

    /// Feeds a UPS status to the monitor.
    ///
    /// The power-lost marker is checked first; the power-restored marker is
    /// only considered when that check changed nothing.
    fn handle_ups(&self, status: UpsStatus) -> Transition {
        let mut transition = Transition::None;
        if status.on_battery {
            transition = self.monitor.on_battery();
        }
        if !transition.is_change() && status.on_line {
            transition = self.monitor.power_restored();
        }

        match transition {
            Transition::PowerLost => self.events.publish(OutageEvent::power_lost()),
            Transition::RestoreStarted => {
                self.events.publish(OutageEvent::power_restored());
                self.spawn_restore();
            }
            Transition::None => {
                tracing::debug!(
                    phase = %self.monitor.phase(),
                    on_battery = status.on_battery,
                    on_line = status.on_line,
                    "UPS status without transition"
                );
            }
        }
        transition
    }

    /// Handles a message that may block the worker on a store flush.
    ///
    /// A current-thread runtime has no other worker to move tasks to, so
    /// the message is handled inline there.
    fn handle_blocking(&self, message: &BusMessage) -> Dispatch {
        match Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => task::block_in_place(|| self.handle(message)),
            _ => self.handle(message),
        }
    }

    fn spawn_restore(&self) {
        let restorer = Arc::clone(&self.restorer);
        let monitor = Arc::clone(&self.monitor);
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            let report = restorer.run(&monitor).await;
            events.publish(OutageEvent::restore_finished(report.clone()));
            report
        });

        // The previous pass, if any, has already closed its window.
        *self.restore_task.lock() = Some(task);
    }

    /// Waits for the latest restoration pass, if one was started and not
    /// awaited yet.
    ///
    /// Returns `None` if there is no such pass or it panicked.
    pub async fn wait_for_restore(&self) -> Option<RestoreReport> {
        let task = self.restore_task.lock().take()?;
        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "Restoration task failed");
                None
            }
        }
    }

    /// Runs the dispatch loop until the bus channel closes.
    ///
    /// # Errors
    ///
    /// Always returns `ProtocolError::ChannelClosed` once the sender side is
    /// gone, which means the bus connection is lost for good.
    pub async fn run(&self, mut messages: mpsc::Receiver<BusMessage>) -> Result<()> {
        tracing::info!(
            devices = %self.layout.device_filter(),
            ups = %self.layout.ups_topic(),
            "Light state cache running"
        );

        while let Some(message) = messages.recv().await {
            self.handle_blocking(&message);
        }

        tracing::error!("Bus channel closed");
        Err(ProtocolError::ChannelClosed("bus message stream ended".to_string()).into())
    }
}

impl<S, C> std::fmt::Debug for Service<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("layout", &self.layout)
            .field("monitor", &self.monitor)
            .field("restorer", &self.restorer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{ControlError, Error};
    use crate::outage::PowerPhase;
    use crate::store::{MemoryStateStore, SledStateStore};
    use crate::types::{DeviceId, LightState};

    #[derive(Default)]
    struct CountingController {
        calls: Mutex<Vec<(DeviceId, LightState)>>,
    }

    impl DeviceController for CountingController {
        async fn set_state(
            &self,
            device_id: &DeviceId,
            state: &LightState,
        ) -> std::result::Result<(), ControlError> {
            self.calls.lock().push((device_id.clone(), state.clone()));
            Ok(())
        }
    }

    type TestService = Service<MemoryStateStore, CountingController>;

    fn service() -> (TestService, Arc<MemoryStateStore>, Arc<CountingController>) {
        let store = Arc::new(MemoryStateStore::new());
        let controller = Arc::new(CountingController::default());
        let restorer = Restorer::new(Arc::clone(&store), Arc::clone(&controller))
            .with_grace_period(Duration::from_secs(10));
        (Service::new(TopicLayout::default(), restorer), store, controller)
    }

    fn light(id: &str, state: &str) -> BusMessage {
        BusMessage::new(format!("light_state_cache/{id}"), state)
    }

    fn ups(status: &str) -> BusMessage {
        BusMessage::new("NUT/ups/status", status)
    }

    #[tokio::test(start_paused = true)]
    async fn ingests_device_states() {
        let (service, store, _) = service();

        assert_eq!(
            service.handle(&light("light.kitchen", "on")),
            Dispatch::Ingested(IngestOutcome::Stored)
        );
        assert_eq!(service.handle(&BusMessage::new("other/topic", "on")), Dispatch::Ignored);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn on_battery_checked_before_on_line() {
        let (service, _, _) = service();

        // Both markers while normal: only the power loss applies.
        assert_eq!(service.handle(&ups("OB OL")), Dispatch::Power(Transition::PowerLost));
        assert_eq!(service.monitor().phase(), PowerPhase::OnBattery);

        // Both markers while on battery: the restore marker is evaluated.
        assert_eq!(
            service.handle(&ups("OB OL")),
            Dispatch::Power(Transition::RestoreStarted)
        );
        service.wait_for_restore().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restore_runs_once_per_outage() {
        let (service, _, controller) = service();
        service.handle(&light("light.a", "on"));

        service.handle(&ups("OB"));
        service.handle(&ups("OL"));
        assert_eq!(service.handle(&ups("OL")), Dispatch::Power(Transition::None));
        assert_eq!(service.handle(&ups("OB")), Dispatch::Power(Transition::None));

        let report = service.wait_for_restore().await.unwrap();
        assert_eq!(report.restored.len(), 1);
        assert_eq!(controller.calls.lock().len(), 1);
        assert_eq!(service.monitor().phase(), PowerPhase::Normal);
        assert!(service.wait_for_restore().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_outage_events() {
        let (service, _, _) = service();
        let mut events = service.subscribe();

        service.handle(&ups("OB DISCHRG"));
        service.handle(&ups("OL CHRG"));
        service.wait_for_restore().await.unwrap();

        assert!(events.recv().await.unwrap().is_power_lost());
        assert!(events.recv().await.unwrap().is_power_restored());
        assert!(events.recv().await.unwrap().report().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn run_fails_when_bus_closes() {
        let (service, store, _) = service();
        let (tx, rx) = mpsc::channel(8);

        tx.send(light("light.a", "off")).await.unwrap();
        drop(tx);

        let err = service.run(rx).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::ChannelClosed(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_on_multi_thread_runtime_with_sled() {
        let store = Arc::new(SledStateStore::temporary().unwrap());
        let controller = Arc::new(CountingController::default());
        let restorer = Restorer::new(Arc::clone(&store), Arc::clone(&controller))
            .with_grace_period(Duration::ZERO);
        let service = Service::new(TopicLayout::default(), restorer);
        let (tx, rx) = mpsc::channel(16);

        tx.send(light("light.a", "on")).await.unwrap();
        tx.send(light("light.a", "off")).await.unwrap();
        tx.send(light("light.b", "on")).await.unwrap();
        tx.send(ups("OB")).await.unwrap();
        tx.send(ups("OL")).await.unwrap();
        drop(tx);

        let err = service.run(rx).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::ChannelClosed(_))));

        let report = service.wait_for_restore().await.unwrap();
        assert_eq!(report.restored.len(), 2);
        assert_eq!(
            *controller.calls.lock(),
            [
                (DeviceId::new("light.a").unwrap(), LightState::Off),
                (DeviceId::new("light.b").unwrap(), LightState::On),
            ]
        );
        assert_eq!(service.monitor().phase(), PowerPhase::Normal);
    }
}
