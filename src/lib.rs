// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state cache - remember light states and restore them after a
//! power outage.
//!
//! The cache listens on MQTT for two kinds of messages:
//!
//! - **Device states**, published on `light_state_cache/<entity id>` with a
//!   payload such as `on` or `off`. The last state of every light is kept in
//!   a durable store.
//! - **UPS status** flags published by NUT (`OB` on battery, `OL` on line).
//!
//! When the UPS goes on battery, the cache stops recording states: lights
//! that lose power report misleading states. When power comes back, it
//! waits a grace period and sends every cached state back to the lights
//! through the Home Assistant API, retrying each light with exponential
//! backoff. Recording resumes once the pass is over.
//!
//! # Components
//!
//! - [`outage`]: the power-event state machine gating everything else
//! - [`ingest`]: topic classification and gated writes to the store
//! - [`restore`]: the retrying restoration pass
//! - [`store`]: durable (`sled`) and in-memory state stores
//! - [`controller`]: the device control API (Home Assistant)
//! - [`bus`]: the MQTT transport
//! - [`alert`] and [`event`]: outage notifications
//! - [`service`]: the dispatch loop wiring the above together
//! - [`config`]: the options file
//!
//! # Feature Flags
//!
//! - `http` (default): Home Assistant controller and webhook alerts
//! - `mqtt` (default): MQTT transport
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use light_state_cache::bus::MqttBus;
//! use light_state_cache::controller::ControllerConfig;
//! use light_state_cache::ingest::TopicLayout;
//! use light_state_cache::restore::Restorer;
//! use light_state_cache::service::Service;
//! use light_state_cache::store::SledStateStore;
//!
//! #[tokio::main]
//! async fn main() -> light_state_cache::Result<()> {
//!     let store = Arc::new(SledStateStore::open("/data/light_state_cache.db")?);
//!     let controller = Arc::new(
//!         ControllerConfig::default()
//!             .with_token("long-lived-token")
//!             .into_controller()?,
//!     );
//!
//!     let service = Service::new(TopicLayout::default(), Restorer::new(store, controller));
//!
//!     let (_bus, messages) = MqttBus::builder()
//!         .host("core-mosquitto")
//!         .subscribe(TopicLayout::DEFAULT_DEVICE_FILTER)
//!         .subscribe(TopicLayout::DEFAULT_UPS_TOPIC)
//!         .build()
//!         .await?;
//!
//!     service.run(messages).await
//! }
//! ```

pub mod alert;
pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod ingest;
pub mod outage;
pub mod restore;
pub mod service;
pub mod store;
pub mod types;

pub use error::{ConfigError, ControlError, Error, ProtocolError, Result, StoreError, ValueError};
pub use outage::{OutageMonitor, OutageState, PowerPhase, Transition};
pub use service::Service;
pub use types::{DeviceId, DeviceState, LightState};
