// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state cache add-on.
//!
//! Caches the state of every light reported on MQTT and turns the lights
//! back to that state once the UPS reports that mains power is back.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use light_state_cache::alert::{LogAlert, WebhookAlert, spawn_alerts};
use light_state_cache::bus::MqttBus;
use light_state_cache::config::{DEFAULT_OPTIONS_PATH, Options};
use light_state_cache::controller::ControllerConfig;
use light_state_cache::event::EventBus;
use light_state_cache::restore::Restorer;
use light_state_cache::service::Service;
use light_state_cache::store::SledStateStore;

#[derive(Parser)]
#[command(name = "light-state-cache")]
#[command(about = "Cache light states and restore them after a power outage", long_about = None)]
#[command(version)]
struct Cli {
    /// Options file path
    #[arg(short, long, env = "LIGHT_STATE_CACHE_OPTIONS", default_value = DEFAULT_OPTIONS_PATH)]
    options: PathBuf,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, env = "LIGHT_STATE_CACHE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LIGHT_STATE_CACHE_LOG_JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> light_state_cache::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let options = Options::load(&cli.options)?;
    tracing::debug!(?options, "Effective options");

    let store = Arc::new(SledStateStore::open(&options.db_path)?);
    tracing::info!(cached = store.len(), "Cached light states loaded");

    let mut controller =
        ControllerConfig::new(&options.api_url).with_timeout(options.request_timeout());
    match options.token() {
        Some(token) => controller = controller.with_token(token),
        None => tracing::warn!(
            variable = %options.token_env,
            "No API token set, control requests are unauthenticated"
        ),
    }
    let controller = Arc::new(controller.into_controller()?);

    let restorer = Restorer::new(store, controller)
        .with_grace_period(options.grace_period())
        .with_policy(options.retry_policy());
    let service = Service::new(options.topic_layout()?, restorer)
        .with_event_bus(EventBus::with_capacity(options.event_capacity));

    let webhook = options
        .alert_webhook_url
        .as_deref()
        .map(|url| WebhookAlert::new(url, WebhookAlert::DEFAULT_TIMEOUT))
        .transpose()?;
    let log = options.log_alerts.then_some(LogAlert::new());
    spawn_alerts((log, webhook), service.subscribe());

    let mut bus = MqttBus::builder()
        .host(&options.mqtt_broker)
        .port(options.mqtt_port);
    if let Some(username) = &options.mqtt_username {
        bus = bus.credentials(username, options.mqtt_password.as_deref().unwrap_or_default());
    }
    for filter in service.layout().subscriptions() {
        bus = bus.subscribe(filter);
    }
    let (_bus, messages) = bus.build().await?;

    service.run(messages).await
}
