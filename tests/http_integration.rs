// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP adapters using wiremock.

#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use light_state_cache::alert::{WebhookAlert, spawn_alerts};
use light_state_cache::bus::BusMessage;
use light_state_cache::controller::ControllerConfig;
use light_state_cache::event::EventBus;
use light_state_cache::ingest::TopicLayout;
use light_state_cache::restore::{Restorer, RetryPolicy};
use light_state_cache::service::Service;
use light_state_cache::store::{SledStateStore, StateStore};
use light_state_cache::{DeviceId, LightState};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn restorer_for(
    server: &MockServer,
    store: Arc<SledStateStore>,
) -> Restorer<SledStateStore, light_state_cache::controller::HomeAssistantController> {
    let controller = ControllerConfig::new(format!("{}/api", server.uri()))
        .with_token("test-token")
        .with_timeout(Duration::from_secs(2))
        .into_controller()
        .unwrap();

    Restorer::new(store, Arc::new(controller))
        .with_grace_period(Duration::ZERO)
        .with_policy(
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_initial_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(20)),
        )
}

#[tokio::test]
async fn outage_cycle_calls_home_assistant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_on"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(serde_json::json!({ "entity_id": "light.kitchen" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_off"))
        .and(body_json(serde_json::json!({ "entity_id": "light.porch" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStateStore::open(dir.path().join("cache.db")).unwrap());
    let service = Service::new(TopicLayout::default(), restorer_for(&server, store));

    service.handle(&BusMessage::new("light_state_cache/light.kitchen", "on"));
    service.handle(&BusMessage::new("light_state_cache/light.porch", "off"));
    service.handle(&BusMessage::new("NUT/ups/status", "OB DISCHRG"));
    service.handle(&BusMessage::new("NUT/ups/status", "OL CHRG"));

    let report = service.wait_for_restore().await.unwrap();
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.restored.len(), 2);
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_on"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
        .expect(3)
        .mount(&server)
        .await;

    let store = Arc::new(SledStateStore::temporary().unwrap());
    store
        .upsert(&light_state_cache::DeviceState::new(
            DeviceId::new("light.hall").unwrap(),
            LightState::On,
        ))
        .unwrap();

    let report = restorer_for(&server, store).restore_all().await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].attempts, 3);
    assert!(report.failed[0].last_error.contains("503"));
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SledStateStore::temporary().unwrap());
    store
        .upsert(&light_state_cache::DeviceState::new(
            DeviceId::new("light.hall").unwrap(),
            LightState::Off,
        ))
        .unwrap();

    let report = restorer_for(&server, store).restore_all().await;
    assert_eq!(report.failed[0].attempts, 1);
}

#[tokio::test]
async fn webhook_receives_every_outage_event() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&api)
        .await;

    let hook = MockServer::start().await;
    for event in ["power_lost", "power_restored", "restore_finished"] {
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({ "event": event })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&hook)
            .await;
    }

    let events = EventBus::new();
    let store = Arc::new(SledStateStore::temporary().unwrap());
    let service = Service::new(TopicLayout::default(), restorer_for(&api, store))
        .with_event_bus(events.clone());
    let alert = WebhookAlert::new(format!("{}/hook", hook.uri()), Duration::from_secs(2)).unwrap();
    let alerts = spawn_alerts(alert, events.subscribe());

    service.handle(&BusMessage::new("light_state_cache/light.a", "on"));
    service.handle(&BusMessage::new("NUT/ups/status", "OB"));
    service.handle(&BusMessage::new("NUT/ups/status", "OL"));
    service.wait_for_restore().await.unwrap();

    drop(service);
    drop(events);
    alerts.await.unwrap();
}
