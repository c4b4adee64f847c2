// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT bus using mockforge-mqtt.
//!
//! The mock broker accepts connections and subscriptions but does not
//! forward publishes, so message delivery is covered by the service tests
//! that feed the channel directly.

#![cfg(feature = "mqtt")]

use std::time::Duration;

use light_state_cache::ProtocolError;
use light_state_cache::bus::MqttBus;
use light_state_cache::ingest::TopicLayout;
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind
    sleep(Duration::from_millis(500)).await;
}

mod connection {
    use super::*;

    #[tokio::test]
    async fn connect_and_subscribe() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let layout = TopicLayout::default();
        let mut builder = MqttBus::builder().host("127.0.0.1").port(port);
        for filter in layout.subscriptions() {
            builder = builder.subscribe(filter);
        }

        let result = builder.build().await;
        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());

        let (bus, _messages) = result.unwrap();
        assert!(bus.is_connected());
        assert_eq!(bus.host(), "127.0.0.1");
        assert_eq!(bus.port(), port);
        assert_eq!(bus.subscriptions(), ["light_state_cache/+", "NUT/ups/status"]);
    }

    #[tokio::test]
    async fn connect_with_credentials() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .credentials("cache", "secret")
            .build()
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn disconnect_marks_bus_disconnected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bus, _messages) = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .build()
            .await
            .unwrap();

        bus.disconnect().await.unwrap();
        assert!(!bus.is_connected());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn missing_host_fails() {
        let result = MqttBus::builder().port(1883).build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn unreachable_broker_fails() {
        // Nothing listens on this port
        let port = get_test_port();

        let result = MqttBus::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }
}
