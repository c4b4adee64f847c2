// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Add-on options.
//!
//! The add-on supervisor writes the user's options to a JSON file
//! (`/data/options.json`). Every field has a default, so a partial file or
//! no file at all yields a working configuration.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::ingest::TopicLayout;
use crate::restore::RetryPolicy;

/// Default location of the options file.
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// Runtime options.
///
/// # Examples
///
/// ```
/// use light_state_cache::config::Options;
///
/// let options: Options = serde_json::from_str(r#"{"mqtt_broker": "10.0.0.2"}"#).unwrap();
/// assert_eq!(options.mqtt_broker, "10.0.0.2");
/// assert_eq!(options.mqtt_port, 1883);
/// assert_eq!(options.restore_attempts, 12);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// MQTT broker host.
    pub mqtt_broker: String,
    /// MQTT broker port.
    pub mqtt_port: u16,
    /// MQTT user name, if the broker requires one.
    pub mqtt_username: Option<String>,
    /// MQTT password.
    pub mqtt_password: Option<String>,
    /// Filter matching device state topics, `<prefix>/+`.
    pub light_topic: String,
    /// Topic on which NUT publishes the UPS status.
    pub nut_topic: String,
    /// Entity domain accepted from device topics; empty accepts all.
    pub entity_domain: String,
    /// Path of the state database.
    pub db_path: String,
    /// Base URL of the device control API.
    pub api_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    /// Timeout of a single API request, in seconds.
    pub request_timeout_secs: u64,
    /// Wait between power restoration and the first command, in seconds.
    pub grace_period_secs: u64,
    /// Attempts per device during a restoration pass.
    pub restore_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds.
    pub retry_initial_delay_ms: u64,
    /// Upper bound of the delay between attempts, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// URL receiving outage notifications as JSON.
    pub alert_webhook_url: Option<String>,
    /// Write outage notifications to the log.
    pub log_alerts: bool,
    /// Outage events buffered per alert sink before it starts losing them.
    pub event_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mqtt_broker: "core-mosquitto".to_string(),
            mqtt_port: 1883,
            mqtt_username: None,
            mqtt_password: None,
            light_topic: TopicLayout::DEFAULT_DEVICE_FILTER.to_string(),
            nut_topic: TopicLayout::DEFAULT_UPS_TOPIC.to_string(),
            entity_domain: TopicLayout::DEFAULT_ENTITY_DOMAIN.to_string(),
            db_path: "/data/light_state_cache.db".to_string(),
            api_url: "http://supervisor/core/api".to_string(),
            token_env: "SUPERVISOR_TOKEN".to_string(),
            request_timeout_secs: 10,
            grace_period_secs: 10,
            restore_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            alert_webhook_url: None,
            log_alerts: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Options {
    /// Loads options from a JSON file.
    ///
    /// A missing file yields the defaults. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid JSON
    /// for this schema, or holds an unusable value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let options = match fs::read_to_string(path) {
            Ok(contents) => {
                let options: Self = serde_json::from_str(&contents)?;
                tracing::info!(path = %path.display(), "Loaded options");
                options
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "No options file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        options.validate()?;
        Ok(options)
    }

    /// Checks that every value can be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt_broker.trim().is_empty() {
            return Err(invalid("mqtt_broker", "must not be empty"));
        }
        if self.mqtt_port == 0 {
            return Err(invalid("mqtt_port", "must not be 0"));
        }
        if self.db_path.trim().is_empty() {
            return Err(invalid("db_path", "must not be empty"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(invalid("api_url", "must be an http(s) URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.restore_attempts == 0 {
            return Err(invalid("restore_attempts", "must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(invalid("event_capacity", "must be at least 1"));
        }
        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return Err(invalid(
                "retry_max_delay_ms",
                "must not be below retry_initial_delay_ms",
            ));
        }
        self.topic_layout()?;
        Ok(())
    }

    /// Returns the topic layout described by the options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a topic is malformed.
    pub fn topic_layout(&self) -> Result<TopicLayout, ConfigError> {
        Ok(TopicLayout::new(&self.light_topic, &self.nut_topic)?
            .with_entity_domain(self.entity_domain.clone()))
    }

    /// Returns the per-device retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.restore_attempts)
            .with_initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry_max_delay_ms))
    }

    /// Returns the wait before the first restore command.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Returns the API request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reads the API token from the configured environment variable.
    ///
    /// Returns `None` if the variable is unset or empty.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("mqtt_broker", &self.mqtt_broker)
            .field("mqtt_port", &self.mqtt_port)
            .field("mqtt_username", &self.mqtt_username)
            .field("mqtt_password", &self.mqtt_password.as_ref().map(|_| "<redacted>"))
            .field("light_topic", &self.light_topic)
            .field("nut_topic", &self.nut_topic)
            .field("entity_domain", &self.entity_domain)
            .field("db_path", &self.db_path)
            .field("api_url", &self.api_url)
            .field("token_env", &self.token_env)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("grace_period_secs", &self.grace_period_secs)
            .field("restore_attempts", &self.restore_attempts)
            .field("retry_initial_delay_ms", &self.retry_initial_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("alert_webhook_url", &self.alert_webhook_url)
            .field("log_alerts", &self.log_alerts)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
