// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic classification.

use crate::bus::BusMessage;
use crate::error::ConfigError;
use crate::outage::UpsStatus;
use crate::types::{DeviceId, LightState};

/// What a bus message is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A device reported its state.
    DeviceState {
        /// The device, taken from the last topic level.
        device_id: DeviceId,
        /// The reported state.
        state: LightState,
    },
    /// The UPS published its status flags.
    UpsStatus(UpsStatus),
    /// The message is not for the cache.
    Ignored(&'static str),
}

/// The topics the cache listens to.
///
/// Device states are expected on `<prefix>/<entity id>`, where the device
/// filter is `<prefix>/+`. When an entity domain is set, only entity ids in
/// that domain (`light.` for `light`) are accepted.
///
/// # Examples
///
/// ```
/// use light_state_cache::bus::BusMessage;
/// use light_state_cache::ingest::{Route, TopicLayout};
///
/// let layout = TopicLayout::default();
///
/// let msg = BusMessage::new("light_state_cache/light.kitchen", "on");
/// assert!(matches!(layout.classify(&msg), Route::DeviceState { .. }));
///
/// let msg = BusMessage::new("light_state_cache/switch.fan", "on");
/// assert!(matches!(layout.classify(&msg), Route::Ignored(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    device_filter: String,
    device_prefix: String,
    entity_domain: Option<String>,
    ups_topic: String,
}

impl TopicLayout {
    /// Default device state filter.
    pub const DEFAULT_DEVICE_FILTER: &'static str = "light_state_cache/+";
    /// Default UPS status topic published by NUT.
    pub const DEFAULT_UPS_TOPIC: &'static str = "NUT/ups/status";
    /// Default entity domain.
    pub const DEFAULT_ENTITY_DOMAIN: &'static str = "light";

    /// Creates a layout from a device filter and a UPS topic.
    ///
    /// The entity domain is left unset; see [`Self::with_entity_domain`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the device filter is not of the
    /// form `<prefix>/+` or the UPS topic is empty or holds a wildcard.
    pub fn new(device_filter: &str, ups_topic: &str) -> Result<Self, ConfigError> {
        let prefix = device_filter
            .strip_suffix('+')
            .filter(|prefix| prefix.len() > 1 && prefix.ends_with('/'))
            .ok_or_else(|| ConfigError::Invalid {
                field: "light_topic",
                reason: format!("{device_filter:?} must have the form <prefix>/+"),
            })?;
        if has_wildcard(prefix) {
            return Err(ConfigError::Invalid {
                field: "light_topic",
                reason: format!("{device_filter:?} may only hold a wildcard in its last level"),
            });
        }
        if ups_topic.is_empty() || has_wildcard(ups_topic) {
            return Err(ConfigError::Invalid {
                field: "nut_topic",
                reason: format!("{ups_topic:?} must be a plain topic"),
            });
        }

        Ok(Self {
            device_filter: device_filter.to_string(),
            device_prefix: prefix.to_string(),
            entity_domain: None,
            ups_topic: ups_topic.to_string(),
        })
    }

    /// Restricts device ids to an entity domain.
    ///
    /// An empty domain accepts every id.
    #[must_use]
    pub fn with_entity_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.entity_domain = (!domain.is_empty()).then_some(domain);
        self
    }

    /// Returns the device state filter.
    #[must_use]
    pub fn device_filter(&self) -> &str {
        &self.device_filter
    }

    /// Returns the UPS status topic.
    #[must_use]
    pub fn ups_topic(&self) -> &str {
        &self.ups_topic
    }

    /// Returns the accepted entity domain, if restricted.
    #[must_use]
    pub fn entity_domain(&self) -> Option<&str> {
        self.entity_domain.as_deref()
    }

    /// Returns the filters to subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.device_filter.clone(), self.ups_topic.clone()]
    }

    /// Classifies a message.
    #[must_use]
    pub fn classify(&self, message: &BusMessage) -> Route {
        if message.topic == self.ups_topic {
            return Route::UpsStatus(UpsStatus::parse(&message.payload));
        }

        let Some(entity) = message.topic.strip_prefix(&self.device_prefix) else {
            return Route::Ignored("unknown topic");
        };
        if entity.contains('/') {
            return Route::Ignored("nested device topic");
        }
        if let Some(domain) = &self.entity_domain
            && entity.split_once('.').is_none_or(|(d, _)| d != domain)
        {
            return Route::Ignored("entity outside of domain");
        }

        let Ok(device_id) = DeviceId::new(entity) else {
            return Route::Ignored("empty device id");
        };
        let Ok(state) = message.payload.parse::<LightState>() else {
            return Route::Ignored("empty state");
        };

        Route::DeviceState { device_id, state }
    }
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self {
            device_filter: Self::DEFAULT_DEVICE_FILTER.to_string(),
            device_prefix: "light_state_cache/".to_string(),
            entity_domain: Some(Self::DEFAULT_ENTITY_DOMAIN.to_string()),
            ups_topic: Self::DEFAULT_UPS_TOPIC.to_string(),
        }
    }
}

fn has_wildcard(topic: &str) -> bool {
    topic.contains(['+', '#'])
}
