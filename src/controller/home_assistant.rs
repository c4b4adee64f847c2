// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant REST API controller.

use std::time::Duration;

use reqwest::Client;

use super::DeviceController;
use crate::error::ControlError;
use crate::types::{DeviceId, LightState};

/// Domain used when an entity id carries none.
const DEFAULT_DOMAIN: &str = "light";

// ============================================================================
// ControllerConfig
// ============================================================================

/// Configuration for a [`HomeAssistantController`].
///
/// # Examples
///
/// ```
/// use light_state_cache::controller::ControllerConfig;
/// use std::time::Duration;
///
/// let config = ControllerConfig::new("http://supervisor/core/api")
///     .with_token("long-lived-token")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.api_url(), "http://supervisor/core/api");
/// ```
#[derive(Clone)]
pub struct ControllerConfig {
    api_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl ControllerConfig {
    /// API base URL used inside a Home Assistant add-on.
    pub const DEFAULT_API_URL: &'static str = "http://supervisor/core/api";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the API at `api_url`.
    ///
    /// A trailing `/` is removed.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            token: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns true if a token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a [`HomeAssistantController`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_controller(self) -> Result<HomeAssistantController, ControlError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ControlError::Http)?;

        Ok(HomeAssistantController {
            api_url: self.api_url,
            token: self.token,
            client,
        })
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_API_URL)
    }
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// HomeAssistantController
// ============================================================================

/// Controls lights through the Home Assistant services API.
///
/// Setting a state posts `{"entity_id": ...}` to
/// `<api>/services/<domain>/turn_on` or `turn_off`, where `<domain>` is the
/// entity domain of the device id (`light` for `light.kitchen`). Any
/// non-2xx answer is a failure.
#[derive(Clone)]
pub struct HomeAssistantController {
    api_url: String,
    token: Option<String>,
    client: Client,
}

impl HomeAssistantController {
    /// Returns the service URL that applies `state` to `device_id`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::UnsupportedState` for tokens other than
    /// on/off.
    pub fn service_url(
        &self,
        device_id: &DeviceId,
        state: &LightState,
    ) -> Result<String, ControlError> {
        let service = match state {
            LightState::On => "turn_on",
            LightState::Off => "turn_off",
            LightState::Other(token) => {
                return Err(ControlError::UnsupportedState(token.clone()));
            }
        };
        let domain = device_id.domain().unwrap_or(DEFAULT_DOMAIN);
        Ok(format!("{}/services/{domain}/{service}", self.api_url))
    }
}

impl DeviceController for HomeAssistantController {
    async fn set_state(
        &self,
        device_id: &DeviceId,
        state: &LightState,
    ) -> Result<(), ControlError> {
        let url = self.service_url(device_id, state)?;

        tracing::debug!(url = %url, device = %device_id, "Sending control request");

        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "entity_id": device_id.as_str() }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ControlError::Http)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(device = %device_id, state = %state, "Control request accepted");
        Ok(())
    }
}

impl std::fmt::Debug for HomeAssistantController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeAssistantController")
            .field("api_url", &self.api_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    #[test]
    fn config_default_values() {
        let config = ControllerConfig::default();
        assert_eq!(config.api_url(), "http://supervisor/core/api");
        assert!(!config.has_token());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = ControllerConfig::new("http://ha.local:8123/api/");
        assert_eq!(config.api_url(), "http://ha.local:8123/api");
    }

    #[test]
    fn config_debug_hides_token() {
        let config = ControllerConfig::default().with_token("secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn service_url_for_states() {
        let controller = ControllerConfig::new("http://ha/api")
            .into_controller()
            .unwrap();

        assert_eq!(
            controller
                .service_url(&id("light.kitchen"), &LightState::On)
                .unwrap(),
            "http://ha/api/services/light/turn_on"
        );
        assert_eq!(
            controller
                .service_url(&id("switch.fan"), &LightState::Off)
                .unwrap(),
            "http://ha/api/services/switch/turn_off"
        );
        assert_eq!(
            controller
                .service_url(&id("porch"), &LightState::On)
                .unwrap(),
            "http://ha/api/services/light/turn_on"
        );
    }

    #[test]
    fn service_url_rejects_other_tokens() {
        let controller = ControllerConfig::default().into_controller().unwrap();
        let result = controller.service_url(
            &id("light.kitchen"),
            &LightState::Other("unavailable".to_string()),
        );
        assert!(matches!(result, Err(ControlError::UnsupportedState(_))));
    }

    #[tokio::test]
    async fn set_state_posts_entity_with_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/services/light/turn_on"))
            .and(header("authorization", "Bearer abc123"))
            .and(body_json(serde_json::json!({ "entity_id": "light.kitchen" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let controller = ControllerConfig::new(format!("{}/api", mock_server.uri()))
            .with_token("abc123")
            .into_controller()
            .unwrap();

        controller
            .set_state(&id("light.kitchen"), &LightState::On)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/services/light/turn_off"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let controller = ControllerConfig::new(format!("{}/api", mock_server.uri()))
            .into_controller()
            .unwrap();

        let err = controller
            .set_state(&id("light.kitchen"), &LightState::Off)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::Rejected { status: 502, ref body } if body == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn unauthorized_is_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let controller = ControllerConfig::new(mock_server.uri())
            .with_token("wrong")
            .into_controller()
            .unwrap();

        let err = controller
            .set_state(&id("light.kitchen"), &LightState::On)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn unsupported_state_sends_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let controller = ControllerConfig::new(mock_server.uri())
            .into_controller()
            .unwrap();

        let result = controller
            .set_state(&id("light.kitchen"), &LightState::Other("dim".to_string()))
            .await;
        assert!(matches!(result, Err(ControlError::UnsupportedState(_))));
    }

    #[tokio::test]
    async fn unreachable_api_is_failure() {
        let controller = ControllerConfig::new("http://127.0.0.1:1")
            .with_timeout(Duration::from_millis(500))
            .into_controller()
            .unwrap();

        let err = controller
            .set_state(&id("light.kitchen"), &LightState::On)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Http(_)));
    }
}
