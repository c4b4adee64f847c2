// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Alerts posted to a webhook.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use super::PowerAlert;
use crate::error::ControlError;
use crate::event::OutageEvent;
use crate::restore::RestoreReport;

/// Body posted to the webhook.
#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(flatten)]
    event: &'a OutageEvent,
    message: String,
}

/// Posts outage notifications as JSON.
///
/// The body is the serialized [`OutageEvent`] plus a human readable
/// `message`:
///
/// ```json
/// {
///   "event": "restore_finished",
///   "at": "...",
///   "report": {...},
///   "message": "Restored 4 of 5 lights in 31.2s"
/// }
/// ```
///
/// Each notification is sent once. Delivery failures are logged.
#[derive(Debug, Clone)]
pub struct WebhookAlert {
    url: String,
    client: Client,
}

impl WebhookAlert {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates an alert posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Http` if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ControlError::Http)?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts one event.
    ///
    /// # Errors
    ///
    /// Returns `ControlError` if the request fails or is not answered
    /// with a success status.
    pub async fn send(&self, event: &OutageEvent) -> Result<(), ControlError> {
        let payload = WebhookPayload {
            event,
            message: event.describe(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(ControlError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn deliver(&self, event: OutageEvent) {
        match self.send(&event).await {
            Ok(()) => tracing::debug!(url = %self.url, "Webhook alert delivered"),
            Err(e) => tracing::warn!(url = %self.url, error = %e, "Webhook alert failed"),
        }
    }
}

impl PowerAlert for WebhookAlert {
    async fn power_lost(&self, at: DateTime<Utc>) {
        self.deliver(OutageEvent::PowerLost { at }).await;
    }

    async fn power_restored(&self, at: DateTime<Utc>) {
        self.deliver(OutageEvent::PowerRestored { at }).await;
    }

    async fn restore_finished(&self, at: DateTime<Utc>, report: &RestoreReport) {
        self.deliver(OutageEvent::RestoreFinished {
            at,
            report: report.clone(),
        })
        .await;
    }
}
