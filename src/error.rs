// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the light state cache.
//!
//! Each collaborator of the cache has its own error enum: the message bus
//! ([`ProtocolError`]), the persistent store ([`StoreError`]), the device
//! control API ([`ControlError`]) and the options file ([`ConfigError`]).
//! They all fold into the crate-level [`Error`].

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the message bus.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while reading or writing the state store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error returned by the device control API.
    #[error("control error: {0}")]
    Control(#[from] ControlError),

    /// Error occurred while loading configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A device identifier was empty.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// A state token was empty or contained whitespace only.
    #[error("invalid light state: {0:?}")]
    InvalidState(String),
}

/// Errors related to the message bus transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed or was lost.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to the persistent state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored key is not a valid device id.
    #[error("invalid stored key: {0}")]
    InvalidKey(String),
}

/// Errors returned by a device controller.
///
/// These are never fatal: the restoration pass records them and moves on.
#[derive(Debug, Error)]
pub enum ControlError {
    /// HTTP request failed before a response was received.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected {
        /// The HTTP status code.
        status: u16,
        /// The response body, possibly empty.
        body: String,
    },

    /// The state token has no matching control service.
    #[error("no control service for state {0:?}")]
    UnsupportedState(String),

    /// The controller is unreachable or otherwise unavailable.
    #[error("controller unavailable: {0}")]
    Unavailable(String),
}

impl ControlError {
    /// Returns true if sending the same command again may succeed.
    ///
    /// Unknown state tokens and client errors (bad request, bad token,
    /// unknown service) are permanent; everything else is treated as
    /// transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnsupportedState(_) => false,
            Self::Rejected { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            _ => true,
        }
    }
}

/// Errors related to loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was being read.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The options file is not valid JSON for the expected schema.
    #[error("failed to parse options: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value that cannot be used.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
