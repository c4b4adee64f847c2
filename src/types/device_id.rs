// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Stable identifier of a cached light.
///
/// This is the entity id the device control API knows the light by, e.g.
/// `light.kitchen`. The identifier is opaque to the cache: it is only
/// required to be non-empty.
///
/// # Examples
///
/// ```
/// use light_state_cache::types::DeviceId;
///
/// let id = DeviceId::new("light.kitchen").unwrap();
/// assert_eq!(id.as_str(), "light.kitchen");
/// assert!(DeviceId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::EmptyDeviceId` if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ValueError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValueError::EmptyDeviceId);
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the entity domain, the part before the first `.`.
    ///
    /// Returns `None` for identifiers without a domain.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('.').map(|(domain, _)| domain)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank() {
        assert_eq!(DeviceId::new(""), Err(ValueError::EmptyDeviceId));
        assert_eq!(DeviceId::new("   "), Err(ValueError::EmptyDeviceId));
    }

    #[test]
    fn domain_is_prefix_before_dot() {
        let id = DeviceId::new("light.living_room").unwrap();
        assert_eq!(id.domain(), Some("light"));

        let bare = DeviceId::new("porch").unwrap();
        assert_eq!(bare.domain(), None);
    }

    #[test]
    fn display_format() {
        let id: DeviceId = "light.kitchen".parse().unwrap();
        assert_eq!(id.to_string(), "light.kitchen");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = DeviceId::new("light.a").unwrap();
        let b = DeviceId::new("light.b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn deserialize_rejects_empty() {
        let result: Result<DeviceId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
