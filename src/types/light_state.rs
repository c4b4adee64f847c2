// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Last reported state of a light.
///
/// Lights publish `on` or `off`. Any other non-blank token is kept
/// verbatim as [`LightState::Other`] so the controller can decide whether
/// it knows how to apply it.
///
/// # Examples
///
/// ```
/// use light_state_cache::types::LightState;
///
/// assert_eq!("ON".parse::<LightState>().unwrap(), LightState::On);
/// assert_eq!(LightState::Off.as_str(), "off");
/// assert_eq!(
///     "unavailable".parse::<LightState>().unwrap(),
///     LightState::Other("unavailable".to_string())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LightState {
    /// The light is on.
    On,
    /// The light is off.
    Off,
    /// A controller-defined token other than on/off.
    Other(String),
}

impl LightState {
    /// Returns the token as published on the bus.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(ValueError::InvalidState(s.to_string()));
        }
        if token.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if token.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Ok(Self::Other(token.to_string()))
        }
    }
}

impl TryFrom<String> for LightState {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LightState> for String {
    fn from(state: LightState) -> Self {
        match state {
            LightState::Other(token) => token,
            known => known.as_str().to_string(),
        }
    }
}
