// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UPS status payload parsing.

/// Flag published by NUT while running on battery.
const ON_BATTERY_FLAG: &str = "OB";

/// Flag published by NUT while running on mains power.
const ON_LINE_FLAG: &str = "OL";

/// Power markers found in a UPS status payload.
///
/// NUT publishes `ups.status` as whitespace-separated flags such as
/// `OL CHRG` or `OB DISCHRG LB`. The two markers are parsed independently;
/// a payload may carry both, either, or neither.
///
/// # Examples
///
/// ```
/// use light_state_cache::outage::UpsStatus;
///
/// let status = UpsStatus::parse("OB DISCHRG");
/// assert!(status.on_battery);
/// assert!(!status.on_line);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsStatus {
    /// The payload contains the on-battery flag.
    pub on_battery: bool,
    /// The payload contains the on-line flag.
    pub on_line: bool,
}

impl UpsStatus {
    /// Scans a status payload for power markers.
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        payload
            .split(|c: char| c.is_whitespace() || c == ',')
            .fold(Self::default(), |mut status, flag| {
                match flag {
                    ON_BATTERY_FLAG => status.on_battery = true,
                    ON_LINE_FLAG => status.on_line = true,
                    _ => {}
                }
                status
            })
    }

    /// Returns true if neither marker was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.on_battery && !self.on_line
    }
}
