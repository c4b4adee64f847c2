// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The power-event state machine.

use std::fmt;

use parking_lot::Mutex;

/// Phase of the outage cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerPhase {
    /// Mains power is present and no restoration is pending.
    #[default]
    Normal,
    /// The UPS reported running on battery.
    OnBattery,
    /// Power came back and a restoration pass is running.
    Restoring,
}

impl PowerPhase {
    /// Returns the flag pair describing this phase.
    #[must_use]
    pub const fn outage_state(self) -> OutageState {
        match self {
            Self::Normal => OutageState {
                on_battery: false,
                restore_in_progress: false,
            },
            Self::OnBattery => OutageState {
                on_battery: true,
                restore_in_progress: false,
            },
            Self::Restoring => OutageState {
                on_battery: true,
                restore_in_progress: true,
            },
        }
    }
}

impl fmt::Display for PowerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::OnBattery => "on_battery",
            Self::Restoring => "restoring",
        };
        f.write_str(name)
    }
}

/// Snapshot of the outage flags.
///
/// Always derived from a [`PowerPhase`], so the two flags change together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutageState {
    /// The fleet is power-impaired.
    pub on_battery: bool,
    /// A restoration pass is running.
    pub restore_in_progress: bool,
}

impl OutageState {
    /// Returns true if device states may be written to the store.
    #[must_use]
    pub const fn accepts_ingestion(&self) -> bool {
        !self.on_battery && !self.restore_in_progress
    }
}

/// Outcome of feeding a UPS signal to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The signal did not change the phase.
    None,
    /// `Normal → OnBattery`.
    PowerLost,
    /// `OnBattery → Restoring`. The caller must start exactly one pass.
    RestoreStarted,
}

impl Transition {
    /// Returns true if the phase changed.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Thread-safe holder of the current [`PowerPhase`].
///
/// All reads and transitions go through one mutex so that the dispatch
/// loop and the restoration task never observe a half-updated state.
///
/// # Examples
///
/// ```
/// use light_state_cache::outage::{OutageMonitor, PowerPhase, Transition};
///
/// let monitor = OutageMonitor::new();
/// assert_eq!(monitor.on_battery(), Transition::PowerLost);
/// assert_eq!(monitor.on_battery(), Transition::None);
/// assert_eq!(monitor.power_restored(), Transition::RestoreStarted);
/// assert!(!monitor.accepts_ingestion());
///
/// assert!(monitor.restore_complete());
/// assert_eq!(monitor.phase(), PowerPhase::Normal);
/// ```
#[derive(Debug, Default)]
pub struct OutageMonitor {
    phase: Mutex<PowerPhase>,
}

impl OutageMonitor {
    /// Creates a monitor in [`PowerPhase::Normal`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> PowerPhase {
        *self.phase.lock()
    }

    /// Returns the current outage flags.
    #[must_use]
    pub fn snapshot(&self) -> OutageState {
        self.phase().outage_state()
    }

    /// Returns true if device states may be written to the store.
    #[must_use]
    pub fn accepts_ingestion(&self) -> bool {
        self.snapshot().accepts_ingestion()
    }

    /// Handles an "on battery" signal.
    ///
    /// Only moves `Normal → OnBattery`; repeated signals are ignored.
    pub fn on_battery(&self) -> Transition {
        let mut phase = self.phase.lock();
        if *phase != PowerPhase::Normal {
            tracing::trace!(phase = %*phase, "Ignoring repeated on-battery signal");
            return Transition::None;
        }
        *phase = PowerPhase::OnBattery;
        tracing::info!("UPS on battery, ingestion suspended");
        Transition::PowerLost
    }

    /// Handles a "power restored" signal.
    ///
    /// Only moves `OnBattery → Restoring`. A `RestoreStarted` result is
    /// returned once per outage, which is what keeps restoration
    /// single-flight.
    pub fn power_restored(&self) -> Transition {
        let mut phase = self.phase.lock();
        if *phase != PowerPhase::OnBattery {
            tracing::trace!(phase = %*phase, "Ignoring power-restored signal");
            return Transition::None;
        }
        *phase = PowerPhase::Restoring;
        tracing::info!("UPS back on line, restoration pending");
        Transition::RestoreStarted
    }

    /// Closes the outage window after a restoration pass.
    ///
    /// Returns `true` if the monitor was `Restoring`.
    pub fn restore_complete(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase != PowerPhase::Restoring {
            tracing::warn!(phase = %*phase, "Restore completion outside of a restoration");
            return false;
        }
        *phase = PowerPhase::Normal;
        tracing::info!("Outage window closed, ingestion resumed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_normal() {
        let monitor = OutageMonitor::new();
        assert_eq!(monitor.phase(), PowerPhase::Normal);
        assert_eq!(monitor.snapshot(), OutageState::default());
        assert!(monitor.accepts_ingestion());
    }

    #[test]
    fn outage_state_per_phase() {
        assert!(PowerPhase::Normal.outage_state().accepts_ingestion());

        let on_battery = PowerPhase::OnBattery.outage_state();
        assert!(on_battery.on_battery);
        assert!(!on_battery.restore_in_progress);
        assert!(!on_battery.accepts_ingestion());

        let restoring = PowerPhase::Restoring.outage_state();
        assert!(restoring.on_battery);
        assert!(restoring.restore_in_progress);
    }

    #[test]
    fn on_battery_is_idempotent() {
        let monitor = OutageMonitor::new();
        assert_eq!(monitor.on_battery(), Transition::PowerLost);
        assert_eq!(monitor.on_battery(), Transition::None);
        assert_eq!(monitor.phase(), PowerPhase::OnBattery);
    }

    #[test]
    fn power_restored_ignored_when_normal() {
        let monitor = OutageMonitor::new();
        assert_eq!(monitor.power_restored(), Transition::None);
        assert_eq!(monitor.phase(), PowerPhase::Normal);
    }

    #[test]
    fn power_restored_only_once() {
        let monitor = OutageMonitor::new();
        monitor.on_battery();
        assert_eq!(monitor.power_restored(), Transition::RestoreStarted);
        assert_eq!(monitor.power_restored(), Transition::None);
        assert_eq!(monitor.phase(), PowerPhase::Restoring);
    }

    #[test]
    fn on_battery_during_restore_is_ignored() {
        let monitor = OutageMonitor::new();
        monitor.on_battery();
        monitor.power_restored();
        assert_eq!(monitor.on_battery(), Transition::None);
        assert_eq!(monitor.phase(), PowerPhase::Restoring);
    }

    #[test]
    fn restore_complete_returns_to_normal() {
        let monitor = OutageMonitor::new();
        monitor.on_battery();
        monitor.power_restored();
        assert!(monitor.restore_complete());
        assert_eq!(monitor.snapshot(), OutageState::default());
        assert!(!monitor.restore_complete());
    }

    #[test]
    fn full_cycle_can_repeat() {
        let monitor = OutageMonitor::new();
        for _ in 0..3 {
            assert_eq!(monitor.on_battery(), Transition::PowerLost);
            assert_eq!(monitor.power_restored(), Transition::RestoreStarted);
            assert!(monitor.restore_complete());
        }
    }

    #[test]
    fn concurrent_signals_start_one_restore() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let monitor = Arc::new(OutageMonitor::new());
        monitor.on_battery();
        let started = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                let started = Arc::clone(&started);
                std::thread::spawn(move || {
                    if monitor.power_restored() == Transition::RestoreStarted {
                        started.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
