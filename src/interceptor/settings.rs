// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    ops::RangeInclusive,
    sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
    time::Duration,
};

/// The threshold values a control surface may select.
pub const THRESHOLD_RANGE: RangeInclusive<u8> = 1..=20;

/// The poll intervals, in milliseconds, a control surface may select.
pub const POLL_INTERVAL_MS_RANGE: RangeInclusive<u64> = 1..=10;

pub const DEFAULT_THRESHOLD: u8 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings shared between the control surface and the processing task.
///
/// Every field is stored in its own atomic so a read never observes a partial write. The
/// processing task takes a [Snapshot] per event rather than reading fields one at a time.
#[derive(Debug)]
pub struct Settings {
    threshold: AtomicU8,
    pass_polytouch_for_real_notes: AtomicBool,
    bounce_retrigger: AtomicBool,
    poll_interval_ms: AtomicU64,
}

/// A copy of the settings taken at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub threshold: u8,
    pub pass_polytouch_for_real_notes: bool,
    pub bounce_retrigger: bool,
}

impl Settings {
    /// Creates new settings. Out of range values are clamped.
    pub fn new(
        threshold: u8,
        pass_polytouch_for_real_notes: bool,
        bounce_retrigger: bool,
        poll_interval: Duration,
    ) -> Settings {
        let settings = Settings {
            threshold: AtomicU8::new(DEFAULT_THRESHOLD),
            pass_polytouch_for_real_notes: AtomicBool::new(pass_polytouch_for_real_notes),
            bounce_retrigger: AtomicBool::new(bounce_retrigger),
            poll_interval_ms: AtomicU64::new(DEFAULT_POLL_INTERVAL.as_millis() as u64),
        };
        settings.set_threshold(threshold);
        settings.set_poll_interval(poll_interval);
        settings
    }

    /// Takes a snapshot of the settings the engine reads per event.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            threshold: self.threshold(),
            pass_polytouch_for_real_notes: self.pass_polytouch_for_real_notes(),
            bounce_retrigger: self.bounce_retrigger(),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Sets the threshold, clamped to [THRESHOLD_RANGE]. Returns the stored value.
    pub fn set_threshold(&self, threshold: u8) -> u8 {
        let threshold = threshold.clamp(*THRESHOLD_RANGE.start(), *THRESHOLD_RANGE.end());
        self.threshold.store(threshold, Ordering::Relaxed);
        threshold
    }

    pub fn pass_polytouch_for_real_notes(&self) -> bool {
        self.pass_polytouch_for_real_notes.load(Ordering::Relaxed)
    }

    pub fn set_pass_polytouch_for_real_notes(&self, enabled: bool) {
        self.pass_polytouch_for_real_notes
            .store(enabled, Ordering::Relaxed);
    }

    pub fn bounce_retrigger(&self) -> bool {
        self.bounce_retrigger.load(Ordering::Relaxed)
    }

    pub fn set_bounce_retrigger(&self, enabled: bool) {
        self.bounce_retrigger.store(enabled, Ordering::Relaxed);
    }

    /// How long the processing task sleeps between polls of the input queue.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::Relaxed))
    }

    /// Sets the poll interval, clamped to [POLL_INTERVAL_MS_RANGE]. Returns the stored value.
    pub fn set_poll_interval(&self, poll_interval: Duration) -> Duration {
        let millis = (poll_interval.as_millis() as u64).clamp(
            *POLL_INTERVAL_MS_RANGE.start(),
            *POLL_INTERVAL_MS_RANGE.end(),
        );
        self.poll_interval_ms.store(millis, Ordering::Relaxed);
        Duration::from_millis(millis)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new(DEFAULT_THRESHOLD, false, false, DEFAULT_POLL_INTERVAL)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "threshold={}, passthrough={}, bounce={}, reaction={}ms",
            self.threshold(),
            on_off(self.pass_polytouch_for_real_notes()),
            on_off(self.bounce_retrigger()),
            self.poll_interval().as_millis(),
        )
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
