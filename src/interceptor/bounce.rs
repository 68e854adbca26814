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
use midly::num::u7;
use tracing::{debug, warn};

/// The number of pressure samples that must show a decline before a release is confirmed.
pub const RELEASE_WINDOW: usize = 14;

/// The number of samples after an unconfirmed release that must show a rebound before
/// a retrigger is confirmed.
pub const RETRIGGER_WINDOW: usize = 4;

/// The result of feeding one pressure sample into a [BounceWindow].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    /// Either a window is still filling or the retrigger window showed no rebound.
    Inconclusive,
    /// The release window showed a net decline.
    Release,
    /// The retrigger window showed a net rise.
    Retrigger,
}

/// Per note pressure history used to tell a genuine release from a bounce.
///
/// Pressure first fills the release window. If the release window completes without a net
/// decline, that sample and the ones after it fill the retrigger window. Both windows are
/// emptied whenever a detection cycle ends.
#[derive(Clone, Debug, Default)]
pub struct BounceWindow {
    release: Vec<u8>,
    retrigger: Vec<u8>,
}

impl BounceWindow {
    /// Feeds a pressure sample into the window.
    pub fn push(&mut self, pressure: u7) -> Detection {
        if !self.is_consistent() {
            warn!(
                release = self.release.len(),
                retrigger = self.retrigger.len(),
                "Bounce window out of bounds, resetting."
            );
            self.clear();
        }

        let pressure = pressure.as_int();
        if self.release.len() < RELEASE_WINDOW {
            self.release.push(pressure);
            if self.release.len() < RELEASE_WINDOW {
                return Detection::Inconclusive;
            }

            let score = trend(&self.release);
            debug!(score, "Release window complete.");
            if score < 0 {
                self.clear();
                return Detection::Release;
            }
        }

        self.retrigger.push(pressure);
        if self.retrigger.len() < RETRIGGER_WINDOW {
            return Detection::Inconclusive;
        }

        let score = trend(&self.retrigger);
        debug!(score, "Retrigger window complete.");
        self.clear();
        if score > 0 {
            Detection::Retrigger
        } else {
            Detection::Inconclusive
        }
    }

    /// Empties both windows.
    pub fn clear(&mut self) {
        self.release.clear();
        self.retrigger.clear();
    }

    /// Returns true if no samples are held.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.release.is_empty() && self.retrigger.is_empty()
    }

    /// The retrigger window only fills once the release window is full, and neither window
    /// may exceed its length.
    fn is_consistent(&self) -> bool {
        self.release.len() <= RELEASE_WINDOW
            && self.retrigger.len() < RETRIGGER_WINDOW
            && (self.retrigger.is_empty() || self.release.len() == RELEASE_WINDOW)
    }
}

/// Sums the differences of consecutive, non-overlapping sample pairs.
fn trend(samples: &[u8]) -> i16 {
    samples
        .chunks_exact(2)
        .map(|pair| i16::from(pair[1]) - i16::from(pair[0]))
        .sum()
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use super::{trend, BounceWindow, Detection, RELEASE_WINDOW, RETRIGGER_WINDOW};

    fn feed(window: &mut BounceWindow, samples: &[u8]) -> Vec<Detection> {
        samples
            .iter()
            .map(|sample| window.push(u7::from_int_lossy(*sample)))
            .collect()
    }

    #[test]
    fn trend_sums_pairs() {
        assert_eq!(-7, trend(&[10, 9, 10, 9, 10, 9, 10, 9, 10, 9, 10, 9, 10, 9]));
        assert_eq!(0, trend(&[5, 5, 5, 5]));
        assert_eq!(3, trend(&[1, 2, 100, 102]));
        // Differences across pairs are not counted.
        assert_eq!(0, trend(&[0, 0, 100, 100]));
    }

    #[test]
    fn declining_window_confirms_release() {
        let mut window = BounceWindow::default();
        let samples: Vec<u8> = (0..RELEASE_WINDOW as u8).map(|i| 60 - i).collect();

        let detections = feed(&mut window, &samples);
        assert!(detections[..RELEASE_WINDOW - 1]
            .iter()
            .all(|detection| *detection == Detection::Inconclusive));
        assert_eq!(Detection::Release, detections[RELEASE_WINDOW - 1]);
        assert!(window.is_empty());
    }

    #[test]
    fn flat_window_then_rebound_confirms_retrigger() {
        let mut window = BounceWindow::default();

        // Fourteen flat samples do not confirm a release. The last of them opens the
        // retrigger window.
        let detections = feed(&mut window, &[30; RELEASE_WINDOW]);
        assert!(detections
            .iter()
            .all(|detection| *detection == Detection::Inconclusive));
        assert!(!window.is_empty());

        // 30 (already held), 20, 40, 45: (20 - 30) + (45 - 40) = -5, no rebound.
        let detections = feed(&mut window, &[20, 40, 45]);
        assert_eq!(
            vec![
                Detection::Inconclusive,
                Detection::Inconclusive,
                Detection::Inconclusive
            ],
            detections
        );
        assert!(window.is_empty());

        // Start over and rebound this time: (40 - 30) + (50 - 45) = 15.
        feed(&mut window, &[30; RELEASE_WINDOW]);
        let detections = feed(&mut window, &[40, 45, 50]);
        assert_eq!(Detection::Retrigger, detections[RETRIGGER_WINDOW - 2]);
        assert!(window.is_empty());
    }

    #[test]
    fn rising_release_window_is_not_a_release() {
        let mut window = BounceWindow::default();
        let samples: Vec<u8> = (0..RELEASE_WINDOW as u8).map(|i| 20 + i).collect();
        assert_eq!(
            Some(&Detection::Inconclusive),
            feed(&mut window, &samples).last()
        );
    }

    #[test]
    fn inconsistent_window_resets() {
        let mut window = BounceWindow {
            release: vec![1; 3],
            retrigger: vec![1; 2],
        };
        assert_eq!(Detection::Inconclusive, window.push(u7::from_int_lossy(5)));
        assert_eq!(vec![5], window.release);
        assert!(window.retrigger.is_empty());
    }
}
