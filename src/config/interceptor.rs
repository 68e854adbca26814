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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::interceptor::settings::{
    Settings, DEFAULT_POLL_INTERVAL, DEFAULT_THRESHOLD, POLL_INTERVAL_MS_RANGE, THRESHOLD_RANGE,
};

use super::error::ConfigError;

/// A YAML representation of the interceptor configuration. Every field is optional so that
/// a file and command line flags can be layered.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Interceptor {
    /// The MIDI device to read notes and pressure from.
    input_device: Option<String>,

    /// The MIDI device to send the corrected stream to.
    output_device: Option<String>,

    /// Pressure above this starts an artificial note, pressure below it ends one.
    threshold: Option<u8>,

    /// Whether pressure for genuine notes is passed through.
    pass_polytouch_for_real_notes: Option<bool>,

    /// Whether release bounce detection is enabled.
    bounce_retrigger: Option<bool>,

    /// How long to wait between polls of the input queue, e.g. 5ms.
    poll_interval: Option<String>,
}

impl Interceptor {
    /// New will create a new interceptor configuration.
    pub fn new(
        input_device: Option<String>,
        output_device: Option<String>,
        threshold: Option<u8>,
        pass_polytouch_for_real_notes: Option<bool>,
        bounce_retrigger: Option<bool>,
        poll_interval: Option<String>,
    ) -> Interceptor {
        Interceptor {
            input_device,
            output_device,
            threshold,
            pass_polytouch_for_real_notes,
            bounce_retrigger,
            poll_interval,
        }
    }

    /// Parse an interceptor configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Interceptor, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Interceptor>()?)
    }

    /// Layers the given configuration on top of this one. Values set in the overrides win.
    pub fn merge(self, overrides: Interceptor) -> Interceptor {
        Interceptor {
            input_device: overrides.input_device.or(self.input_device),
            output_device: overrides.output_device.or(self.output_device),
            threshold: overrides.threshold.or(self.threshold),
            pass_polytouch_for_real_notes: overrides
                .pass_polytouch_for_real_notes
                .or(self.pass_polytouch_for_real_notes),
            bounce_retrigger: overrides.bounce_retrigger.or(self.bounce_retrigger),
            poll_interval: overrides.poll_interval.or(self.poll_interval),
        }
    }

    /// Returns the input device from the configuration.
    pub fn input_device(&self) -> Result<&str, ConfigError> {
        self.input_device
            .as_deref()
            .ok_or(ConfigError::MissingInputDevice)
    }

    /// Returns the output device from the configuration.
    pub fn output_device(&self) -> Option<&str> {
        self.output_device.as_deref()
    }

    /// Returns the threshold from the configuration.
    pub fn threshold(&self) -> Result<u8, ConfigError> {
        let threshold = self.threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !THRESHOLD_RANGE.contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        Ok(threshold)
    }

    /// Returns the poll interval from the configuration.
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        let poll_interval: Duration = match &self.poll_interval {
            Some(poll_interval) => DurationString::from_string(poll_interval.clone())
                .map_err(|e| ConfigError::InvalidPollInterval {
                    value: poll_interval.clone(),
                    reason: e.to_string(),
                })?
                .into(),
            None => DEFAULT_POLL_INTERVAL,
        };

        let min = Duration::from_millis(*POLL_INTERVAL_MS_RANGE.start());
        let max = Duration::from_millis(*POLL_INTERVAL_MS_RANGE.end());
        if poll_interval < min || poll_interval > max {
            return Err(ConfigError::PollIntervalOutOfRange(poll_interval));
        }
        Ok(poll_interval)
    }

    /// Validates the configuration and produces the initial session settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings::new(
            self.threshold()?,
            self.pass_polytouch_for_real_notes.unwrap_or_default(),
            self.bounce_retrigger.unwrap_or_default(),
            self.poll_interval()?,
        ))
    }
}
