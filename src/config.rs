// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::interceptor::Settings;
use crate::midi::{self, Device};

mod error;
mod interceptor;

pub use self::error::ConfigError;
pub use self::interceptor::Interceptor;

/// Everything needed to start a session.
pub struct Resolved {
    pub input: Arc<dyn Device>,
    pub output: Option<Arc<dyn Device>>,
    pub settings: Arc<Settings>,
}

/// Loads the configuration file, if any, layers the overrides on top and opens the devices
/// it names.
pub fn resolve(path: Option<&Path>, overrides: Interceptor) -> Result<Resolved, Box<dyn Error>> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration.");
            Interceptor::deserialize(path)?.merge(overrides)
        }
        None => overrides,
    };

    let settings = Arc::new(config.settings()?);
    let input = midi::get_device(config.input_device()?)?;
    let output = config
        .output_device()
        .map(midi::get_device)
        .map_or(Ok(None), |result| result.map(Some))?;

    Ok(Resolved {
        input,
        output,
        settings,
    })
}
