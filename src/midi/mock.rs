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
use std::{error::Error, fmt, sync::Arc};

use crossbeam_channel::Sender;
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{debug, info};

/// A mock device. Records what it emits and replays injected input.
#[derive(Clone)]
pub struct Device {
    name: String,
    sender: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    emitted: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            sender: Arc::new(Mutex::new(None)),
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    /// Sends the mock event through to the watcher. Returns false if nothing is watching.
    pub fn mock_event(&self, event: &[u8]) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(event.to_vec()).is_ok(),
            None => false,
        }
    }

    #[cfg(test)]
    /// Returns true if something is watching this device.
    pub fn is_watched(&self) -> bool {
        self.sender.lock().is_some()
    }

    #[cfg(test)]
    /// Gets every event emitted so far.
    pub fn get_emitted_events(&self) -> Vec<Vec<u8>> {
        self.emitted.lock().clone()
    }

    #[cfg(test)]
    /// Forgets all emitted events.
    pub fn reset_emitted_events(&self) {
        self.emitted.lock().clear();
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let mut current = self.sender.lock();
        if current.is_some() {
            return Err("Already watching events.".into());
        }

        info!(device = self.name, "Watching mock MIDI events.");
        *current = Some(sender);
        Ok(())
    }

    /// Stops watching events.
    fn stop_watch_events(&self) {
        self.sender.lock().take();
    }

    /// Emits an event.
    fn emit(&self, midi_event: Option<LiveEvent<'_>>) -> Result<(), Box<dyn Error>> {
        if let Some(midi_event) = midi_event {
            let mut buf: Vec<u8> = Vec::with_capacity(8);
            midi_event.write(&mut buf)?;
            debug!(device = self.name, event = ?buf, "Mock emit.");
            self.emitted.lock().push(buf);
        }

        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
