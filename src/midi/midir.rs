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
use std::{collections::HashMap, error::Error, fmt, mem};

use crossbeam_channel::{Sender, TrySendError};
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{debug, info, span, warn, Level};

#[cfg(test)]
use std::sync::Arc;

pub struct Device {
    name: String,
    input_port: Option<MidiInputPort>,
    output_port: Option<MidiOutputPort>,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
    /// Opened on the first emit and held for the life of the device.
    output_connection: Mutex<Option<MidiOutputConnection>>,
}

impl Device {
    fn new(name: String) -> Device {
        Device {
            name,
            input_port: None,
            output_port: None,
            event_connection: Mutex::new(None),
            output_connection: Mutex::new(None),
        }
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "watch events (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock();
        if event_connection.is_some() {
            return Err("Already watching events.".into());
        }

        let input_port = match self.input_port.as_ref() {
            Some(input_port) => input_port,
            None => {
                return Err(format!(
                    "{} has no MIDI input, cannot listen for events",
                    self.name
                )
                .into());
            }
        };

        info!(device = self.name, "Watching MIDI events.");

        let input = MidiInput::new("touchgate input")?;
        *event_connection = Some(input.connect(
            input_port,
            "touchgate input watcher",
            move |_, raw_event, _| match sender.try_send(Vec::from(raw_event)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Input queue is full, dropping MIDI event.");
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!("Input queue closed, dropping MIDI event.");
                }
            },
            (),
        )?);

        Ok(())
    }

    /// Stops watching events.
    fn stop_watch_events(&self) {
        // Explicitly drop the connection.
        let event_connection = self.event_connection.lock().take();

        mem::drop(event_connection);
    }

    fn emit(&self, midi_event: Option<LiveEvent<'_>>) -> Result<(), Box<dyn Error>> {
        let event = match midi_event {
            Some(midi_event) => midi_event,
            // If there's no event, return early.
            None => return Ok(()),
        };

        let output_port = match &self.output_port {
            Some(output_port) => output_port,
            None => {
                warn!(device = self.name, "No MIDI output on device, cannot emit event.");
                return Ok(());
            }
        };

        debug!(
            device = self.name,
            event = format!("{:?}", event),
            "Emitting event."
        );

        // Choosing 8 here because that's what nodi does.
        let mut buf: Vec<u8> = Vec::with_capacity(8);
        event.write(&mut buf)?;

        let mut connection = self.output_connection.lock();
        if connection.is_none() {
            let output = MidiOutput::new("touchgate output")?;
            *connection = Some(output.connect(output_port, "touchgate emitter")?);
        }
        if let Some(connection) = connection.as_mut() {
            connection.send(&buf)?;
        }

        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<String> = Vec::new();
        if self.input_port.is_some() {
            capabilities.push(String::from("Input"));
        }
        if self.output_port.is_some() {
            capabilities.push(String::from("Output"));
        }

        write!(f, "{} ({})", self.name, capabilities.join("/"))
    }
}

/// Lists midir devices and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
    Ok(list_midir_devices()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir devices. Input and output ports with the same name become one device.
fn list_midir_devices() -> Result<Vec<Device>, Box<dyn Error>> {
    let input = MidiInput::new("touchgate input listing")?;
    let output = MidiOutput::new("touchgate output listing")?;

    let mut devices: HashMap<String, Device> = HashMap::new();

    for port in input.ports() {
        let name = input.port_name(&port)?;
        devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name))
            .input_port
            .get_or_insert(port);
    }

    for port in output.ports() {
        let name = output.port_name(&port)?;
        devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name))
            .output_port
            .get_or_insert(port);
    }

    let mut sorted_devices = devices
        .into_iter()
        .map(|entry| entry.1)
        .collect::<Vec<Device>>();
    sorted_devices.sort_by_key(|device| device.name.clone());
    Ok(sorted_devices)
}

/// Gets the given midir device.
pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
    let mut matches = list_midir_devices()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.is_empty() {
        return Err(format!("no device found with name {}", name).into());
    }
    if matches.len() > 1 {
        return Err(format!(
            "found too many devices that match ({}), use a less ambiguous device name",
            matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", ")
        )
        .into());
    }

    // We've verified that there's only one element in the vector, so this should be safe.
    Ok(matches.swap_remove(0))
}
