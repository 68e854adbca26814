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
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};

/// The fields of an event that carries a note context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub channel: u4,
    pub key: u7,
    /// Velocity for note events, pressure for pressure changes.
    pub value: u7,
}

impl NoteEvent {
    /// A note on for this key and channel with the given velocity.
    pub fn note_on(&self, vel: u7) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: self.channel,
            message: MidiMessage::NoteOn { key: self.key, vel },
        }
    }

    /// A note off for this key and channel with zero velocity.
    pub fn note_off(&self) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: self.channel,
            message: MidiMessage::NoteOff {
                key: self.key,
                vel: u7::from_int_lossy(0),
            },
        }
    }
}

/// The category of an inbound event along with its note fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classified {
    NoteOn(NoteEvent),
    NoteOff(NoteEvent),
    /// Polyphonic key pressure.
    PressureChange(NoteEvent),
    /// Anything without a note context.
    Other,
}

/// Classifies an inbound event. A note on with zero velocity is a note off.
pub fn classify(event: &LiveEvent) -> Classified {
    let (channel, message) = match event {
        LiveEvent::Midi { channel, message } => (*channel, *message),
        _ => return Classified::Other,
    };

    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => Classified::NoteOff(NoteEvent {
            channel,
            key,
            value: vel,
        }),
        MidiMessage::NoteOn { key, vel } => Classified::NoteOn(NoteEvent {
            channel,
            key,
            value: vel,
        }),
        MidiMessage::NoteOff { key, vel } => Classified::NoteOff(NoteEvent {
            channel,
            key,
            value: vel,
        }),
        MidiMessage::Aftertouch { key, vel } => Classified::PressureChange(NoteEvent {
            channel,
            key,
            value: vel,
        }),
        _ => Classified::Other,
    }
}
