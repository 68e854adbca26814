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
use std::collections::HashMap;

use midly::{live::LiveEvent, num::u7};
use tracing::debug;

use self::{
    classify::{classify, Classified},
    note::{Note, Response, Stage},
};

pub mod bounce;
pub mod classify;
pub mod note;
pub mod settings;

pub use note::NoteState;
pub use settings::{Settings, Snapshot};

/// Rewrites a stream of note and pressure events into a corrected stream.
///
/// Per note state is keyed by note number only. The channel of each inbound event is carried
/// through to anything synthesized from it.
#[derive(Debug, Default)]
pub struct Engine {
    notes: HashMap<u8, Note>,
}

impl Engine {
    /// Creates an engine with every note in the [NoteState::None] state.
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Processes one inbound event and returns the event to emit, if any.
    pub fn process<'a>(
        &mut self,
        event: LiveEvent<'a>,
        settings: &Snapshot,
    ) -> Option<LiveEvent<'a>> {
        debug!(event = format!("{:?}", event), "Incoming event.");

        let response = match classify(&event) {
            Classified::NoteOn(note_event) => self.note(note_event.key).note_on(),
            Classified::NoteOff(note_event) => self.note(note_event.key).note_off(),
            Classified::PressureChange(note_event) => {
                let note = self.note(note_event.key);
                let note_event = if settings.bounce_retrigger {
                    match note.detect_bounce(note_event) {
                        Stage::Handled(synthesized) => return Some(synthesized),
                        Stage::Continue(note_event) => note_event,
                    }
                } else {
                    note_event
                };
                note.pressure(note_event, settings)
            }
            Classified::Other => Response::Forward,
        };

        match response {
            Response::Forward => Some(event),
            Response::Synthesize(synthesized) => {
                debug!(
                    event = format!("{:?}", synthesized),
                    "Synthesized event."
                );
                Some(synthesized)
            }
            Response::Suppress => None,
        }
    }

    /// Returns the state of the given note.
    pub fn state(&self, key: u7) -> NoteState {
        self.notes
            .get(&key.as_int())
            .map(|note| note.state())
            .unwrap_or_default()
    }

    fn note(&mut self, key: u7) -> &mut Note {
        self.notes.entry(key.as_int()).or_default()
    }
}
