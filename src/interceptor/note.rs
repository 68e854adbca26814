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
use std::fmt;

use midly::live::LiveEvent;
use tracing::debug;

use super::{
    bounce::{BounceWindow, Detection},
    classify::NoteEvent,
    settings::Snapshot,
};

/// Whether a note is sounding from the engine's point of view, and why.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteState {
    /// Nothing is sounding.
    #[default]
    None,
    /// A note on was received and has not been matched by a note off.
    Real,
    /// The engine synthesized a note on from pressure and owes a note off.
    Artificial,
}

impl fmt::Display for NoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteState::None => "none",
            NoteState::Real => "real",
            NoteState::Artificial => "artificial",
        };
        write!(f, "{}", name)
    }
}

/// The result of the bounce stage for a pressure change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// The bounce detector consumed the event and produced this one instead.
    Handled(LiveEvent<'static>),
    /// The event continues on to the threshold logic.
    Continue(NoteEvent),
}

/// What to do with an event that went through the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Send the inbound event on unchanged.
    Forward,
    /// Send this event in place of the inbound one.
    Synthesize(LiveEvent<'static>),
    /// Send nothing.
    Suppress,
}

/// Everything the engine tracks for one note number.
#[derive(Clone, Debug, Default)]
pub struct Note {
    state: NoteState,
    bounce: BounceWindow,
}

impl Note {
    pub fn state(&self) -> NoteState {
        self.state
    }

    /// A genuine note on. Always forwarded.
    pub fn note_on(&mut self) -> Response {
        self.transition(NoteState::Real);
        self.bounce.clear();
        Response::Forward
    }

    /// A genuine note off. Always forwarded.
    pub fn note_off(&mut self) -> Response {
        self.transition(NoteState::None);
        self.bounce.clear();
        Response::Forward
    }

    /// Runs a pressure change through the bounce detector.
    ///
    /// This runs in every note state. A declining window confirms a release, and emits a note
    /// off, even when the note is not sounding.
    pub fn detect_bounce(&mut self, event: NoteEvent) -> Stage {
        match self.bounce.push(event.value) {
            Detection::Release => {
                debug!(key = event.key.as_int(), "Bounce: release confirmed.");
                self.transition(NoteState::None);
                Stage::Handled(event.note_off())
            }
            Detection::Retrigger => {
                debug!(key = event.key.as_int(), "Bounce: retrigger confirmed.");
                self.transition(NoteState::Artificial);
                Stage::Handled(event.note_on(event.value))
            }
            Detection::Inconclusive => Stage::Continue(event),
        }
    }

    /// Applies the threshold rules to a pressure change.
    pub fn pressure(&mut self, event: NoteEvent, settings: &Snapshot) -> Response {
        let pressure = event.value.as_int();
        match self.state {
            NoteState::None if pressure > settings.threshold => {
                self.transition(NoteState::Artificial);
                self.bounce.clear();
                Response::Synthesize(event.note_on(event.value))
            }
            NoteState::None => Response::Suppress,
            NoteState::Artificial if pressure < settings.threshold => {
                self.transition(NoteState::None);
                self.bounce.clear();
                Response::Synthesize(event.note_off())
            }
            NoteState::Artificial => Response::Forward,
            NoteState::Real if settings.pass_polytouch_for_real_notes => Response::Forward,
            NoteState::Real => Response::Suppress,
        }
    }

    fn transition(&mut self, next: NoteState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Note state changed.");
        }
        self.state = next;
    }

    #[cfg(test)]
    pub fn bounce_is_empty(&self) -> bool {
        self.bounce.is_empty()
    }
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use crate::interceptor::{classify::NoteEvent, settings::Snapshot};

    use super::{Note, NoteState, Response, Stage};

    const THRESHOLD: u8 = 10;

    fn settings(pass_polytouch_for_real_notes: bool) -> Snapshot {
        Snapshot {
            threshold: THRESHOLD,
            pass_polytouch_for_real_notes,
            bounce_retrigger: false,
        }
    }

    fn pressure(value: u8) -> NoteEvent {
        NoteEvent {
            channel: 1.into(),
            key: 60.into(),
            value: u7::from_int_lossy(value),
        }
    }

    fn note_in(state: NoteState) -> Note {
        let mut note = Note::default();
        match state {
            NoteState::None => {}
            NoteState::Real => {
                note.note_on();
            }
            NoteState::Artificial => {
                note.pressure(pressure(127), &settings(false));
            }
        }
        assert_eq!(state, note.state());
        note
    }

    #[test]
    fn note_on_and_off_from_any_state() {
        for state in [NoteState::None, NoteState::Real, NoteState::Artificial] {
            let mut note = note_in(state);
            assert_eq!(Response::Forward, note.note_on());
            assert_eq!(NoteState::Real, note.state());

            let mut note = note_in(state);
            assert_eq!(Response::Forward, note.note_off());
            assert_eq!(NoteState::None, note.state());
        }
    }

    #[test]
    fn pressure_above_threshold_synthesizes_note_on() {
        let mut note = note_in(NoteState::None);
        assert_eq!(
            Response::Suppress,
            note.pressure(pressure(THRESHOLD), &settings(false))
        );
        assert_eq!(NoteState::None, note.state());

        let event = pressure(THRESHOLD + 1);
        assert_eq!(
            Response::Synthesize(event.note_on(event.value)),
            note.pressure(event, &settings(false))
        );
        assert_eq!(NoteState::Artificial, note.state());
    }

    #[test]
    fn pressure_below_threshold_synthesizes_note_off() {
        let mut note = note_in(NoteState::Artificial);
        assert_eq!(
            Response::Forward,
            note.pressure(pressure(THRESHOLD), &settings(false))
        );
        assert_eq!(NoteState::Artificial, note.state());

        let event = pressure(THRESHOLD - 1);
        assert_eq!(
            Response::Synthesize(event.note_off()),
            note.pressure(event, &settings(false))
        );
        assert_eq!(NoteState::None, note.state());
    }

    #[test]
    fn real_notes_honor_passthrough() {
        let mut note = note_in(NoteState::Real);
        assert_eq!(Response::Suppress, note.pressure(pressure(0), &settings(false)));
        assert_eq!(
            Response::Suppress,
            note.pressure(pressure(100), &settings(false))
        );
        assert_eq!(Response::Forward, note.pressure(pressure(0), &settings(true)));
        assert_eq!(NoteState::Real, note.state());
    }

    #[test]
    fn bounce_stage_continues_while_filling() {
        let mut note = note_in(NoteState::Artificial);
        let event = pressure(50);
        assert_eq!(Stage::Continue(event), note.detect_bounce(event));
        assert!(!note.bounce_is_empty());

        note.note_off();
        assert!(note.bounce_is_empty());
    }
}
