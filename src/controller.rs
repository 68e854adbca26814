// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::{io, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{info, span, warn, Level};

use crate::interceptor::Settings;

const THRESHOLD: &str = "threshold";
const PASSTHROUGH: &str = "passthrough";
const BOUNCE: &str = "bounce";
const REACTION: &str = "reaction";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// Commands accepted from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Sets the pressure threshold.
    Threshold(u8),
    /// Toggles passing pressure through for real notes.
    Passthrough(bool),
    /// Toggles bounce detection.
    Bounce(bool),
    /// Sets the poll interval in milliseconds.
    Reaction(u64),
    /// Prints the current settings.
    Status,
    /// Ends the session.
    Quit,
}

impl Command {
    /// Parses a line of input. Returns None if the line isn't a command.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim().to_lowercase();
        let mut parts = input.split_whitespace();
        let command = parts.next()?;
        let argument = parts.next();
        if parts.next().is_some() {
            return None;
        }

        match (command, argument) {
            // Large thresholds saturate and are then clamped like any other value.
            (THRESHOLD, Some(value)) => value
                .parse::<u32>()
                .ok()
                .map(|threshold| Command::Threshold(u8::try_from(threshold).unwrap_or(u8::MAX))),
            (PASSTHROUGH, Some(value)) => parse_on_off(value).map(Command::Passthrough),
            (BOUNCE, Some(value)) => parse_on_off(value).map(Command::Bounce),
            (REACTION, Some(value)) => value.parse().ok().map(Command::Reaction),
            (STATUS, None) => Some(Command::Status),
            (QUIT, None) => Some(Command::Quit),
            _ => None,
        }
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Adjusts the session settings from the keyboard while the session runs.
pub struct Driver {
    settings: Arc<Settings>,
}

impl Driver {
    pub fn new(settings: Arc<Settings>) -> Driver {
        Driver { settings }
    }

    /// Reads and applies one command. Returns false once the user quits or input ends.
    fn monitor_io<R, W>(&self, mut reader: R, mut writer: W) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <1-20>, {} on|off, {} on|off, {} <1-10>, {}, {}): ",
            THRESHOLD, PASSTHROUGH, BOUNCE, REACTION, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let command = match Command::parse(&input) {
            Some(command) => command,
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                return Ok(true);
            }
        };

        match command {
            Command::Threshold(threshold) => {
                let threshold = self.settings.set_threshold(threshold);
                info!(threshold, "Threshold changed.");
            }
            Command::Passthrough(enabled) => {
                self.settings.set_pass_polytouch_for_real_notes(enabled);
                info!(enabled, "Polytouch pass-through for real notes toggled.");
            }
            Command::Bounce(enabled) => {
                self.settings.set_bounce_retrigger(enabled);
                info!(enabled, "Bounce retrigger toggled.");
            }
            Command::Reaction(millis) => {
                let interval = self
                    .settings
                    .set_poll_interval(Duration::from_millis(millis));
                info!(millis = interval.as_millis() as u64, "Reaction time changed.");
            }
            Command::Status => writeln!(writer, "{}", self.settings)?,
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }

    /// Reads commands from stdin until the user quits. The handle completes when they do.
    pub fn monitor_events(self) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while self.monitor_io(io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
