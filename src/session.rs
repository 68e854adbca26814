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
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, TryRecvError};
use midly::live::LiveEvent;
use tracing::{debug, error, info, span, warn, Level};

use crate::{
    interceptor::{Engine, Settings},
    midi::Device,
};

/// How many raw input events may wait for the processing thread before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 1024;

/// A running interception session. Events from the input device are rewritten by an
/// [Engine] on a dedicated thread and sent to the output device.
pub struct Session {
    input: Arc<dyn Device>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Starts watching the input device and processing its events.
    pub fn start(
        input: Arc<dyn Device>,
        output: Option<Arc<dyn Device>>,
        settings: Arc<Settings>,
    ) -> Result<Session, Box<dyn Error>> {
        let (queue_tx, queue_rx) = crossbeam_channel::bounded::<Vec<u8>>(QUEUE_CAPACITY);
        input.watch_events(queue_tx)?;

        match output.as_ref() {
            Some(output) => info!(
                input = %input,
                output = %output,
                %settings,
                "Starting session."
            ),
            None => warn!(
                input = %input,
                %settings,
                "Starting session without an output device, events will be dropped."
            ),
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            queue: queue_rx,
            output,
            settings,
            stop: stop.clone(),
        };
        let worker = match thread::Builder::new()
            .name("touchgate session".into())
            .spawn(move || worker.run())
        {
            Ok(worker) => worker,
            Err(e) => {
                input.stop_watch_events();
                return Err(e.into());
            }
        };

        Ok(Session {
            input,
            stop,
            worker: Some(worker),
        })
    }

    /// Returns true until the processing thread has exited.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stops the session. The event being processed is finished first. Calling this more than
    /// once does nothing.
    pub fn stop(&mut self) {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return,
        };

        self.stop.store(true, Ordering::Relaxed);
        if worker.join().is_err() {
            error!("Session thread panicked.");
        }
        self.input.stop_watch_events();
        info!("Session stopped.");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The processing thread. Owns the engine, and with it all per note state.
struct Worker {
    queue: Receiver<Vec<u8>>,
    output: Option<Arc<dyn Device>>,
    settings: Arc<Settings>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let span = span!(Level::INFO, "session");
        let _enter = span.enter();

        let mut engine = Engine::new();
        while !self.stopped() {
            loop {
                match self.queue.try_recv() {
                    Ok(raw_event) => self.handle(&mut engine, &raw_event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("Input closed, ending session.");
                        return;
                    }
                }
                if self.stopped() {
                    return;
                }
            }

            spin_sleep::sleep(self.settings.poll_interval());
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn handle(&self, engine: &mut Engine, raw_event: &[u8]) {
        let event = match LiveEvent::parse(raw_event) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    err = format!("{:?}", e),
                    raw = ?raw_event,
                    "Unable to parse MIDI event, dropping it."
                );
                return;
            }
        };

        let event = match engine.process(event, &self.settings.snapshot()) {
            Some(event) => event,
            None => return,
        };

        match self.output.as_ref() {
            Some(output) => {
                if let Err(e) = output.emit(Some(event)) {
                    error!(err = e.as_ref(), "Error emitting event.");
                }
            }
            None => debug!(
                event = format!("{:?}", event),
                "No output device, dropping event."
            ),
        }
    }
}
