//! Polling synchronization
//!
//! Devices never talk to each other. Each one re-reads the shared record
//! once per tick and redraws when it changed. Ticks form a single alarm
//! chain: the next poll is only scheduled when the current one is handled,
//! so two polls never overlap.

use serde::{Deserialize, Serialize};
use tracing::warn;
use web_time::Duration;

use crate::{
    constants::timing::POLL_INTERVAL,
    session::{self, Session},
    store::Storage,
};

/// Alarm messages of the synchronization loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Time to re-read the shared record
    Poll {
        /// Epoch the poll was scheduled under
        epoch: u64,
    },
}

/// The polling loop of one device
#[derive(Debug, Default)]
pub struct SyncLoop {
    epoch: u64,
    running: bool,
}

impl SyncLoop {
    /// Creates a stopped loop
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the loop is polling
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts polling, discarding any tick of an earlier run
    pub fn start<F>(&mut self, mut schedule_message: F)
    where
        F: FnMut(crate::AlarmMessage, Duration),
    {
        self.epoch += 1;
        self.running = true;
        schedule_message(AlarmMessage::Poll { epoch: self.epoch }.into(), POLL_INTERVAL);
    }

    /// Stops polling; ticks already scheduled are ignored when they arrive
    pub fn stop(&mut self) {
        self.epoch += 1;
        self.running = false;
    }

    /// Handles a poll tick
    ///
    /// Stale ticks are ignored. Otherwise the next tick is scheduled before
    /// polling, so a failing read does not end the loop.
    ///
    /// Returns whether the shared record changed.
    pub fn receive_alarm<S, F>(
        &mut self,
        session: &mut Session<S>,
        schedule_message: &mut F,
        message: &AlarmMessage,
    ) -> Result<bool, session::Error>
    where
        S: Storage,
        F: FnMut(crate::AlarmMessage, Duration),
    {
        let AlarmMessage::Poll { epoch } = *message;
        if !self.running || epoch != self.epoch {
            return Ok(false);
        }

        schedule_message(AlarmMessage::Poll { epoch }.into(), POLL_INTERVAL);

        session.poll().inspect_err(|e| {
            warn!(error = %e, "poll failed");
        })
    }
}
