//! # Monitor Module
//!
//! The event loop state behind a live session. Owns the `SessionData`
//! accumulators and applies transport updates to them one at a time: each
//! notification is processed fully before the next, so the core needs no
//! locking. A one-second tick advances the elapsed-time bookkeeping used for
//! tag timestamps; it never touches the series.

use crate::session::{SessionData, Tag, TagColor, TickUpdate};
use crate::sensor::{ConnectionStatus, SensorUpdate};
use crate::summary::SessionSummary;

/// What a completed session leaves behind for display.
#[derive(Debug)]
pub struct SessionReport {
    /// `None` when no heart-rate sample was ever recorded.
    pub summary: Option<SessionSummary>,
    pub tags: Vec<Tag>,
    pub duration_secs: u64,
}

/// Outcome of applying one transport update.
#[derive(Debug)]
pub enum MonitorOutput {
    /// A notification was decoded and accumulated.
    Live(TickUpdate),
    /// Connection state changed without ending the session.
    Status(ConnectionStatus),
    /// The session ended; accumulators have been reset.
    SessionEnded(SessionReport),
}

#[derive(Debug, Default)]
pub struct Monitor {
    session: SessionData,
    elapsed_secs: u64,
    connected: bool,
    paused: bool,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update from the transport channel.
    ///
    /// Returns `None` for updates with nothing to display (e.g. a decoded
    /// payload too short to carry a reading).
    pub fn handle_update(&mut self, update: SensorUpdate) -> Option<MonitorOutput> {
        match update {
            SensorUpdate::Notification {
                payload,
                received_at_ms,
            } => self
                .session
                .handle_notification(&payload, received_at_ms)
                .map(MonitorOutput::Live),
            SensorUpdate::ConnectionStatus(status) => match status {
                ConnectionStatus::Connected => {
                    // A replacement connection can arrive without an
                    // intervening disconnect; the new session must not
                    // inherit the old one's series.
                    if self.connected {
                        self.session.reset();
                    }
                    self.connected = true;
                    self.paused = false;
                    self.elapsed_secs = 0;
                    Some(MonitorOutput::Status(status))
                }
                ConnectionStatus::Disconnected | ConnectionStatus::Error(_) => {
                    if let ConnectionStatus::Error(e) = &status {
                        log::warn!("Session ending on connection error: {}", e);
                    }
                    let was_connected = self.connected;
                    self.connected = false;
                    if was_connected {
                        Some(MonitorOutput::SessionEnded(self.finish_session()))
                    } else {
                        Some(MonitorOutput::Status(status))
                    }
                }
                ConnectionStatus::Connecting => Some(MonitorOutput::Status(status)),
            },
        }
    }

    /// Advance the session clock by one second. Called by the shell's
    /// 1-second timer; paused or disconnected sessions do not age.
    pub fn tick(&mut self) {
        if self.connected && !self.paused {
            self.elapsed_secs += 1;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn add_tag(&mut self, color: TagColor, label: &str, comments: &str) {
        self.session.add_tag(self.elapsed_secs, color, label, comments);
    }

    pub fn edit_tag_comments(&mut self, index: usize, comments: &str) -> bool {
        self.session.edit_tag_comments(index, comments)
    }

    pub fn session(&self) -> &SessionData {
        &self.session
    }

    /// Compute the end-of-session report, then clear all accumulators.
    fn finish_session(&mut self) -> SessionReport {
        let report = SessionReport {
            summary: SessionSummary::compute(&self.session),
            tags: self.session.tags().to_vec(),
            duration_secs: self.elapsed_secs,
        };
        self.session.reset();
        self.elapsed_secs = 0;
        self.paused = false;
        report
    }
}
