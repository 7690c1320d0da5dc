//! Callbacks for run progress.

use tokio::sync::mpsc;

use crate::error::DecodeError;
use crate::stream::ProgressRecord;

/// Receives progress from a running simulation.
///
/// Called from the supervisor's monitor task, in emission order. A slow
/// observer delays delivery of later records but never blocks the child.
pub trait RunObserver: Send + Sync {
    /// Called for each decoded progress record.
    fn on_progress(&self, record: &ProgressRecord);

    /// Called when the simulation exits with status 0.
    fn on_completed(&self, exit_code: i32);

    /// Called when the simulation exits unsuccessfully.
    fn on_failed(&self, detail: &str);

    /// Called for each output line that was not a valid record.
    fn on_decode_error(&self, _error: &DecodeError) {}

    /// Called when the simulation was killed.
    fn on_killed(&self) {}
}

/// Everything a [`RunObserver`] can be told, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Progress(ProgressRecord),
    DecodeError(DecodeError),
    Completed(i32),
    Failed(String),
    Killed,
}

impl RunEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_) | Self::Killed)
    }
}

/// Observer that forwards every callback into a channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RunEvent) {
        // The receiver going away just means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl RunObserver for ChannelObserver {
    fn on_progress(&self, record: &ProgressRecord) {
        self.send(RunEvent::Progress(record.clone()));
    }

    fn on_completed(&self, exit_code: i32) {
        self.send(RunEvent::Completed(exit_code));
    }

    fn on_failed(&self, detail: &str) {
        self.send(RunEvent::Failed(detail.to_string()));
    }

    fn on_decode_error(&self, error: &DecodeError) {
        self.send(RunEvent::DecodeError(error.clone()));
    }

    fn on_killed(&self) {
        self.send(RunEvent::Killed);
    }
}
