//! Hand-off of a finished run to a later consumer.
//!
//! The configuration stage publishes a [`RunSnapshot`] (the configuration it
//! built plus the graphs the run produced); a viewing stage reads it later.
//! There is exactly one writer and any number of readers. Publishing replaces
//! the whole snapshot; there is no merging.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::config::Configuration;
use crate::error::DecodeError;
use crate::stream::ProgressRecord;
use crate::supervisor::RunObserver;

/// A graph file reported by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphRef {
    pub file: String,
    pub message: String,
}

/// Everything a viewer needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub configuration: Configuration,
    pub graphs: Vec<GraphRef>,
}

impl RunSnapshot {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            graphs: Vec::new(),
        }
    }

    pub fn with_graphs(mut self, graphs: Vec<GraphRef>) -> Self {
        self.graphs = graphs;
        self
    }
}

type Slot = Option<Arc<RunSnapshot>>;

/// Create an empty shared slot.
pub fn shared_state() -> (StateWriter, StateReader) {
    let (tx, rx) = watch::channel(None);
    (StateWriter { tx }, StateReader { rx })
}

/// The only writer of a shared slot. Not `Clone`.
#[derive(Debug)]
pub struct StateWriter {
    tx: watch::Sender<Slot>,
}

impl StateWriter {
    /// Replace the slot's content. Last write wins.
    pub fn publish(&self, snapshot: RunSnapshot) {
        tracing::debug!(
            "Publishing run snapshot with {} graph(s)",
            snapshot.graphs.len()
        );
        self.tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Another reader of this slot.
    pub fn subscribe(&self) -> StateReader {
        StateReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// A reader of a shared slot.
///
/// Keeps reading the last published value after the writer is gone.
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<Slot>,
}

impl StateReader {
    /// The current snapshot, or `None` if nothing was published yet.
    pub fn snapshot(&self) -> Option<Arc<RunSnapshot>> {
        self.rx.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.borrow().is_none()
    }

    /// Wait for the next publish and return it.
    ///
    /// Returns `None` once the writer is dropped and nothing new can arrive.
    pub async fn changed(&mut self) -> Option<Arc<RunSnapshot>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

/// Observer adapter that records graph outputs.
///
/// Every callback is forwarded unchanged to the wrapped observer.
pub struct GraphCollector {
    inner: Arc<dyn RunObserver>,
    graphs: Mutex<Vec<GraphRef>>,
}

impl GraphCollector {
    pub fn new(inner: Arc<dyn RunObserver>) -> Self {
        Self {
            inner,
            graphs: Mutex::new(Vec::new()),
        }
    }

    /// Graphs seen so far, in emission order.
    pub fn graphs(&self) -> Vec<GraphRef> {
        self.graphs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build a snapshot of `configuration` with the graphs seen so far.
    pub fn snapshot(&self, configuration: Configuration) -> RunSnapshot {
        RunSnapshot::new(configuration).with_graphs(self.graphs())
    }
}

impl RunObserver for GraphCollector {
    fn on_progress(&self, record: &ProgressRecord) {
        if let ProgressRecord::Graph { file, message } = record {
            self.graphs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(GraphRef {
                    file: file.clone(),
                    message: message.clone(),
                });
        }
        self.inner.on_progress(record);
    }

    fn on_completed(&self, exit_code: i32) {
        self.inner.on_completed(exit_code);
    }

    fn on_failed(&self, detail: &str) {
        self.inner.on_failed(detail);
    }

    fn on_decode_error(&self, error: &DecodeError) {
        self.inner.on_decode_error(error);
    }

    fn on_killed(&self) {
        self.inner.on_killed();
    }
}
