//! The single-slot process supervisor.

use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{KillError, SpawnError};
use crate::stream::record_stream;

use super::command::SimulationCommand;
use super::observer::RunObserver;
use super::state::{RunOutcome, RunState};

/// Owner of the one process slot.
///
/// At most one simulation runs at a time, across every clone of the
/// supervisor. Clones share the slot, so a clone handed to a window-close
/// handler can kill a run started elsewhere.
#[derive(Clone)]
pub struct ProcessSupervisor {
    slot: Arc<Mutex<Slot>>,
    /// Id of the most recent run that released the slot.
    released: Arc<watch::Sender<u64>>,
}

struct Slot {
    state: RunState,
    /// Id of the current (or last) run; increases with every start.
    run_id: u64,
    /// Set by `kill` while the child is still being spawned.
    kill_requested: bool,
    /// Signals the monitor task to kill the child.
    kill_tx: Option<oneshot::Sender<()>>,
    last_outcome: Option<RunOutcome>,
}

impl Slot {
    fn transition(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                "Invalid supervisor transition {} -> {} (run {})",
                self.state,
                next,
                self.run_id
            );
            debug_assert!(false, "invalid transition {} -> {}", self.state, next);
        }
        tracing::debug!("Run {}: {} -> {}", self.run_id, self.state, next);
        self.state = next;
    }
}

/// Handle to a started run.
///
/// Dropping the handle does not stop the run; use
/// [`ProcessSupervisor::kill`] for that.
pub struct RunHandle {
    run_id: u64,
    pid: Option<u32>,
    monitor: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Process id of the child, if it was still alive when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Sequence number of this run within its supervisor.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Wait for the run to end and the slot to be released.
    pub async fn wait(self) -> RunOutcome {
        match self.monitor.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed {
                code: None,
                detail: format!("run monitor ended abnormally: {e}"),
            },
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                state: RunState::Idle,
                run_id: 0,
                kill_requested: false,
                kill_tx: None,
                last_outcome: None,
            })),
            released: Arc::new(watch::Sender::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of the slot.
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Outcome of the most recent finished run.
    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.lock().last_outcome.clone()
    }

    /// Start a simulation.
    ///
    /// Spawns the executable with the mode flag and returns as soon as the
    /// child exists. `config` is written to the child's standard input by a
    /// background task, which then closes it and delivers progress to
    /// `observer` until the run ends. Must be called within a tokio runtime.
    pub async fn start(
        &self,
        command: &SimulationCommand,
        config: &[u8],
        observer: Arc<dyn RunObserver>,
    ) -> Result<RunHandle, SpawnError> {
        let run_id = self.claim()?;

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to start simulation: {}", e);
                self.release(run_id, None);
                return Err(e);
            }
        };

        tracing::info!(
            "Started simulation run {} (pid {:?}, mode {})",
            run_id,
            child.id(),
            command.mode()
        );
        Ok(self.launch(run_id, child, config.to_vec(), observer))
    }

    /// Take the slot for a new run: Idle -> Starting.
    fn claim(&self) -> Result<u64, SpawnError> {
        let mut slot = self.lock();
        if slot.state != RunState::Idle {
            return Err(SpawnError::AlreadyRunning);
        }
        slot.run_id += 1;
        slot.kill_requested = false;
        slot.transition(RunState::Starting);
        Ok(slot.run_id)
    }

    /// Hand a spawned child to its monitor task: Starting -> Running.
    fn launch(
        &self,
        run_id: u64,
        child: Child,
        config: Vec<u8>,
        observer: Arc<dyn RunObserver>,
    ) -> RunHandle {
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel();
        {
            let mut slot = self.lock();
            slot.transition(RunState::Running);
            if slot.kill_requested {
                let _ = kill_tx.send(());
            } else {
                slot.kill_tx = Some(kill_tx);
            }
        }

        let monitor = tokio::spawn(monitor(
            self.clone(),
            run_id,
            child,
            config,
            kill_rx,
            observer,
        ));
        RunHandle {
            run_id,
            pid,
            monitor,
        }
    }

    /// Forcibly terminate the running simulation.
    ///
    /// Returns once the slot is free again, so a following `start` can
    /// succeed. Fails with [`KillError::NotRunning`] when the slot is idle.
    pub async fn kill(&self) -> Result<(), KillError> {
        let run_id = {
            let mut slot = self.lock();
            match slot.state {
                RunState::Idle => return Err(KillError::NotRunning),
                RunState::Starting => slot.kill_requested = true,
                RunState::Running => {
                    slot.kill_requested = true;
                    if let Some(tx) = slot.kill_tx.take() {
                        let _ = tx.send(());
                    }
                }
                // Already over; just wait for the slot to be released
                RunState::Succeeded | RunState::Failed | RunState::Killed => {}
            }
            slot.run_id
        };

        tracing::debug!("Kill requested for run {}", run_id);
        let mut released = self.released.subscribe();
        let _ = released.wait_for(|&done| done >= run_id).await;
        Ok(())
    }

    /// Return the slot to Idle and wake any pending `kill`.
    ///
    /// With an outcome the slot passes through the matching terminal state
    /// first, and the outcome is kept for [`last_outcome`](Self::last_outcome).
    fn release(&self, run_id: u64, outcome: Option<&RunOutcome>) {
        {
            let mut slot = self.lock();
            if let Some(outcome) = outcome {
                slot.transition(outcome.state());
                slot.last_outcome = Some(outcome.clone());
                tracing::info!("Simulation run {} ended: {:?}", run_id, outcome);
            }
            slot.kill_tx = None;
            slot.kill_requested = false;
            slot.transition(RunState::Idle);
        }
        self.released.send_replace(run_id);
    }
}

async fn write_config(stdin: &mut tokio::process::ChildStdin, config: &[u8]) -> io::Result<()> {
    stdin.write_all(config).await?;
    stdin.flush().await?;
    Ok(())
}

/// Drive one run to completion.
///
/// Feeds the configuration to stdin, forwards stdout records to the observer
/// and collects stderr, all while waiting for the child to exit or for a kill
/// request. The slot is released before the observer hears the outcome, so a
/// new run can be started from inside the terminal callback.
async fn monitor(
    supervisor: ProcessSupervisor,
    run_id: u64,
    mut child: Child,
    config: Vec<u8>,
    mut kill_rx: oneshot::Receiver<()>,
    observer: Arc<dyn RunObserver>,
) -> RunOutcome {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let feed = async {
        let Some(mut stdin) = stdin else { return };
        // A solver that exits without reading its input shows up as a
        // broken pipe here; its exit status tells the real story.
        if let Err(e) = write_config(&mut stdin, &config).await {
            tracing::warn!("Could not write configuration to simulation: {}", e);
        }
        // stdin is dropped here, closing the pipe
    };

    let forward = async {
        let Some(stdout) = stdout else { return };
        let records = record_stream(stdout);
        futures::pin_mut!(records);
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => observer.on_progress(&record),
                Err(e) => {
                    tracing::warn!("{}", e);
                    observer.on_decode_error(&e);
                }
            }
        }
    };

    let collect_stderr = async {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let mut bytes = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut bytes).await {
                tracing::warn!("Could not read simulation stderr: {}", e);
            }
            text = String::from_utf8_lossy(&bytes).into_owned();
        }
        text
    };

    let run = async {
        let (status, (), (), stderr) =
            tokio::join!(child.wait(), feed, forward, collect_stderr);
        (status, stderr)
    };

    // A dropped sender only means the slot was released; not a kill.
    let finished = tokio::select! {
        Ok(()) = &mut kill_rx => None,
        result = run => Some(result),
    };

    let outcome = match finished {
        None => {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill simulation: {}", e);
            }
            RunOutcome::Killed
        }
        Some((status, stderr)) => outcome_from_exit(status, &stderr),
    };

    supervisor.release(run_id, Some(&outcome));
    match &outcome {
        RunOutcome::Succeeded => observer.on_completed(0),
        RunOutcome::Failed { detail, .. } => observer.on_failed(detail),
        RunOutcome::Killed => observer.on_killed(),
    }
    outcome
}

fn outcome_from_exit(status: io::Result<ExitStatus>, stderr: &str) -> RunOutcome {
    match status {
        Ok(status) if status.success() => RunOutcome::Succeeded,
        Ok(status) => {
            let detail = stderr.trim_end();
            RunOutcome::Failed {
                code: status.code(),
                detail: if detail.trim().is_empty() {
                    format!("simulation exited with {status}")
                } else {
                    detail.to_string()
                },
            }
        }
        Err(e) => RunOutcome::Failed {
            code: None,
            detail: format!("failed to wait for simulation: {e}"),
        },
    }
}
