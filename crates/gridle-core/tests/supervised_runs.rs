//! Integration tests for supervised solver runs.
//!
//! Shell scripts stand in for the solver executable.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use gridle_core::{
    ChannelObserver, GraphCollector, KillError, OperatingMode, ProcessSupervisor, ProgressRecord,
    RunEvent, RunObserver, RunOutcome, RunState, SimulationCommand, SpawnError, shared_state,
};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Writing a script while another test forks can make exec fail with
/// "text file busy", so script creation and spawning take turns.
static SPAWN_LOCK: LazyLock<tokio::sync::Mutex<()>> = LazyLock::new(|| tokio::sync::Mutex::new(()));

const LIMIT: Duration = Duration::from_secs(10);

// ============================================================================
// Helpers
// ============================================================================

/// A solver stand-in living in its own temporary directory.
struct FakeSolver {
    dir: TempDir,
    path: PathBuf,
}

impl FakeSolver {
    async fn new(body: &str) -> Self {
        let _guard = SPAWN_LOCK.lock().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gridle");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, path }
    }

    fn command(&self, mode: OperatingMode) -> SimulationCommand {
        SimulationCommand::new(&self.path, mode)
    }

    fn dir(&self) -> &Path {
        self.dir.path()
    }
}

fn channel() -> (Arc<dyn RunObserver>, UnboundedReceiver<RunEvent>) {
    let (observer, rx) = ChannelObserver::new();
    (Arc::new(observer), rx)
}

async fn start(
    supervisor: &ProcessSupervisor,
    solver: &FakeSolver,
    mode: OperatingMode,
    config: &[u8],
    observer: Arc<dyn RunObserver>,
) -> Result<gridle_core::RunHandle, SpawnError> {
    let _guard = SPAWN_LOCK.lock().await;
    supervisor
        .start(&solver.command(mode), config, observer)
        .await
}

/// Collect events up to and including the terminal one.
async fn drain(rx: &mut UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Some(event) = timeout(LIMIT, rx.recv()).await.unwrap() {
        let done = event.is_terminal();
        events.push(event);
        if done {
            break;
        }
    }
    events
}

const LONG_RUNNING: &str = "cat > /dev/null\necho '{\"message\":\"started\"}'\nexec sleep 30";

// ============================================================================
// Progress delivery
// ============================================================================

#[tokio::test]
async fn test_records_arrive_in_order() {
    let solver = FakeSolver::new(
        "cat > /dev/null
echo '{\"message\":\"a\"}'
echo 'NOT-JSON'
echo '{\"type\":\"timing\",\"function\":\"solve\",\"duration\":12}'
echo '{\"message\":\"b\"}'",
    ).await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer)
        .await
        .unwrap();
    assert!(handle.pid().is_some());

    let events = drain(&mut rx).await;
    assert_eq!(events.len(), 5, "{events:?}");
    assert_eq!(events[0], RunEvent::Progress(ProgressRecord::text("a")));
    assert!(matches!(&events[1], RunEvent::DecodeError(e) if e.content == "NOT-JSON"));
    assert_eq!(
        events[2],
        RunEvent::Progress(ProgressRecord::Timing {
            function: "solve".into(),
            duration_ms: 12
        })
    );
    assert_eq!(events[3], RunEvent::Progress(ProgressRecord::text("b")));
    assert_eq!(events[4], RunEvent::Completed(0));

    assert_eq!(timeout(LIMIT, handle.wait()).await.unwrap(), RunOutcome::Succeeded);
    assert_eq!(supervisor.state(), RunState::Idle);
    assert_eq!(supervisor.last_outcome(), Some(RunOutcome::Succeeded));
}

#[tokio::test]
async fn test_child_receives_config_and_mode_flag() {
    // Runs in its own directory, so the relative path lands next to the script
    let solver = FakeSolver::new(
        "cat > received.json
echo \"{\\\"message\\\":\\\"$1\\\"}\"",
    ).await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();
    let config = br#"{"MaxIterations":50}"#;

    let handle = start(&supervisor, &solver, OperatingMode::CompareProb0, config, observer)
        .await
        .unwrap();
    let events = drain(&mut rx).await;
    handle.wait().await;

    assert_eq!(
        events[0],
        RunEvent::Progress(ProgressRecord::text("--compare-prob0"))
    );
    let received = std::fs::read(solver.dir().join("received.json")).unwrap();
    assert_eq!(received, config);
}

#[tokio::test]
async fn test_graphs_reach_the_shared_slot() {
    let solver = FakeSolver::new(
        "cat > /dev/null
echo '{\"type\":\"graph\",\"file\":\"potential.png\",\"message\":\"Potential\"}'
echo '{\"type\":\"graph\",\"file\":\"error.png\",\"message\":\"Error\"}'",
    ).await;
    let supervisor = ProcessSupervisor::new();
    let (inner, mut rx) = channel();
    let collector = Arc::new(GraphCollector::new(inner));
    let (writer, reader) = shared_state();

    let handle = start(
        &supervisor,
        &solver,
        OperatingMode::CompareTwo,
        b"{}",
        collector.clone(),
    )
    .await
    .unwrap();
    assert!(handle.wait().await.is_success());
    assert_eq!(drain(&mut rx).await.len(), 3);

    writer.publish(collector.snapshot(Default::default()));
    drop(writer);

    let snapshot = reader.snapshot().unwrap();
    let files: Vec<&str> = snapshot.graphs.iter().map(|g| g.file.as_str()).collect();
    assert_eq!(files, ["potential.png", "error.png"]);
}

// ============================================================================
// Failure
// ============================================================================

#[tokio::test]
async fn test_nonzero_exit_reports_stderr() {
    let solver = FakeSolver::new("cat > /dev/null\necho 'solver diverged' >&2\nexit 3").await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer)
        .await
        .unwrap();
    let outcome = timeout(LIMIT, handle.wait()).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            code: Some(3),
            detail: "solver diverged".into()
        }
    );
    assert_eq!(drain(&mut rx).await, vec![RunEvent::Failed("solver diverged".into())]);
    assert_eq!(supervisor.state(), RunState::Idle);
}

#[tokio::test]
async fn test_solver_ignoring_stdin_still_completes() {
    let solver = FakeSolver::new("echo '{\"message\":\"done\"}'").await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer)
        .await
        .unwrap();
    assert!(timeout(LIMIT, handle.wait()).await.unwrap().is_success());
    assert_eq!(drain(&mut rx).await.last(), Some(&RunEvent::Completed(0)));
}

// ============================================================================
// Single slot
// ============================================================================

#[tokio::test]
async fn test_second_start_is_rejected() {
    let solver = FakeSolver::new(LONG_RUNNING).await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer.clone())
        .await
        .unwrap();
    assert_eq!(supervisor.state(), RunState::Running);

    let second = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer).await;
    assert!(matches!(second, Err(SpawnError::AlreadyRunning)));
    assert_eq!(supervisor.state(), RunState::Running);

    supervisor.kill().await.unwrap();
    assert_eq!(handle.wait().await, RunOutcome::Killed);
    assert_eq!(drain(&mut rx).await.last(), Some(&RunEvent::Killed));
}

#[tokio::test]
async fn test_kill_when_idle_is_rejected() {
    let supervisor = ProcessSupervisor::new();
    assert_eq!(supervisor.kill().await, Err(KillError::NotRunning));
}

#[tokio::test]
async fn test_kill_then_restart() {
    let solver = FakeSolver::new(LONG_RUNNING).await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer)
        .await
        .unwrap();
    let first = timeout(LIMIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, RunEvent::Progress(ProgressRecord::text("started")));

    // Kill from another task through a clone of the supervisor
    let remote = supervisor.clone();
    timeout(LIMIT, tokio::spawn(async move { remote.kill().await }))
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(supervisor.state(), RunState::Idle);
    assert_eq!(supervisor.last_outcome(), Some(RunOutcome::Killed));
    assert_eq!(handle.wait().await, RunOutcome::Killed);
    assert_eq!(drain(&mut rx).await, vec![RunEvent::Killed]);

    let quick = FakeSolver::new("cat > /dev/null\necho '{\"message\":\"again\"}'").await;
    let (observer, mut rx) = channel();
    let handle = start(&supervisor, &quick, OperatingMode::SingleSimulation, b"{}", observer)
        .await
        .unwrap();
    assert!(timeout(LIMIT, handle.wait()).await.unwrap().is_success());
    assert_eq!(
        drain(&mut rx).await,
        vec![
            RunEvent::Progress(ProgressRecord::text("again")),
            RunEvent::Completed(0)
        ]
    );
}

// ============================================================================
// Standard input
// ============================================================================

/// Larger than any pipe buffer.
fn large_config() -> Vec<u8> {
    vec![b' '; 1 << 20]
}

#[tokio::test]
async fn test_large_config_does_not_block_start_or_kill() {
    let solver = FakeSolver::new("exec sleep 30").await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = timeout(
        LIMIT,
        start(&supervisor, &solver, OperatingMode::SingleSimulation, &large_config(), observer),
    )
    .await
    .expect("start should not wait for the solver to read its input")
    .unwrap();
    assert_eq!(supervisor.state(), RunState::Running);

    timeout(LIMIT, supervisor.kill()).await.unwrap().unwrap();
    assert_eq!(supervisor.state(), RunState::Idle);
    assert_eq!(handle.wait().await, RunOutcome::Killed);
    assert_eq!(drain(&mut rx).await, vec![RunEvent::Killed]);
}

#[tokio::test]
async fn test_solver_writing_before_reading() {
    // Fills the stdout pipe before it starts reading stdin
    let solver = FakeSolver::new(
        "i=0
while [ $i -lt 5000 ]; do
  echo '{\"message\":\"warming up the grid before reading input\"}'
  i=$((i+1))
done
cat > /dev/null
echo '{\"message\":\"done\"}'",
    )
    .await;
    let supervisor = ProcessSupervisor::new();
    let (observer, mut rx) = channel();

    let handle = timeout(
        LIMIT,
        start(&supervisor, &solver, OperatingMode::SingleSimulation, &large_config(), observer),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(timeout(LIMIT, handle.wait()).await.unwrap().is_success());

    let events = drain(&mut rx).await;
    assert_eq!(events.len(), 5002);
    assert_eq!(events[5000], RunEvent::Progress(ProgressRecord::text("done")));
    assert_eq!(events[5001], RunEvent::Completed(0));
}

// ============================================================================
// Restarting
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restart_as_soon_as_run_ends() {
    let solver = FakeSolver::new("cat > /dev/null").await;
    let supervisor = ProcessSupervisor::new();

    for _ in 0..50 {
        let (observer, mut rx) = channel();
        let handle = start(&supervisor, &solver, OperatingMode::SingleSimulation, b"{}", observer)
            .await
            .expect("slot should be free once the previous run reported its end");

        assert_eq!(drain(&mut rx).await, vec![RunEvent::Completed(0)]);
        assert_eq!(supervisor.state(), RunState::Idle);
        drop(handle);
    }
}
