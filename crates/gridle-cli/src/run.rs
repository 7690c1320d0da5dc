//! Run command implementation.
//!
//! Merges the configuration, starts the solver and prints its progress as
//! it arrives. Ctrl-C kills the solver.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use gridle_core::{
    ChannelObserver, GraphCollector, ProcessSupervisor, ProgressRecord, RunEvent,
    RunOutcome, SimulationCommand, locate_executable, shared_state,
};

use crate::colors;
use crate::overrides::ConfigArgs;

/// Execute one solver run.
pub async fn execute(
    args: &ConfigArgs,
    executable: Option<&Path>,
    working_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = args.build()?;
    let input = config.to_json_bytes()?;

    let executable = locate_executable(executable)?;
    let mut command = SimulationCommand::new(&executable, args.mode);
    if let Some(dir) = working_dir {
        command = command.current_dir(dir);
    }

    println!(
        "{}Running{} {} ({})",
        colors::BOLD,
        colors::RESET,
        executable.display(),
        args.mode
    );

    let supervisor = ProcessSupervisor::new();
    let (observer, mut events) = ChannelObserver::new();
    let collector = Arc::new(GraphCollector::new(Arc::new(observer)));
    let (writer, reader) = shared_state();

    let handle = supervisor
        .start(&command, &input, collector.clone())
        .await?;

    let mut interruptible = true;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let done = event.is_terminal();
                print_event(&event);
                if done {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c(), if interruptible => {
                if let Err(e) = signal {
                    tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                    interruptible = false;
                    continue;
                }
                eprintln!("\n{}Interrupted, stopping solver...{}", colors::YELLOW, colors::RESET);
                // NotRunning just means the run ended on its own meanwhile
                if let Err(e) = supervisor.kill().await {
                    tracing::debug!("{}", e);
                }
            }
        }
    }

    let outcome = handle.wait().await;

    writer.publish(collector.snapshot(config));
    drop(writer);
    print_graphs(&reader);

    let elapsed = start.elapsed().as_secs_f64();
    match outcome {
        RunOutcome::Succeeded => {
            println!(
                "{}Completed{} in {:.2}s",
                colors::GREEN,
                colors::RESET,
                elapsed
            );
            Ok(())
        }
        RunOutcome::Failed { code, detail } => match code {
            Some(code) => anyhow::bail!("Solver failed with exit code {code}: {detail}"),
            None => anyhow::bail!("Solver failed: {detail}"),
        },
        RunOutcome::Killed => anyhow::bail!("Solver was killed after {elapsed:.2}s"),
    }
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::Progress(ProgressRecord::Message { message }) => println!("{message}"),
        RunEvent::Progress(ProgressRecord::Graph { file, message }) => println!(
            "{}graph{} {} {}({}){}",
            colors::CYAN,
            colors::RESET,
            message,
            colors::DIM,
            file,
            colors::RESET
        ),
        RunEvent::Progress(ProgressRecord::Timing {
            function,
            duration_ms,
        }) => println!(
            "{}{} took {}ms{}",
            colors::DIM,
            function,
            duration_ms,
            colors::RESET
        ),
        RunEvent::DecodeError(error) => eprintln!(
            "{}warning:{} skipped output line {}: {}",
            colors::YELLOW,
            colors::RESET,
            error.line,
            error.content
        ),
        RunEvent::Failed(_) => eprintln!("{}Solver failed{}", colors::RED, colors::RESET),
        RunEvent::Completed(_) | RunEvent::Killed => {}
    }
    colors::flush_stdout();
}

fn print_graphs(reader: &gridle_core::StateReader) {
    let Some(snapshot) = reader.snapshot() else {
        return;
    };
    if snapshot.graphs.is_empty() {
        return;
    }

    println!("\n{}Graphs:{}", colors::BOLD, colors::RESET);
    println!("{}", "─".repeat(50));
    for graph in &snapshot.graphs {
        println!("  {}  {}", graph.file, graph.message);
    }
}
