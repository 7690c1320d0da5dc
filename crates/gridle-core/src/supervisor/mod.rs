//! Supervision of the external solver process.
//!
//! The solver is spawned as `<executable> <mode flag>`, reads the merged
//! configuration as JSON from standard input, streams progress records on
//! standard output and reports failures on standard error. A
//! [`ProcessSupervisor`] owns exactly one process slot:
//!
//! ```text
//! start(command, config, observer)
//!     │
//!     ├── spawn child, write config, close stdin
//!     │
//!     └── monitor task
//!             ├── stdout ─► record_stream ─► observer.on_progress / on_decode_error
//!             ├── stderr ─► collected for the failure detail
//!             └── exit / kill ─► observer.on_completed / on_failed / on_killed ─► Idle
//! ```
//!
//! # Module Structure
//!
//! - `command` - Locating and invoking the solver executable
//! - `observer` - Progress callbacks
//! - `process` - The supervisor and its monitor task
//! - `state` - Run lifecycle states and outcomes

mod command;
mod observer;
mod process;
mod state;

pub use command::{EXECUTABLE_ENV, SimulationCommand, locate_executable};
pub use observer::{ChannelObserver, RunEvent, RunObserver};
pub use process::{ProcessSupervisor, RunHandle};
pub use state::{RunOutcome, RunState};
