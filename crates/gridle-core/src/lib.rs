//! Front-end core for the Gridle grid solver.
//!
//! This crate provides:
//! - Configuration building: defaults, override merging, color map merging
//! - Decoding of the solver's newline-delimited JSON progress stream
//! - Supervision of the single solver process
//! - A single-writer slot handing run results to a later consumer

pub mod bridge;
pub mod config;
pub mod error;
pub mod stream;
pub mod supervisor;

pub use bridge::{GraphCollector, GraphRef, RunSnapshot, StateReader, StateWriter, shared_state};
pub use config::{
    ColorMapEntry, ColorRule, ConfigField, Configuration, Defaults, OperatingMode, RawColorEntry,
    RawOverrides, Rgb, merge_color_map, merge_overrides,
};
pub use error::{ConfigError, DecodeError, Error, KillError, Result, SpawnError};
pub use stream::{LineDecoder, ProgressRecord, RecordReader, record_stream};
pub use supervisor::{
    ChannelObserver, ProcessSupervisor, RunEvent, RunHandle, RunObserver, RunOutcome, RunState,
    SimulationCommand, locate_executable,
};
