//! How the solver executable is found and invoked.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::OperatingMode;
use crate::error::SpawnError;

/// Environment variable naming the solver executable.
pub const EXECUTABLE_ENV: &str = "GRIDLE_EXECUTABLE";

/// File name of the solver executable.
const EXECUTABLE_NAME: &str = if cfg!(windows) { "gridle.exe" } else { "gridle" };

/// Invocation of the solver for one run: `<executable> <mode flag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationCommand {
    executable: PathBuf,
    mode: OperatingMode,
    working_dir: Option<PathBuf>,
}

impl SimulationCommand {
    pub fn new(executable: impl Into<PathBuf>, mode: OperatingMode) -> Self {
        Self {
            executable: executable.into(),
            mode,
            working_dir: None,
        }
    }

    /// Run the solver from `dir` instead of the executable's directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Directory the solver runs in.
    ///
    /// Defaults to the executable's parent directory; a bare program name
    /// resolved through `PATH` has none and inherits ours.
    pub fn working_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.working_dir {
            return Some(dir.clone());
        }
        self.executable
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Spawn with all three standard streams piped.
    ///
    /// The child is killed if its handle is dropped.
    pub(crate) fn spawn(&self) -> Result<Child, SpawnError> {
        let working_dir = self.working_dir();

        // A relative path with a directory part would be resolved against
        // the new working directory on some platforms.
        let program = if working_dir.is_some() && self.executable.is_relative() {
            std::path::absolute(&self.executable).unwrap_or_else(|_| self.executable.clone())
        } else {
            self.executable.clone()
        };

        let mut command = Command::new(&program);
        command
            .arg(self.mode.flag())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(
            "Spawning {} {} in {}",
            program.display(),
            self.mode.flag(),
            working_dir
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        );

        command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SpawnError::ExecutableNotFound(self.executable.clone())
            } else {
                SpawnError::Io {
                    path: self.executable.clone(),
                    source,
                }
            }
        })
    }
}

/// Find the solver executable.
///
/// Looks in the following order:
/// 1. `explicit`, when given
/// 2. `GRIDLE_EXECUTABLE` environment variable
/// 3. Same directory as the current executable
/// 4. System PATH
pub fn locate_executable(explicit: Option<&Path>) -> Result<PathBuf, SpawnError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(SpawnError::ExecutableNotFound(path.to_path_buf()))
        };
    }

    if let Ok(path) = std::env::var(EXECUTABLE_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {}, which does not exist",
            EXECUTABLE_ENV,
            path.display()
        );
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let sibling = exe_dir.join(EXECUTABLE_NAME);
        if sibling.exists() {
            return Ok(sibling);
        }
    }

    which::which(EXECUTABLE_NAME).map_err(|_| SpawnError::ExecutableNotFound(EXECUTABLE_NAME.into()))
}
