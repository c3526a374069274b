//! Error types for sysstat collection.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::collector::traits::CommandStatus;

use super::parser::ParseError;

/// A single failure within a collection cycle.
#[derive(Debug)]
pub enum SysstatError {
    /// `sadc` exited unsuccessfully. Carries its combined output.
    Capture { command: String, output: String },
    /// `sadc` could not be run at all, or left no artifact behind.
    CaptureIo { command: String, source: io::Error },
    /// The private directory for the artifact could not be created.
    ArtifactDir { dir: PathBuf, source: io::Error },
    /// `sadf` could not be started or its stdout could not be read.
    Transport { command: String, source: io::Error },
    /// A malformed record in `sadf` output.
    Parse {
        command: String,
        line: usize,
        source: ParseError,
    },
    /// `sadf` exited unsuccessfully after its output was consumed.
    Exit {
        command: String,
        status: CommandStatus,
    },
    /// An extraction thread panicked.
    WorkerPanicked { option: String },
    /// The temporary artifact could not be removed.
    Cleanup { path: PathBuf, source: io::Error },
}

impl SysstatError {
    /// Returns `true` for errors that abort the cycle before extraction.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            SysstatError::Capture { .. }
                | SysstatError::CaptureIo { .. }
                | SysstatError::ArtifactDir { .. }
        )
    }
}

impl fmt::Display for SysstatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysstatError::Capture { command, output } => {
                write!(f, "failed to run command {}: {}", command, output)
            }
            SysstatError::CaptureIo { command, source } => {
                write!(f, "failed to run command {}: {}", command, source)
            }
            SysstatError::ArtifactDir { dir, source } => {
                write!(
                    f,
                    "failed to create artifact dir in {}: {}",
                    dir.display(),
                    source
                )
            }
            SysstatError::Transport { command, source } => {
                write!(f, "running command '{}' failed: {}", command, source)
            }
            SysstatError::Parse {
                command,
                line,
                source,
            } => write!(f, "command {}: line {}: {}", command, line, source),
            SysstatError::Exit { command, status } => {
                write!(f, "command {} failed with {}", command, status)
            }
            SysstatError::WorkerPanicked { option } => {
                write!(f, "extraction for option '{}' panicked", option)
            }
            SysstatError::Cleanup { path, source } => {
                write!(f, "failed to remove {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SysstatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SysstatError::CaptureIo { source, .. }
            | SysstatError::ArtifactDir { source, .. }
            | SysstatError::Transport { source, .. }
            | SysstatError::Cleanup { source, .. } => Some(source),
            SysstatError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Every failure of one collection cycle.
///
/// Displays as the newline-joined messages of all contained errors, so no
/// sibling failure is hidden behind another.
#[derive(Debug)]
pub struct CycleError {
    errors: Vec<SysstatError>,
}

impl CycleError {
    /// Wraps a non-empty list of errors. Returns `None` for an empty list.
    pub fn from_errors(errors: Vec<SysstatError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[SysstatError] {
        &self.errors
    }

    /// Consumes the cycle error, yielding the individual failures.
    pub fn into_errors(self) -> Vec<SysstatError> {
        self.errors
    }

    /// Returns `true` if the cycle was aborted by a capture failure.
    pub fn is_capture_failure(&self) -> bool {
        self.errors.iter().any(SysstatError::is_capture)
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

impl From<SysstatError> for CycleError {
    fn from(error: SysstatError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}
