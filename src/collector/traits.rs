//! Abstractions for running external commands to enable testing and mocking.
//!
//! The `CommandRunner` trait allows the collector to drive the real `sadc` and
//! `sadf` binaries on Linux and canned implementations in tests.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Exit state of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandStatus {
    /// Status of a process that exited with the given code.
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Status of a process that was terminated by a signal.
    pub fn signaled() -> Self {
        Self { code: None }
    }

    /// Returns `true` if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status: {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Result of a command that was run to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: CommandStatus,
    /// Standard output followed by standard error.
    pub combined: Vec<u8>,
}

impl CommandOutput {
    /// Combined output as (lossy) UTF-8 text.
    pub fn combined_text(&self) -> String {
        String::from_utf8_lossy(&self.combined).into_owned()
    }
}

/// A started command whose standard output is streamed.
pub trait RunningCommand: Send {
    /// Takes the standard output stream. Returns `None` on the second call.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Waits for the command to exit.
    fn wait(&mut self) -> io::Result<CommandStatus>;

    /// Kills the command. Killing an already exited command is not an error.
    fn kill(&mut self) -> io::Result<()>;
}

/// Abstraction for external process execution.
///
/// Implementations must be shareable between threads: one collection cycle
/// runs every extraction concurrently through the same runner.
pub trait CommandRunner: Send + Sync {
    /// Runs a command to completion, capturing stdout and stderr together.
    fn output(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput>;

    /// Starts a command with its standard output piped.
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn RunningCommand>>;
}

/// Renders a command invocation the way a shell user would type it.
pub fn command_line(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Real process runner that delegates to `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new `SystemRunner` instance.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn output(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        Ok(CommandOutput {
            status: output.status.into(),
            combined,
        })
    }

    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn RunningCommand>> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Box::new(SystemCommand { child }))
    }
}

struct SystemCommand {
    child: Child,
}

impl RunningCommand for SystemCommand {
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> io::Result<CommandStatus> {
        self.child.wait().map(CommandStatus::from)
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }
}
