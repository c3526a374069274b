//! Canned command runner for testing collectors without real processes.
//!
//! `MockRunner` answers `output()` calls (the capture step) and `spawn()`
//! calls (extractions) from responses registered up front. A successful
//! capture creates the artifact file named by its last argument, like `sadc`.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::collector::traits::{CommandOutput, CommandRunner, CommandStatus, RunningCommand};

/// Content written to artifacts created by a mock capture.
const ARTIFACT_CONTENT: &[u8] = b"sa-mock\n";

/// Number of leading `sadf` arguments before the option tokens.
const SADF_PREFIX_LEN: usize = 3;

/// A recorded command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Whether the path in the last argument existed when the command ran.
    pub artifact_present: bool,
}

#[derive(Debug, Clone)]
enum CaptureResponse {
    Exit {
        code: i32,
        output: String,
        write_artifact: bool,
    },
    /// Succeeds but leaves a non-empty directory at the artifact path.
    Directory,
    NotFound,
}

#[derive(Debug, Clone)]
struct ExtractionResponse {
    stdout: String,
    code: i32,
}

/// In-memory command runner for testing.
#[derive(Debug)]
pub struct MockRunner {
    capture: CaptureResponse,
    extractions: HashMap<String, ExtractionResponse>,
    captures: Mutex<Vec<Invocation>>,
    invocations: Mutex<Vec<Invocation>>,
    killed: Arc<AtomicUsize>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self {
            capture: CaptureResponse::Exit {
                code: 0,
                output: String::new(),
                write_artifact: true,
            },
            extractions: HashMap::new(),
            captures: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
            killed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockRunner {
    /// Creates a runner whose capture succeeds and which knows no options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capture exit code and combined output. The artifact is only
    /// written when `code` is 0.
    pub fn with_capture(mut self, code: i32, output: &str) -> Self {
        self.capture = CaptureResponse::Exit {
            code,
            output: output.to_string(),
            write_artifact: code == 0,
        };
        self
    }

    /// Makes the capture fail with `output` after writing a partial artifact.
    pub fn with_partial_capture(mut self, code: i32, output: &str) -> Self {
        self.capture = CaptureResponse::Exit {
            code,
            output: output.to_string(),
            write_artifact: true,
        };
        self
    }

    /// Makes the capture succeed but leave a non-empty directory where the
    /// artifact file belongs, so it cannot be removed as a file.
    pub fn with_directory_capture(mut self) -> Self {
        self.capture = CaptureResponse::Directory;
        self
    }

    /// Makes the capture program impossible to start.
    pub fn with_missing_capture(mut self) -> Self {
        self.capture = CaptureResponse::NotFound;
        self
    }

    /// Registers the output and exit code `sadf` produces for `option`.
    pub fn with_extraction(mut self, option: &str, stdout: &str, code: i32) -> Self {
        self.extractions.insert(
            normalize_option(option),
            ExtractionResponse {
                stdout: stdout.to_string(),
                code,
            },
        );
        self
    }

    /// Capture invocations seen so far.
    pub fn captures(&self) -> Vec<Invocation> {
        lock(&self.captures).clone()
    }

    /// Extraction invocations seen so far, including failed spawns.
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Number of extractions that were killed before finishing.
    pub fn killed(&self) -> usize {
        self.killed.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalize_option(option: &str) -> String {
    option.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn record(program: &Path, args: &[String]) -> Invocation {
    Invocation {
        program: program.to_path_buf(),
        args: args.to_vec(),
        artifact_present: args.last().is_some_and(|a| Path::new(a).exists()),
    }
}

impl CommandRunner for MockRunner {
    fn output(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        lock(&self.captures).push(record(program, args));

        match &self.capture {
            CaptureResponse::NotFound => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: not found", program.display()),
            )),
            CaptureResponse::Directory => {
                if let Some(artifact) = args.last() {
                    std::fs::create_dir(artifact)?;
                    std::fs::write(Path::new(artifact).join("sa01"), ARTIFACT_CONTENT)?;
                }
                Ok(CommandOutput {
                    status: CommandStatus::exited(0),
                    combined: Vec::new(),
                })
            }
            CaptureResponse::Exit {
                code,
                output,
                write_artifact,
            } => {
                if *write_artifact && let Some(artifact) = args.last() {
                    std::fs::write(artifact, ARTIFACT_CONTENT)?;
                }
                Ok(CommandOutput {
                    status: CommandStatus::exited(*code),
                    combined: output.clone().into_bytes(),
                })
            }
        }
    }

    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn RunningCommand>> {
        lock(&self.invocations).push(record(program, args));

        let option = if args.len() > SADF_PREFIX_LEN {
            args[SADF_PREFIX_LEN..args.len() - 1].join(" ")
        } else {
            String::new()
        };
        let response = self.extractions.get(&option).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mock response for option '{}'", option),
            )
        })?;

        Ok(Box::new(MockCommand {
            stdout: Some(response.stdout.clone().into_bytes()),
            status: CommandStatus::exited(response.code),
            killed: false,
            kill_counter: Arc::clone(&self.killed),
        }))
    }
}

struct MockCommand {
    stdout: Option<Vec<u8>>,
    status: CommandStatus,
    killed: bool,
    kill_counter: Arc<AtomicUsize>,
}

impl RunningCommand for MockCommand {
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .take()
            .map(|buf| Box::new(Cursor::new(buf)) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> io::Result<CommandStatus> {
        if self.killed {
            Ok(CommandStatus::signaled())
        } else {
            Ok(self.status)
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        if !self.killed {
            self.killed = true;
            self.kill_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
