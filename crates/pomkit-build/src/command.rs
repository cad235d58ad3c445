//! Process execution for Maven runs.
//!
//! [`CommandRunner`] is the seam tests replace; [`DefaultCommandRunner`]
//! spawns the real process with stdin closed and both pipes drained on their
//! own threads, so a chatty `-X` run cannot block on a full pipe.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Maven's closing advice after a failure; everything from here on is the
/// same for every build.
const HELP_TRAILER: &str = "To see the full stack trace of the errors";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Messages of the `[ERROR]` lines Maven logged, prefix removed.
    ///
    /// With `-q` these are the only lines Maven prints at all. Blank error
    /// lines and the generic help trailer are dropped.
    pub fn maven_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for line in self.stdout.lines().chain(self.stderr.lines()) {
            let Some(message) = line.trim_end().strip_prefix("[ERROR]") else {
                continue;
            };
            let message = message.trim();
            if message.starts_with(HELP_TRAILER) {
                break;
            }
            if !message.is_empty() {
                errors.push(message.to_string());
            }
        }
        errors
    }
}

pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultCommandRunner {
    /// Wall-clock limit for one run. On expiry the child is killed and the
    /// run fails with [`io::ErrorKind::TimedOut`]; JVMs the wrapper script
    /// forked may outlive it.
    pub timeout: Option<Duration>,
}

impl DefaultCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn wait(&self, child: &mut Child, command: &str) -> io::Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child.wait();
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("`{command}` timed out after {timeout:?}"),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CommandRunner for DefaultCommandRunner {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let command = format_command(program, args);
        tracing::debug!(target: "pomkit.build", command = %command, cwd = %cwd.display(), "running maven");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| io::Error::new(err.kind(), format!("failed to spawn `{command}`: {err}")))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child, &command);
        if status.is_err() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        match status {
            Ok(status) => {
                tracing::debug!(target: "pomkit.build", command = %command, code = ?status.code(), "maven finished");
                Ok(CommandOutput {
                    status,
                    stdout,
                    stderr,
                })
            }
            Err(err) => {
                tracing::warn!(target: "pomkit.build", command = %command, error = %err, "maven run aborted");
                Err(err)
            }
        }
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    }))
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Shell-like rendering of a command line for logs and errors.
pub(crate) fn format_command(program: &Path, args: &[String]) -> String {
    std::iter::once(program.to_string_lossy().into_owned())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
