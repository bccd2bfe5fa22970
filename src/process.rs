//! External command execution with a bounded timeout.
//!
//! `SystemRunner` merges stdout and stderr into one captured string, kills the
//! child when the timeout elapses, and maps non-zero exits to
//! `ProvisionError::CommandFailed` carrying the captured output.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{ProvisionError, ProvisionResult};

/// Default per-command time budget.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

const REDACTED: &str = "********";

/// One external command, either as an argument vector or as a line handed to
/// the platform shell (`cmd.exe /c` on Windows, `sh -c` elsewhere).
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    shell: bool,
    secrets: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            shell: false,
            secrets: Vec::new(),
        }
    }

    /// A full command line for the platform shell. Used where the tool's own
    /// argument parsing depends on shell quoting (`netsh name="A B"`).
    pub fn shell(line: impl Into<String>) -> Self {
        Self {
            program: line.into(),
            args: Vec::new(),
            shell: true,
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark a value that must never appear in logs or diagnostics.
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn is_shell(&self) -> bool {
        self.shell
    }

    /// Space-joined command line with secrets redacted.
    pub fn display(&self) -> String {
        let mut line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        for secret in &self.secrets {
            line = line.replace(secret.as_str(), REDACTED);
        }
        line
    }

    fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
    }

    fn to_command(&self) -> Command {
        if self.shell {
            shell_command(&self.program)
        } else {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            cmd
        }
    }
}

impl std::fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CommandLine").field(&self.display()).finish()
    }
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/c").raw_arg(line);
    cmd
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

/// Outcome of one command that exited successfully within its timeout.
/// A timeout is reported as [`ProvisionError::CommandTimeout`] instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub status: Option<i32>,
    /// Combined stdout and stderr, trimmed.
    pub output: String,
}

/// Executes external commands. Implemented by [`SystemRunner`] and by test fakes.
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Non-zero exit and timeout are errors.
    fn run(&self, command: &CommandLine) -> ProvisionResult<CommandResult>;

    /// Returns true when `tool` resolves on the search path.
    fn tool_available(&self, tool: &str) -> bool;
}

/// Runs real processes.
#[derive(Clone, Debug)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> ProvisionResult<CommandResult> {
        let display = command.display();
        log::debug!("exec: {}", display);

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProvisionError::CommandFailed {
                command: display.clone(),
                output: format!("could not start process: {}", e),
            })?;

        let combined = Arc::new(Mutex::new(String::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_collector(stdout, combined.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_collector(stderr, combined.clone()));
        }

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // Collectors are left detached: their pipes close once the kill lands.
                if let Err(e) = child.kill() {
                    log::warn!("failed to kill timed-out command '{}': {}", display, e);
                }
                let _ = child.wait();
                return Err(ProvisionError::CommandTimeout {
                    command: display,
                    timeout: self.timeout,
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProvisionError::CommandFailed {
                    command: display,
                    output: format!("wait failed: {}", e),
                });
            }
        };

        for reader in readers {
            let _ = reader.join();
        }
        let output = {
            let guard = combined.lock().unwrap_or_else(|p| p.into_inner());
            command.redact(guard.trim())
        };

        if !status.success() {
            return Err(ProvisionError::CommandFailed {
                command: display,
                output,
            });
        }
        Ok(CommandResult {
            status: status.code(),
            output,
        })
    }

    fn tool_available(&self, tool: &str) -> bool {
        let probe = if cfg!(windows) { "where" } else { "which" };
        self.run(&CommandLine::new(probe).arg(tool)).is_ok()
    }
}

fn spawn_collector<R: Read + Send + 'static>(
    stream: R,
    sink: Arc<Mutex<String>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    let mut guard = sink.lock().unwrap_or_else(|p| p.into_inner());
                    guard.push_str(&text);
                    if !text.ends_with('\n') {
                        guard.push('\n');
                    }
                }
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ProvisionErrorKind;
    use std::time::Instant;

    #[test]
    fn captures_combined_output_on_success() {
        let runner = SystemRunner::new();
        let result = runner
            .run(&CommandLine::shell("echo out; echo err 1>&2"))
            .expect("command succeeds");
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
        assert_eq!(result.status, Some(0));
    }

    #[test]
    fn non_zero_exit_is_command_failed_with_output() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&CommandLine::shell("echo boom 1>&2; exit 3"))
            .expect_err("command fails");
        assert_eq!(err.kind(), ProvisionErrorKind::CommandFailed);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn missing_program_is_command_failed() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&CommandLine::new("definitely-not-a-real-tool-7f3a"))
            .expect_err("spawn fails");
        assert_eq!(err.kind(), ProvisionErrorKind::CommandFailed);
    }

    #[test]
    fn timeout_kills_the_process() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_file = dir.path().join("pid");
        let runner = SystemRunner::with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let line = format!("echo $$ > {}; exec sleep 5", pid_file.display());
        let err = runner
            .run(&CommandLine::shell(line))
            .expect_err("command times out");

        assert_eq!(err.kind(), ProvisionErrorKind::CommandTimeout);
        assert!(err.to_string().contains("exec sleep 5"));
        assert!(started.elapsed() < Duration::from_secs(3));

        let pid = std::fs::read_to_string(&pid_file).expect("pid written");
        let alive = Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .expect("kill -0 runs");
        assert!(!alive.success(), "timed-out process must be terminated");
    }

    #[test]
    fn secrets_are_redacted_from_display_and_output() {
        let cmd = CommandLine::new("echo").arg("hunter2").secret("hunter2");
        assert_eq!(cmd.display(), "echo ********");
        let result = SystemRunner::new().run(&cmd).expect("echo succeeds");
        assert_eq!(result.output, "********");
    }

    #[test]
    fn probes_tools_on_path() {
        let runner = SystemRunner::new();
        assert!(runner.tool_available("sh"));
        assert!(!runner.tool_available("definitely-not-a-real-tool-7f3a"));
    }
}
