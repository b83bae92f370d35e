//! External command execution
//!
//! Every process the pipeline starts goes through a [`CommandRunner`]. The
//! system implementation blocks until the child exits and captures its
//! output; exit status is checked by the caller immediately afterwards.
//!
//! Tests substitute a recording runner so the pipeline can be driven without
//! touching the host.

use crate::error::{ProvisionError, Result};
use std::fmt;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// A fully described external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Successful output carrying the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let detail = match self.stderr.trim() {
            "" => "no error output".to_string(),
            stderr => last_lines(stderr, 5),
        };
        Err(ProvisionError::command(program, self.exit_code, detail))
    }
}

/// Keep only the tail of long diagnostic output.
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// Capability for running external commands.
///
/// `run` only fails when the process cannot be started at all; a non-zero
/// exit is reported through [`CommandOutput::success`].
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run and fail on non-zero exit.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.run(spec)?.ensure_success(&spec.program)
    }
}

/// Runs commands as real child processes on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        info!("Running: {}", spec);

        // stdin is null - every invocation is non-interactive
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ProvisionError::command(&spec.program, None, format!("failed to start: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        for line in stdout.lines() {
            debug!("[{}] {}", spec.program, line);
        }
        for line in stderr.lines() {
            debug!("[{} stderr] {}", spec.program, line);
        }

        let exit_code = output.status.code();
        debug!("{} exited with {:?}", spec.program, exit_code);

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            success: output.status.success(),
        })
    }
}
