//! Command Runner
//!
//! Seam between the engine and the external management tool. The production
//! runner spawns the tool; tests swap in a closure or a [`ScriptedRunner`].

use std::collections::VecDeque;
use std::process::Command;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Executes a tool command line and returns its standard output
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<String>;
}

impl<F> CommandRunner for F
where
    F: Fn(&str) -> Result<String>,
{
    fn run(&self, command: &str) -> Result<String> {
        self(command)
    }
}

// =============================================================================
// Shell Runner
// =============================================================================

/// Spawns the command as a child process
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    /// Replaces the program named in each command line
    program: Option<String>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command with `program` instead of the tool on `PATH`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<String> {
        let mut parts = command.split_whitespace();
        let named = parts.next().ok_or_else(|| Error::Execution {
            command: command.to_string(),
            reason: "empty command".to_string(),
            output: String::new(),
        })?;
        let program = self.program.as_deref().unwrap_or(named);

        debug!("Running: {}", command);

        let output = Command::new(program)
            .args(parts)
            .output()
            .map_err(|e| Error::Execution {
                command: command.to_string(),
                reason: format!("failed to launch: {}", e),
                output: String::new(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Execution {
                command: command.to_string(),
                reason: format!("exited with {}", output.status),
                output: format!("{}{}", stdout, stderr),
            });
        }

        debug!("Command '{}' returned {} bytes", command, stdout.len());
        Ok(stdout)
    }
}

// =============================================================================
// Scripted Runner
// =============================================================================

/// Replays canned outputs in call order, recording the commands it was given.
///
/// Once the script is exhausted every further call returns empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Create a runner that returns each output in turn
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(outputs.into_iter().map(|s| Ok(s.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure as the next response
    pub fn push_err(&self, err: Error) {
        self.script.lock().push_back(Err(err));
    }

    /// Queue an output as the next response
    pub fn push_output(&self, output: impl Into<String>) {
        self.script.lock().push_back(Ok(output.into()));
    }

    /// Commands received so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> Result<String> {
        self.calls.lock().push(command.to_string());
        self.script.lock().pop_front().unwrap_or_else(|| Ok(String::new()))
    }
}
