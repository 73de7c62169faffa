// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Process layer for the external tools.

use std::io::{self, Write};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use sporenet_common::tools::ToolInvocation;

/// Spinner refresh interval.
const TICK_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{program} not found; run 'sporenet setup' to check your environment")]
    NotFound { program: String },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' failed ({status})")]
    Failed { command: String, status: ExitStatus },
}

/// Runs [`ToolInvocation`]s, blocking until each one exits.
pub struct Runner {
    verbose: bool,
}

impl Runner {
    /// With `verbose`, tool output always goes straight to the terminal.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn command(inv: &ToolInvocation) -> Command {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args);
        if let Some(dir) = &inv.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(inv: &ToolInvocation, e: io::Error) -> RunError {
        if e.kind() == io::ErrorKind::NotFound {
            RunError::NotFound {
                program: inv.program.clone(),
            }
        } else {
            RunError::Spawn {
                program: inv.program.clone(),
                source: e,
            }
        }
    }

    fn check(inv: &ToolInvocation, status: ExitStatus) -> Result<(), RunError> {
        if status.success() {
            Ok(())
        } else {
            Err(RunError::Failed {
                command: inv.to_string(),
                status,
            })
        }
    }

    /// Run with inherited stdio. Used for interactive tools (flash, monitor).
    pub fn run(&self, inv: &ToolInvocation) -> Result<(), RunError> {
        debug!(cwd = ?inv.cwd, "running {}", inv);
        let status = Self::command(inv)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Self::spawn_error(inv, e))?;
        info!(%status, "{} exited", inv.program);
        Self::check(inv, status)
    }

    /// Run behind a spinner, capturing output.
    ///
    /// The captured output is replayed on stderr only when the tool fails.
    /// In verbose mode this behaves like [`Runner::run`].
    pub fn run_step(&self, inv: &ToolInvocation, message: &str) -> Result<(), RunError> {
        if self.verbose {
            println!("{}...", message);
            return self.run(inv);
        }

        debug!(cwd = ?inv.cwd, "running {}", inv);
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(TICK_MS));

        let output = Self::command(inv)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                pb.abandon();
                Self::spawn_error(inv, e)
            })?;

        if output.status.success() {
            pb.finish_with_message(format!("{} ... OK", message));
        } else {
            pb.abandon_with_message(format!("{} ... FAILED", message));
            replay(&output);
        }
        info!(status = %output.status, "{} exited", inv.program);
        Self::check(inv, output.status)
    }
}

fn replay(output: &Output) {
    let mut stderr = io::stderr().lock();
    let _ = stderr.write_all(&output.stdout);
    let _ = stderr.write_all(&output.stderr);
    let _ = stderr.flush();
}
