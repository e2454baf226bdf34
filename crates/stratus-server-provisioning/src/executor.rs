// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Child-process execution of the provisioning tool.
//!
//! One [`ToolRunner::run`] call is one tool invocation in a workspace
//! directory, with variables injected through `TF_VAR_`-prefixed
//! environment entries. A nonzero exit is returned, not raised: the
//! orchestrator decides per command whether it is fatal. Timeout and
//! cancellation both kill the child before the error propagates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use stratus_server_config::ProvisioningConfig;

use crate::error::{ProvisioningError, ProvisioningResult};

/// Prefix under which variables become tool-visible environment
/// entries. Secret variables travel only this way, never on disk.
pub const ENV_VAR_PREFIX: &str = "TF_VAR_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
	Init,
	Plan,
	Apply,
	Destroy,
}

impl ToolCommand {
	pub fn as_str(&self) -> &'static str {
		match self {
			ToolCommand::Init => "init",
			ToolCommand::Plan => "plan",
			ToolCommand::Apply => "apply",
			ToolCommand::Destroy => "destroy",
		}
	}

	/// Command-line arguments for this invocation. Mutating commands
	/// run unattended and carry the auto-approve flag.
	pub fn args(&self) -> &'static [&'static str] {
		match self {
			ToolCommand::Init => &["init"],
			ToolCommand::Plan => &["plan"],
			ToolCommand::Apply => &["apply", "-auto-approve"],
			ToolCommand::Destroy => &["destroy", "-auto-approve"],
		}
	}

	pub fn mutates(&self) -> bool {
		matches!(self, ToolCommand::Apply | ToolCommand::Destroy)
	}
}

impl fmt::Display for ToolCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Captured streams and exit status of one tool run.
#[derive(Debug, Clone)]
pub struct ExecOutput {
	/// `None` when the child was terminated by a signal.
	pub exit_code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl ExecOutput {
	pub fn success(&self) -> bool {
		self.exit_code == Some(0)
	}
}

pub struct ToolRunner {
	bin: String,
	timeout: Duration,
}

impl ToolRunner {
	pub fn new(config: &ProvisioningConfig) -> Self {
		Self {
			bin: config.tool_bin.clone(),
			timeout: Duration::from_secs(config.command_timeout_secs),
		}
	}

	/// Run one tool command in `working_dir` and wait for it to exit.
	///
	/// Returns the captured streams whatever the exit code. Fails with
	/// `Timeout` when the configured ceiling elapses and `Cancelled`
	/// when `cancel` fires first; in both cases the child is killed
	/// rather than left running.
	#[tracing::instrument(skip(self, env_overlay, cancel), fields(dir = %working_dir.display()))]
	pub async fn run(
		&self,
		command: ToolCommand,
		working_dir: &Path,
		env_overlay: &BTreeMap<String, String>,
		cancel: &CancellationToken,
	) -> ProvisioningResult<ExecOutput> {
		let mut cmd = Command::new(&self.bin);
		cmd.args(command.args())
			.current_dir(working_dir)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		for (name, value) in env_overlay {
			cmd.env(format!("{ENV_VAR_PREFIX}{name}"), value);
		}

		let child = cmd.spawn().map_err(|source| ProvisioningError::Spawn {
			bin: self.bin.clone(),
			source,
		})?;

		// Dropping the wait future on either branch below kills the
		// child via kill_on_drop.
		let output = tokio::select! {
			result = tokio::time::timeout(self.timeout, child.wait_with_output()) => {
				match result {
					Ok(Ok(output)) => output,
					Ok(Err(error)) => return Err(error.into()),
					Err(_) => {
						tracing::warn!(%command, secs = self.timeout.as_secs(), "tool run timed out");
						return Err(ProvisioningError::Timeout {
							command,
							secs: self.timeout.as_secs(),
						});
					}
				}
			}
			_ = cancel.cancelled() => {
				tracing::warn!(%command, "tool run cancelled");
				return Err(ProvisioningError::Cancelled { command });
			}
		};

		let exec = ExecOutput {
			exit_code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		};
		tracing::debug!(%command, exit_code = ?exec.exit_code, "tool run finished");
		Ok(exec)
	}
}
