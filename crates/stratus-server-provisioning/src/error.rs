// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;

use stratus_server_events::TrackedFailure;

use crate::executor::ToolCommand;
use crate::types::Provider;

/// Errors from the provisioning pipeline. Every variant surfaces to the
/// caller as a provisioning failure; tool-run variants additionally
/// finalize the audit event as FAILED before propagating.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
	#[error("no template directory for provider '{provider}'")]
	TemplateMissing { provider: Provider },

	#[error("workspace '{name}' not found")]
	WorkspaceNotFound { name: String },

	#[error("failed to spawn '{bin}': {source}")]
	Spawn {
		bin: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{command} exceeded the {secs}s timeout and was killed")]
	Timeout { command: ToolCommand, secs: u64 },

	#[error("{command} was cancelled and the child process killed")]
	Cancelled { command: ToolCommand },

	#[error("{command} failed: {stderr}")]
	ProcessFailed {
		command: ToolCommand,
		stderr: String,
		/// Facts parsed out of stdout before the failure was judged,
		/// kept for operator diagnosis.
		report: Option<Value>,
	},

	#[error("variables are not JSON-serializable: {0}")]
	InvalidVariables(#[from] serde_json::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl TrackedFailure for ProvisioningError {
	fn audit_result(&self) -> Option<Value> {
		match self {
			ProvisioningError::ProcessFailed { report, .. } => report.clone(),
			_ => None,
		}
	}
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
