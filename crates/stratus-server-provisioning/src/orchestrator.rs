// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provisioning protocol: workspace prepare, tool execute, output
//! parse, event finalize.
//!
//! [`Provisioner::apply`] and [`Provisioner::destroy`] are one attempt
//! each; no retries happen here. The caller serializes operations per
//! VM id. Both operations run under the [`OperationTracker`] with the
//! PROVISIONING intermediate status, so the audit trail reads
//! PENDING, PROVISIONING, then SUCCESS or FAILED.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use stratus_server_config::ProvisioningConfig;
use stratus_server_events::{
	EventStatus, EventStore, EventType, OperationTracker, ParamMap, ParamValue, TrackSpec,
};

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::executor::{ToolCommand, ToolRunner};
use crate::parser::{parse_apply, parse_destroy, ApplyReport, DestroyReport};
use crate::types::{Ack, InstanceFacts, Provider};
use crate::workspace::{Workspace, WorkspaceManager};

/// One apply attempt for a VM.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
	pub provider: Provider,
	pub vm_id: i64,
	pub user_id: i64,
	pub credential_id: Option<i64>,
	/// Template variables. Values under sensitive names are injected
	/// only as process environment, never written to the workspace.
	pub variables: BTreeMap<String, Value>,
}

/// One destroy attempt for a VM.
#[derive(Debug, Clone)]
pub struct DestroyRequest {
	pub vm_id: i64,
	pub user_id: i64,
	pub credential_id: Option<i64>,
}

pub struct Provisioner {
	workspaces: WorkspaceManager,
	runner: ToolRunner,
	tracker: OperationTracker,
}

impl Provisioner {
	pub fn new(config: &ProvisioningConfig, events: Arc<dyn EventStore>) -> Self {
		Self {
			workspaces: WorkspaceManager::new(config),
			runner: ToolRunner::new(config),
			tracker: OperationTracker::new(events),
		}
	}

	/// Provision a VM: prepare a fresh workspace, run `init` then
	/// `apply`, and parse the instance facts out of the tool output.
	#[tracing::instrument(skip(self, request, cancel), fields(vm_id = request.vm_id))]
	pub async fn apply(
		&self,
		request: ApplyRequest,
		cancel: &CancellationToken,
	) -> ProvisioningResult<InstanceFacts> {
		let name = WorkspaceManager::name_for_vm(request.vm_id);

		let params = ParamMap::new()
			.with("provider", request.provider.as_str())
			.with("workspace", name.clone())
			.with("user_id", request.user_id)
			.with("vm_id", request.vm_id)
			.with("credential_id", request.credential_id)
			.with("variables", ParamValue::from(variables_value(&request.variables)));

		let spec = TrackSpec::new(EventType::VmCreate)
			.with_intermediate_status(EventStatus::Provisioning);

		let report = self
			.tracker
			.track(spec, params, || {
				self.run_apply(request.provider, &name, &request.variables, cancel)
			})
			.await?;

		Ok(facts_from_report(&report))
	}

	/// Tear a VM down: run `destroy` in the workspace its apply left
	/// behind. Fails with `WorkspaceNotFound` before any event is
	/// created when no such workspace exists.
	#[tracing::instrument(skip(self, request, cancel), fields(vm_id = request.vm_id))]
	pub async fn destroy(
		&self,
		request: DestroyRequest,
		cancel: &CancellationToken,
	) -> ProvisioningResult<Ack> {
		let name = WorkspaceManager::name_for_vm(request.vm_id);
		let workspace = self.workspaces.locate_for_destroy(&name)?;

		let params = ParamMap::new()
			.with("workspace", name.clone())
			.with("user_id", request.user_id)
			.with("vm_id", request.vm_id)
			.with("credential_id", request.credential_id);

		let spec = TrackSpec::new(EventType::VmDelete)
			.with_intermediate_status(EventStatus::Provisioning);

		let report = self
			.tracker
			.track(spec, params, || self.run_destroy(&workspace, cancel))
			.await?;

		Ok(Ack {
			workspace: name,
			destroyed_resources: report.destroyed_resources,
		})
	}

	async fn run_apply(
		&self,
		provider: Provider,
		name: &str,
		variables: &BTreeMap<String, Value>,
		cancel: &CancellationToken,
	) -> ProvisioningResult<ApplyReport> {
		let (file_vars, env_overlay) = split_variables(variables);
		let workspace = self.workspaces.prepare_apply(provider, name, &file_vars)?;

		let init = self
			.runner
			.run(ToolCommand::Init, &workspace.dir, &env_overlay, cancel)
			.await?;
		if !init.success() {
			// Nonzero init is not fatal on its own; apply surfaces the
			// real failure if the workspace is actually unusable.
			tracing::warn!(
				workspace = name,
				exit_code = ?init.exit_code,
				"init exited nonzero"
			);
		}

		let output = self
			.runner
			.run(ToolCommand::Apply, &workspace.dir, &env_overlay, cancel)
			.await?;
		let report = parse_apply(provider, &output.stdout);
		if !output.success() {
			return Err(ProvisioningError::ProcessFailed {
				command: ToolCommand::Apply,
				stderr: output.stderr,
				report: serde_json::to_value(&report).ok(),
			});
		}

		tracing::info!(
			workspace = name,
			instance_id = ?report.instance_id,
			"apply completed"
		);
		Ok(report)
	}

	async fn run_destroy(
		&self,
		workspace: &Workspace,
		cancel: &CancellationToken,
	) -> ProvisioningResult<DestroyReport> {
		let output = self
			.runner
			.run(
				ToolCommand::Destroy,
				&workspace.dir,
				&BTreeMap::new(),
				cancel,
			)
			.await?;
		let report = parse_destroy(&output.stdout);
		if !output.success() {
			return Err(ProvisioningError::ProcessFailed {
				command: ToolCommand::Destroy,
				stderr: output.stderr,
				report: serde_json::to_value(&report).ok(),
			});
		}

		tracing::info!(
			workspace = workspace.name,
			destroyed = report.destroyed_resources.len(),
			"destroy completed"
		);
		Ok(report)
	}
}

/// Split variables into the tfvars document and the environment
/// overlay. Every variable is exported through the environment; values
/// under sensitive names go ONLY there and never reach the tfvars file
/// on disk.
fn split_variables(
	variables: &BTreeMap<String, Value>,
) -> (BTreeMap<String, Value>, BTreeMap<String, String>) {
	let mut file_vars = BTreeMap::new();
	let mut env_overlay = BTreeMap::new();
	for (name, value) in variables {
		env_overlay.insert(name.clone(), env_string(value));
		if !stratus_redact::is_sensitive_key(name) {
			file_vars.insert(name.clone(), value.clone());
		}
	}
	(file_vars, env_overlay)
}

fn env_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn variables_value(variables: &BTreeMap<String, Value>) -> Value {
	Value::Object(
		variables
			.iter()
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect(),
	)
}

fn facts_from_report(report: &ApplyReport) -> InstanceFacts {
	InstanceFacts {
		instance_id: report.instance_id.clone(),
		public_ip: report.public_ip.clone(),
		private_ip: report.private_ip.clone(),
		status: "running".to_string(),
	}
}
