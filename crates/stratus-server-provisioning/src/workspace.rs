// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-VM provisioning workspaces.
//!
//! A workspace is a directory named `vm-<id>` under the configured
//! workspaces root, holding a copy of the provider's templates, the
//! rendered variables file, and the tool's own state after an apply.
//! Apply rebuilds the directory from scratch; destroy requires the
//! directory left behind by the apply (the state file lives there).
//! Directories are retained after both phases for diagnosis; cleanup is
//! an explicit operator action via [`WorkspaceManager::remove`].

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use stratus_server_config::ProvisioningConfig;

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::types::Provider;

/// File the non-secret variables are rendered into, picked up by the
/// tool automatically from the working directory.
pub const VARIABLES_FILE: &str = "terraform.tfvars.json";

/// A prepared working directory bound to its logical name.
#[derive(Debug, Clone)]
pub struct Workspace {
	pub name: String,
	pub dir: PathBuf,
}

pub struct WorkspaceManager {
	templates_dir: PathBuf,
	workspaces_dir: PathBuf,
}

impl WorkspaceManager {
	pub fn new(config: &ProvisioningConfig) -> Self {
		Self {
			templates_dir: config.templates_dir.clone(),
			workspaces_dir: config.workspaces_dir.clone(),
		}
	}

	/// Logical workspace name for a VM. The same name is used by apply
	/// and destroy; it is the join key between the VM record and its
	/// provisioning directory.
	pub fn name_for_vm(vm_id: i64) -> String {
		format!("vm-{vm_id}")
	}

	/// Build a fresh workspace for an apply attempt: wipe any previous
	/// attempt's directory, copy the provider's template files in
	/// unmodified, and render `variables` as the tfvars JSON document.
	///
	/// Secret variables must not be in `variables`; they travel only as
	/// process environment entries.
	#[tracing::instrument(skip(self, variables))]
	pub fn prepare_apply(
		&self,
		provider: Provider,
		name: &str,
		variables: &BTreeMap<String, Value>,
	) -> ProvisioningResult<Workspace> {
		let template_dir = self.templates_dir.join(provider.as_str());
		if !template_dir.is_dir() {
			return Err(ProvisioningError::TemplateMissing { provider });
		}

		let dir = self.workspaces_dir.join(name);
		if dir.exists() {
			fs::remove_dir_all(&dir)?;
		}
		fs::create_dir_all(&dir)?;

		for entry in fs::read_dir(&template_dir)? {
			let entry = entry?;
			if entry.file_type()?.is_file() {
				fs::copy(entry.path(), dir.join(entry.file_name()))?;
			}
		}

		let rendered = serde_json::to_string_pretty(variables)?;
		fs::write(dir.join(VARIABLES_FILE), rendered)?;

		tracing::info!(workspace = name, dir = %dir.display(), "workspace prepared");
		Ok(Workspace {
			name: name.to_string(),
			dir,
		})
	}

	/// Resolve the workspace left behind by a previous apply. Destroy
	/// cannot run without it.
	pub fn locate_for_destroy(&self, name: &str) -> ProvisioningResult<Workspace> {
		let dir = self.workspaces_dir.join(name);
		if !dir.is_dir() {
			return Err(ProvisioningError::WorkspaceNotFound {
				name: name.to_string(),
			});
		}
		Ok(Workspace {
			name: name.to_string(),
			dir,
		})
	}

	/// Delete a workspace directory. Missing directories are fine.
	#[tracing::instrument(skip(self))]
	pub fn remove(&self, name: &str) -> ProvisioningResult<()> {
		let dir = self.workspaces_dir.join(name);
		if dir.exists() {
			fs::remove_dir_all(&dir)?;
			tracing::info!(workspace = name, "workspace removed");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tempfile::TempDir;

	fn manager(root: &TempDir) -> WorkspaceManager {
		let templates_dir = root.path().join("templates");
		fs::create_dir_all(templates_dir.join("aws")).unwrap();
		fs::write(templates_dir.join("aws").join("main.tf"), "# aws main").unwrap();
		fs::write(templates_dir.join("aws").join("outputs.tf"), "# aws outputs").unwrap();

		WorkspaceManager::new(&ProvisioningConfig {
			tool_bin: "terraform".to_string(),
			templates_dir,
			workspaces_dir: root.path().join("workspaces"),
			command_timeout_secs: 60,
		})
	}

	#[test]
	fn test_name_for_vm() {
		assert_eq!(WorkspaceManager::name_for_vm(17), "vm-17");
	}

	#[test]
	fn test_prepare_apply_copies_templates_and_writes_variables() {
		let root = TempDir::new().unwrap();
		let manager = manager(&root);

		let variables = BTreeMap::from([
			("instance_type".to_string(), json!("t3.micro")),
			("region".to_string(), json!("eu-west-1")),
		]);
		let workspace = manager
			.prepare_apply(Provider::Aws, "vm-1", &variables)
			.unwrap();

		assert_eq!(workspace.name, "vm-1");
		assert!(workspace.dir.join("main.tf").is_file());
		assert!(workspace.dir.join("outputs.tf").is_file());

		let rendered = fs::read_to_string(workspace.dir.join(VARIABLES_FILE)).unwrap();
		let parsed: Value = serde_json::from_str(&rendered).unwrap();
		assert_eq!(parsed["instance_type"], "t3.micro");
		assert_eq!(parsed["region"], "eu-west-1");
	}

	#[test]
	fn test_prepare_apply_rebuilds_directory_from_scratch() {
		let root = TempDir::new().unwrap();
		let manager = manager(&root);

		let first = manager
			.prepare_apply(Provider::Aws, "vm-1", &BTreeMap::new())
			.unwrap();
		fs::write(first.dir.join("terraform.tfstate"), "{}").unwrap();

		let second = manager
			.prepare_apply(Provider::Aws, "vm-1", &BTreeMap::new())
			.unwrap();
		assert_eq!(first.dir, second.dir);
		assert!(!second.dir.join("terraform.tfstate").exists());
		assert!(second.dir.join("main.tf").is_file());
	}

	#[test]
	fn test_prepare_apply_unknown_provider_templates() {
		let root = TempDir::new().unwrap();
		let manager = manager(&root);

		let result = manager.prepare_apply(Provider::Gcp, "vm-1", &BTreeMap::new());
		assert!(matches!(
			result,
			Err(ProvisioningError::TemplateMissing {
				provider: Provider::Gcp
			})
		));
	}

	#[test]
	fn test_locate_for_destroy_requires_prior_apply() {
		let root = TempDir::new().unwrap();
		let manager = manager(&root);

		let missing = manager.locate_for_destroy("vm-9");
		assert!(matches!(
			missing,
			Err(ProvisioningError::WorkspaceNotFound { name }) if name == "vm-9"
		));

		manager
			.prepare_apply(Provider::Aws, "vm-9", &BTreeMap::new())
			.unwrap();
		let found = manager.locate_for_destroy("vm-9").unwrap();
		assert!(found.dir.is_dir());
	}

	#[test]
	fn test_remove_is_idempotent() {
		let root = TempDir::new().unwrap();
		let manager = manager(&root);

		manager
			.prepare_apply(Provider::Aws, "vm-3", &BTreeMap::new())
			.unwrap();
		manager.remove("vm-3").unwrap();
		assert!(manager.locate_for_destroy("vm-3").is_err());

		// Second remove of the same name is a no-op.
		manager.remove("vm-3").unwrap();
	}
}
