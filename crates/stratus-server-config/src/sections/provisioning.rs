// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning tool configuration: binary location, template and
//! workspace directories, and the execution timeout ceiling.

use std::path::PathBuf;

use serde::Deserialize;

/// Provisioning configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
	/// Infrastructure tool binary to invoke.
	pub tool_bin: String,
	/// Directory holding one template subdirectory per provider.
	pub templates_dir: PathBuf,
	/// Directory under which per-VM workspaces are created.
	pub workspaces_dir: PathBuf,
	/// Hard ceiling on a single tool invocation, in seconds.
	pub command_timeout_secs: u64,
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		Self {
			tool_bin: "terraform".to_string(),
			templates_dir: PathBuf::from("./terraform/templates"),
			workspaces_dir: PathBuf::from("./terraform/workspaces"),
			command_timeout_secs: 900,
		}
	}
}

/// Provisioning configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfigLayer {
	#[serde(default)]
	pub tool_bin: Option<String>,
	#[serde(default)]
	pub templates_dir: Option<PathBuf>,
	#[serde(default)]
	pub workspaces_dir: Option<PathBuf>,
	#[serde(default)]
	pub command_timeout_secs: Option<u64>,
}

impl ProvisioningConfigLayer {
	pub fn merge(&mut self, other: ProvisioningConfigLayer) {
		if other.tool_bin.is_some() {
			self.tool_bin = other.tool_bin;
		}
		if other.templates_dir.is_some() {
			self.templates_dir = other.templates_dir;
		}
		if other.workspaces_dir.is_some() {
			self.workspaces_dir = other.workspaces_dir;
		}
		if other.command_timeout_secs.is_some() {
			self.command_timeout_secs = other.command_timeout_secs;
		}
	}

	pub fn finalize(self) -> ProvisioningConfig {
		let defaults = ProvisioningConfig::default();
		ProvisioningConfig {
			tool_bin: self.tool_bin.unwrap_or(defaults.tool_bin),
			templates_dir: self.templates_dir.unwrap_or(defaults.templates_dir),
			workspaces_dir: self.workspaces_dir.unwrap_or(defaults.workspaces_dir),
			command_timeout_secs: self
				.command_timeout_secs
				.unwrap_or(defaults.command_timeout_secs),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ProvisioningConfigLayer::default().finalize();
		assert_eq!(config.tool_bin, "terraform");
		assert_eq!(config.command_timeout_secs, 900);
	}

	#[test]
	fn test_merge_prefers_later_layer() {
		let mut base = ProvisioningConfigLayer::default();
		base.merge(ProvisioningConfigLayer {
			tool_bin: Some("tofu".to_string()),
			command_timeout_secs: Some(120),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.tool_bin, "tofu");
		assert_eq!(config.command_timeout_secs, 120);
		assert_eq!(config.templates_dir, PathBuf::from("./terraform/templates"));
	}
}
