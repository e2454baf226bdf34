// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cloud provider a VM is provisioned on. Selects which template
/// directory is copied and which instance-id shape the parser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
	Aws,
	Gcp,
}

impl Provider {
	pub fn as_str(&self) -> &'static str {
		match self {
			Provider::Aws => "aws",
			Provider::Gcp => "gcp",
		}
	}
}

impl fmt::Display for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Parsed result of a successful apply, handed back to the VM lifecycle
/// layer. `status` carries the provider-reported vocabulary; callers
/// normalize it to the VM record's status set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFacts {
	pub instance_id: Option<String>,
	pub public_ip: Option<String>,
	pub private_ip: Option<String>,
	pub status: String,
}

/// Acknowledgement of a completed destroy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
	pub workspace: String,
	pub destroyed_resources: Vec<String>,
}
