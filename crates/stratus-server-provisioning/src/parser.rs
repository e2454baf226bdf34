// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort extraction of facts from the tool's free-form stdout.
//!
//! Parsing is pattern matching over line-oriented text and never fails:
//! output the patterns don't recognize just yields a less complete
//! report. Output values are kept as opaque strings with no type
//! coercion.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::Provider;

static CREATION_COMPLETE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"([\w._-]+):\s+Creation complete").unwrap());

static DESTRUCTION_COMPLETE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"([\w._-]+):\s+Destruction complete").unwrap());

static OUTPUT_LINE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^([A-Za-z_][\w-]*)\s*=\s*(.+)$").unwrap());

static AWS_INSTANCE_ID: Lazy<Regex> =
	Lazy::new(|| Regex::new(r#"instance_id\s*=\s*"?(i-[0-9a-f]+)"#).unwrap());

static GCP_INSTANCE_ID: Lazy<Regex> =
	Lazy::new(|| Regex::new(r#"instance_id\s*=\s*"?([a-z][a-z0-9-]*)"#).unwrap());

static PUBLIC_IP: Lazy<Regex> =
	Lazy::new(|| Regex::new(r#"public_ip\s*=\s*"?(\d{1,3}(?:\.\d{1,3}){3})"#).unwrap());

static PRIVATE_IP: Lazy<Regex> =
	Lazy::new(|| Regex::new(r#"private_ip\s*=\s*"?(\d{1,3}(?:\.\d{1,3}){3})"#).unwrap());

/// Facts extracted from an apply run's stdout. Any field the output
/// didn't mention is empty or `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
	pub created_resources: Vec<String>,
	pub outputs: BTreeMap<String, String>,
	pub instance_id: Option<String>,
	pub public_ip: Option<String>,
	pub private_ip: Option<String>,
}

/// Facts extracted from a destroy run's stdout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DestroyReport {
	pub destroyed_resources: Vec<String>,
}

pub fn parse_apply(provider: Provider, stdout: &str) -> ApplyReport {
	let instance_id_pattern = match provider {
		Provider::Aws => &AWS_INSTANCE_ID,
		Provider::Gcp => &GCP_INSTANCE_ID,
	};

	ApplyReport {
		created_resources: CREATION_COMPLETE
			.captures_iter(stdout)
			.map(|c| c[1].to_string())
			.collect(),
		outputs: parse_outputs_block(stdout),
		instance_id: instance_id_pattern
			.captures(stdout)
			.map(|c| c[1].to_string()),
		public_ip: PUBLIC_IP.captures(stdout).map(|c| c[1].to_string()),
		private_ip: PRIVATE_IP.captures(stdout).map(|c| c[1].to_string()),
	}
}

pub fn parse_destroy(stdout: &str) -> DestroyReport {
	DestroyReport {
		destroyed_resources: DESTRUCTION_COMPLETE
			.captures_iter(stdout)
			.map(|c| c[1].to_string())
			.collect(),
	}
}

/// Key-value pairs from the `Outputs:` section. The block runs from the
/// `Outputs:` marker to the first blank line after at least one entry.
fn parse_outputs_block(stdout: &str) -> BTreeMap<String, String> {
	let mut outputs = BTreeMap::new();
	let mut in_block = false;
	for line in stdout.lines() {
		let trimmed = line.trim();
		if !in_block {
			in_block = trimmed == "Outputs:";
			continue;
		}
		if trimmed.is_empty() {
			if outputs.is_empty() {
				continue;
			}
			break;
		}
		if let Some(captures) = OUTPUT_LINE.captures(trimmed) {
			let value = captures[2].trim().trim_matches('"').to_string();
			outputs.insert(captures[1].to_string(), value);
		}
	}
	outputs
}
