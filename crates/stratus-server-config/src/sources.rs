// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources. Environment variables (`STRATUS_SERVER_*`) are
//! the only override layer this core ships; callers embedding the crates
//! can construct [`crate::ServerConfigLayer`] values from anywhere else
//! and merge them ahead of the environment.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::{ServerConfigLayer, ENV_PREFIX};

fn read_var(suffix: &str) -> Option<String> {
	env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn parse_var<T: std::str::FromStr>(suffix: &str) -> Result<Option<T>, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match read_var(suffix) {
		None => Ok(None),
		Some(raw) => raw
			.parse::<T>()
			.map(Some)
			.map_err(|e| ConfigError::invalid(format!("{ENV_PREFIX}{suffix}"), e.to_string())),
	}
}

/// Build a configuration layer from the process environment.
pub fn env_layer() -> Result<ServerConfigLayer, ConfigError> {
	let mut layer = ServerConfigLayer::default();

	layer.database.url = read_var("DATABASE_URL");
	layer.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS")?;

	layer.provisioning.tool_bin = read_var("TOOL_BIN");
	layer.provisioning.templates_dir = read_var("TEMPLATES_DIR").map(PathBuf::from);
	layer.provisioning.workspaces_dir = read_var("WORKSPACES_DIR").map(PathBuf::from);
	layer.provisioning.command_timeout_secs = parse_var("COMMAND_TIMEOUT_SECS")?;

	layer.logging.filter = read_var("LOG_FILTER");
	layer.logging.json = parse_var("LOG_JSON")?;

	Ok(layer)
}
