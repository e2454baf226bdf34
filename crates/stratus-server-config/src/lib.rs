// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Stratus server.
//!
//! This crate provides:
//! - A fully resolved [`ServerConfig`] constructed once at process start
//!   and injected by reference into each component
//! - Layered partial configs ([`ServerConfigLayer`]) merged defaults-first
//! - Consistent environment variable naming (`STRATUS_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use stratus_server_config::load_config;
//!
//! let config = load_config()?;
//! init_tracing(&config.logging);
//! ```

pub mod error;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use sections::{
	DatabaseConfig, DatabaseConfigLayer, LoggingConfig, LoggingConfigLayer, ProvisioningConfig,
	ProvisioningConfigLayer,
};
pub use sources::env_layer;

use tracing::debug;

/// Prefix for all environment variable overrides.
pub const ENV_PREFIX: &str = "STRATUS_SERVER_";

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub provisioning: ProvisioningConfig,
	pub logging: LoggingConfig,
}

/// Partial configuration, one section layer per concern.
#[derive(Debug, Clone, Default)]
pub struct ServerConfigLayer {
	pub database: DatabaseConfigLayer,
	pub provisioning: ProvisioningConfigLayer,
	pub logging: LoggingConfigLayer,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		self.database.merge(other.database);
		self.provisioning.merge(other.provisioning);
		self.logging.merge(other.logging);
	}

	pub fn finalize(self) -> ServerConfig {
		ServerConfig {
			database: self.database.finalize(),
			provisioning: self.provisioning.finalize(),
			logging: self.logging.finalize(),
		}
	}
}

/// Load configuration: defaults overridden by the process environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let mut layer = ServerConfigLayer::default();
	layer.merge(env_layer()?);

	let config = layer.finalize();
	debug!(
		database_url = %config.database.url,
		tool_bin = %config.provisioning.tool_bin,
		"configuration loaded"
	);
	Ok(config)
}

/// Install the global tracing subscriber according to [`LoggingConfig`].
///
/// Intended for binaries embedding this workspace; library crates only
/// emit `tracing` events and never install subscribers.
pub fn init_tracing(logging: &LoggingConfig) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	if logging.json {
		builder.json().init();
	} else {
		builder.init();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_finalize() {
		let config = ServerConfigLayer::default().finalize();
		assert_eq!(config.database.url, "sqlite:./stratus.db");
		assert_eq!(config.provisioning.tool_bin, "terraform");
		assert_eq!(config.logging.filter, "info");
	}

	#[test]
	fn test_merge_precedence() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			database: DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
				max_connections: None,
			},
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.database.url, "sqlite::memory:");
		// Unset fields fall back to defaults.
		assert_eq!(config.database.max_connections, 5);
	}
}
