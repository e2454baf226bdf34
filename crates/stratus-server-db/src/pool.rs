// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;

use stratus_server_config::DatabaseConfig;

use crate::error::DbError;

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(config))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(&config.url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(config.max_connections)
		.connect_with(options)
		.await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
