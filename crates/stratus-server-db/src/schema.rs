// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema bootstrap for the audit event store.
//!
//! Stratus records one row per tracked operation attempt in `events`.
//! Writes are single atomic statements; a crash mid-provisioning leaves
//! the row in its last written status (a stuck `provisioning` row is
//! swept by an out-of-band reconciliation job, not by this layer).

use sqlx::SqlitePool;

use crate::error::DbError;

const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	event_type TEXT NOT NULL,
	status TEXT NOT NULL,
	timestamp TEXT NOT NULL,
	user_id INTEGER,
	vm_id INTEGER,
	credential_id INTEGER,
	parameters TEXT,
	result TEXT,
	error_message TEXT,
	duration REAL
)
"#;

const CREATE_EVENTS_INDEXES: &[&str] = &[
	"CREATE INDEX IF NOT EXISTS idx_events_event_type ON events (event_type)",
	"CREATE INDEX IF NOT EXISTS idx_events_status ON events (status)",
	"CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events (timestamp)",
	"CREATE INDEX IF NOT EXISTS idx_events_user_id ON events (user_id)",
	"CREATE INDEX IF NOT EXISTS idx_events_vm_id ON events (vm_id)",
	"CREATE INDEX IF NOT EXISTS idx_events_credential_id ON events (credential_id)",
];

/// Create the events table and its indexes if they do not exist.
#[tracing::instrument(skip(pool))]
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(CREATE_EVENTS_TABLE).execute(pool).await?;
	for statement in CREATE_EVENTS_INDEXES {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("events schema initialized");
	Ok(())
}
