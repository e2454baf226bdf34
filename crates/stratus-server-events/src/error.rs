// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type EventStoreResult<T> = Result<T, EventStoreError>;

#[derive(Debug, Error)]
pub enum EventStoreError {
	#[error("event not found: {0}")]
	NotFound(i64),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
