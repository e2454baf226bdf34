// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed event store.
//!
//! Every write is a single statement — no transaction spans the external
//! tool run, so a crash mid-provisioning leaves the row in its last
//! written status instead of corrupting it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{EventStoreError, EventStoreResult};
use crate::event::{
	parse_event_status, parse_event_type, Event, EventStatus, EventType, NewEvent, UpdateEvent,
};

/// Default page size for event listings.
pub const DEFAULT_LIST_LIMIT: i64 = 100;
/// Hard ceiling on a single page of events.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Narrow store seam used by the operation tracker; the full query
/// surface lives on [`EventRepository`] itself.
#[async_trait]
pub trait EventStore: Send + Sync {
	async fn create_event(&self, new: NewEvent) -> EventStoreResult<Event>;
	async fn update_event(&self, event_id: i64, update: UpdateEvent) -> EventStoreResult<Event>;
	async fn get_event(&self, event_id: i64) -> EventStoreResult<Option<Event>>;
}

/// Filters for event listings and counts. All fields are conjunctive;
/// the date range is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
	pub user_id: Option<i64>,
	pub vm_id: Option<i64>,
	pub credential_id: Option<i64>,
	pub event_type: Option<EventType>,
	pub status: Option<EventStatus>,
	pub start_date: Option<DateTime<Utc>>,
	pub end_date: Option<DateTime<Utc>>,
}

impl EventFilter {
	fn conditions(&self) -> String {
		let mut conditions = vec!["1=1".to_string()];
		if self.user_id.is_some() {
			conditions.push("user_id = ?".to_string());
		}
		if self.vm_id.is_some() {
			conditions.push("vm_id = ?".to_string());
		}
		if self.credential_id.is_some() {
			conditions.push("credential_id = ?".to_string());
		}
		if self.event_type.is_some() {
			conditions.push("event_type = ?".to_string());
		}
		if self.status.is_some() {
			conditions.push("status = ?".to_string());
		}
		if self.start_date.is_some() {
			conditions.push("timestamp >= ?".to_string());
		}
		if self.end_date.is_some() {
			conditions.push("timestamp <= ?".to_string());
		}
		conditions.join(" AND ")
	}

	fn bind<'q>(
		&self,
		mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
	) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
		if let Some(v) = self.user_id {
			query = query.bind(v);
		}
		if let Some(v) = self.vm_id {
			query = query.bind(v);
		}
		if let Some(v) = self.credential_id {
			query = query.bind(v);
		}
		if let Some(v) = self.event_type {
			query = query.bind(v.as_str());
		}
		if let Some(v) = self.status {
			query = query.bind(v.as_str());
		}
		if let Some(v) = self.start_date {
			query = query.bind(v.to_rfc3339());
		}
		if let Some(v) = self.end_date {
			query = query.bind(v.to_rfc3339());
		}
		query
	}
}

#[derive(Clone)]
pub struct EventRepository {
	pool: SqlitePool,
}

impl EventRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub(crate) fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	#[tracing::instrument(skip(self, new), fields(event_type = %new.event_type))]
	pub async fn create_event(&self, new: NewEvent) -> EventStoreResult<Event> {
		let timestamp = Utc::now();
		let parameters_json = new
			.parameters
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let inserted = sqlx::query(
			r#"
			INSERT INTO events (event_type, status, timestamp, user_id, vm_id, credential_id, parameters)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(new.event_type.as_str())
		.bind(new.status.as_str())
		.bind(timestamp.to_rfc3339())
		.bind(new.user_id)
		.bind(new.vm_id)
		.bind(new.credential_id)
		.bind(&parameters_json)
		.execute(&self.pool)
		.await?;

		let id = inserted.last_insert_rowid();
		tracing::debug!(event_id = id, status = %new.status, "event created");

		Ok(Event {
			id,
			event_type: new.event_type,
			status: new.status,
			timestamp,
			user_id: new.user_id,
			vm_id: new.vm_id,
			credential_id: new.credential_id,
			parameters: new.parameters,
			result: None,
			error_message: None,
			duration: None,
		})
	}

	#[tracing::instrument(skip(self, update))]
	pub async fn update_event(&self, event_id: i64, update: UpdateEvent) -> EventStoreResult<Event> {
		let mut assignments = Vec::new();
		if update.status.is_some() {
			assignments.push("status = ?");
		}
		if update.result.is_some() {
			assignments.push("result = ?");
		}
		if update.error_message.is_some() {
			assignments.push("error_message = ?");
		}
		if update.duration.is_some() {
			assignments.push("duration = ?");
		}

		if !assignments.is_empty() {
			let result_json = update
				.result
				.as_ref()
				.map(serde_json::to_string)
				.transpose()?;

			let sql = format!("UPDATE events SET {} WHERE id = ?", assignments.join(", "));
			let mut query = sqlx::query(&sql);
			if let Some(status) = update.status {
				query = query.bind(status.as_str());
			}
			if let Some(result_json) = &result_json {
				query = query.bind(result_json);
			}
			if let Some(error_message) = &update.error_message {
				query = query.bind(error_message);
			}
			if let Some(duration) = update.duration {
				query = query.bind(duration);
			}
			let outcome = query.bind(event_id).execute(&self.pool).await?;
			if outcome.rows_affected() == 0 {
				return Err(EventStoreError::NotFound(event_id));
			}
		}

		self.get_event(event_id)
			.await?
			.ok_or(EventStoreError::NotFound(event_id))
	}

	pub async fn get_event(&self, event_id: i64) -> EventStoreResult<Option<Event>> {
		let row = sqlx::query(
			"SELECT id, event_type, status, timestamp, user_id, vm_id, credential_id, \
			 parameters, result, error_message, duration FROM events WHERE id = ?",
		)
		.bind(event_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.as_ref().and_then(event_from_row))
	}

	/// List events matching `filter`, newest first.
	///
	/// `limit` is clamped to `1..=1000` (default 100); negative offsets
	/// are treated as 0.
	#[tracing::instrument(skip(self, filter))]
	pub async fn list_events(
		&self,
		filter: &EventFilter,
		limit: Option<i64>,
		offset: Option<i64>,
	) -> EventStoreResult<Vec<Event>> {
		let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
		let offset = offset.unwrap_or(0).max(0);

		let sql = format!(
			"SELECT id, event_type, status, timestamp, user_id, vm_id, credential_id, \
			 parameters, result, error_message, duration FROM events WHERE {} \
			 ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
			filter.conditions()
		);
		let query = filter.bind(sqlx::query(&sql)).bind(limit).bind(offset);

		let rows = query.fetch_all(&self.pool).await?;
		Ok(rows.iter().filter_map(event_from_row).collect())
	}

	pub async fn count_events(&self, filter: &EventFilter) -> EventStoreResult<i64> {
		let sql = format!(
			"SELECT COUNT(*) as cnt FROM events WHERE {}",
			filter.conditions()
		);
		let row = filter.bind(sqlx::query(&sql)).fetch_one(&self.pool).await?;
		Ok(row.get("cnt"))
	}
}

#[async_trait]
impl EventStore for EventRepository {
	async fn create_event(&self, new: NewEvent) -> EventStoreResult<Event> {
		EventRepository::create_event(self, new).await
	}

	async fn update_event(&self, event_id: i64, update: UpdateEvent) -> EventStoreResult<Event> {
		EventRepository::update_event(self, event_id, update).await
	}

	async fn get_event(&self, event_id: i64) -> EventStoreResult<Option<Event>> {
		EventRepository::get_event(self, event_id).await
	}
}

fn event_from_row(row: &SqliteRow) -> Option<Event> {
	let event_type_str: String = row.get("event_type");
	let event_type = parse_event_type(&event_type_str)?;

	let status_str: String = row.get("status");
	let status = parse_event_status(&status_str)?;

	let ts_str: String = row.get("timestamp");
	let timestamp = DateTime::parse_from_rfc3339(&ts_str)
		.map(|dt| dt.with_timezone(&Utc))
		.ok()?;

	let parameters: Option<String> = row.get("parameters");
	let result: Option<String> = row.get("result");

	Some(Event {
		id: row.get("id"),
		event_type,
		status,
		timestamp,
		user_id: row.get("user_id"),
		vm_id: row.get("vm_id"),
		credential_id: row.get("credential_id"),
		parameters: parameters.and_then(|s| serde_json::from_str(&s).ok()),
		result: result.and_then(|s| serde_json::from_str(&s).ok()),
		error_message: row.get("error_message"),
		duration: row.get("duration"),
	})
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
	use stratus_server_config::DatabaseConfig;

	let pool = stratus_server_db::create_pool(&DatabaseConfig {
		url: "sqlite::memory:".to_string(),
		max_connections: 1,
	})
	.await
	.expect("Failed to create test pool");
	stratus_server_db::init_schema(&pool)
		.await
		.expect("Failed to init schema");
	pool
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use serde_json::json;

	async fn repo() -> EventRepository {
		EventRepository::new(test_pool().await)
	}

	fn new_event(event_type: EventType, user_id: i64) -> NewEvent {
		NewEvent {
			user_id: Some(user_id),
			..NewEvent::new(event_type)
		}
	}

	#[tokio::test]
	async fn test_create_and_get_event() {
		let repo = repo().await;
		let created = repo
			.create_event(NewEvent {
				vm_id: Some(7),
				parameters: Some(json!({"command": "apply"})),
				..new_event(EventType::VmCreate, 1)
			})
			.await
			.unwrap();

		assert_eq!(created.status, EventStatus::Pending);
		assert!(created.id > 0);

		let fetched = repo.get_event(created.id).await.unwrap().unwrap();
		assert_eq!(fetched.event_type, EventType::VmCreate);
		assert_eq!(fetched.vm_id, Some(7));
		assert_eq!(fetched.parameters, Some(json!({"command": "apply"})));
		assert!(fetched.result.is_none());
		assert!(fetched.duration.is_none());
	}

	#[tokio::test]
	async fn test_update_event_partial_fields() {
		let repo = repo().await;
		let created = repo
			.create_event(new_event(EventType::VmStop, 1))
			.await
			.unwrap();

		let updated = repo
			.update_event(
				created.id,
				UpdateEvent {
					status: Some(EventStatus::Success),
					result: Some(json!({"stopped": true})),
					duration: Some(1.25),
					..Default::default()
				},
			)
			.await
			.unwrap();

		assert_eq!(updated.status, EventStatus::Success);
		assert_eq!(updated.result, Some(json!({"stopped": true})));
		assert_eq!(updated.duration, Some(1.25));
		// Untouched fields survive a partial update.
		assert_eq!(updated.user_id, Some(1));
		assert!(updated.error_message.is_none());
	}

	#[tokio::test]
	async fn test_update_missing_event_is_not_found() {
		let repo = repo().await;
		let err = repo
			.update_event(
				9999,
				UpdateEvent {
					status: Some(EventStatus::Failed),
					..Default::default()
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, EventStoreError::NotFound(9999)));
	}

	#[tokio::test]
	async fn test_empty_update_returns_current_row() {
		let repo = repo().await;
		let created = repo
			.create_event(new_event(EventType::VmStart, 2))
			.await
			.unwrap();
		let unchanged = repo
			.update_event(created.id, UpdateEvent::default())
			.await
			.unwrap();
		assert_eq!(unchanged.status, EventStatus::Pending);
	}

	#[tokio::test]
	async fn test_list_events_filters_and_order() {
		let repo = repo().await;
		repo.create_event(new_event(EventType::VmCreate, 1))
			.await
			.unwrap();
		repo.create_event(new_event(EventType::VmDelete, 1))
			.await
			.unwrap();
		repo.create_event(new_event(EventType::CredentialCreate, 2))
			.await
			.unwrap();

		let all = repo
			.list_events(&EventFilter::default(), None, None)
			.await
			.unwrap();
		assert_eq!(all.len(), 3);
		// Newest first: equal timestamps tie-break on id.
		assert!(all[0].id > all[2].id);

		let user1 = repo
			.list_events(
				&EventFilter {
					user_id: Some(1),
					..Default::default()
				},
				None,
				None,
			)
			.await
			.unwrap();
		assert_eq!(user1.len(), 2);

		let deletes = repo
			.list_events(
				&EventFilter {
					event_type: Some(EventType::VmDelete),
					..Default::default()
				},
				None,
				None,
			)
			.await
			.unwrap();
		assert_eq!(deletes.len(), 1);
		assert_eq!(deletes[0].event_type, EventType::VmDelete);
	}

	#[tokio::test]
	async fn test_list_events_date_range_inclusive() {
		let repo = repo().await;
		let created = repo
			.create_event(new_event(EventType::VmCreate, 1))
			.await
			.unwrap();

		let hits = repo
			.list_events(
				&EventFilter {
					start_date: Some(created.timestamp - Duration::seconds(1)),
					end_date: Some(created.timestamp + Duration::seconds(1)),
					..Default::default()
				},
				None,
				None,
			)
			.await
			.unwrap();
		assert_eq!(hits.len(), 1);

		let misses = repo
			.list_events(
				&EventFilter {
					end_date: Some(created.timestamp - Duration::hours(1)),
					..Default::default()
				},
				None,
				None,
			)
			.await
			.unwrap();
		assert!(misses.is_empty());
	}

	#[tokio::test]
	async fn test_pagination_and_limit_clamp() {
		let repo = repo().await;
		for _ in 0..5 {
			repo.create_event(new_event(EventType::VmStatusUpdate, 1))
				.await
				.unwrap();
		}

		let page = repo
			.list_events(&EventFilter::default(), Some(2), None)
			.await
			.unwrap();
		assert_eq!(page.len(), 2);

		let last = repo
			.list_events(&EventFilter::default(), Some(2), Some(4))
			.await
			.unwrap();
		assert_eq!(last.len(), 1);

		// Out-of-range limits are clamped, not rejected.
		let clamped = repo
			.list_events(&EventFilter::default(), Some(0), Some(-3))
			.await
			.unwrap();
		assert_eq!(clamped.len(), 1);

		let count = repo.count_events(&EventFilter::default()).await.unwrap();
		assert_eq!(count, 5);
	}

	#[tokio::test]
	async fn test_count_events_with_status_filter() {
		let repo = repo().await;
		let created = repo
			.create_event(new_event(EventType::VmCreate, 1))
			.await
			.unwrap();
		repo.update_event(
			created.id,
			UpdateEvent {
				status: Some(EventStatus::Failed),
				error_message: Some("boom".to_string()),
				..Default::default()
			},
		)
		.await
		.unwrap();
		repo.create_event(new_event(EventType::VmCreate, 1))
			.await
			.unwrap();

		let failed = repo
			.count_events(&EventFilter {
				status: Some(EventStatus::Failed),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(failed, 1);
	}
}
