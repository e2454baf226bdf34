// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Aggregate queries over the event store, consumed by the reporting
//! surface: per-type counts, success ratios, and duration averages.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::error::EventStoreResult;
use crate::event::{EventStatus, EventType};
use crate::repository::EventRepository;

/// Status breakdown with percentages; ratios are 0 when `total` is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
	pub total: i64,
	pub success: i64,
	pub failed: i64,
	pub pending: i64,
	pub in_progress: i64,
	pub success_ratio: f64,
	pub failed_ratio: f64,
}

/// Event count and outcome breakdown for one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStat {
	pub date: NaiveDate,
	pub count: i64,
	pub summary: StatusSummary,
}

/// Optional scoping shared by the aggregate queries.
#[derive(Debug, Clone, Default)]
pub struct StatsScope {
	pub user_id: Option<i64>,
	pub event_type: Option<EventType>,
	pub start_date: Option<DateTime<Utc>>,
	pub end_date: Option<DateTime<Utc>>,
}

impl StatsScope {
	fn conditions(&self) -> String {
		let mut conditions = vec!["1=1".to_string()];
		if self.user_id.is_some() {
			conditions.push("user_id = ?".to_string());
		}
		if self.event_type.is_some() {
			conditions.push("event_type = ?".to_string());
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
		if let Some(v) = self.event_type {
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

impl EventRepository {
	/// Event counts grouped by event type.
	#[tracing::instrument(skip(self, scope))]
	pub async fn counts_by_type(
		&self,
		scope: &StatsScope,
	) -> EventStoreResult<BTreeMap<String, i64>> {
		let sql = format!(
			"SELECT event_type, COUNT(*) as cnt FROM events WHERE {} GROUP BY event_type",
			scope.conditions()
		);
		let rows = scope.bind(sqlx::query(&sql)).fetch_all(self.pool()).await?;
		Ok(rows
			.into_iter()
			.map(|row| (row.get("event_type"), row.get("cnt")))
			.collect())
	}

	/// Success/failure breakdown of events in scope.
	#[tracing::instrument(skip(self, scope))]
	pub async fn status_summary(&self, scope: &StatsScope) -> EventStoreResult<StatusSummary> {
		let sql = format!(
			"SELECT status, COUNT(*) as cnt FROM events WHERE {} GROUP BY status",
			scope.conditions()
		);
		let rows = scope.bind(sqlx::query(&sql)).fetch_all(self.pool()).await?;

		let counts: BTreeMap<String, i64> = rows
			.into_iter()
			.map(|row| (row.get("status"), row.get("cnt")))
			.collect();
		let total: i64 = counts.values().sum();

		let count_for =
			|status: EventStatus| counts.get(status.as_str()).copied().unwrap_or(0);
		let success = count_for(EventStatus::Success);
		let failed = count_for(EventStatus::Failed);

		let ratio = |count: i64| {
			if total > 0 {
				count as f64 / total as f64 * 100.0
			} else {
				0.0
			}
		};

		Ok(StatusSummary {
			total,
			success,
			failed,
			pending: count_for(EventStatus::Pending),
			in_progress: count_for(EventStatus::InProgress),
			success_ratio: ratio(success),
			failed_ratio: ratio(failed),
		})
	}

	/// Average duration per event type, over successful events with a
	/// recorded duration.
	#[tracing::instrument(skip(self, scope))]
	pub async fn average_durations(
		&self,
		scope: &StatsScope,
	) -> EventStoreResult<BTreeMap<String, f64>> {
		let sql = format!(
			"SELECT event_type, AVG(duration) as avg_duration FROM events \
			 WHERE {} AND status = ? AND duration IS NOT NULL GROUP BY event_type",
			scope.conditions()
		);
		let rows = scope
			.bind(sqlx::query(&sql))
			.bind(EventStatus::Success.as_str())
			.fetch_all(self.pool())
			.await?;
		Ok(rows
			.into_iter()
			.map(|row| (row.get("event_type"), row.get("avg_duration")))
			.collect())
	}

	/// Average duration for one event type; 0.0 when no rows qualify.
	#[tracing::instrument(skip(self, scope))]
	pub async fn average_duration_for(
		&self,
		event_type: EventType,
		scope: &StatsScope,
	) -> EventStoreResult<f64> {
		let sql = format!(
			"SELECT AVG(duration) as avg_duration FROM events \
			 WHERE {} AND event_type = ? AND status = ? AND duration IS NOT NULL",
			scope.conditions()
		);
		let row = scope
			.bind(sqlx::query(&sql))
			.bind(event_type.as_str())
			.bind(EventStatus::Success.as_str())
			.fetch_one(self.pool())
			.await?;
		let avg: Option<f64> = row.get("avg_duration");
		Ok(avg.unwrap_or(0.0))
	}

	/// Per-day counts and status breakdowns over an inclusive date range.
	#[tracing::instrument(skip(self, scope))]
	pub async fn daily_stats(
		&self,
		start: NaiveDate,
		end: NaiveDate,
		scope: &StatsScope,
	) -> EventStoreResult<Vec<DailyStat>> {
		let mut stats = Vec::new();
		let mut date = start;
		while date <= end {
			let day_start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
			let day_end = day_start.map(|dt| dt + Duration::days(1) - Duration::nanoseconds(1));

			let day_scope = StatsScope {
				user_id: scope.user_id,
				event_type: scope.event_type,
				start_date: day_start,
				end_date: day_end,
			};
			let summary = self.status_summary(&day_scope).await?;

			stats.push(DailyStat {
				date,
				count: summary.total,
				summary,
			});
			date += Duration::days(1);
		}
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{NewEvent, UpdateEvent};
	use crate::repository::test_pool;

	async fn seeded_repo() -> EventRepository {
		let repo = EventRepository::new(test_pool().await);

		// Two successful creates with durations, one failed create, one
		// pending delete, for two different users.
		for (user_id, duration) in [(1, 10.0), (1, 20.0)] {
			let event = repo
				.create_event(NewEvent {
					user_id: Some(user_id),
					..NewEvent::new(EventType::VmCreate)
				})
				.await
				.unwrap();
			repo.update_event(
				event.id,
				UpdateEvent {
					status: Some(EventStatus::Success),
					duration: Some(duration),
					..Default::default()
				},
			)
			.await
			.unwrap();
		}

		let failed = repo
			.create_event(NewEvent {
				user_id: Some(2),
				..NewEvent::new(EventType::VmCreate)
			})
			.await
			.unwrap();
		repo.update_event(
			failed.id,
			UpdateEvent {
				status: Some(EventStatus::Failed),
				error_message: Some("tool exited 1".to_string()),
				duration: Some(5.0),
				..Default::default()
			},
		)
		.await
		.unwrap();

		repo.create_event(NewEvent {
			user_id: Some(1),
			..NewEvent::new(EventType::VmDelete)
		})
		.await
		.unwrap();

		repo
	}

	#[tokio::test]
	async fn test_counts_by_type() {
		let repo = seeded_repo().await;
		let counts = repo.counts_by_type(&StatsScope::default()).await.unwrap();
		assert_eq!(counts.get("vm_create"), Some(&3));
		assert_eq!(counts.get("vm_delete"), Some(&1));
	}

	#[tokio::test]
	async fn test_counts_by_type_scoped_to_user() {
		let repo = seeded_repo().await;
		let counts = repo
			.counts_by_type(&StatsScope {
				user_id: Some(2),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(counts.get("vm_create"), Some(&1));
		assert_eq!(counts.get("vm_delete"), None);
	}

	#[tokio::test]
	async fn test_status_summary_ratios() {
		let repo = seeded_repo().await;
		let summary = repo.status_summary(&StatsScope::default()).await.unwrap();
		assert_eq!(summary.total, 4);
		assert_eq!(summary.success, 2);
		assert_eq!(summary.failed, 1);
		assert_eq!(summary.pending, 1);
		assert_eq!(summary.in_progress, 0);
		assert!((summary.success_ratio - 50.0).abs() < f64::EPSILON);
		assert!((summary.failed_ratio - 25.0).abs() < f64::EPSILON);
	}

	#[tokio::test]
	async fn test_status_summary_empty_scope_is_zero() {
		let repo = EventRepository::new(test_pool().await);
		let summary = repo.status_summary(&StatsScope::default()).await.unwrap();
		assert_eq!(summary.total, 0);
		assert_eq!(summary.success_ratio, 0.0);
		assert_eq!(summary.failed_ratio, 0.0);
	}

	#[tokio::test]
	async fn test_average_durations_only_successful_rows() {
		let repo = seeded_repo().await;
		let averages = repo
			.average_durations(&StatsScope::default())
			.await
			.unwrap();
		// The failed create's 5.0s must not drag the average down.
		assert_eq!(averages.get("vm_create"), Some(&15.0));
		assert_eq!(averages.get("vm_delete"), None);
	}

	#[tokio::test]
	async fn test_average_duration_for_single_type() {
		let repo = seeded_repo().await;
		let avg = repo
			.average_duration_for(EventType::VmCreate, &StatsScope::default())
			.await
			.unwrap();
		assert_eq!(avg, 15.0);

		let none = repo
			.average_duration_for(EventType::VmStop, &StatsScope::default())
			.await
			.unwrap();
		assert_eq!(none, 0.0);
	}

	#[tokio::test]
	async fn test_daily_stats_covers_range() {
		let repo = seeded_repo().await;
		let today = Utc::now().date_naive();
		let yesterday = today - Duration::days(1);

		let stats = repo
			.daily_stats(yesterday, today, &StatsScope::default())
			.await
			.unwrap();
		assert_eq!(stats.len(), 2);
		assert_eq!(stats[0].date, yesterday);
		assert_eq!(stats[0].count, 0);
		assert_eq!(stats[1].date, today);
		assert_eq!(stats[1].count, 4);
		assert_eq!(stats[1].summary.success, 2);
	}
}
