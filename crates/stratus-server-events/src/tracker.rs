// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operation tracking: wraps a unit of work with audit bookkeeping.
//!
//! [`OperationTracker::track`] creates a PENDING event, runs the
//! operation, and finalizes the event as SUCCESS or FAILED with the
//! measured wall-clock duration. The tracker never changes the
//! operation's outcome: errors propagate to the caller unchanged, and a
//! failed audit write is logged rather than surfaced. Tool-executing
//! operations opt into an intermediate PROVISIONING transition via
//! [`TrackSpec::with_intermediate_status`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::event::{EventStatus, EventType, NewEvent, UpdateEvent};
use crate::repository::EventStore;
use crate::sanitize::ParamMap;

/// Failure side of a tracked operation.
///
/// `audit_message` lands in the event's `error_message`; `audit_result`
/// lets an error carry partially parsed diagnostic output into the
/// event's `result` column without the tracker knowing its shape.
pub trait TrackedFailure: std::fmt::Display {
	fn audit_message(&self) -> String {
		self.to_string()
	}

	fn audit_result(&self) -> Option<Value> {
		None
	}
}

/// Reads an association id out of the parameter snapshot.
pub type IdExtractor = fn(&ParamMap) -> Option<i64>;

/// Conventional extractor for the `user_id` parameter.
pub fn extract_user_id(params: &ParamMap) -> Option<i64> {
	params.get("user_id").and_then(|v| v.as_i64())
}

/// Conventional extractor for the `vm_id` parameter.
pub fn extract_vm_id(params: &ParamMap) -> Option<i64> {
	params.get("vm_id").and_then(|v| v.as_i64())
}

/// Conventional extractor for the `credential_id` parameter.
pub fn extract_credential_id(params: &ParamMap) -> Option<i64> {
	params.get("credential_id").and_then(|v| v.as_i64())
}

/// How one operation kind is audited.
#[derive(Debug, Clone)]
pub struct TrackSpec {
	pub event_type: EventType,
	pub initial_status: EventStatus,
	/// Written immediately after creation, before the operation runs.
	pub intermediate_status: Option<EventStatus>,
	pub success_status: EventStatus,
	pub failure_status: EventStatus,
	/// Parameter names dropped before the snapshot is stored. Excluded
	/// fields never reach the database at all.
	pub excluded_params: &'static [&'static str],
	pub extract_user_id: Option<IdExtractor>,
	pub extract_vm_id: Option<IdExtractor>,
	pub extract_credential_id: Option<IdExtractor>,
}

impl TrackSpec {
	pub fn new(event_type: EventType) -> Self {
		Self {
			event_type,
			initial_status: EventStatus::Pending,
			intermediate_status: None,
			success_status: EventStatus::Success,
			failure_status: EventStatus::Failed,
			excluded_params: &[],
			extract_user_id: Some(extract_user_id),
			extract_vm_id: Some(extract_vm_id),
			extract_credential_id: Some(extract_credential_id),
		}
	}

	pub fn with_intermediate_status(mut self, status: EventStatus) -> Self {
		self.intermediate_status = Some(status);
		self
	}

	pub fn excluding(mut self, params: &'static [&'static str]) -> Self {
		self.excluded_params = params;
		self
	}
}

/// Wraps operations with event-store bookkeeping.
#[derive(Clone)]
pub struct OperationTracker {
	events: Arc<dyn EventStore>,
}

impl OperationTracker {
	pub fn new(events: Arc<dyn EventStore>) -> Self {
		Self { events }
	}

	/// Run `op` under audit tracking.
	///
	/// The operation's result is returned unchanged whether or not any
	/// audit write succeeds. If even the initial insert fails, the
	/// operation still runs — untracked, with the failure logged.
	pub async fn track<T, E, F, Fut>(&self, spec: TrackSpec, params: ParamMap, op: F) -> Result<T, E>
	where
		T: Serialize,
		E: TrackedFailure,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let user_id = spec.extract_user_id.and_then(|f| f(&params));
		let vm_id = spec.extract_vm_id.and_then(|f| f(&params));
		let credential_id = spec.extract_credential_id.and_then(|f| f(&params));

		let stored_params = stratus_redact::mask(
			&params.without(spec.excluded_params).into_value(),
		);

		let event_id = match self
			.events
			.create_event(NewEvent {
				event_type: spec.event_type,
				status: spec.initial_status,
				user_id,
				vm_id,
				credential_id,
				parameters: Some(stored_params),
			})
			.await
		{
			Ok(event) => Some(event.id),
			Err(error) => {
				tracing::error!(
					event_type = %spec.event_type,
					%error,
					"failed to create audit event; operation will run untracked"
				);
				None
			}
		};

		if let (Some(id), Some(status)) = (event_id, spec.intermediate_status) {
			self.finalize(
				id,
				UpdateEvent {
					status: Some(status),
					..Default::default()
				},
			)
			.await;
		}

		let started = Instant::now();
		let outcome = op().await;
		let duration = started.elapsed().as_secs_f64();

		if let Some(id) = event_id {
			match &outcome {
				Ok(value) => {
					let result = match serde_json::to_value(value) {
						Ok(json) => stratus_redact::mask(&json),
						Err(error) => {
							tracing::warn!(event_id = id, %error, "operation result not serializable");
							Value::Null
						}
					};
					self.finalize(
						id,
						UpdateEvent {
							status: Some(spec.success_status),
							result: Some(result),
							duration: Some(duration),
							..Default::default()
						},
					)
					.await;
				}
				Err(error) => {
					self.finalize(
						id,
						UpdateEvent {
							status: Some(spec.failure_status),
							result: error.audit_result().map(|v| stratus_redact::mask(&v)),
							error_message: Some(error.audit_message()),
							duration: Some(duration),
							..Default::default()
						},
					)
					.await;
				}
			}
		}

		outcome
	}

	/// Write a finalization update; audit write failures must never mask
	/// the operation's own outcome, so they are only logged here.
	async fn finalize(&self, event_id: i64, update: UpdateEvent) {
		if let Err(error) = self.events.update_event(event_id, update).await {
			tracing::error!(event_id, %error, "failed to update audit event");
		}
	}
}
