// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the audit event store.
//!
//! One [`Event`] row exists per tracked operation attempt. The stored
//! string forms of [`EventType`] and [`EventStatus`] are a stable wire
//! contract; parsing an unknown string yields `None` rather than an error
//! so newer rows never break older readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kinds of operations recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	// VM lifecycle events
	VmCreate,
	VmStart,
	VmStop,
	VmDelete,
	VmStatusUpdate,

	// Credential events
	CredentialCreate,
	CredentialUpdate,
	CredentialDelete,
	CredentialValidate,
}

impl EventType {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventType::VmCreate => "vm_create",
			EventType::VmStart => "vm_start",
			EventType::VmStop => "vm_stop",
			EventType::VmDelete => "vm_delete",
			EventType::VmStatusUpdate => "vm_status_update",
			EventType::CredentialCreate => "credential_create",
			EventType::CredentialUpdate => "credential_update",
			EventType::CredentialDelete => "credential_delete",
			EventType::CredentialValidate => "credential_validate",
		}
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

pub fn parse_event_type(s: &str) -> Option<EventType> {
	match s {
		"vm_create" => Some(EventType::VmCreate),
		"vm_start" => Some(EventType::VmStart),
		"vm_stop" => Some(EventType::VmStop),
		"vm_delete" => Some(EventType::VmDelete),
		"vm_status_update" => Some(EventType::VmStatusUpdate),
		"credential_create" => Some(EventType::CredentialCreate),
		"credential_update" => Some(EventType::CredentialUpdate),
		"credential_delete" => Some(EventType::CredentialDelete),
		"credential_validate" => Some(EventType::CredentialValidate),
		_ => None,
	}
}

/// Lifecycle status of an audit event.
///
/// An event transitions `Pending` → (`Provisioning`) → exactly one of
/// `Success`/`Failed`, never in reverse. `Provisioning` is specific to
/// operations that execute the external infrastructure tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
	Pending,
	InProgress,
	Provisioning,
	Success,
	Failed,
}

impl EventStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventStatus::Pending => "pending",
			EventStatus::InProgress => "in_progress",
			EventStatus::Provisioning => "provisioning",
			EventStatus::Success => "success",
			EventStatus::Failed => "failed",
		}
	}

	/// True for `Success` and `Failed`, the only states an event may end in.
	pub fn is_terminal(&self) -> bool {
		matches!(self, EventStatus::Success | EventStatus::Failed)
	}
}

impl fmt::Display for EventStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

pub fn parse_event_status(s: &str) -> Option<EventStatus> {
	match s {
		"pending" => Some(EventStatus::Pending),
		"in_progress" => Some(EventStatus::InProgress),
		"provisioning" => Some(EventStatus::Provisioning),
		"success" => Some(EventStatus::Success),
		"failed" => Some(EventStatus::Failed),
		_ => None,
	}
}

/// One audit record: the lifecycle of one tracked operation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
	pub id: i64,
	pub event_type: EventType,
	pub status: EventStatus,
	pub timestamp: DateTime<Utc>,
	pub user_id: Option<i64>,
	pub vm_id: Option<i64>,
	pub credential_id: Option<i64>,
	/// Sanitized snapshot of operation inputs.
	pub parameters: Option<Value>,
	/// Sanitized operation output; set on success, or partially on
	/// failure when diagnostic output was parsed before the failure.
	pub result: Option<Value>,
	pub error_message: Option<String>,
	/// Wall-clock seconds from creation to finalization.
	pub duration: Option<f64>,
}

/// Fields for inserting a new event row.
#[derive(Debug, Clone)]
pub struct NewEvent {
	pub event_type: EventType,
	pub status: EventStatus,
	pub user_id: Option<i64>,
	pub vm_id: Option<i64>,
	pub credential_id: Option<i64>,
	/// Must already be JSON-safe (see [`crate::sanitize`]).
	pub parameters: Option<Value>,
}

impl NewEvent {
	pub fn new(event_type: EventType) -> Self {
		Self {
			event_type,
			status: EventStatus::Pending,
			user_id: None,
			vm_id: None,
			credential_id: None,
			parameters: None,
		}
	}
}

/// Partial update applied to an existing event; `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateEvent {
	pub status: Option<EventStatus>,
	pub result: Option<Value>,
	pub error_message: Option<String>,
	pub duration: Option<f64>,
}
