// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event store and operation tracking for Stratus.
//!
//! This crate provides the foundational types for the audit system:
//!
//! - [`EventType`] / [`EventStatus`]: the auditable operation kinds and
//!   their lifecycle states
//! - [`EventRepository`]: SQLite-backed store with filtered listings and
//!   aggregate statistics
//! - [`OperationTracker`]: wraps any unit of work with create/finalize
//!   bookkeeping and duration measurement
//! - [`sanitize`]: the uniform JSON-safety pass applied to parameter and
//!   result snapshots

pub mod error;
pub mod event;
pub mod repository;
pub mod sanitize;
pub mod stats;
pub mod tracker;

pub use error::{EventStoreError, EventStoreResult};
pub use event::{
	parse_event_status, parse_event_type, Event, EventStatus, EventType, NewEvent, UpdateEvent,
};
pub use repository::{
	EventFilter, EventRepository, EventStore, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use sanitize::{sanitize, ParamMap, ParamValue};
pub use stats::{DailyStat, StatsScope, StatusSummary};
pub use tracker::{
	extract_credential_id, extract_user_id, extract_vm_id, IdExtractor, OperationTracker,
	TrackSpec, TrackedFailure,
};
