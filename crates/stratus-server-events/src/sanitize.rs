// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON-safety pass for parameter and result snapshots.
//!
//! Every value persisted into an event's `parameters` or `result` column
//! goes through [`sanitize`]: timestamps become ISO-8601 strings, enum-like
//! inputs their stable string value, sequences and maps recurse. The input
//! side is the closed [`ParamValue`] union — conversion rules are decided
//! by `From` impls at the call site, not by runtime type probing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::event::{EventStatus, EventType};

/// Closed value model accepted by the sanitation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Timestamp(DateTime<Utc>),
	Seq(Vec<ParamValue>),
	Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			ParamValue::Int(n) => Some(*n),
			_ => None,
		}
	}
}

impl From<bool> for ParamValue {
	fn from(v: bool) -> Self {
		ParamValue::Bool(v)
	}
}

impl From<i64> for ParamValue {
	fn from(v: i64) -> Self {
		ParamValue::Int(v)
	}
}

impl From<i32> for ParamValue {
	fn from(v: i32) -> Self {
		ParamValue::Int(i64::from(v))
	}
}

impl From<u32> for ParamValue {
	fn from(v: u32) -> Self {
		ParamValue::Int(i64::from(v))
	}
}

impl From<f64> for ParamValue {
	fn from(v: f64) -> Self {
		ParamValue::Float(v)
	}
}

impl From<&str> for ParamValue {
	fn from(v: &str) -> Self {
		ParamValue::String(v.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(v: String) -> Self {
		ParamValue::String(v)
	}
}

impl From<DateTime<Utc>> for ParamValue {
	fn from(v: DateTime<Utc>) -> Self {
		ParamValue::Timestamp(v)
	}
}

impl From<EventType> for ParamValue {
	fn from(v: EventType) -> Self {
		ParamValue::String(v.as_str().to_string())
	}
}

impl From<EventStatus> for ParamValue {
	fn from(v: EventStatus) -> Self {
		ParamValue::String(v.as_str().to_string())
	}
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
	fn from(v: Vec<T>) -> Self {
		ParamValue::Seq(v.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
	fn from(v: Option<T>) -> Self {
		match v {
			Some(inner) => inner.into(),
			None => ParamValue::Null,
		}
	}
}

impl From<Value> for ParamValue {
	fn from(v: Value) -> Self {
		match v {
			Value::Null => ParamValue::Null,
			Value::Bool(b) => ParamValue::Bool(b),
			Value::Number(n) => {
				if let Some(i) = n.as_i64() {
					ParamValue::Int(i)
				} else {
					ParamValue::Float(n.as_f64().unwrap_or(0.0))
				}
			}
			Value::String(s) => ParamValue::String(s),
			Value::Array(items) => ParamValue::Seq(items.into_iter().map(Into::into).collect()),
			Value::Object(map) => ParamValue::Map(
				map.into_iter()
					.map(|(key, value)| (key, value.into()))
					.collect(),
			),
		}
	}
}

/// Convert a [`ParamValue`] into plain JSON.
///
/// Timestamps become RFC 3339 strings; non-finite floats have no JSON
/// representation and fall back to their display form.
pub fn sanitize(value: ParamValue) -> Value {
	match value {
		ParamValue::Null => Value::Null,
		ParamValue::Bool(b) => Value::Bool(b),
		ParamValue::Int(n) => Value::Number(n.into()),
		ParamValue::Float(f) => match Number::from_f64(f) {
			Some(n) => Value::Number(n),
			None => Value::String(f.to_string()),
		},
		ParamValue::String(s) => Value::String(s),
		ParamValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
		ParamValue::Seq(items) => Value::Array(items.into_iter().map(sanitize).collect()),
		ParamValue::Map(entries) => Value::Object(
			entries
				.into_iter()
				.map(|(key, value)| (key, sanitize(value)))
				.collect::<Map<String, Value>>(),
		),
	}
}

/// Named-argument snapshot captured for an operation, in insertion-stable
/// (sorted) key order.
#[derive(Debug, Clone, Default)]
pub struct ParamMap(BTreeMap<String, ParamValue>);

impl ParamMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		self.0.insert(key.into(), value.into());
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
		self.0.insert(key.into(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&ParamValue> {
		self.0.get(key)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Copy of this map with the named parameters dropped entirely.
	pub fn without(&self, excluded: &[&str]) -> ParamMap {
		ParamMap(
			self.0
				.iter()
				.filter(|(key, _)| !excluded.contains(&key.as_str()))
				.map(|(key, value)| (key.clone(), value.clone()))
				.collect(),
		)
	}

	pub fn into_value(self) -> Value {
		sanitize(ParamValue::Map(self.0))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use serde_json::json;

	#[test]
	fn test_timestamps_become_iso_strings() {
		let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
		assert_eq!(
			sanitize(ParamValue::from(ts)),
			json!("2025-03-14T09:26:53+00:00")
		);
	}

	#[test]
	fn test_enums_become_string_values() {
		assert_eq!(sanitize(EventType::VmCreate.into()), json!("vm_create"));
		assert_eq!(sanitize(EventStatus::Failed.into()), json!("failed"));
	}

	#[test]
	fn test_sequences_and_maps_recurse() {
		let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
		let map = ParamMap::new()
			.with("ids", vec![1i64, 2, 3])
			.with("created", ts)
			.with("nested", ParamValue::Map(BTreeMap::from([(
				"flag".to_string(),
				ParamValue::Bool(true),
			)])));
		assert_eq!(
			map.into_value(),
			json!({
				"created": "2025-01-01T00:00:00+00:00",
				"ids": [1, 2, 3],
				"nested": { "flag": true },
			})
		);
	}

	#[test]
	fn test_non_finite_floats_fall_back_to_strings() {
		assert_eq!(sanitize(ParamValue::Float(f64::NAN)), json!("NaN"));
		assert_eq!(sanitize(ParamValue::Float(f64::INFINITY)), json!("inf"));
	}

	#[test]
	fn test_without_drops_named_keys() {
		let map = ParamMap::new()
			.with("name", "web-01")
			.with("credentials", "raw-secret");
		let filtered = map.without(&["credentials"]);
		assert!(filtered.get("credentials").is_none());
		assert!(filtered.get("name").is_some());
	}

	#[test]
	fn test_json_value_round_trip() {
		let value = json!({ "a": [1, 2.5, "x", null], "b": { "c": true } });
		assert_eq!(sanitize(ParamValue::from(value.clone())), value);
	}
}
