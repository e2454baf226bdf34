// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key-based masking of sensitive values in JSON structures.
//!
//! Operation parameters and results pass through [`mask`] before they are
//! logged or persisted. Masking is keyed on field names, not value shapes:
//! any string value stored under a key containing a known-sensitive
//! substring is replaced with [`REDACTION_MARKER`]. Nested objects are
//! masked recursively; every other value passes through unchanged.

use serde_json::Value;

/// Replacement written in place of a sensitive value.
pub const REDACTION_MARKER: &str = "******";

/// Case-insensitive substrings that mark a key as sensitive.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
	"password",
	"secret",
	"key",
	"token",
	"private_key",
	"access_key",
	"secret_key",
	"aws_secret_access_key",
];

/// Returns true if a field name should have its string value masked.
pub fn is_sensitive_key(key: &str) -> bool {
	let lowered = key.to_lowercase();
	SENSITIVE_KEY_FRAGMENTS
		.iter()
		.any(|fragment| lowered.contains(fragment))
}

/// Mask sensitive string values in a JSON structure.
///
/// Pure and idempotent: `mask(&mask(v)) == mask(v)`.
pub fn mask(value: &Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(key, entry)| (key.clone(), mask_entry(key, entry)))
				.collect(),
		),
		other => other.clone(),
	}
}

fn mask_entry(key: &str, value: &Value) -> Value {
	match value {
		Value::Object(_) => mask(value),
		Value::String(_) if is_sensitive_key(key) => Value::String(REDACTION_MARKER.to_string()),
		other => other.clone(),
	}
}
