// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-level value snapshots captured before and after a change.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// A mapping of field name to value at a point in time.
///
/// Keys are kept in sorted order so two snapshots with the same content
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(field.into(), value.into());
		self
	}

	pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(field.into(), value.into())
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
		self.0.iter()
	}

	/// Converts a JSON object into a snapshot. Returns `None` for any other
	/// JSON value.
	pub fn from_value(value: Value) -> Option<Self> {
		match value {
			Value::Object(map) => Some(map.into()),
			_ => None,
		}
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.0.into_iter().collect())
	}

	/// Returns the `(old, new)` pair restricted to fields whose values differ.
	///
	/// A field present on only one side is compared against `null`, and the
	/// `null` is written out explicitly so both halves always carry the same
	/// set of fields.
	pub fn changes(old: &Snapshot, new: &Snapshot) -> (Snapshot, Snapshot) {
		let fields: BTreeSet<&String> = old.0.keys().chain(new.0.keys()).collect();

		let mut before = Snapshot::new();
		let mut after = Snapshot::new();
		for field in fields {
			let prior = old.0.get(field).unwrap_or(&Value::Null);
			let next = new.0.get(field).unwrap_or(&Value::Null);
			if prior != next {
				before.0.insert(field.clone(), prior.clone());
				after.0.insert(field.clone(), next.clone());
			}
		}

		(before, after)
	}
}

impl From<serde_json::Map<String, Value>> for Snapshot {
	fn from(map: serde_json::Map<String, Value>) -> Self {
		Self(map.into_iter().collect())
	}
}

impl FromIterator<(String, Value)> for Snapshot {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for Snapshot {
	type Item = (String, Value);
	type IntoIter = btree_map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
