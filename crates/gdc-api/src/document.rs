// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON documents with dotted-path access.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Segment that maps the rest of a path over every element of an array.
pub const EACH: &str = "@each";

/// Resource data without its namespace key.
///
/// Paths are dot separated (`meta.title`, `content.state`). A path segment
/// of `@each` applies the remaining path to every element of an array:
/// `entries.@each.link` yields an array of links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
	/// An empty object.
	pub fn new() -> Self {
		Self(Value::Object(Map::new()))
	}

	pub fn as_value(&self) -> &Value {
		&self.0
	}

	pub fn into_value(self) -> Value {
		self.0
	}

	pub fn is_empty(&self) -> bool {
		match &self.0 {
			Value::Null => true,
			Value::Object(map) => map.is_empty(),
			_ => false,
		}
	}

	/// Value at `path`, cloned. `@each` collects into an array.
	pub fn get(&self, path: &str) -> Option<Value> {
		let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
		lookup(&self.0, &segments)
	}

	pub fn get_str(&self, path: &str) -> Option<String> {
		self.get(path).and_then(|v| v.as_str().map(str::to_string))
	}

	pub fn get_i64(&self, path: &str) -> Option<i64> {
		self.get(path).and_then(|v| v.as_i64())
	}

	pub fn get_bool(&self, path: &str) -> Option<bool> {
		self.get(path).and_then(|v| v.as_bool())
	}

	/// Sets `path`, creating intermediate objects. Non-object intermediates
	/// are replaced.
	pub fn set(&mut self, path: &str, value: Value) {
		let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
		let Some((last, parents)) = segments.split_last() else {
			self.0 = value;
			return;
		};

		let mut current = &mut self.0;
		for segment in parents {
			current = object_mut(current)
				.entry(segment.to_string())
				.or_insert_with(|| Value::Object(Map::new()));
		}
		object_mut(current).insert(last.to_string(), value);
	}

	/// Removes `path`, returning the old value.
	pub fn remove(&mut self, path: &str) -> Option<Value> {
		let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
		let (last, parents) = segments.split_last()?;

		let mut current = &mut self.0;
		for segment in parents {
			current = current.as_object_mut()?.get_mut(*segment)?;
		}
		current.as_object_mut()?.remove(*last)
	}
}

impl From<Value> for Document {
	fn from(value: Value) -> Self {
		Self(value)
	}
}

impl From<Document> for Value {
	fn from(document: Document) -> Self {
		document.0
	}
}

fn lookup(value: &Value, segments: &[&str]) -> Option<Value> {
	let Some((first, rest)) = segments.split_first() else {
		return Some(value.clone());
	};

	if *first == EACH {
		let items = value.as_array()?;
		return Some(Value::Array(
			items
				.iter()
				.map(|item| lookup(item, rest).unwrap_or(Value::Null))
				.collect(),
		));
	}

	let next = match value {
		Value::Object(map) => map.get(*first)?,
		Value::Array(items) => items.get(first.parse::<usize>().ok()?)?,
		_ => return None,
	};
	lookup(next, rest)
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
	if !value.is_object() {
		*value = Value::Object(Map::new());
	}
	match value {
		Value::Object(map) => map,
		_ => unreachable!("value was just replaced with an object"),
	}
}
