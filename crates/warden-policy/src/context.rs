// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subject and record attributes consumed by conditions.
//!
//! - [`UserContext`]: who is asking (user id, role, tenant id, extra attributes)
//! - [`RecordContext`]: the entity being accessed, when the check targets one
//! - [`Attribute`]: a borrowed attribute value as seen by the DSL
//!
//! Both contexts are resolved before evaluation and never mutated by it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Attributes describing the subject making the request.
///
/// Well-known attributes are typed fields; anything else the identity layer
/// knows (clearance level, region, ...) lives in `attributes`. JSON/TOML
/// representation is flat and camelCase: `{"userId": .., "role": .., "tenantId": .., "region": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
	pub user_id: String,
	pub role: String,
	pub tenant_id: String,
	#[serde(flatten, default)]
	pub attributes: BTreeMap<String, Value>,
}

impl UserContext {
	pub fn new(
		user_id: impl Into<String>,
		role: impl Into<String>,
		tenant_id: impl Into<String>,
	) -> Self {
		Self {
			user_id: user_id.into(),
			role: role.into(),
			tenant_id: tenant_id.into(),
			attributes: BTreeMap::new(),
		}
	}

	/// Builder: add an extra attribute.
	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	/// Returns an extra attribute by name. Does not cover the typed fields.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attributes.get(name)
	}

	/// Resolves `name` the way `context.<name>` paths do.
	///
	/// Typed fields answer to both their camelCase and snake_case names.
	/// Missing and `null` attributes are unresolved.
	pub fn attribute(&self, name: &str) -> Option<Attribute<'_>> {
		match name {
			"userId" | "user_id" => Some(Attribute::Str(&self.user_id)),
			"role" => Some(Attribute::Str(&self.role)),
			"tenantId" | "tenant_id" => Some(Attribute::Str(&self.tenant_id)),
			other => resolve_value(self.attributes.get(other)),
		}
	}
}

/// Attributes of the specific record being accessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordContext {
	attributes: BTreeMap<String, Value>,
}

impl RecordContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: set an attribute.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
		self.attributes.insert(name.into(), value.into());
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attributes.get(name)
	}

	/// Resolves `name` the way `record.<name>` paths do.
	pub fn attribute(&self, name: &str) -> Option<Attribute<'_>> {
		resolve_value(self.attributes.get(name))
	}

	/// The record's `id` attribute rendered as a string, used for audit entries.
	pub fn id(&self) -> Option<String> {
		match self.attributes.get("id")? {
			Value::String(s) => Some(s.clone()),
			Value::Number(n) => Some(n.to_string()),
			_ => None,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}
}

impl FromIterator<(String, Value)> for RecordContext {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self {
			attributes: iter.into_iter().collect(),
		}
	}
}

impl From<serde_json::Map<String, Value>> for RecordContext {
	fn from(map: serde_json::Map<String, Value>) -> Self {
		map.into_iter().collect()
	}
}

fn resolve_value(value: Option<&Value>) -> Option<Attribute<'_>> {
	match value {
		None | Some(Value::Null) => None,
		Some(v) => Some(Attribute::Value(v)),
	}
}

/// A resolved attribute value.
///
/// Equality is strict on type, except that numbers compare by value
/// (`1 == 1.0`) and typed string fields compare equal to JSON strings.
/// Two integers compare exactly, at any magnitude.
#[derive(Debug, Clone, Copy)]
pub enum Attribute<'a> {
	Str(&'a str),
	Value(&'a Value),
}

impl<'a> Attribute<'a> {
	pub fn as_str(&self) -> Option<&'a str> {
		match self {
			Attribute::Str(s) => Some(s),
			Attribute::Value(v) => v.as_str(),
		}
	}
}

impl PartialEq for Attribute<'_> {
	fn eq(&self, other: &Self) -> bool {
		if let (Some(a), Some(b)) = (self.as_str(), other.as_str()) {
			return a == b;
		}

		match (self, other) {
			(Attribute::Value(Value::Number(a)), Attribute::Value(Value::Number(b))) => {
				numbers_equal(a, b)
			}
			(Attribute::Value(a), Attribute::Value(b)) => a == b,
			_ => false,
		}
	}
}

// Integers never go through f64: above 2^53 distinct ids would collapse.
fn numbers_equal(a: &Number, b: &Number) -> bool {
	if a.is_f64() || b.is_f64() {
		return a.as_f64() == b.as_f64();
	}

	match (a.as_i64(), b.as_i64()) {
		(Some(a), Some(b)) => a == b,
		_ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
	}
}
