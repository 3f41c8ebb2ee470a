// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission rules and ordered rule sets.
//!
//! Rule files are TOML or JSON:
//!
//! ```toml
//! [[rules]]
//! resource = "orders"
//! action = "read"
//! condition = { equals = ["record.tenantId", "context.tenantId"] }
//! field_permissions = { id = "read", total = "read", cost = "none" }
//!
//! [[rules]]
//! resource = "users"
//! action = "invite"
//! condition = { equals = ["context.role", "record.inviterRole"] }
//! ```
//!
//! Order is significant: the first rule whose resource, action and condition
//! all match decides the request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::condition::Condition;
use crate::context::UserContext;
use crate::engine::{evaluate_access, AccessEvaluationResult, AccessRequest};
use crate::error::PolicyError;

/// Access granted to a single field once the resource-level rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
	#[default]
	None,
	Read,
	Write,
}

impl AccessLevel {
	/// Returns true for `read` and `write`.
	pub fn grants_access(&self) -> bool {
		!matches!(self, AccessLevel::None)
	}
}

/// A single policy statement.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRule {
	pub resource: String,
	pub action: String,
	#[serde(default)]
	pub condition: Option<Condition>,
	#[serde(default, alias = "fieldPermissions")]
	pub field_permissions: Option<BTreeMap<String, AccessLevel>>,
}

impl PermissionRule {
	/// An unconditional rule with no field permissions.
	pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
		Self {
			resource: resource.into(),
			action: action.into(),
			condition: None,
			field_permissions: None,
		}
	}

	/// Builder: attach a condition.
	pub fn when(mut self, condition: impl Into<Condition>) -> Self {
		self.condition = Some(condition.into());
		self
	}

	/// Builder: set the access level of one field.
	pub fn field(mut self, name: impl Into<String>, level: AccessLevel) -> Self {
		self
			.field_permissions
			.get_or_insert_with(BTreeMap::new)
			.insert(name.into(), level);
		self
	}

	pub fn applies_to(&self, resource: &str, action: &str) -> bool {
		self.resource == resource && self.action == action
	}

	/// Access level for `field`; `None` when the rule has no entry for it.
	pub fn field_access(&self, field: &str) -> Option<AccessLevel> {
		self.field_permissions.as_ref()?.get(field).copied()
	}
}

/// An ordered, immutable collection of rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSet {
	rules: Vec<PermissionRule>,
}

impl RuleSet {
	pub fn new(rules: Vec<PermissionRule>) -> Self {
		Self { rules }
	}

	pub fn from_toml_str(content: &str) -> Result<Self, PolicyError> {
		Ok(toml::from_str(content)?)
	}

	pub fn from_json_str(content: &str) -> Result<Self, PolicyError> {
		Ok(serde_json::from_str(content)?)
	}

	/// Loads a rule file, choosing the format from its extension.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
		let path = path.as_ref();
		let extension = path
			.extension()
			.and_then(|e| e.to_str())
			.map(str::to_ascii_lowercase);

		let parse: fn(&str) -> Result<Self, PolicyError> = match extension.as_deref() {
			Some("toml") => Self::from_toml_str,
			Some("json") => Self::from_json_str,
			_ => {
				return Err(PolicyError::UnsupportedFormat {
					path: path.to_path_buf(),
				})
			}
		};

		let content = std::fs::read_to_string(path).map_err(|source| PolicyError::FileRead {
			path: path.to_path_buf(),
			source,
		})?;

		let rules = parse(&content)?;
		debug!(path = %path.display(), rules = rules.len(), "loaded rule file");
		Ok(rules)
	}

	pub fn rules(&self) -> &[PermissionRule] {
		&self.rules
	}

	pub fn iter(&self) -> std::slice::Iter<'_, PermissionRule> {
		self.rules.iter()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Evaluates a request against this rule set. See [`evaluate_access`].
	pub fn evaluate(
		&self,
		context: &UserContext,
		request: &AccessRequest<'_>,
	) -> Result<AccessEvaluationResult, PolicyError> {
		evaluate_access(
			&self.rules,
			context,
			request.resource,
			request.action,
			request.record,
			request.field,
		)
	}
}

impl FromIterator<PermissionRule> for RuleSet {
	fn from_iter<I: IntoIterator<Item = PermissionRule>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

impl<'a> IntoIterator for &'a RuleSet {
	type Item = &'a PermissionRule;
	type IntoIter = std::slice::Iter<'a, PermissionRule>;

	fn into_iter(self) -> Self::IntoIter {
		self.rules.iter()
	}
}
