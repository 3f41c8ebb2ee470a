// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access log entry written once per evaluated request.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_policy::{AccessEvaluationResult, AccessRequest, RecordContext, UserContext};

/// Severity derived from the decision: `info` when allowed, `warn` when denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessSeverity {
	Info,
	Warn,
}

impl AccessSeverity {
	pub fn as_str(&self) -> &'static str {
		match self {
			AccessSeverity::Info => "info",
			AccessSeverity::Warn => "warn",
		}
	}
}

impl fmt::Display for AccessSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Immutable record of one access decision.
///
/// The schema is identical for every sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub resource: String,
	pub action: String,
	pub context: UserContext,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub record_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	pub can: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl AccessLogEntry {
	pub fn builder(
		resource: impl Into<String>,
		action: impl Into<String>,
		context: UserContext,
	) -> AccessLogBuilder {
		AccessLogBuilder::new(resource, action, context)
	}

	/// Builds the entry for a request that was just evaluated.
	pub fn from_decision(
		context: &UserContext,
		request: &AccessRequest<'_>,
		result: &AccessEvaluationResult,
	) -> Self {
		let mut builder =
			Self::builder(request.resource, request.action, context.clone()).decision(result);
		if let Some(record) = request.record {
			builder = builder.record(record);
		}
		if let Some(field) = request.field {
			builder = builder.field(field);
		}
		builder.build()
	}

	pub fn severity(&self) -> AccessSeverity {
		if self.can {
			AccessSeverity::Info
		} else {
			AccessSeverity::Warn
		}
	}

	/// One-line summary, e.g. `Auth DENIED: read orders.cost`.
	pub fn message(&self) -> String {
		let verdict = if self.can { "ALLOWED" } else { "DENIED" };
		match &self.field {
			Some(field) => format!(
				"Auth {verdict}: {} {}.{field}",
				self.action, self.resource
			),
			None => format!("Auth {verdict}: {} {}", self.action, self.resource),
		}
	}
}

/// Fluent builder for [`AccessLogEntry`]. Defaults to a denial without a reason.
#[derive(Debug, Clone)]
pub struct AccessLogBuilder {
	resource: String,
	action: String,
	context: UserContext,
	record_id: Option<String>,
	field: Option<String>,
	can: bool,
	reason: Option<String>,
}

impl AccessLogBuilder {
	pub fn new(resource: impl Into<String>, action: impl Into<String>, context: UserContext) -> Self {
		Self {
			resource: resource.into(),
			action: action.into(),
			context,
			record_id: None,
			field: None,
			can: false,
			reason: None,
		}
	}

	pub fn record_id(mut self, id: impl Into<String>) -> Self {
		self.record_id = Some(id.into());
		self
	}

	/// Takes the record's `id` attribute, if it has one.
	pub fn record(mut self, record: &RecordContext) -> Self {
		self.record_id = record.id();
		self
	}

	pub fn field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn decision(mut self, result: &AccessEvaluationResult) -> Self {
		self.can = result.can;
		self.reason = result.reason.clone();
		self
	}

	pub fn build(self) -> AccessLogEntry {
		AccessLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			resource: self.resource,
			action: self.action,
			context: self.context,
			record_id: self.record_id,
			field: self.field,
			can: self.can,
			reason: self.reason,
		}
	}
}
