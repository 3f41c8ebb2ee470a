// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use http::HeaderMap;
use tracing::{error, info, instrument};
use warden_audit::AuditService;
use warden_policy::{AccessEvaluationResult, AccessRequest, RuleSet, UserContext};

use crate::error::GateError;
use crate::resolver::ContextResolver;

/// Wraps the evaluator for request handlers.
#[derive(Clone)]
pub struct Gate {
	rules: Arc<RuleSet>,
	resolver: Arc<dyn ContextResolver>,
	audit: Option<Arc<AuditService>>,
}

impl Gate {
	pub fn new(rules: Arc<RuleSet>, resolver: Arc<dyn ContextResolver>) -> Self {
		Self {
			rules,
			resolver,
			audit: None,
		}
	}

	/// Writes one access log entry per decision.
	pub fn with_audit(mut self, audit: Arc<AuditService>) -> Self {
		self.audit = Some(audit);
		self
	}

	pub fn rules(&self) -> &RuleSet {
		&self.rules
	}

	/// Resolves the caller and evaluates `request`, returning the decision as-is.
	///
	/// Only resolution and policy failures are errors; a denial is `Ok`.
	#[instrument(
		level = "debug",
		skip_all,
		fields(resource = %request.resource, action = %request.action, field = ?request.field)
	)]
	pub async fn check(
		&self,
		headers: &HeaderMap,
		request: &AccessRequest<'_>,
	) -> Result<(UserContext, AccessEvaluationResult), GateError> {
		let context = self.resolver.resolve(headers).await?;

		let result = self.rules.evaluate(&context, request).map_err(|e| {
			error!(error = %e, user_id = %context.user_id, "policy evaluation failed");
			GateError::from(e)
		})?;

		if let Some(audit) = &self.audit {
			audit.record(&context, request, &result);
		}

		Ok((context, result))
	}

	/// Like [`Gate::check`], but a denial becomes [`GateError::Forbidden`].
	///
	/// Returns the resolved context so the handler can use it.
	pub async fn authorize(
		&self,
		headers: &HeaderMap,
		request: &AccessRequest<'_>,
	) -> Result<UserContext, GateError> {
		let (context, result) = self.check(headers, request).await?;

		if result.can {
			return Ok(context);
		}

		let reason = result.reason.unwrap_or_default();
		info!(
			user_id = %context.user_id,
			resource = %request.resource,
			action = %request.action,
			reason = %reason,
			"access denied"
		);
		Err(GateError::Forbidden { reason })
	}
}
