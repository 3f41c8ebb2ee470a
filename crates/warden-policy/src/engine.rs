// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access decision engine.
//!
//! [`evaluate_access`] scans rules in declaration order:
//!
//! 1. Skip rules whose resource or action differ from the request.
//! 2. Skip rules whose condition evaluates to `false` (scanning continues).
//! 3. The first remaining rule decides. If a field was requested and the rule
//!    carries field permissions, the field must map to `read` or `write`.
//! 4. If no rule is accepted the request is denied.
//!
//! Denial is a normal [`AccessEvaluationResult`], never an error. The only
//! error is a native predicate failing, which signals a broken policy.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::context::{RecordContext, UserContext};
use crate::error::PolicyError;
use crate::rule::PermissionRule;

/// Reason reported when no rule accepted the request.
pub const NO_MATCHING_RULE_REASON: &str = "No matching rule found";

/// Outcome of one access evaluation. `reason` is set only on denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvaluationResult {
	pub can: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl AccessEvaluationResult {
	pub fn allow() -> Self {
		Self {
			can: true,
			reason: None,
		}
	}

	pub fn deny(reason: impl Into<String>) -> Self {
		Self {
			can: false,
			reason: Some(reason.into()),
		}
	}

	pub fn no_matching_rule() -> Self {
		Self::deny(NO_MATCHING_RULE_REASON)
	}

	pub fn field_denied(field: &str) -> Self {
		Self::deny(format!("No access to field '{field}'"))
	}

	pub fn is_allowed(&self) -> bool {
		self.can
	}
}

/// The resource/action being requested, optionally narrowed to a record and field.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
	pub resource: &'a str,
	pub action: &'a str,
	pub record: Option<&'a RecordContext>,
	pub field: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
	pub fn new(resource: &'a str, action: &'a str) -> Self {
		Self {
			resource,
			action,
			record: None,
			field: None,
		}
	}

	/// Builder: target a specific record.
	pub fn on_record(mut self, record: &'a RecordContext) -> Self {
		self.record = Some(record);
		self
	}

	/// Builder: ask about a single field.
	pub fn field(mut self, field: &'a str) -> Self {
		self.field = Some(field);
		self
	}
}

/// Decides whether `context` may perform `action` on `resource`.
///
/// Pure: performs no I/O and keeps no state between calls.
///
/// # Errors
///
/// Returns [`PolicyError::Predicate`] when a native predicate fails. Denials
/// are `Ok` results with `can == false`.
#[instrument(
	level = "debug",
	skip(rules, context, record),
	fields(user_id = %context.user_id, has_record = record.is_some())
)]
pub fn evaluate_access(
	rules: &[PermissionRule],
	context: &UserContext,
	resource: &str,
	action: &str,
	record: Option<&RecordContext>,
	field: Option<&str>,
) -> Result<AccessEvaluationResult, PolicyError> {
	for (index, rule) in rules.iter().enumerate() {
		if !rule.applies_to(resource, action) {
			continue;
		}

		if let Some(condition) = &rule.condition {
			let satisfied =
				condition
					.evaluate(context, record)
					.map_err(|source| PolicyError::Predicate {
						resource: rule.resource.clone(),
						action: rule.action.clone(),
						source,
					})?;
			if !satisfied {
				debug!(rule = index, "condition not satisfied, continuing");
				continue;
			}
		}

		debug!(rule = index, "rule matched");
		return Ok(resolve_field(rule, field));
	}

	debug!("no rule matched");
	Ok(AccessEvaluationResult::no_matching_rule())
}

fn resolve_field(rule: &PermissionRule, field: Option<&str>) -> AccessEvaluationResult {
	let (Some(field), Some(permissions)) = (field, rule.field_permissions.as_ref()) else {
		return AccessEvaluationResult::allow();
	};

	match permissions.get(field) {
		Some(level) if level.grants_access() => AccessEvaluationResult::allow(),
		_ => AccessEvaluationResult::field_denied(field),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::condition::{Condition, DslNode};
	use crate::error::PredicateError;
	use crate::rule::{AccessLevel, RuleSet};
	use proptest::prelude::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	fn tenant_ctx(tenant: &str) -> UserContext {
		UserContext::new("u1", "member", tenant)
	}

	fn tenant_record(tenant: &str) -> RecordContext {
		RecordContext::new().with("id", "ord-1").with("tenantId", tenant)
	}

	fn orders_rules() -> Vec<PermissionRule> {
		vec![PermissionRule::new("orders", "read")
			.when(DslNode::equals("record.tenantId", "context.tenantId"))
			.field("cost", AccessLevel::None)
			.field("total", AccessLevel::Read)]
	}

	fn never() -> DslNode {
		DslNode::equals("context.userId", "context.missing")
	}

	mod tenant_scenario {
		use super::*;

		#[test]
		fn readable_field_is_allowed() {
			let record = tenant_record("t1");
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&record),
				Some("total"),
			)
			.unwrap();
			assert_eq!(result, AccessEvaluationResult::allow());
		}

		#[test]
		fn field_mapped_to_none_is_denied() {
			let record = tenant_record("t1");
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&record),
				Some("cost"),
			)
			.unwrap();
			assert!(!result.can);
			assert_eq!(result.reason.as_deref(), Some("No access to field 'cost'"));
		}

		#[test]
		fn other_tenant_matches_no_rule() {
			let record = tenant_record("t2");
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&record),
				Some("total"),
			)
			.unwrap();
			assert!(!result.can);
			assert_eq!(result.reason.as_deref(), Some("No matching rule found"));
		}

		#[test]
		fn resource_level_check_without_field_is_allowed() {
			let record = tenant_record("t1");
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&record),
				None,
			)
			.unwrap();
			assert!(result.can);
			assert!(result.reason.is_none());
		}
	}

	mod field_permissions {
		use super::*;

		#[test]
		fn field_missing_from_map_is_denied() {
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&tenant_record("t1")),
				Some("margin"),
			)
			.unwrap();
			assert_eq!(result, AccessEvaluationResult::field_denied("margin"));
		}

		#[test]
		fn write_level_grants_field_access() {
			let rules = vec![PermissionRule::new("orders", "update").field("status", AccessLevel::Write)];
			let result = evaluate_access(
				&rules,
				&tenant_ctx("t1"),
				"orders",
				"update",
				None,
				Some("status"),
			)
			.unwrap();
			assert!(result.can);
		}

		#[test]
		fn rule_without_field_map_allows_any_field() {
			let rules = vec![PermissionRule::new("users", "invite")];
			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "users", "invite", None, Some("email"))
					.unwrap();
			assert!(result.can);
		}

		#[test]
		fn field_map_is_ignored_without_field() {
			let rules = vec![PermissionRule::new("orders", "read").field("cost", AccessLevel::None)];
			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "orders", "read", None, None).unwrap();
			assert!(result.can);
		}
	}

	mod ordering {
		use super::*;

		#[test]
		fn false_condition_falls_through_to_next_rule() {
			let rules = vec![
				PermissionRule::new("orders", "read")
					.when(never())
					.field("total", AccessLevel::Read),
				PermissionRule::new("orders", "read").field("total", AccessLevel::None),
			];

			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "orders", "read", None, Some("total"))
					.unwrap();
			assert_eq!(result, AccessEvaluationResult::field_denied("total"));
		}

		#[test]
		fn first_accepted_rule_wins() {
			let permissive = PermissionRule::new("orders", "read").field("cost", AccessLevel::Read);
			let strict = PermissionRule::new("orders", "read").field("cost", AccessLevel::None);

			let ctx = tenant_ctx("t1");
			let a = evaluate_access(
				&[permissive.clone(), strict.clone()],
				&ctx,
				"orders",
				"read",
				None,
				Some("cost"),
			)
			.unwrap();
			let b = evaluate_access(&[strict, permissive], &ctx, "orders", "read", None, Some("cost"))
				.unwrap();

			assert!(a.can);
			assert!(!b.can);
		}

		#[test]
		fn later_conditions_are_not_evaluated_after_a_match() {
			let calls = Arc::new(AtomicUsize::new(0));
			let counter = Arc::clone(&calls);
			let rules = vec![
				PermissionRule::new("orders", "read"),
				PermissionRule::new("orders", "read").when(Condition::from_fn(move |_, _| {
					counter.fetch_add(1, Ordering::SeqCst);
					true
				})),
			];

			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "orders", "read", None, None).unwrap();
			assert!(result.can);
			assert_eq!(calls.load(Ordering::SeqCst), 0);
		}

		#[test]
		fn resource_and_action_must_both_match() {
			let rules = vec![
				PermissionRule::new("orders", "update"),
				PermissionRule::new("invoices", "read"),
			];
			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "orders", "read", None, None).unwrap();
			assert_eq!(result, AccessEvaluationResult::no_matching_rule());
		}

		#[test]
		fn empty_rule_set_denies() {
			let result = evaluate_access(&[], &tenant_ctx("t1"), "orders", "read", None, None).unwrap();
			assert_eq!(result.reason.as_deref(), Some(NO_MATCHING_RULE_REASON));
		}
	}

	mod predicates {
		use super::*;

		#[test]
		fn clearance_predicate() {
			let rules = vec![PermissionRule::new("payments", "approve").when(Condition::from_fn(
				|ctx, _| {
					ctx
						.get("clearanceLevel")
						.and_then(serde_json::Value::as_i64)
						.is_some_and(|level| level >= 3)
				},
			))];

			let cleared = tenant_ctx("t1").with_attribute("clearanceLevel", 3);
			let junior = tenant_ctx("t1").with_attribute("clearanceLevel", 2);

			assert!(evaluate_access(&rules, &cleared, "payments", "approve", None, None)
				.unwrap()
				.can);
			assert!(!evaluate_access(&rules, &junior, "payments", "approve", None, None)
				.unwrap()
				.can);
		}

		#[test]
		fn failing_predicate_is_an_error_not_a_denial() {
			let rules = vec![
				PermissionRule::new("invoices", "read")
					.when(Condition::predicate(|_, _| Err(PredicateError::new("region service down")))),
				PermissionRule::new("invoices", "read"),
			];

			let err = evaluate_access(&rules, &tenant_ctx("t1"), "invoices", "read", None, None)
				.unwrap_err();
			match err {
				PolicyError::Predicate {
					resource,
					action,
					source,
				} => {
					assert_eq!(resource, "invoices");
					assert_eq!(action, "read");
					assert_eq!(source.message(), "region service down");
				}
				other => panic!("unexpected error: {other}"),
			}
		}

		#[test]
		fn predicate_on_non_matching_rule_is_not_invoked() {
			let rules = vec![PermissionRule::new("invoices", "read")
				.when(Condition::predicate(|_, _| Err(PredicateError::new("boom"))))];
			let result =
				evaluate_access(&rules, &tenant_ctx("t1"), "orders", "read", None, None).unwrap();
			assert!(!result.can);
		}
	}

	mod rule_set {
		use super::*;

		#[test]
		fn evaluates_request_against_loaded_rules() {
			let rules = RuleSet::from_toml_str(
				r#"
[[rules]]
resource = "orders"
action = "read"
condition = { equals = ["record.tenantId", "context.tenantId"] }
field_permissions = { total = "read", cost = "none" }
"#,
			)
			.unwrap();

			let ctx = tenant_ctx("t1");
			let record = tenant_record("t1");
			let total = AccessRequest::new("orders", "read")
				.on_record(&record)
				.field("total");
			let cost = AccessRequest::new("orders", "read").on_record(&record).field("cost");

			assert!(rules.evaluate(&ctx, &total).unwrap().can);
			assert_eq!(
				rules.evaluate(&ctx, &cost).unwrap(),
				AccessEvaluationResult::field_denied("cost")
			);
		}

		#[test]
		fn unknown_dsl_node_in_file_denies() {
			let rules = RuleSet::from_json_str(
				r#"{"rules": [{"resource": "orders", "action": "read", "condition": {"matches": ["a", "b"]}}]}"#,
			)
			.unwrap();
			let result = rules
				.evaluate(&tenant_ctx("t1"), &AccessRequest::new("orders", "read"))
				.unwrap();
			assert_eq!(result, AccessEvaluationResult::no_matching_rule());
		}
	}

	#[test]
	fn result_serializes_without_reason_when_allowed() {
		let allowed = serde_json::to_value(AccessEvaluationResult::allow()).unwrap();
		assert_eq!(allowed, serde_json::json!({"can": true}));

		let denied = serde_json::to_value(AccessEvaluationResult::no_matching_rule()).unwrap();
		assert_eq!(
			denied,
			serde_json::json!({"can": false, "reason": "No matching rule found"})
		);
	}

	proptest! {
		// Prepending rules for other resources/actions never changes a decision.
		#[test]
		fn unrelated_rules_do_not_affect_decision(
			noise in prop::collection::vec(("[a-z]{1,6}", "[a-z]{1,6}"), 0..6),
			field in prop::option::of(prop::sample::select(vec!["total", "cost", "margin"])),
		) {
			let ctx = tenant_ctx("t1");
			let record = tenant_record("t1");
			let baseline = evaluate_access(&orders_rules(), &ctx, "orders", "read", Some(&record), field).unwrap();

			let mut rules: Vec<PermissionRule> = noise
				.into_iter()
				.filter(|(r, a)| !(r == "orders" && a == "read"))
				.map(|(r, a)| PermissionRule::new(r, a))
				.collect();
			rules.extend(orders_rules());

			let result = evaluate_access(&rules, &ctx, "orders", "read", Some(&record), field).unwrap();
			prop_assert_eq!(result, baseline);
		}

		// A denial always carries a reason; an allow never does.
		#[test]
		fn reason_present_iff_denied(
			tenant in prop::sample::select(vec!["t1", "t2"]),
			field in prop::option::of("[a-z]{1,8}"),
		) {
			let record = tenant_record(tenant);
			let result = evaluate_access(
				&orders_rules(),
				&tenant_ctx("t1"),
				"orders",
				"read",
				Some(&record),
				field.as_deref(),
			)
			.unwrap();
			prop_assert_eq!(result.can, result.reason.is_none());
		}
	}
}
