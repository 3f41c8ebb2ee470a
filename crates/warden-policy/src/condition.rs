// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule conditions.
//!
//! A [`Condition`] is either a native [`Predicate`] or a declarative
//! [`DslNode`] tree. The DSL has three node kinds:
//!
//! ```text
//! { equals = ["record.tenantId", "context.tenantId"] }
//! { and = [ <node>, ... ] }     all children true; empty is true
//! { or  = [ <node>, ... ] }     any child true; empty is false
//! ```
//!
//! Paths start with `context.` or `record.`. A path that cannot be resolved
//! (unknown prefix, missing attribute, `null`, or no record) never compares
//! equal to anything, not even to another unresolved path.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::context::{Attribute, RecordContext, UserContext};
use crate::error::PredicateError;

const CONTEXT_PREFIX: &str = "context.";
const RECORD_PREFIX: &str = "record.";

/// Native condition code.
///
/// Implemented for any `Fn(&UserContext, Option<&RecordContext>) -> Result<bool, PredicateError>`.
pub trait Predicate: Send + Sync {
	fn evaluate(
		&self,
		context: &UserContext,
		record: Option<&RecordContext>,
	) -> Result<bool, PredicateError>;
}

impl<F> Predicate for F
where
	F: Fn(&UserContext, Option<&RecordContext>) -> Result<bool, PredicateError> + Send + Sync,
{
	fn evaluate(
		&self,
		context: &UserContext,
		record: Option<&RecordContext>,
	) -> Result<bool, PredicateError> {
		self(context, record)
	}
}

/// The condition attached to a permission rule.
#[derive(Clone)]
pub enum Condition {
	Predicate(Arc<dyn Predicate>),
	Dsl(DslNode),
}

impl Condition {
	/// Wraps a fallible closure. Errors propagate out of the evaluator.
	pub fn predicate<F>(f: F) -> Self
	where
		F: Fn(&UserContext, Option<&RecordContext>) -> Result<bool, PredicateError>
			+ Send
			+ Sync
			+ 'static,
	{
		Condition::Predicate(Arc::new(f))
	}

	/// Wraps a closure that always reaches a decision.
	pub fn from_fn<F>(f: F) -> Self
	where
		F: Fn(&UserContext, Option<&RecordContext>) -> bool + Send + Sync + 'static,
	{
		Self::predicate(move |context, record| Ok(f(context, record)))
	}

	/// Wraps a [`Predicate`] implementation.
	pub fn custom(predicate: impl Predicate + 'static) -> Self {
		Condition::Predicate(Arc::new(predicate))
	}

	pub fn evaluate(
		&self,
		context: &UserContext,
		record: Option<&RecordContext>,
	) -> Result<bool, PredicateError> {
		match self {
			Condition::Predicate(predicate) => predicate.evaluate(context, record),
			Condition::Dsl(node) => Ok(node.evaluate(context, record)),
		}
	}
}

impl From<DslNode> for Condition {
	fn from(node: DslNode) -> Self {
		Condition::Dsl(node)
	}
}

impl fmt::Debug for Condition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Condition::Predicate(_) => f.write_str("Predicate(..)"),
			Condition::Dsl(node) => f.debug_tuple("Dsl").field(node).finish(),
		}
	}
}

// Rule files can only carry DSL conditions.
impl<'de> Deserialize<'de> for Condition {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		DslNode::deserialize(deserializer).map(Condition::Dsl)
	}
}

/// Policy expression tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub enum DslNode {
	Equals(String, String),
	And(Vec<DslNode>),
	Or(Vec<DslNode>),
	/// A node whose shape was not recognised when the rule file was parsed.
	/// Always evaluates to `false`.
	Unrecognized(String),
}

impl DslNode {
	pub fn equals(a: impl Into<String>, b: impl Into<String>) -> Self {
		DslNode::Equals(a.into(), b.into())
	}

	pub fn and(children: impl IntoIterator<Item = DslNode>) -> Self {
		DslNode::And(children.into_iter().collect())
	}

	pub fn or(children: impl IntoIterator<Item = DslNode>) -> Self {
		DslNode::Or(children.into_iter().collect())
	}

	pub fn evaluate(&self, context: &UserContext, record: Option<&RecordContext>) -> bool {
		match self {
			DslNode::Equals(a, b) => {
				match (
					resolve_path(a, context, record),
					resolve_path(b, context, record),
				) {
					(Some(left), Some(right)) => left == right,
					_ => false,
				}
			}
			DslNode::And(children) => children.iter().all(|c| c.evaluate(context, record)),
			DslNode::Or(children) => children.iter().any(|c| c.evaluate(context, record)),
			DslNode::Unrecognized(shape) => {
				debug!(shape = %shape, "unrecognized condition node evaluates to false");
				false
			}
		}
	}
}

fn resolve_path<'a>(
	path: &str,
	context: &'a UserContext,
	record: Option<&'a RecordContext>,
) -> Option<Attribute<'a>> {
	if let Some(name) = path.strip_prefix(CONTEXT_PREFIX) {
		return context.attribute(name);
	}
	if let Some(name) = path.strip_prefix(RECORD_PREFIX) {
		return record?.attribute(name);
	}
	None
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
	Equals { equals: (String, String) },
	And { and: Vec<DslNode> },
	Or { or: Vec<DslNode> },
	Other(Value),
}

impl From<RawNode> for DslNode {
	fn from(raw: RawNode) -> Self {
		match raw {
			RawNode::Equals { equals: (a, b) } => DslNode::Equals(a, b),
			RawNode::And { and } => DslNode::And(and),
			RawNode::Or { or } => DslNode::Or(or),
			RawNode::Other(value) => DslNode::Unrecognized(describe_shape(&value)),
		}
	}
}

fn describe_shape(value: &Value) -> String {
	match value {
		Value::Object(map) => {
			let keys: Vec<&str> = map.keys().map(String::as_str).collect();
			format!("{{{}}}", keys.join(", "))
		}
		Value::Array(_) => "array".to_string(),
		Value::String(_) => "string".to_string(),
		Value::Number(_) => "number".to_string(),
		Value::Bool(_) => "bool".to_string(),
		Value::Null => "null".to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn ctx() -> UserContext {
		UserContext::new("u1", "member", "t1").with_attribute("region", "eu")
	}

	fn record(tenant: &str) -> RecordContext {
		RecordContext::new().with("tenantId", tenant)
	}

	mod equals {
		use super::*;

		#[test]
		fn matches_context_and_record() {
			let node = DslNode::equals("record.tenantId", "context.tenantId");
			assert!(node.evaluate(&ctx(), Some(&record("t1"))));
			assert!(!node.evaluate(&ctx(), Some(&record("t2"))));
		}

		#[test]
		fn two_unresolved_paths_are_not_equal() {
			let node = DslNode::equals("context.missing", "record.missing");
			assert!(!node.evaluate(&ctx(), Some(&RecordContext::new())));
			assert!(!node.evaluate(&ctx(), None));
		}

		#[test]
		fn same_unresolved_path_is_not_equal_to_itself() {
			let node = DslNode::equals("context.missing", "context.missing");
			assert!(!node.evaluate(&ctx(), None));
		}

		#[test]
		fn record_path_without_record_is_unresolved() {
			let node = DslNode::equals("record.tenantId", "context.tenantId");
			assert!(!node.evaluate(&ctx(), None));
		}

		#[test]
		fn unknown_prefix_is_unresolved() {
			let node = DslNode::equals("request.tenantId", "request.tenantId");
			assert!(!node.evaluate(&ctx(), Some(&record("t1"))));
		}

		#[test]
		fn null_values_are_unresolved() {
			let rec = RecordContext::new().with("owner", Value::Null);
			let ctx = ctx().with_attribute("owner", Value::Null);
			let node = DslNode::equals("context.owner", "record.owner");
			assert!(!node.evaluate(&ctx, Some(&rec)));
		}

		#[test]
		fn extra_attributes_compare() {
			let node = DslNode::equals("context.region", "record.region");
			assert!(node.evaluate(&ctx(), Some(&RecordContext::new().with("region", "eu"))));
			assert!(!node.evaluate(&ctx(), Some(&RecordContext::new().with("region", "us"))));
		}

		#[test]
		fn large_integers_compare_exactly() {
			let ctx = ctx().with_attribute("accountNo", 9_007_199_254_740_993u64);
			let node = DslNode::equals("context.accountNo", "record.ownerAccountNo");

			let neighbour = RecordContext::new().with("ownerAccountNo", 9_007_199_254_740_992u64);
			assert!(!node.evaluate(&ctx, Some(&neighbour)));

			let owner = RecordContext::new().with("ownerAccountNo", 9_007_199_254_740_993u64);
			assert!(node.evaluate(&ctx, Some(&owner)));
		}

		#[test]
		fn integers_beyond_i64_compare_exactly() {
			let ctx = ctx().with_attribute("serial", u64::MAX);
			let node = DslNode::equals("context.serial", "record.serial");

			assert!(node.evaluate(&ctx, Some(&RecordContext::new().with("serial", u64::MAX))));
			assert!(!node.evaluate(&ctx, Some(&RecordContext::new().with("serial", u64::MAX - 1))));
			assert!(!node.evaluate(&ctx, Some(&RecordContext::new().with("serial", -1i64))));
		}

		#[test]
		fn integer_equals_float_of_same_value() {
			let ctx = ctx().with_attribute("clearance", 3);
			let node = DslNode::equals("context.clearance", "record.clearance");

			assert!(node.evaluate(&ctx, Some(&RecordContext::new().with("clearance", 3.0))));
			assert!(!node.evaluate(&ctx, Some(&RecordContext::new().with("clearance", 3.5))));
		}
	}

	mod combinators {
		use super::*;

		#[test]
		fn empty_and_is_true() {
			assert!(DslNode::And(vec![]).evaluate(&ctx(), None));
		}

		#[test]
		fn empty_or_is_false() {
			assert!(!DslNode::Or(vec![]).evaluate(&ctx(), None));
		}

		#[test]
		fn nested_tree() {
			let node = DslNode::and([
				DslNode::equals("record.tenantId", "context.tenantId"),
				DslNode::or([
					DslNode::equals("context.role", "record.requiredRole"),
					DslNode::equals("context.userId", "record.createdBy"),
				]),
			]);

			let owner = record("t1").with("createdBy", "u1");
			let stranger = record("t1").with("createdBy", "u2");
			let other_tenant = record("t2").with("createdBy", "u1");

			assert!(node.evaluate(&ctx(), Some(&owner)));
			assert!(!node.evaluate(&ctx(), Some(&stranger)));
			assert!(!node.evaluate(&ctx(), Some(&other_tenant)));
		}

		#[test]
		fn unrecognized_node_is_false() {
			assert!(!DslNode::Unrecognized("{not}".into()).evaluate(&ctx(), None));
			assert!(!DslNode::or([DslNode::Unrecognized("{x}".into())]).evaluate(&ctx(), None));
		}
	}

	mod short_circuit {
		use super::*;
		use std::sync::atomic::{AtomicUsize, Ordering};
		use tracing::Subscriber;
		use tracing_subscriber::layer::{Context, SubscriberExt};
		use tracing_subscriber::Layer;

		/// Counts events emitted while evaluating. Only an evaluated
		/// unrecognized node emits one.
		#[derive(Clone, Default)]
		struct EventCounter(Arc<AtomicUsize>);

		impl<S: Subscriber> Layer<S> for EventCounter {
			fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
				if event.metadata().target().starts_with("warden_policy") {
					self.0.fetch_add(1, Ordering::SeqCst);
				}
			}
		}

		fn evaluated_unrecognized(node: &DslNode, record: Option<&RecordContext>) -> (bool, usize) {
			let counter = EventCounter::default();
			let subscriber = tracing_subscriber::registry().with(counter.clone());
			let result = tracing::subscriber::with_default(subscriber, || node.evaluate(&ctx(), record));
			(result, counter.0.load(Ordering::SeqCst))
		}

		#[test]
		fn and_stops_at_first_false_child() {
			let node = DslNode::and([
				DslNode::equals("record.tenantId", "context.tenantId"),
				DslNode::Unrecognized("{later}".into()),
			]);

			assert_eq!(evaluated_unrecognized(&node, Some(&record("t2"))), (false, 0));
			assert_eq!(evaluated_unrecognized(&node, Some(&record("t1"))), (false, 1));
		}

		#[test]
		fn or_stops_at_first_true_child() {
			let node = DslNode::or([
				DslNode::equals("record.tenantId", "context.tenantId"),
				DslNode::Unrecognized("{later}".into()),
			]);

			assert_eq!(evaluated_unrecognized(&node, Some(&record("t1"))), (true, 0));
			assert_eq!(evaluated_unrecognized(&node, Some(&record("t2"))), (false, 1));
		}
	}

	mod predicates {
		use super::*;

		#[test]
		fn from_fn_sees_context_and_record() {
			let condition = Condition::from_fn(|ctx, record| {
				record.and_then(|r| r.get("region")).and_then(Value::as_str)
					== ctx.get("region").and_then(Value::as_str)
			});

			let eu = RecordContext::new().with("region", "eu");
			let us = RecordContext::new().with("region", "us");
			assert_eq!(condition.evaluate(&ctx(), Some(&eu)), Ok(true));
			assert_eq!(condition.evaluate(&ctx(), Some(&us)), Ok(false));
		}

		#[test]
		fn predicate_errors_propagate() {
			let condition =
				Condition::predicate(|_, _| Err(PredicateError::new("clearance lookup failed")));
			let err = condition.evaluate(&ctx(), None).unwrap_err();
			assert_eq!(err.message(), "clearance lookup failed");
		}

		struct MinClearance(i64);

		impl Predicate for MinClearance {
			fn evaluate(
				&self,
				context: &UserContext,
				_record: Option<&RecordContext>,
			) -> Result<bool, PredicateError> {
				let level = context
					.get("clearanceLevel")
					.and_then(Value::as_i64)
					.ok_or_else(|| PredicateError::new("clearanceLevel missing"))?;
				Ok(level >= self.0)
			}
		}

		#[test]
		fn custom_predicate_struct() {
			let condition = Condition::custom(MinClearance(3));
			let cleared = ctx().with_attribute("clearanceLevel", 3);
			let junior = ctx().with_attribute("clearanceLevel", 1);

			assert_eq!(condition.evaluate(&cleared, None), Ok(true));
			assert_eq!(condition.evaluate(&junior, None), Ok(false));
			assert!(condition.evaluate(&ctx(), None).is_err());
		}
	}

	mod parsing {
		use super::*;

		#[test]
		fn parses_json_tree() {
			let node: DslNode = serde_json::from_value(json!({
				"and": [
					{"equals": ["record.tenantId", "context.tenantId"]},
					{"or": []}
				]
			}))
			.unwrap();

			assert_eq!(
				node,
				DslNode::and([
					DslNode::equals("record.tenantId", "context.tenantId"),
					DslNode::Or(vec![]),
				])
			);
		}

		#[test]
		fn parses_toml_inline_table() {
			#[derive(Deserialize)]
			struct Holder {
				condition: Condition,
			}

			let holder: Holder = toml::from_str(
				r#"condition = { or = [ { equals = ["context.role", "record.role"] } ] }"#,
			)
			.unwrap();

			match holder.condition {
				Condition::Dsl(node) => assert_eq!(
					node,
					DslNode::or([DslNode::equals("context.role", "record.role")])
				),
				other => panic!("expected DSL condition, got {other:?}"),
			}
		}

		#[test]
		fn unknown_tag_becomes_unrecognized() {
			let node: DslNode =
				serde_json::from_value(json!({"notEquals": ["context.a", "record.a"]})).unwrap();
			assert_eq!(node, DslNode::Unrecognized("{notEquals}".to_string()));
			assert!(!node.evaluate(&ctx(), Some(&record("t1"))));
		}

		#[test]
		fn malformed_equals_becomes_unrecognized() {
			let node: DslNode = serde_json::from_value(json!({"equals": ["context.a"]})).unwrap();
			assert!(matches!(node, DslNode::Unrecognized(_)));
		}

		#[test]
		fn unknown_child_inside_and_denies() {
			let node: DslNode = serde_json::from_value(json!({
				"and": [{"equals": ["context.tenantId", "record.tenantId"]}, {"xor": []}]
			}))
			.unwrap();
			assert!(!node.evaluate(&ctx(), Some(&record("t1"))));
		}
	}

	fn leaf(truth: bool) -> DslNode {
		if truth {
			DslNode::equals("context.userId", "context.userId")
		} else {
			DslNode::equals("context.userId", "context.missing")
		}
	}

	proptest! {
		#[test]
		fn and_is_conjunction(values in prop::collection::vec(any::<bool>(), 0..8)) {
			let node = DslNode::and(values.iter().copied().map(leaf));
			prop_assert_eq!(node.evaluate(&ctx(), None), values.iter().all(|v| *v));
		}

		#[test]
		fn or_is_disjunction(values in prop::collection::vec(any::<bool>(), 0..8)) {
			let node = DslNode::or(values.iter().copied().map(leaf));
			prop_assert_eq!(node.evaluate(&ctx(), None), values.iter().any(|v| *v));
		}

		#[test]
		fn missing_attributes_never_match(name in "[a-z]{1,12}") {
			let node = DslNode::equals(format!("context.x_{name}"), format!("record.x_{name}"));
			prop_assert!(!node.evaluate(&ctx(), Some(&RecordContext::new())));
		}
	}
}
