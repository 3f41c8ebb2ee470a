// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-control decision engine for Warden.
//!
//! Given a resolved [`UserContext`], a requested resource/action (optionally a
//! single field) and an ordered [`RuleSet`], [`evaluate_access`] decides whether
//! the operation is allowed.
//!
//! - [`context`]: subject and record attributes used by conditions
//! - [`condition`]: native predicates and the [`DslNode`] expression tree
//! - [`rule`]: [`PermissionRule`], [`AccessLevel`] and rule-file loading
//! - [`engine`]: first-match rule scanning and field-permission resolution
//!
//! Evaluation is pure: no I/O, no shared mutable state. Audit logging of the
//! decision is the caller's job (see `warden-audit`).

pub mod condition;
pub mod context;
pub mod engine;
pub mod error;
pub mod rule;

pub use condition::{Condition, DslNode, Predicate};
pub use context::{Attribute, RecordContext, UserContext};
pub use engine::{
	evaluate_access, AccessEvaluationResult, AccessRequest, NO_MATCHING_RULE_REASON,
};
pub use error::{PolicyError, PredicateError};
pub use rule::{AccessLevel, PermissionRule, RuleSet};
