// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Args;
use tracing::info;
use warden_audit::AuditService;
use warden_config::WardenConfig;
use warden_policy::{AccessEvaluationResult, AccessRequest, RecordContext, RuleSet, UserContext};

#[derive(Args, Debug)]
pub struct CheckArgs {
	/// Rule file (.toml or .json); falls back to policy.rules_path
	#[arg(long)]
	pub rules: Option<PathBuf>,

	/// Subject context as JSON, e.g. '{"userId":"u1","role":"admin","tenantId":"t1"}'
	#[arg(long)]
	pub context: String,

	#[arg(long)]
	pub resource: String,

	#[arg(long)]
	pub action: String,

	/// Record attributes as a JSON object
	#[arg(long)]
	pub record: Option<String>,

	/// Field to check after resource-level access
	#[arg(long)]
	pub field: Option<String>,
}

pub fn rules_path(explicit: Option<PathBuf>, config: &WardenConfig) -> anyhow::Result<PathBuf> {
	explicit
		.or_else(|| config.policy.rules_path.clone())
		.ok_or_else(|| anyhow!("no rule file given (pass --rules or set WARDEN_RULES_PATH)"))
}

pub fn validate(path: &Path) -> anyhow::Result<usize> {
	let rules = RuleSet::load(path)
		.with_context(|| format!("invalid rule file {}", path.display()))?;
	Ok(rules.len())
}

/// Evaluates the request, writes its audit entry and waits for delivery.
pub async fn check(args: CheckArgs, config: &WardenConfig) -> anyhow::Result<AccessEvaluationResult> {
	let path = rules_path(args.rules, config)?;
	let rules = RuleSet::load(&path)
		.with_context(|| format!("invalid rule file {}", path.display()))?;

	let context: UserContext =
		serde_json::from_str(&args.context).context("--context is not a valid user context")?;
	let record: Option<RecordContext> = args
		.record
		.as_deref()
		.map(serde_json::from_str)
		.transpose()
		.context("--record must be a JSON object")?;

	let mut request = AccessRequest::new(&args.resource, &args.action);
	if let Some(record) = &record {
		request = request.on_record(record);
	}
	if let Some(field) = &args.field {
		request = request.field(field);
	}

	let result = rules.evaluate(&context, &request)?;
	info!(
		resource = %args.resource,
		action = %args.action,
		can = result.can,
		"access evaluated"
	);

	let audit = AuditService::from_config(&config.audit)?;
	audit.record(&context, &request, &result);
	audit.shutdown().await;

	Ok(result)
}
