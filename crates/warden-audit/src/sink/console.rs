// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AuditSinkError;
use crate::event::AccessLogEntry;
use crate::sink::AuditSink;

/// Emits each entry as a `tracing` event on the `warden::access` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAuditSink;

impl ConsoleAuditSink {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl AuditSink for ConsoleAuditSink {
	fn name(&self) -> &str {
		"console"
	}

	async fn write(&self, entry: Arc<AccessLogEntry>) -> Result<(), AuditSinkError> {
		let message = entry.message();
		if entry.can {
			info!(
				target: "warden::access",
				id = %entry.id,
				resource = %entry.resource,
				action = %entry.action,
				user_id = %entry.context.user_id,
				tenant_id = %entry.context.tenant_id,
				record_id = ?entry.record_id,
				field = ?entry.field,
				can = entry.can,
				"{message}"
			);
		} else {
			warn!(
				target: "warden::access",
				id = %entry.id,
				resource = %entry.resource,
				action = %entry.action,
				user_id = %entry.context.user_id,
				tenant_id = %entry.context.tenant_id,
				record_id = ?entry.record_id,
				field = ?entry.field,
				can = entry.can,
				reason = ?entry.reason,
				"{message}"
			);
		}
		Ok(())
	}
}
