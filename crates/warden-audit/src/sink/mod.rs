// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery adapters for access log entries.

pub mod console;
pub mod file;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use warden_config::{AuditConfig, AuditTarget};

use crate::error::AuditSinkError;
use crate::event::AccessLogEntry;

pub use console::ConsoleAuditSink;
pub use file::FileAuditSink;
pub use http::HttpAuditSink;

/// Write-once-per-decision delivery contract.
///
/// Errors are returned to [`crate::AuditService`], which logs and discards them.
#[async_trait]
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	async fn write(&self, entry: Arc<AccessLogEntry>) -> Result<(), AuditSinkError>;
}

/// Builds the single active sink selected by `config`.
pub fn sink_from_config(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, AuditSinkError> {
	let sink: Arc<dyn AuditSink> = match (config.target, &config.remote) {
		(AuditTarget::Console, _) => Arc::new(ConsoleAuditSink::new()),
		(AuditTarget::File, _) => Arc::new(FileAuditSink::from_config(&config.file)),
		(AuditTarget::Remote, Some(remote)) => Arc::new(HttpAuditSink::new(remote)?),
		(AuditTarget::Remote, None) => {
			return Err(AuditSinkError::Permanent(
				"remote audit target requires a source token".to_string(),
			))
		}
	};

	info!(sink = sink.name(), "audit sink selected");
	Ok(sink)
}
