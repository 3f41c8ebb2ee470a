// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use warden_config::RemoteSinkConfig;

use crate::error::AuditSinkError;
use crate::event::AccessLogEntry;
use crate::sink::AuditSink;

const USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));

/// The entry as sent to the ingestion endpoint.
#[derive(Debug, Serialize)]
pub struct RemotePayload<'a> {
	#[serde(flatten)]
	pub entry: &'a AccessLogEntry,
	pub level: &'static str,
	pub message: String,
	pub service: &'a str,
}

impl<'a> RemotePayload<'a> {
	pub fn new(entry: &'a AccessLogEntry, service: &'a str) -> Self {
		Self {
			entry,
			level: entry.severity().as_str(),
			message: entry.message(),
			service,
		}
	}
}

/// Best-effort delivery to a remote log ingestion endpoint.
///
/// One POST per entry, at most once: no retries and no buffering.
pub struct HttpAuditSink {
	client: Client,
	url: String,
	source_token: String,
	service: String,
}

impl HttpAuditSink {
	pub fn new(config: &RemoteSinkConfig) -> Result<Self, AuditSinkError> {
		if config.timeout_ms == 0 {
			return Err(AuditSinkError::Permanent(
				"remote audit timeout must be greater than zero".to_string(),
			));
		}

		let client = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(Duration::from_millis(config.timeout_ms))
			.build()
			.map_err(|e| AuditSinkError::Permanent(format!("failed to build HTTP client: {e}")))?;

		Ok(Self {
			client,
			url: config.url.clone(),
			source_token: config.source_token.clone(),
			service: config.service.clone(),
		})
	}
}

impl std::fmt::Debug for HttpAuditSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpAuditSink")
			.field("url", &self.url)
			.field("source_token", &"[REDACTED]")
			.field("service", &self.service)
			.finish()
	}
}

#[async_trait]
impl AuditSink for HttpAuditSink {
	fn name(&self) -> &str {
		"http"
	}

	async fn write(&self, entry: Arc<AccessLogEntry>) -> Result<(), AuditSinkError> {
		let payload = RemotePayload::new(&entry, &self.service);

		let response = self
			.client
			.post(&self.url)
			.bearer_auth(&self.source_token)
			.json(&payload)
			.send()
			.await
			.map_err(|e| AuditSinkError::Transient(format!("request failed: {e}")))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			let message = format!("ingestion endpoint returned {status}: {body}");
			return Err(if status.is_client_error() {
				AuditSinkError::Permanent(message)
			} else {
				AuditSinkError::Transient(message)
			});
		}

		debug!(id = %entry.id, status = status.as_u16(), "access log entry delivered");
		Ok(())
	}
}
