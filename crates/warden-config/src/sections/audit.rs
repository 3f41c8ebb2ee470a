// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.
//!
//! Exactly one delivery target is active per process:
//!
//! ```toml
//! [audit]
//! target = "remote"            # console | file | remote
//! queue_capacity = 10000
//! max_in_flight = 64
//!
//! [audit.file]
//! path = "./logs/access.log"
//!
//! [audit.remote]
//! url = "https://in.logs.betterstack.com"
//! source_token = "..."
//! timeout_ms = 5000
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_QUEUE_CAPACITY: usize = 10000;
const DEFAULT_MAX_IN_FLIGHT: usize = 64;
const DEFAULT_FILE_PATH: &str = "./logs/access.log";
const DEFAULT_REMOTE_URL: &str = "https://in.logs.betterstack.com";
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_REMOTE_SERVICE: &str = "auth-service";

/// Where access log entries are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditTarget {
	#[default]
	Console,
	File,
	#[serde(alias = "betterstack")]
	Remote,
}

impl FromStr for AuditTarget {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"console" => Ok(AuditTarget::Console),
			"file" => Ok(AuditTarget::File),
			"remote" | "betterstack" => Ok(AuditTarget::Remote),
			other => Err(format!(
				"unknown audit target '{other}' (expected console, file or remote)"
			)),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub target: Option<AuditTarget>,
	pub queue_capacity: Option<usize>,
	pub max_in_flight: Option<usize>,
	pub file: Option<FileSinkConfigLayer>,
	pub remote: Option<RemoteSinkConfigLayer>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.target.is_some() {
			self.target = other.target;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.max_in_flight.is_some() {
			self.max_in_flight = other.max_in_flight;
		}
		if let Some(file) = other.file {
			self.file.get_or_insert_with(Default::default).merge(file);
		}
		if let Some(remote) = other.remote {
			self.remote.get_or_insert_with(Default::default).merge(remote);
		}
	}

	pub fn finalize(self) -> AuditConfig {
		let file = self.file.unwrap_or_default().finalize();
		let remote = self.remote.and_then(|l| l.finalize());

		let mut target = self.target.unwrap_or_default();
		if target == AuditTarget::Remote && remote.is_none() {
			warn!("remote audit target selected without a source token, falling back to console");
			target = AuditTarget::Console;
		}

		AuditConfig {
			target,
			queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
			max_in_flight: self
				.max_in_flight
				.filter(|&n| n > 0)
				.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
			file,
			remote,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
	pub target: AuditTarget,
	pub queue_capacity: usize,
	/// Upper bound on sink writes running at the same time.
	pub max_in_flight: usize,
	pub file: FileSinkConfig,
	/// Present only when a source token was configured.
	pub remote: Option<RemoteSinkConfig>,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileSinkConfigLayer {
	pub path: Option<PathBuf>,
}

impl FileSinkConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.path.is_some() {
			self.path = other.path;
		}
	}

	pub fn finalize(self) -> FileSinkConfig {
		FileSinkConfig {
			path: self.path.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_PATH)),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSinkConfig {
	pub path: PathBuf,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteSinkConfigLayer {
	pub url: Option<String>,
	pub source_token: Option<String>,
	pub timeout_ms: Option<u64>,
	pub service: Option<String>,
}

impl RemoteSinkConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.source_token.is_some() {
			self.source_token = other.source_token;
		}
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.service.is_some() {
			self.service = other.service;
		}
	}

	/// Returns `None` when no source token is configured.
	pub fn finalize(self) -> Option<RemoteSinkConfig> {
		let source_token = self.source_token.filter(|t| !t.is_empty())?;

		let timeout_ms = match self.timeout_ms {
			Some(0) => {
				warn!(
					default_ms = DEFAULT_REMOTE_TIMEOUT_MS,
					"remote audit timeout of 0 ms would fail every delivery, using default"
				);
				DEFAULT_REMOTE_TIMEOUT_MS
			}
			Some(ms) => ms,
			None => DEFAULT_REMOTE_TIMEOUT_MS,
		};

		Some(RemoteSinkConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
			source_token,
			timeout_ms,
			service: self
				.service
				.unwrap_or_else(|| DEFAULT_REMOTE_SERVICE.to_string()),
		})
	}
}

impl std::fmt::Debug for RemoteSinkConfigLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteSinkConfigLayer")
			.field("url", &self.url)
			.field(
				"source_token",
				&self.source_token.as_ref().map(|_| "[REDACTED]"),
			)
			.field("timeout_ms", &self.timeout_ms)
			.field("service", &self.service)
			.finish()
	}
}

/// Remote ingestion sink configuration.
///
/// Does not derive Debug: `source_token` is a credential.
#[derive(Clone, PartialEq)]
pub struct RemoteSinkConfig {
	pub url: String,
	pub source_token: String,
	pub timeout_ms: u64,
	/// Reported as `service` in every payload.
	pub service: String,
}

impl std::fmt::Debug for RemoteSinkConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteSinkConfig")
			.field("url", &self.url)
			.field("source_token", &"[REDACTED]")
			.field("timeout_ms", &self.timeout_ms)
			.field("service", &self.service)
			.finish()
	}
}
