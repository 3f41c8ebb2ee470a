// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use warden_config::FileSinkConfig;

use crate::error::AuditSinkError;
use crate::event::AccessLogEntry;
use crate::sink::AuditSink;

/// Appends one JSON line per entry to a local file.
///
/// The file and its parent directory are created on first write.
pub struct FileAuditSink {
	path: PathBuf,
	handle: Mutex<Option<File>>,
}

impl FileAuditSink {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			handle: Mutex::new(None),
		}
	}

	pub fn from_config(config: &FileSinkConfig) -> Self {
		Self::new(config.path.clone())
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn open(&self) -> Result<File, AuditSinkError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await.map_err(|e| {
				AuditSinkError::Transient(format!(
					"failed to create directory {}: {e}",
					parent.display()
				))
			})?;
		}

		OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("failed to open file: {e}")))
	}
}

#[async_trait]
impl AuditSink for FileAuditSink {
	fn name(&self) -> &str {
		"file"
	}

	async fn write(&self, entry: Arc<AccessLogEntry>) -> Result<(), AuditSinkError> {
		let line = format_json_line(&entry)?;

		let mut guard = self.handle.lock().await;
		if guard.is_none() {
			*guard = Some(self.open().await?);
		}
		let Some(file) = guard.as_mut() else {
			return Err(AuditSinkError::Permanent(
				"file handle not initialized".to_string(),
			));
		};

		let written = match file.write_all(line.as_bytes()).await {
			Ok(()) => file
				.flush()
				.await
				.map_err(|e| format!("failed to flush file: {e}")),
			Err(e) => Err(format!("failed to write to file: {e}")),
		};

		written.map_err(|message| {
			// Reopen on the next write.
			*guard = None;
			AuditSinkError::Transient(message)
		})
	}
}

pub fn format_json_line(entry: &AccessLogEntry) -> Result<String, AuditSinkError> {
	let json = serde_json::to_string(entry)
		.map_err(|e| AuditSinkError::Permanent(format!("JSON serialization failed: {e}")))?;
	Ok(format!("{json}\n"))
}
