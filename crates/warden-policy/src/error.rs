// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Raised by a native predicate that could not reach a decision.
///
/// This is a policy-authoring bug, not an access outcome, so the engine
/// propagates it instead of turning it into a denial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PredicateError {
	message: String,
}

impl PredicateError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

#[derive(Error, Debug)]
pub enum PolicyError {
	#[error("condition for rule {resource}/{action} failed: {source}")]
	Predicate {
		resource: String,
		action: String,
		#[source]
		source: PredicateError,
	},

	#[error("failed to read rule file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse TOML rules: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("failed to parse JSON rules: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("unsupported rule file format: {path} (expected .toml or .json)")]
	UnsupportedFormat { path: PathBuf },
}
