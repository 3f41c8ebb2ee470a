// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use warden_policy::PolicyError;

pub const INCOMPLETE_SESSION_MESSAGE: &str = "Unauthorized or incomplete session";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
	#[error("{0}")]
	Unauthorized(String),
}

impl ResolveError {
	pub fn incomplete_session() -> Self {
		ResolveError::Unauthorized(INCOMPLETE_SESSION_MESSAGE.to_string())
	}
}

#[derive(Error, Debug)]
pub enum GateError {
	#[error(transparent)]
	Unauthorized(#[from] ResolveError),

	#[error("{reason}")]
	Forbidden { reason: String },

	#[error("policy evaluation failed: {0}")]
	Policy(#[from] PolicyError),
}

impl GateError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			GateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			GateError::Forbidden { .. } => StatusCode::FORBIDDEN,
			GateError::Policy(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// JSON response body: `{"error": "<message>"}`.
	///
	/// Policy failures get a generic message; details stay in the server log.
	pub fn body(&self) -> Value {
		let message = match self {
			GateError::Policy(_) => "Internal authorization error".to_string(),
			other => other.to_string(),
		};
		json!({ "error": message })
	}
}
