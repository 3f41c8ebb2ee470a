// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use http::header::HeaderName;
use http::HeaderMap;
use tracing::{debug, instrument};
use warden_policy::UserContext;

use crate::error::ResolveError;

pub const DEFAULT_USER_ID_HEADER: &str = "x-user-id";
pub const DEFAULT_ROLE_HEADER: &str = "x-user-role";
pub const DEFAULT_TENANT_ID_HEADER: &str = "x-tenant-id";

/// Turns an incoming request into the subject context.
///
/// Implementations must fail with [`ResolveError::Unauthorized`] when any of
/// user id, role or tenant id cannot be established.
#[async_trait]
pub trait ContextResolver: Send + Sync {
	async fn resolve(&self, headers: &HeaderMap) -> Result<UserContext, ResolveError>;
}

/// Reads the subject from headers set by an upstream identity proxy.
#[derive(Debug, Clone)]
pub struct HeaderContextResolver {
	user_id: HeaderName,
	role: HeaderName,
	tenant_id: HeaderName,
}

impl HeaderContextResolver {
	pub fn new() -> Self {
		Self {
			user_id: HeaderName::from_static(DEFAULT_USER_ID_HEADER),
			role: HeaderName::from_static(DEFAULT_ROLE_HEADER),
			tenant_id: HeaderName::from_static(DEFAULT_TENANT_ID_HEADER),
		}
	}

	pub fn with_headers(user_id: HeaderName, role: HeaderName, tenant_id: HeaderName) -> Self {
		Self {
			user_id,
			role,
			tenant_id,
		}
	}
}

impl Default for HeaderContextResolver {
	fn default() -> Self {
		Self::new()
	}
}

fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
		.filter(|v| !v.is_empty())
}

#[async_trait]
impl ContextResolver for HeaderContextResolver {
	#[instrument(level = "trace", skip_all)]
	async fn resolve(&self, headers: &HeaderMap) -> Result<UserContext, ResolveError> {
		let (Some(user_id), Some(role), Some(tenant_id)) = (
			header_value(headers, &self.user_id),
			header_value(headers, &self.role),
			header_value(headers, &self.tenant_id),
		) else {
			debug!("identity headers missing or empty");
			return Err(ResolveError::incomplete_session());
		};

		Ok(UserContext::new(user_id, role, tenant_id))
	}
}
