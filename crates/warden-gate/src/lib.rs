// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization at the request boundary.
//!
//! ```text
//! HeaderMap → ContextResolver → UserContext ─┐
//!                                            ├→ evaluate_access → decision → AuditService
//!                         RuleSet ───────────┘
//! ```
//!
//! A failed resolution maps to 401, a denial to 403 carrying the reason.

pub mod error;
pub mod gate;
pub mod resolver;

pub use error::{GateError, ResolveError};
pub use gate::Gate;
pub use resolver::{
	ContextResolver, HeaderContextResolver, DEFAULT_ROLE_HEADER, DEFAULT_TENANT_ID_HEADER,
	DEFAULT_USER_ID_HEADER,
};
