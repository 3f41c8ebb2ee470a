// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::sections::{AuditConfigLayer, LoggingConfigLayer, PolicyConfigLayer};

/// Partial configuration produced by one source. Later layers win field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WardenConfigLayer {
	pub audit: Option<AuditConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub policy: Option<PolicyConfigLayer>,
}

impl WardenConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if let Some(audit) = other.audit {
			self.audit.get_or_insert_with(Default::default).merge(audit);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
		if let Some(policy) = other.policy {
			self.policy.get_or_insert_with(Default::default).merge(policy);
		}
	}
}
