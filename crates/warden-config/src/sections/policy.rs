// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfigLayer {
	pub rules_path: Option<PathBuf>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.rules_path.is_some() {
			self.rules_path = other.rules_path;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		PolicyConfig {
			rules_path: self.rules_path,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
	/// Rule file used when no path is given on the command line.
	pub rules_path: Option<PathBuf>,
}
