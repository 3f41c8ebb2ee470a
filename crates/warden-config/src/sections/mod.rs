// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod audit;
mod logging;
mod policy;

pub use audit::{
	AuditConfig, AuditConfigLayer, AuditTarget, FileSinkConfig, FileSinkConfigLayer,
	RemoteSinkConfig, RemoteSinkConfigLayer,
};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use policy::{PolicyConfig, PolicyConfigLayer};
