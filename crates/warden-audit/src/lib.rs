// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access decision audit log.
//!
//! Callers of the evaluator build one [`AccessLogEntry`] per decision and hand
//! it to an [`AuditService`], which delivers it through the single active
//! [`AuditSink`]. Delivery failures are logged and never reach the caller.

pub mod error;
pub mod event;
pub mod pipeline;
pub mod sink;

pub use error::AuditSinkError;
pub use event::{AccessLogBuilder, AccessLogEntry, AccessSeverity};
pub use pipeline::AuditService;
pub use sink::{sink_from_config, AuditSink, ConsoleAuditSink, FileAuditSink, HttpAuditSink};

pub use warden_config::{AuditConfig, AuditTarget};
