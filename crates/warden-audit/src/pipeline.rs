// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, instrument, warn};
use warden_config::AuditConfig;
use warden_policy::{AccessEvaluationResult, AccessRequest, UserContext};

use crate::error::AuditSinkError;
use crate::event::AccessLogEntry;
use crate::sink::{sink_from_config, AuditSink};

/// Concurrent sink writes allowed when no limit is configured.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Fire-and-forget front for the active sink.
///
/// Entries go through a bounded queue; a background task hands each one to
/// the sink on its own task so a slow write never delays later entries.
/// At most `max_in_flight` writes run at once. Once they are all busy the
/// queue fills and further entries are dropped.
/// Must be constructed inside a Tokio runtime.
pub struct AuditService {
	tx: mpsc::Sender<AccessLogEntry>,
	worker: JoinHandle<()>,
	sink_name: String,
}

impl AuditService {
	pub fn new(sink: Arc<dyn AuditSink>, queue_capacity: usize) -> Self {
		Self::with_max_in_flight(sink, queue_capacity, DEFAULT_MAX_IN_FLIGHT)
	}

	pub fn with_max_in_flight(
		sink: Arc<dyn AuditSink>,
		queue_capacity: usize,
		max_in_flight: usize,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));
		let sink_name = sink.name().to_string();
		let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
		let worker = tokio::spawn(Self::background_task(rx, sink, permits));

		Self {
			tx,
			worker,
			sink_name,
		}
	}

	/// Builds the sink selected by `config` and starts the service.
	pub fn from_config(config: &AuditConfig) -> Result<Self, AuditSinkError> {
		let sink = sink_from_config(config)?;
		Ok(Self::with_max_in_flight(
			sink,
			config.queue_capacity,
			config.max_in_flight,
		))
	}

	pub fn sink_name(&self) -> &str {
		&self.sink_name
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AccessLogEntry>,
		sink: Arc<dyn AuditSink>,
		permits: Arc<Semaphore>,
	) {
		let mut writes = JoinSet::new();

		loop {
			// Entries stay queued until a write slot is free.
			let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
				break;
			};
			let Some(entry) = rx.recv().await else {
				break;
			};
			let sink = Arc::clone(&sink);
			let entry = Arc::new(entry);

			writes.spawn(async move {
				if let Err(e) = sink.write(entry).await {
					warn!(sink = sink.name(), error = %e, "audit sink write failed");
				}
				drop(permit);
			});

			while writes.try_join_next().is_some() {}
		}

		while writes.join_next().await.is_some() {}
		debug!(sink = sink.name(), "audit queue drained");
	}

	/// Queues an entry for delivery.
	///
	/// Returns `true` if the entry was queued, `false` if it was dropped
	/// because the queue is full. Never blocks.
	#[instrument(level = "trace", skip(self, entry), fields(resource = %entry.resource, can = entry.can))]
	pub fn log(&self, entry: AccessLogEntry) -> bool {
		match self.tx.try_send(entry) {
			Ok(()) => true,
			Err(mpsc::error::TrySendError::Full(entry)) => {
				warn!(sink = %self.sink_name, id = %entry.id, "audit queue full, dropping entry");
				false
			}
			Err(mpsc::error::TrySendError::Closed(_)) => false,
		}
	}

	/// Builds the entry for an evaluated request and queues it.
	pub fn record(
		&self,
		context: &UserContext,
		request: &AccessRequest<'_>,
		result: &AccessEvaluationResult,
	) -> bool {
		self.log(AccessLogEntry::from_decision(context, request, result))
	}

	/// Stops accepting entries and waits for every queued write to finish.
	pub async fn shutdown(self) {
		let Self { tx, worker, .. } = self;
		drop(tx);
		if let Err(e) = worker.await {
			warn!(error = %e, "audit worker terminated abnormally");
		}
	}
}
