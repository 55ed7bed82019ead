// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping of domain events onto ledger entries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::dedup::DedupGuard;
use crate::directory::EntityDirectory;
use crate::error::{AuditError, AuditResult};
use crate::event::{AuditEvent, AuditRecordId, Change, EntityRef, NewAuditRecord};
use crate::store::AuditStore;

/// What happened to an event handed to an [`AuditSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
	/// A record was written.
	Recorded(AuditRecordId),
	/// A session event fell inside the dedup window of an earlier one.
	Suppressed,
	/// Nothing was written: auditing is disabled, or the write failed and the
	/// failure policy chose not to surface it.
	Dropped,
}

impl RecordOutcome {
	pub fn record_id(&self) -> Option<AuditRecordId> {
		match self {
			RecordOutcome::Recorded(id) => Some(*id),
			_ => None,
		}
	}
}

/// Capability held by components that emit auditable events.
#[async_trait]
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	async fn record(&self, event: AuditEvent) -> AuditResult<RecordOutcome>;
}

/// Sink used when auditing is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
	fn name(&self) -> &str {
		"noop"
	}

	async fn record(&self, _event: AuditEvent) -> AuditResult<RecordOutcome> {
		Ok(RecordOutcome::Dropped)
	}
}

/// Resolves references, applies session dedup, and writes one record per
/// accepted event.
pub struct AuditRecorder {
	store: Arc<dyn AuditStore>,
	directory: Arc<dyn EntityDirectory>,
	guard: DedupGuard,
}

impl AuditRecorder {
	pub fn new(store: Arc<dyn AuditStore>, directory: Arc<dyn EntityDirectory>) -> Self {
		let guard = DedupGuard::new(Arc::clone(&store));
		Self {
			store,
			directory,
			guard,
		}
	}

	pub fn store(&self) -> &Arc<dyn AuditStore> {
		&self.store
	}

	async fn require_exists(&self, subject: &EntityRef) -> AuditResult<()> {
		if self.directory.exists(subject).await? {
			Ok(())
		} else {
			Err(AuditError::InvalidReference(*subject))
		}
	}

	/// Converts an accepted event into the entry to be stored.
	fn to_entry(actor_name: &str, event: AuditEvent) -> NewAuditRecord {
		let description = describe(actor_name, &event);
		let builder = NewAuditRecord::builder(event.actor, event.action())
			.context(event.context)
			.description(description)
			.created_at(event.occurred_at);

		let builder = match event.change {
			Change::Login | Change::Logout => builder,
			Change::Created {
				subject,
				new_values,
			} => builder.subject(subject).new_values(new_values),
			Change::Updated {
				subject,
				old_values,
				new_values,
			} => builder
				.subject(subject)
				.old_values(old_values)
				.new_values(new_values),
			Change::Deleted {
				subject,
				old_values,
			} => {
				let builder = builder.subject(subject);
				match old_values {
					Some(values) => builder.old_values(values),
					None => builder,
				}
			}
		};
		builder.build()
	}
}

#[async_trait]
impl AuditSink for AuditRecorder {
	fn name(&self) -> &str {
		self.store.name()
	}

	#[instrument(
		skip_all,
		fields(actor = %event.actor, action = %event.action(), store = self.store.name())
	)]
	async fn record(&self, event: AuditEvent) -> AuditResult<RecordOutcome> {
		let actor_name = self
			.directory
			.display_name(&event.actor)
			.await?
			.ok_or(AuditError::InvalidReference(event.actor))?;

		match &event.change {
			Change::Login | Change::Logout => {
				if self
					.guard
					.is_duplicate(&event.actor, event.action(), event.occurred_at)
					.await?
				{
					debug!("session event inside dedup window, suppressed");
					return Ok(RecordOutcome::Suppressed);
				}
			}
			Change::Created { subject, .. } | Change::Updated { subject, .. } => {
				self.require_exists(subject).await?;
			}
			// The entity is already gone by the time its delete is recorded.
			Change::Deleted { .. } => {}
		}

		let entry = Self::to_entry(&actor_name, event);
		let id = self.store.record(entry).await?;
		info!(record_id = %id, "audit record written");
		Ok(RecordOutcome::Recorded(id))
	}
}

/// Human-readable summary of an event, e.g. `Ana Reyes logged into the system`
/// or `Ana Reyes updated impact assessment #3`.
pub fn describe(actor_name: &str, event: &AuditEvent) -> String {
	let (verb, subject) = match &event.change {
		Change::Login => return format!("{actor_name} logged into the system"),
		Change::Logout => return format!("{actor_name} logged out of the system"),
		Change::Created { subject, .. } => ("created", subject),
		Change::Updated { subject, .. } => ("updated", subject),
		Change::Deleted { subject, .. } => ("deleted", subject),
	};
	format!(
		"{actor_name} {verb} {} #{}",
		subject.kind.label(),
		subject.id
	)
}
