// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::AuditResult;
use crate::event::AuditEvent;
use crate::recorder::{AuditSink, RecordOutcome};
use ttrack_server_config::AuditFailurePolicy;

/// Applies an [`AuditFailurePolicy`] to the errors of an inner sink.
///
/// Callers commit their business change before emitting, so the policy
/// only decides whether a failed audit write reaches them.
pub struct PolicyAuditSink {
	inner: Arc<dyn AuditSink>,
	policy: AuditFailurePolicy,
}

impl PolicyAuditSink {
	pub fn new(inner: Arc<dyn AuditSink>, policy: AuditFailurePolicy) -> Self {
		Self { inner, policy }
	}

	pub fn policy(&self) -> AuditFailurePolicy {
		self.policy
	}
}

#[async_trait]
impl AuditSink for PolicyAuditSink {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn record(&self, event: AuditEvent) -> AuditResult<RecordOutcome> {
		let actor = event.actor;
		let action = event.action();
		match self.inner.record(event).await {
			Ok(outcome) => Ok(outcome),
			Err(e) => match self.policy {
				AuditFailurePolicy::Propagate => Err(e),
				AuditFailurePolicy::Warn => {
					warn!(
						sink = self.inner.name(),
						%actor,
						%action,
						error = %e,
						"audit write failed, continuing"
					);
					Ok(RecordOutcome::Dropped)
				}
			},
		}
	}
}
