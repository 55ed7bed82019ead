// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Suppression of repeated session events.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use crate::error::{AuditError, AuditResult};
use crate::event::{AuditAction, EntityRef};
use crate::store::AuditStore;

/// Width of the window within which a repeated login or logout by the same
/// actor is treated as the same session event.
pub const SESSION_DEDUP_WINDOW_SECS: i64 = 5;

pub fn session_dedup_window() -> Duration {
	Duration::seconds(SESSION_DEDUP_WINDOW_SECS)
}

/// Read-only check against the ledger. Not linearizable: two events racing
/// through `is_duplicate` concurrently can both see `false`.
#[derive(Clone)]
pub struct DedupGuard {
	store: Arc<dyn AuditStore>,
}

impl DedupGuard {
	pub fn new(store: Arc<dyn AuditStore>) -> Self {
		Self { store }
	}

	/// Whether a record for `actor` and `action` already exists with
	/// `at - SESSION_DEDUP_WINDOW_SECS <= created_at <= at`. Records dated
	/// after `at` never suppress it.
	#[instrument(skip(self), fields(store = self.store.name()))]
	pub async fn is_duplicate(
		&self,
		actor: &EntityRef,
		action: AuditAction,
		at: DateTime<Utc>,
	) -> AuditResult<bool> {
		if !action.is_session() {
			return Err(AuditError::NotSessionAction(action));
		}
		self.store
			.exists_between(actor, action, at - session_dedup_window(), at)
			.await
	}
}
