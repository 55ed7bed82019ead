// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only persistence for audit records.

pub mod memory;
#[cfg(feature = "store-sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuditResult;
use crate::event::{AuditAction, AuditRecord, AuditRecordId, EntityRef, NewAuditRecord};

pub const DEFAULT_QUERY_LIMIT: i64 = 50;
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// The ledger. Implementations only ever insert; there is no update or
/// delete operation.
#[async_trait]
pub trait AuditStore: Send + Sync {
	fn name(&self) -> &str;

	/// Durably append an entry and return its assigned id.
	async fn record(&self, entry: NewAuditRecord) -> AuditResult<AuditRecordId>;

	/// Whether a record for `actor` and `action` exists with
	/// `from <= created_at <= to`.
	async fn exists_between(
		&self,
		actor: &EntityRef,
		action: AuditAction,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> AuditResult<bool>;

	/// Records matching `query`, newest first, with the total match count.
	async fn query(&self, query: &AuditQuery) -> AuditResult<(Vec<AuditRecord>, i64)>;

	async fn get(&self, id: AuditRecordId) -> AuditResult<Option<AuditRecord>>;
}

/// Filter for reading the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
	pub actor: Option<EntityRef>,
	pub action: Option<AuditAction>,
	pub subject: Option<EntityRef>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

impl AuditQuery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn actor(mut self, actor: EntityRef) -> Self {
		self.actor = Some(actor);
		self
	}

	pub fn action(mut self, action: AuditAction) -> Self {
		self.action = Some(action);
		self
	}

	pub fn subject(mut self, subject: EntityRef) -> Self {
		self.subject = Some(subject);
		self
	}

	pub fn since(mut self, from: DateTime<Utc>) -> Self {
		self.from = Some(from);
		self
	}

	pub fn until(mut self, to: DateTime<Utc>) -> Self {
		self.to = Some(to);
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn offset(mut self, offset: i64) -> Self {
		self.offset = Some(offset);
		self
	}

	pub fn effective_limit(&self) -> i64 {
		self.limit
			.unwrap_or(DEFAULT_QUERY_LIMIT)
			.clamp(0, MAX_QUERY_LIMIT)
	}

	pub fn effective_offset(&self) -> i64 {
		self.offset.unwrap_or(0).max(0)
	}

	/// Whether a record passes every filter. Limit and offset are ignored.
	pub fn matches(&self, record: &AuditRecord) -> bool {
		self.actor.map_or(true, |actor| record.actor == actor)
			&& self.action.map_or(true, |action| record.action == action)
			&& self.subject.map_or(true, |subject| record.subject == Some(subject))
			&& self.from.map_or(true, |from| record.created_at >= from)
			&& self.to.map_or(true, |to| record.created_at <= to)
	}
}
