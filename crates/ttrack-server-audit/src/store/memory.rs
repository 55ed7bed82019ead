// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::AuditResult;
use crate::event::{AuditAction, AuditRecord, AuditRecordId, EntityRef, NewAuditRecord};
use crate::store::{AuditQuery, AuditStore};

/// Process-local ledger. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
	records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// All records in insertion order.
	pub async fn records(&self) -> Vec<AuditRecord> {
		self.records.read().await.clone()
	}

	pub async fn len(&self) -> usize {
		self.records.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.records.read().await.is_empty()
	}
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
	fn name(&self) -> &str {
		"memory"
	}

	async fn record(&self, entry: NewAuditRecord) -> AuditResult<AuditRecordId> {
		let mut records = self.records.write().await;
		let id = AuditRecordId::new(records.len() as i64 + 1);
		records.push(AuditRecord::from_new(id, entry));
		Ok(id)
	}

	async fn exists_between(
		&self,
		actor: &EntityRef,
		action: AuditAction,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> AuditResult<bool> {
		let records = self.records.read().await;
		Ok(records.iter().any(|r| {
			r.actor == *actor && r.action == action && r.created_at >= from && r.created_at <= to
		}))
	}

	async fn query(&self, query: &AuditQuery) -> AuditResult<(Vec<AuditRecord>, i64)> {
		let records = self.records.read().await;
		let mut matched: Vec<AuditRecord> = records
			.iter()
			.filter(|r| query.matches(r))
			.cloned()
			.collect();
		matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

		let total = matched.len() as i64;
		let page = matched
			.into_iter()
			.skip(query.effective_offset() as usize)
			.take(query.effective_limit() as usize)
			.collect();

		Ok((page, total))
	}

	async fn get(&self, id: AuditRecordId) -> AuditResult<Option<AuditRecord>> {
		let records = self.records.read().await;
		Ok(records.iter().find(|r| r.id == id).cloned())
	}
}
