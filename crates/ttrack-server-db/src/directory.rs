// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`EntityDirectory`] backed by the users and record tables.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use ttrack_server_audit::{AuditResult, EntityDirectory, EntityKind, EntityRef, SYSTEM_ACTOR_NAME};

use crate::error::DbError;
use crate::record::RecordKind;

#[derive(Clone)]
pub struct SqliteEntityDirectory {
	pool: SqlitePool,
}

impl SqliteEntityDirectory {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	async fn user_name(&self, id: i64) -> Result<Option<String>, DbError> {
		Ok(sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn row_exists(&self, table: &str, id: i64) -> Result<bool, DbError> {
		let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)");
		let exists: bool = sqlx::query_scalar(&sql)
			.bind(id)
			.fetch_one(&self.pool)
			.await?;
		Ok(exists)
	}
}

#[async_trait]
impl EntityDirectory for SqliteEntityDirectory {
	async fn display_name(&self, actor: &EntityRef) -> AuditResult<Option<String>> {
		match actor.kind {
			EntityKind::User => Ok(self.user_name(actor.id).await?),
			EntityKind::System => Ok(Some(SYSTEM_ACTOR_NAME.to_string())),
			_ => Ok(None),
		}
	}

	async fn exists(&self, entity: &EntityRef) -> AuditResult<bool> {
		match entity.kind {
			EntityKind::System => Ok(true),
			EntityKind::User => Ok(self.row_exists("users", entity.id).await?),
			kind => match RecordKind::from_entity_kind(kind) {
				Some(record_kind) => Ok(self.row_exists(record_kind.table(), entity.id).await?),
				None => Ok(false),
			},
		}
	}
}
