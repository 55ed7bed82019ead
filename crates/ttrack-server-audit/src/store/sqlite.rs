// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite};
use tracing::instrument;

use crate::error::{AuditError, AuditResult};
use crate::event::{AuditAction, AuditRecord, AuditRecordId, EntityRef, NewAuditRecord};
use crate::snapshot::Snapshot;
use crate::store::{AuditQuery, AuditStore};

/// DDL for the ledger table. The triggers reject every UPDATE and DELETE so
/// the table stays append-only regardless of which code path touches it.
pub const AUDIT_RECORDS_SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS audit_records (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		actor_type TEXT NOT NULL,
		actor_id INTEGER NOT NULL,
		action TEXT NOT NULL,
		subject_type TEXT,
		subject_id INTEGER,
		old_values TEXT,
		new_values TEXT,
		ip_address TEXT,
		user_agent TEXT,
		description TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_audit_records_actor_action
		ON audit_records (actor_type, actor_id, action, created_at)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_audit_records_subject
		ON audit_records (subject_type, subject_id)
	"#,
	r#"
	CREATE TRIGGER IF NOT EXISTS audit_records_no_update
	BEFORE UPDATE ON audit_records
	BEGIN
		SELECT RAISE(ABORT, 'audit_records is append-only');
	END
	"#,
	r#"
	CREATE TRIGGER IF NOT EXISTS audit_records_no_delete
	BEFORE DELETE ON audit_records
	BEGIN
		SELECT RAISE(ABORT, 'audit_records is append-only');
	END
	"#,
];

const RECORD_COLUMNS: &str = "id, actor_type, actor_id, action, subject_type, subject_id, \
	 old_values, new_values, ip_address, user_agent, description, created_at";

pub struct SqliteAuditStore {
	pool: SqlitePool,
	name: String,
}

impl SqliteAuditStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			name: "sqlite".to_string(),
		}
	}

	/// Create the ledger table, indexes and append-only triggers.
	pub async fn migrate(&self) -> AuditResult<()> {
		for statement in AUDIT_RECORDS_SCHEMA {
			sqlx::query(statement)
				.execute(&self.pool)
				.await
				.map_err(map_sqlx_error)?;
		}
		Ok(())
	}
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
	fn name(&self) -> &str {
		&self.name
	}

	#[instrument(skip_all, fields(actor = %entry.actor, action = %entry.action))]
	async fn record(&self, entry: NewAuditRecord) -> AuditResult<AuditRecordId> {
		let old_values = entry
			.old_values
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		let new_values = entry
			.new_values
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let result = sqlx::query(
			r#"
			INSERT INTO audit_records (
				actor_type, actor_id, action, subject_type, subject_id,
				old_values, new_values, ip_address, user_agent, description, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.actor.kind.as_str())
		.bind(entry.actor.id)
		.bind(entry.action.as_str())
		.bind(entry.subject.map(|s| s.kind.as_str()))
		.bind(entry.subject.map(|s| s.id))
		.bind(old_values)
		.bind(new_values)
		.bind(entry.ip_address)
		.bind(entry.user_agent)
		.bind(entry.description)
		.bind(format_timestamp(entry.created_at))
		.execute(&self.pool)
		.await
		.map_err(map_sqlx_error)?;

		Ok(AuditRecordId::new(result.last_insert_rowid()))
	}

	#[instrument(skip(self))]
	async fn exists_between(
		&self,
		actor: &EntityRef,
		action: AuditAction,
		from: DateTime<Utc>,
		to: DateTime<Utc>,
	) -> AuditResult<bool> {
		let row = sqlx::query(
			r#"
			SELECT EXISTS (
				SELECT 1 FROM audit_records
				WHERE actor_type = ? AND actor_id = ? AND action = ?
					AND created_at >= ? AND created_at <= ?
			) AS found
			"#,
		)
		.bind(actor.kind.as_str())
		.bind(actor.id)
		.bind(action.as_str())
		.bind(format_timestamp(from))
		.bind(format_timestamp(to))
		.fetch_one(&self.pool)
		.await
		.map_err(map_sqlx_error)?;

		let found: i64 = row.try_get("found").map_err(map_sqlx_error)?;
		Ok(found != 0)
	}

	#[instrument(skip(self))]
	async fn query(&self, query: &AuditQuery) -> AuditResult<(Vec<AuditRecord>, i64)> {
		let (where_clause, params) = filter_clause(query);

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM audit_records WHERE {where_clause}");
		let count_row = bind_params(sqlx::query(&count_sql), &params)
			.fetch_one(&self.pool)
			.await
			.map_err(map_sqlx_error)?;
		let total: i64 = count_row.try_get("cnt").map_err(map_sqlx_error)?;

		let data_sql = format!(
			"SELECT {RECORD_COLUMNS} FROM audit_records WHERE {where_clause} \
			 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
		);
		let rows = bind_params(sqlx::query(&data_sql), &params)
			.bind(query.effective_limit())
			.bind(query.effective_offset())
			.fetch_all(&self.pool)
			.await
			.map_err(map_sqlx_error)?;

		let records = rows
			.iter()
			.map(row_to_record)
			.collect::<AuditResult<Vec<_>>>()?;

		Ok((records, total))
	}

	#[instrument(skip(self))]
	async fn get(&self, id: AuditRecordId) -> AuditResult<Option<AuditRecord>> {
		let sql = format!("SELECT {RECORD_COLUMNS} FROM audit_records WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.as_i64())
			.fetch_optional(&self.pool)
			.await
			.map_err(map_sqlx_error)?;

		row.as_ref().map(row_to_record).transpose()
	}
}

/// Fixed-width UTC timestamps so lexical order matches chronological order.
///
/// Precision is microseconds. Entries reach the store already truncated by
/// [`ledger_time`](crate::event::ledger_time), so nothing is lost here.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> AuditResult<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| AuditError::Corrupt(format!("bad timestamp '{value}': {e}")))
}

enum Param {
	Text(String),
	Int(i64),
}

fn filter_clause(query: &AuditQuery) -> (String, Vec<Param>) {
	let mut conditions = vec!["1=1"];
	let mut params = Vec::new();

	if let Some(actor) = query.actor {
		conditions.push("actor_type = ? AND actor_id = ?");
		params.push(Param::Text(actor.kind.as_str().to_string()));
		params.push(Param::Int(actor.id));
	}
	if let Some(action) = query.action {
		conditions.push("action = ?");
		params.push(Param::Text(action.as_str().to_string()));
	}
	if let Some(subject) = query.subject {
		conditions.push("subject_type = ? AND subject_id = ?");
		params.push(Param::Text(subject.kind.as_str().to_string()));
		params.push(Param::Int(subject.id));
	}
	if let Some(from) = query.from {
		conditions.push("created_at >= ?");
		params.push(Param::Text(format_timestamp(from)));
	}
	if let Some(to) = query.to {
		conditions.push("created_at <= ?");
		params.push(Param::Text(format_timestamp(to)));
	}

	(conditions.join(" AND "), params)
}

fn bind_params<'q>(
	mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
	params: &[Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	for param in params {
		query = match param {
			Param::Text(value) => query.bind(value.clone()),
			Param::Int(value) => query.bind(*value),
		};
	}
	query
}

fn row_to_record(row: &SqliteRow) -> AuditResult<AuditRecord> {
	let actor_type: String = row.try_get("actor_type").map_err(map_sqlx_error)?;
	let action: String = row.try_get("action").map_err(map_sqlx_error)?;
	let subject_type: Option<String> = row.try_get("subject_type").map_err(map_sqlx_error)?;
	let subject_id: Option<i64> = row.try_get("subject_id").map_err(map_sqlx_error)?;
	let old_values: Option<String> = row.try_get("old_values").map_err(map_sqlx_error)?;
	let new_values: Option<String> = row.try_get("new_values").map_err(map_sqlx_error)?;
	let created_at: String = row.try_get("created_at").map_err(map_sqlx_error)?;

	let actor = EntityRef::new(
		actor_type
			.parse()
			.map_err(|e| AuditError::Corrupt(format!("{e}")))?,
		row.try_get("actor_id").map_err(map_sqlx_error)?,
	);

	let subject = match (subject_type, subject_id) {
		(Some(kind), Some(id)) => Some(EntityRef::new(
			kind.parse()
				.map_err(|e| AuditError::Corrupt(format!("{e}")))?,
			id,
		)),
		_ => None,
	};

	Ok(AuditRecord {
		id: AuditRecordId::new(row.try_get("id").map_err(map_sqlx_error)?),
		actor,
		action: action
			.parse()
			.map_err(|e| AuditError::Corrupt(format!("{e}")))?,
		subject,
		old_values: parse_snapshot(old_values)?,
		new_values: parse_snapshot(new_values)?,
		ip_address: row.try_get("ip_address").map_err(map_sqlx_error)?,
		user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
		description: row.try_get("description").map_err(map_sqlx_error)?,
		created_at: parse_timestamp(&created_at)?,
	})
}

fn parse_snapshot(value: Option<String>) -> AuditResult<Option<Snapshot>> {
	value
		.map(|json| serde_json::from_str::<Snapshot>(&json))
		.transpose()
		.map_err(AuditError::from)
}

fn map_sqlx_error(e: sqlx::Error) -> AuditError {
	if is_transient_error(&e) {
		AuditError::TransientStoreFailure(format!("database error: {e}"))
	} else {
		AuditError::StoreFailure(format!("database error: {e}"))
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::EntityKind;
	use chrono::{Duration, TimeZone};
	use serde_json::json;
	use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
	use std::str::FromStr;

	async fn create_audit_test_store() -> (SqliteAuditStore, SqlitePool) {
		let options = SqliteConnectOptions::from_str(":memory:")
			.unwrap()
			.create_if_missing(true);

		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect_with(options)
			.await
			.expect("Failed to create test pool");

		let store = SqliteAuditStore::new(pool.clone());
		store.migrate().await.unwrap();
		(store, pool)
	}

	fn t0() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
	}

	#[tokio::test]
	async fn stored_record_equals_entry_with_sub_microsecond_input() {
		let (store, _pool) = create_audit_test_store().await;
		let entry = NewAuditRecord::builder(EntityRef::user(7), AuditAction::Login)
			.created_at(t0() + Duration::nanoseconds(176_253_154))
			.build();

		let id = store.record(entry.clone()).await.unwrap();
		let stored = store.get(id).await.unwrap().unwrap();

		assert_eq!(stored, AuditRecord::from_new(id, entry));
		assert_eq!(stored.created_at, t0() + Duration::microseconds(176_253));
	}

	#[tokio::test]
	async fn record_round_trips_snapshots_verbatim() {
		let (store, _pool) = create_audit_test_store().await;
		let old = Snapshot::new()
			.with("status", "draft")
			.with("budget", json!({"amount": 12500.5, "currency": "PHP"}));
		let new = Snapshot::new()
			.with("status", "active")
			.with("budget", json!({"amount": 13000, "currency": "PHP"}));

		let entry = NewAuditRecord::builder(EntityRef::user(7), AuditAction::Update)
			.subject(EntityRef::new(EntityKind::Project, 42))
			.old_values(old.clone())
			.new_values(new.clone())
			.ip_address("10.1.2.3")
			.user_agent("Mozilla/5.0")
			.description("Ana updated project #42")
			.created_at(t0())
			.build();

		let id = store.record(entry).await.unwrap();
		let stored = store.get(id).await.unwrap().unwrap();

		assert_eq!(stored.id, id);
		assert_eq!(stored.actor, EntityRef::user(7));
		assert_eq!(stored.action, AuditAction::Update);
		assert_eq!(stored.subject, Some(EntityRef::new(EntityKind::Project, 42)));
		assert_eq!(stored.old_values, Some(old));
		assert_eq!(stored.new_values, Some(new));
		assert_eq!(stored.ip_address.as_deref(), Some("10.1.2.3"));
		assert_eq!(stored.user_agent.as_deref(), Some("Mozilla/5.0"));
		assert_eq!(stored.description, "Ana updated project #42");
		assert_eq!(stored.created_at, t0());
	}

	#[tokio::test]
	async fn null_snapshots_stay_null() {
		let (store, _pool) = create_audit_test_store().await;
		let entry = NewAuditRecord::builder(EntityRef::user(7), AuditAction::Delete)
			.subject(EntityRef::new(EntityKind::Award, 9))
			.created_at(t0())
			.build();

		let id = store.record(entry).await.unwrap();
		let stored = store.get(id).await.unwrap().unwrap();

		assert!(stored.old_values.is_none());
		assert!(stored.new_values.is_none());
	}

	#[tokio::test]
	async fn exists_between_matches_actor_action_and_window() {
		let (store, _pool) = create_audit_test_store().await;
		store
			.record(
				NewAuditRecord::builder(EntityRef::user(7), AuditAction::Login)
					.created_at(t0())
					.build(),
			)
			.await
			.unwrap();

		let actor = EntityRef::user(7);
		let window = Duration::seconds(5);
		assert!(store
			.exists_between(&actor, AuditAction::Login, t0(), t0())
			.await
			.unwrap());
		assert!(store
			.exists_between(&actor, AuditAction::Login, t0() - window, t0() + window)
			.await
			.unwrap());
		assert!(!store
			.exists_between(
				&actor,
				AuditAction::Login,
				t0() + Duration::seconds(1),
				t0() + window
			)
			.await
			.unwrap());
		// A record later than the upper bound does not count.
		assert!(!store
			.exists_between(
				&actor,
				AuditAction::Login,
				t0() - Duration::seconds(65),
				t0() - Duration::seconds(60)
			)
			.await
			.unwrap());
		assert!(!store
			.exists_between(&actor, AuditAction::Logout, t0() - window, t0())
			.await
			.unwrap());
		assert!(!store
			.exists_between(&EntityRef::user(8), AuditAction::Login, t0() - window, t0())
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn rejects_updates_and_deletes() {
		let (store, pool) = create_audit_test_store().await;
		store
			.record(NewAuditRecord::builder(EntityRef::user(1), AuditAction::Login).build())
			.await
			.unwrap();

		let update = sqlx::query("UPDATE audit_records SET description = 'tampered'")
			.execute(&pool)
			.await;
		assert!(update.is_err());

		let delete = sqlx::query("DELETE FROM audit_records").execute(&pool).await;
		assert!(delete.is_err());

		let (records, total) = store.query(&AuditQuery::new()).await.unwrap();
		assert_eq!(total, 1);
		assert_eq!(records[0].description, "login");
	}

	#[tokio::test]
	async fn query_filters_and_paginates() {
		let (store, _pool) = create_audit_test_store().await;
		let project = EntityRef::new(EntityKind::Project, 42);

		for i in 0..5 {
			store
				.record(
					NewAuditRecord::builder(EntityRef::user(1), AuditAction::Login)
						.created_at(t0() - Duration::minutes(i))
						.build(),
				)
				.await
				.unwrap();
		}
		store
			.record(
				NewAuditRecord::builder(EntityRef::user(2), AuditAction::Create)
					.subject(project)
					.new_values(Snapshot::new().with("title", "Biochar kiln"))
					.created_at(t0() - Duration::hours(2))
					.build(),
			)
			.await
			.unwrap();

		let (records, total) = store
			.query(&AuditQuery::new().action(AuditAction::Login))
			.await
			.unwrap();
		assert_eq!(total, 5);
		assert_eq!(records[0].created_at, t0());

		let (records, total) = store
			.query(&AuditQuery::new().subject(project))
			.await
			.unwrap();
		assert_eq!(total, 1);
		assert_eq!(records[0].actor, EntityRef::user(2));

		let (_, total) = store
			.query(&AuditQuery::new().since(t0() - Duration::minutes(30)))
			.await
			.unwrap();
		assert_eq!(total, 5);

		let (_, total) = store
			.query(&AuditQuery::new().until(t0() - Duration::minutes(30)))
			.await
			.unwrap();
		assert_eq!(total, 1);

		let (records, total) = store
			.query(&AuditQuery::new().limit(2).offset(4))
			.await
			.unwrap();
		assert_eq!(total, 6);
		assert_eq!(records.len(), 2);
	}

	#[test]
	fn timestamps_are_fixed_width() {
		let a = format_timestamp(t0());
		let b = format_timestamp(t0() + Duration::microseconds(1));
		assert_eq!(a, "2026-03-02T09:30:00.000000Z");
		assert_eq!(a.len(), b.len());
		assert!(a < b);
	}
}
