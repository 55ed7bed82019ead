// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracked-record repository.
//!
//! Projects, awards, partnerships, resolutions and impact assessments share
//! one shape and live in one table per kind.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use ttrack_server_audit::{EntityKind, EntityRef};

use crate::error::DbError;
use crate::timestamp::{format_timestamp, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
	Project,
	Award,
	Partnership,
	Resolution,
	ImpactAssessment,
}

impl RecordKind {
	pub fn all() -> &'static [RecordKind] {
		&[
			RecordKind::Project,
			RecordKind::Award,
			RecordKind::Partnership,
			RecordKind::Resolution,
			RecordKind::ImpactAssessment,
		]
	}

	pub fn as_str(&self) -> &'static str {
		self.entity_kind().as_str()
	}

	pub fn table(&self) -> &'static str {
		match self {
			RecordKind::Project => "projects",
			RecordKind::Award => "awards",
			RecordKind::Partnership => "partnerships",
			RecordKind::Resolution => "resolutions",
			RecordKind::ImpactAssessment => "impact_assessments",
		}
	}

	pub fn entity_kind(&self) -> EntityKind {
		match self {
			RecordKind::Project => EntityKind::Project,
			RecordKind::Award => EntityKind::Award,
			RecordKind::Partnership => EntityKind::Partnership,
			RecordKind::Resolution => EntityKind::Resolution,
			RecordKind::ImpactAssessment => EntityKind::ImpactAssessment,
		}
	}

	pub fn from_entity_kind(kind: EntityKind) -> Option<Self> {
		RecordKind::all()
			.iter()
			.copied()
			.find(|k| k.entity_kind() == kind)
	}
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RecordKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse::<EntityKind>()
			.ok()
			.and_then(RecordKind::from_entity_kind)
			.ok_or_else(|| format!("unknown record kind '{s}'"))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: i64,
	pub kind: RecordKind,
	pub title: String,
	pub status: String,
	pub campus: Option<String>,
	pub college: Option<String>,
	pub attributes: Map<String, Value>,
	pub created_by: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub archived_at: Option<DateTime<Utc>>,
}

impl Record {
	pub fn entity_ref(&self) -> EntityRef {
		EntityRef::new(self.kind.entity_kind(), self.id)
	}

	pub fn is_archived(&self) -> bool {
		self.archived_at.is_some()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
	pub kind: RecordKind,
	pub title: String,
	pub status: String,
	pub campus: Option<String>,
	pub college: Option<String>,
	pub attributes: Map<String, Value>,
	pub created_by: i64,
}

/// Listing filter. Archived records are excluded unless asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
	pub kind: RecordKind,
	pub include_archived: bool,
	pub campus: Option<String>,
	pub status: Option<String>,
	pub limit: i64,
	pub offset: i64,
}

impl RecordFilter {
	pub fn new(kind: RecordKind) -> Self {
		Self {
			kind,
			include_archived: false,
			campus: None,
			status: None,
			limit: 50,
			offset: 0,
		}
	}
}

#[async_trait]
pub trait RecordStore: Send + Sync {
	async fn insert_record(&self, record: &NewRecord) -> Result<Record, DbError>;
	async fn get_record(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, DbError>;
	/// Write the editable fields of `record` and bump `updated_at`.
	async fn update_record(&self, record: &Record) -> Result<Record, DbError>;
	async fn set_archived(
		&self,
		kind: RecordKind,
		id: i64,
		archived_at: Option<DateTime<Utc>>,
	) -> Result<Record, DbError>;
	/// Hard delete. Returns whether a row was removed.
	async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, DbError>;
	async fn list_records(&self, filter: &RecordFilter) -> Result<(Vec<Record>, i64), DbError>;
}

#[async_trait]
impl RecordStore for RecordRepository {
	async fn insert_record(&self, record: &NewRecord) -> Result<Record, DbError> {
		self.insert_record(record).await
	}

	async fn get_record(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, DbError> {
		self.get_record(kind, id).await
	}

	async fn update_record(&self, record: &Record) -> Result<Record, DbError> {
		self.update_record(record).await
	}

	async fn set_archived(
		&self,
		kind: RecordKind,
		id: i64,
		archived_at: Option<DateTime<Utc>>,
	) -> Result<Record, DbError> {
		self.set_archived(kind, id, archived_at).await
	}

	async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, DbError> {
		self.delete_record(kind, id).await
	}

	async fn list_records(&self, filter: &RecordFilter) -> Result<(Vec<Record>, i64), DbError> {
		self.list_records(filter).await
	}
}

const RECORD_COLUMNS: &str = "id, title, status, campus, college, attributes, created_by, \
	 created_at, updated_at, archived_at";

#[derive(Clone)]
pub struct RecordRepository {
	pool: SqlitePool,
}

impl RecordRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(kind = %record.kind, created_by = record.created_by))]
	pub async fn insert_record(&self, record: &NewRecord) -> Result<Record, DbError> {
		let now = format_timestamp(Utc::now());
		let attributes = serde_json::to_string(&record.attributes)?;
		let sql = format!(
			"INSERT INTO {} (title, status, campus, college, attributes, created_by, created_at, updated_at) \
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
			record.kind.table()
		);

		let result = sqlx::query(&sql)
			.bind(&record.title)
			.bind(&record.status)
			.bind(&record.campus)
			.bind(&record.college)
			.bind(&attributes)
			.bind(record.created_by)
			.bind(&now)
			.bind(&now)
			.execute(&self.pool)
			.await?;

		let id = result.last_insert_rowid();
		tracing::debug!(record_id = id, "record created");
		self.require(record.kind, id).await
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_record(&self, kind: RecordKind, id: i64) -> Result<Option<Record>, DbError> {
		let sql = format!("SELECT {RECORD_COLUMNS} FROM {} WHERE id = ?", kind.table());
		let row = sqlx::query(&sql)
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(|row| parse_record_row(kind, &row)).transpose()
	}

	#[tracing::instrument(skip(self, record), fields(kind = %record.kind, record_id = record.id))]
	pub async fn update_record(&self, record: &Record) -> Result<Record, DbError> {
		let attributes = serde_json::to_string(&record.attributes)?;
		let sql = format!(
			"UPDATE {} SET title = ?, status = ?, campus = ?, college = ?, attributes = ?, updated_at = ? \
			 WHERE id = ?",
			record.kind.table()
		);

		let result = sqlx::query(&sql)
			.bind(&record.title)
			.bind(&record.status)
			.bind(&record.campus)
			.bind(&record.college)
			.bind(&attributes)
			.bind(format_timestamp(Utc::now()))
			.bind(record.id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(not_found(record.kind, record.id));
		}
		self.require(record.kind, record.id).await
	}

	#[tracing::instrument(skip(self))]
	pub async fn set_archived(
		&self,
		kind: RecordKind,
		id: i64,
		archived_at: Option<DateTime<Utc>>,
	) -> Result<Record, DbError> {
		let sql = format!(
			"UPDATE {} SET archived_at = ?, updated_at = ? WHERE id = ?",
			kind.table()
		);

		let result = sqlx::query(&sql)
			.bind(archived_at.map(format_timestamp))
			.bind(format_timestamp(Utc::now()))
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(not_found(kind, id));
		}
		self.require(kind, id).await
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, DbError> {
		let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
		let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_records(&self, filter: &RecordFilter) -> Result<(Vec<Record>, i64), DbError> {
		let mut conditions = vec!["1=1"];
		let mut params: Vec<&str> = Vec::new();

		if !filter.include_archived {
			conditions.push("archived_at IS NULL");
		}
		if let Some(campus) = &filter.campus {
			conditions.push("campus = ?");
			params.push(campus);
		}
		if let Some(status) = &filter.status {
			conditions.push("status = ?");
			params.push(status);
		}
		let where_clause = conditions.join(" AND ");
		let table = filter.kind.table();

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM {table} WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for param in &params {
			count_query = count_query.bind(*param);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

		let data_sql = format!(
			"SELECT {RECORD_COLUMNS} FROM {table} WHERE {where_clause} \
			 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for param in &params {
			data_query = data_query.bind(*param);
		}
		let rows = data_query
			.bind(filter.limit.max(0))
			.bind(filter.offset.max(0))
			.fetch_all(&self.pool)
			.await?;

		let records = rows
			.iter()
			.map(|row| parse_record_row(filter.kind, row))
			.collect::<Result<Vec<_>, _>>()?;

		Ok((records, total))
	}

	async fn require(&self, kind: RecordKind, id: i64) -> Result<Record, DbError> {
		self.get_record(kind, id)
			.await?
			.ok_or_else(|| not_found(kind, id))
	}
}

fn not_found(kind: RecordKind, id: i64) -> DbError {
	DbError::NotFound(format!("{} #{id}", kind.entity_kind().label()))
}

fn parse_record_row(kind: RecordKind, row: &SqliteRow) -> Result<Record, DbError> {
	let attributes: String = row.get("attributes");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");
	let archived_at: Option<String> = row.get("archived_at");

	Ok(Record {
		id: row.get("id"),
		kind,
		title: row.get("title"),
		status: row.get("status"),
		campus: row.get("campus"),
		college: row.get("college"),
		attributes: serde_json::from_str(&attributes)?,
		created_by: row.get("created_by"),
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
		archived_at: archived_at.as_deref().map(parse_timestamp).transpose()?,
	})
}
