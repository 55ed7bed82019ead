// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record lifecycle with audit events.
//!
//! Every mutation is committed to the [`RecordStore`] first and reported to
//! the injected [`AuditSink`] afterwards.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use ttrack_server_audit::{AuditEvent, AuditSink, RecordOutcome, Snapshot};
use ttrack_server_auth::{AuthService, CurrentUser, RoleGate};
use ttrack_server_db::{NewRecord, Record, RecordFilter, RecordKind, RecordStore};

use crate::error::{RecordError, RecordResult};
use crate::snapshot::record_snapshot;

/// Input for [`RecordService::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
	pub title: String,
	pub status: String,
	pub campus: Option<String>,
	pub college: Option<String>,
	pub attributes: Map<String, Value>,
}

impl RecordDraft {
	pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			status: status.into(),
			campus: None,
			college: None,
			attributes: Map::new(),
		}
	}

	pub fn campus(mut self, campus: impl Into<String>) -> Self {
		self.campus = Some(campus.into());
		self
	}

	pub fn college(mut self, college: impl Into<String>) -> Self {
		self.college = Some(college.into());
		self
	}

	pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}
}

/// Partial update. `None` leaves a field untouched; `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
	pub title: Option<String>,
	pub status: Option<String>,
	pub campus: Option<Option<String>>,
	pub college: Option<Option<String>>,
	pub attributes: Option<Map<String, Value>>,
}

impl RecordPatch {
	pub fn status(mut self, status: impl Into<String>) -> Self {
		self.status = Some(status.into());
		self
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	fn apply(self, record: &mut Record) {
		if let Some(title) = self.title {
			record.title = title;
		}
		if let Some(status) = self.status {
			record.status = status;
		}
		if let Some(campus) = self.campus {
			record.campus = campus;
		}
		if let Some(college) = self.college {
			record.college = college;
		}
		if let Some(attributes) = self.attributes {
			record.attributes = attributes;
		}
	}
}

pub struct RecordService {
	store: Arc<dyn RecordStore>,
	auth: Arc<AuthService>,
	audit: Arc<dyn AuditSink>,
}

impl RecordService {
	pub fn new(
		store: Arc<dyn RecordStore>,
		auth: Arc<AuthService>,
		audit: Arc<dyn AuditSink>,
	) -> Self {
		Self { store, auth, audit }
	}

	#[instrument(skip(self, current, draft), fields(user_id = current.user.id))]
	pub async fn create(
		&self,
		current: &CurrentUser,
		kind: RecordKind,
		draft: RecordDraft,
	) -> RecordResult<Record> {
		let record = self
			.store
			.insert_record(&NewRecord {
				kind,
				title: draft.title,
				status: draft.status,
				campus: draft.campus,
				college: draft.college,
				attributes: draft.attributes,
				created_by: current.user.id,
			})
			.await?;

		self.emit(
			current,
			AuditEvent::created(current.actor(), record.entity_ref(), record_snapshot(&record)),
		)
		.await?;
		info!(record_id = record.id, "record created");
		Ok(record)
	}

	/// Apply `patch` and emit an update carrying only the changed fields.
	/// A patch that changes nothing writes nothing.
	#[instrument(skip(self, current, patch), fields(user_id = current.user.id))]
	pub async fn update(
		&self,
		current: &CurrentUser,
		kind: RecordKind,
		id: i64,
		patch: RecordPatch,
	) -> RecordResult<Record> {
		let existing = self.get(kind, id).await?;
		let mut edited = existing.clone();
		patch.apply(&mut edited);

		let (old_values, new_values) =
			Snapshot::changes(&record_snapshot(&existing), &record_snapshot(&edited));
		if new_values.is_empty() {
			debug!("patch changes nothing");
			return Ok(existing);
		}

		let updated = self.store.update_record(&edited).await?;
		self.emit(
			current,
			AuditEvent::updated(current.actor(), updated.entity_ref(), old_values, new_values),
		)
		.await?;
		info!("record updated");
		Ok(updated)
	}

	/// Archive after re-checking the acting user's password.
	#[instrument(skip(self, current, password), fields(user_id = current.user.id))]
	pub async fn archive(
		&self,
		current: &CurrentUser,
		kind: RecordKind,
		id: i64,
		password: &str,
	) -> RecordResult<Record> {
		self.auth.confirm_password(current, password).await?;
		let existing = self.get(kind, id).await?;
		if existing.is_archived() {
			return Ok(existing);
		}

		let archived = self.store.set_archived(kind, id, Some(Utc::now())).await?;
		self.emit_archive_change(current, &existing, &archived).await?;
		info!("record archived");
		Ok(archived)
	}

	/// Undo [`archive`](Self::archive). Also password-confirmed.
	#[instrument(skip(self, current, password), fields(user_id = current.user.id))]
	pub async fn restore(
		&self,
		current: &CurrentUser,
		kind: RecordKind,
		id: i64,
		password: &str,
	) -> RecordResult<Record> {
		self.auth.confirm_password(current, password).await?;
		let existing = self.get(kind, id).await?;
		if !existing.is_archived() {
			return Ok(existing);
		}

		let restored = self.store.set_archived(kind, id, None).await?;
		self.emit_archive_change(current, &existing, &restored).await?;
		info!("record restored");
		Ok(restored)
	}

	/// Hard delete. Admin only, password-confirmed.
	#[instrument(skip(self, current, password), fields(user_id = current.user.id))]
	pub async fn delete(
		&self,
		current: &CurrentUser,
		kind: RecordKind,
		id: i64,
		password: &str,
	) -> RecordResult<()> {
		RoleGate::AdminOnly.require(current)?;
		self.auth.confirm_password(current, password).await?;
		let existing = self.get(kind, id).await?;

		if !self.store.delete_record(kind, id).await? {
			return Err(RecordError::NotFound { kind, id });
		}

		self.emit(
			current,
			AuditEvent::deleted(
				current.actor(),
				existing.entity_ref(),
				Some(record_snapshot(&existing)),
			),
		)
		.await?;
		info!("record deleted");
		Ok(())
	}

	pub async fn get(&self, kind: RecordKind, id: i64) -> RecordResult<Record> {
		self.store
			.get_record(kind, id)
			.await?
			.ok_or(RecordError::NotFound { kind, id })
	}

	pub async fn list(&self, filter: &RecordFilter) -> RecordResult<(Vec<Record>, i64)> {
		Ok(self.store.list_records(filter).await?)
	}

	async fn emit_archive_change(
		&self,
		current: &CurrentUser,
		before: &Record,
		after: &Record,
	) -> RecordResult<RecordOutcome> {
		let (old_values, new_values) =
			Snapshot::changes(&record_snapshot(before), &record_snapshot(after));
		self.emit(
			current,
			AuditEvent::updated(current.actor(), after.entity_ref(), old_values, new_values),
		)
		.await
	}

	async fn emit(&self, current: &CurrentUser, event: AuditEvent) -> RecordResult<RecordOutcome> {
		Ok(self
			.audit
			.record(event.with_context(current.context.clone()))
			.await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use sqlx::SqlitePool;
	use ttrack_server_audit::{
		AuditAction, AuditQuery, AuditRecorder, AuditStore, RequestContext, SqliteAuditStore,
	};
	use ttrack_server_auth::{hash_password, AuthError};
	use ttrack_server_db::testing::create_migrated_test_pool;
	use ttrack_server_db::{
		DbError, NewUser, RecordRepository, SqliteEntityDirectory, UserRepository,
	};

	struct Harness {
		service: RecordService,
		audit: Arc<SqliteAuditStore>,
		admin: CurrentUser,
		member: CurrentUser,
	}

	async fn user(pool: &SqlitePool, auth: &AuthService, email: &str, admin: bool) -> CurrentUser {
		let created = UserRepository::new(pool.clone())
			.create_user(&NewUser {
				name: email.split('@').next().unwrap().to_string(),
				email: email.to_string(),
				password_hash: hash_password("correct horse").unwrap(),
				is_admin: admin,
			})
			.await
			.unwrap();
		auth.current_user(
			created.id,
			RequestContext::new().ip_address("10.0.0.5"),
		)
		.await
		.unwrap()
	}

	async fn harness() -> Harness {
		let pool = create_migrated_test_pool().await;
		let audit = Arc::new(SqliteAuditStore::new(pool.clone()));
		let recorder: Arc<dyn AuditSink> = Arc::new(AuditRecorder::new(
			audit.clone(),
			Arc::new(SqliteEntityDirectory::new(pool.clone())),
		));
		let auth = Arc::new(AuthService::new(
			Arc::new(UserRepository::new(pool.clone())),
			recorder.clone(),
		));
		let admin = user(&pool, &auth, "ben@univ.edu.ph", true).await;
		let member = user(&pool, &auth, "ana@univ.edu.ph", false).await;
		let service = RecordService::new(
			Arc::new(RecordRepository::new(pool)),
			auth,
			recorder,
		);
		Harness {
			service,
			audit,
			admin,
			member,
		}
	}

	async fn audit_log(h: &Harness) -> Vec<ttrack_server_audit::AuditRecord> {
		let (mut records, _) = h.audit.query(&AuditQuery::new()).await.unwrap();
		records.reverse();
		records
	}

	fn draft() -> RecordDraft {
		RecordDraft::new("Biochar kiln", "draft")
			.campus("Main")
			.attribute("budget", 250000)
	}

	#[tokio::test]
	async fn create_records_full_snapshot() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();

		let log = audit_log(&h).await;
		assert_eq!(log.len(), 1);
		assert_eq!(log[0].action, AuditAction::Create);
		assert_eq!(log[0].subject, Some(record.entity_ref()));
		assert_eq!(log[0].ip_address.as_deref(), Some("10.0.0.5"));
		let new_values = log[0].new_values.as_ref().unwrap();
		assert_eq!(new_values.get("title"), Some(&json!("Biochar kiln")));
		assert_eq!(new_values.get("attributes"), Some(&json!({"budget": 250000})));
		assert!(log[0].old_values.is_none());
	}

	#[tokio::test]
	async fn identical_creates_are_both_recorded() {
		let h = harness().await;
		h.service
			.create(&h.member, RecordKind::Award, draft())
			.await
			.unwrap();
		h.service
			.create(&h.member, RecordKind::Award, draft())
			.await
			.unwrap();
		assert_eq!(audit_log(&h).await.len(), 2);
	}

	#[tokio::test]
	async fn update_records_only_changed_fields() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();

		let updated = h
			.service
			.update(
				&h.member,
				RecordKind::Project,
				record.id,
				RecordPatch::default().status("active"),
			)
			.await
			.unwrap();
		assert_eq!(updated.status, "active");

		let log = audit_log(&h).await;
		assert_eq!(log.len(), 2);
		assert_eq!(log[1].action, AuditAction::Update);
		assert_eq!(
			log[1].old_values,
			Some(Snapshot::new().with("status", "draft"))
		);
		assert_eq!(
			log[1].new_values,
			Some(Snapshot::new().with("status", "active"))
		);
	}

	#[tokio::test]
	async fn noop_update_writes_nothing() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();

		h.service
			.update(
				&h.member,
				RecordKind::Project,
				record.id,
				RecordPatch::default().status("draft"),
			)
			.await
			.unwrap();
		assert_eq!(audit_log(&h).await.len(), 1);
	}

	#[tokio::test]
	async fn update_of_missing_record_is_not_found() {
		let h = harness().await;
		let err = h
			.service
			.update(&h.member, RecordKind::Resolution, 77, RecordPatch::default())
			.await
			.unwrap_err();
		assert!(matches!(err, RecordError::NotFound { id: 77, .. }));
	}

	#[tokio::test]
	async fn archive_requires_password_and_records_archived_at() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Partnership, draft())
			.await
			.unwrap();

		let err = h
			.service
			.archive(&h.member, RecordKind::Partnership, record.id, "wrong")
			.await
			.unwrap_err();
		assert!(matches!(err, RecordError::Auth(AuthError::PasswordMismatch)));
		assert_eq!(audit_log(&h).await.len(), 1);

		let archived = h
			.service
			.archive(&h.member, RecordKind::Partnership, record.id, "correct horse")
			.await
			.unwrap();
		assert!(archived.is_archived());

		let log = audit_log(&h).await;
		assert_eq!(log.len(), 2);
		let old_values = log[1].old_values.as_ref().unwrap();
		let new_values = log[1].new_values.as_ref().unwrap();
		assert_eq!(old_values.fields().collect::<Vec<_>>(), vec!["archived_at"]);
		assert_eq!(old_values.get("archived_at"), Some(&Value::Null));
		assert!(new_values.get("archived_at").unwrap().is_string());
	}

	#[tokio::test]
	async fn restore_clears_archived_at() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();
		h.service
			.archive(&h.member, RecordKind::Project, record.id, "correct horse")
			.await
			.unwrap();

		let restored = h
			.service
			.restore(&h.member, RecordKind::Project, record.id, "correct horse")
			.await
			.unwrap();
		assert!(!restored.is_archived());

		// Restoring an active record is a no-op.
		h.service
			.restore(&h.member, RecordKind::Project, record.id, "correct horse")
			.await
			.unwrap();

		let log = audit_log(&h).await;
		assert_eq!(log.len(), 3);
		assert_eq!(
			log[2].new_values.as_ref().unwrap().get("archived_at"),
			Some(&Value::Null)
		);
	}

	#[tokio::test]
	async fn delete_is_admin_only() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::ImpactAssessment, draft())
			.await
			.unwrap();

		let err = h
			.service
			.delete(
				&h.member,
				RecordKind::ImpactAssessment,
				record.id,
				"correct horse",
			)
			.await
			.unwrap_err();
		assert!(matches!(err, RecordError::Auth(AuthError::Forbidden { .. })));
		assert!(h
			.service
			.get(RecordKind::ImpactAssessment, record.id)
			.await
			.is_ok());
	}

	#[tokio::test]
	async fn delete_records_prior_snapshot() {
		let h = harness().await;
		let record = h
			.service
			.create(&h.member, RecordKind::Award, draft())
			.await
			.unwrap();

		h.service
			.delete(&h.admin, RecordKind::Award, record.id, "correct horse")
			.await
			.unwrap();

		let log = audit_log(&h).await;
		assert_eq!(log.len(), 2);
		assert_eq!(log[1].action, AuditAction::Delete);
		assert_eq!(log[1].actor, h.admin.actor());
		assert_eq!(log[1].subject, Some(record.entity_ref()));
		assert!(log[1].new_values.is_none());
		assert_eq!(
			log[1].old_values.as_ref().unwrap().get("status"),
			Some(&json!("draft"))
		);
		assert_eq!(
			log[1].description,
			format!("ben deleted award #{}", record.id)
		);

		let err = h.service.get(RecordKind::Award, record.id).await.unwrap_err();
		assert!(matches!(err, RecordError::NotFound { .. }));
	}

	#[tokio::test]
	async fn list_hides_archived_records() {
		let h = harness().await;
		let a = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();
		h.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();
		h.service
			.archive(&h.member, RecordKind::Project, a.id, "correct horse")
			.await
			.unwrap();

		let (records, total) = h
			.service
			.list(&RecordFilter::new(RecordKind::Project))
			.await
			.unwrap();
		assert_eq!(total, 1);
		assert_ne!(records[0].id, a.id);
	}

	#[tokio::test]
	async fn db_errors_surface_as_db() {
		let h = harness().await;
		let mut ghost = h
			.service
			.create(&h.member, RecordKind::Project, draft())
			.await
			.unwrap();
		ghost.id = 999;
		let err = h
			.service
			.store
			.update_record(&ghost)
			.await
			.map_err(RecordError::from)
			.unwrap_err();
		assert!(matches!(err, RecordError::Db(DbError::NotFound(_))));
	}
}
