// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dependency wiring.
//!
//! Every component that emits audit events receives the same sink here;
//! nothing looks one up at runtime.

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use ttrack_server_audit::{
	AuditConfig, AuditRecorder, AuditSink, AuditStore, NoopAuditSink, PolicyAuditSink,
	SqliteAuditStore,
};
use ttrack_server_auth::AuthService;
use ttrack_server_config::ServerConfig;
use ttrack_server_db::{RecordRepository, SqliteEntityDirectory, UserRepository};
use ttrack_server_records::RecordService;

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub audit_store: Arc<dyn AuditStore>,
	pub audit: Arc<dyn AuditSink>,
	pub users: Arc<UserRepository>,
	pub auth: Arc<AuthService>,
	pub records: Arc<RecordService>,
}

/// Build the application state over an already migrated pool.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> AppState {
	let audit_store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::new(pool.clone()));
	let directory = Arc::new(SqliteEntityDirectory::new(pool.clone()));
	let audit = build_audit_sink(audit_store.clone(), directory, &config.audit);

	let users = Arc::new(UserRepository::new(pool.clone()));
	let auth = Arc::new(AuthService::new(users.clone(), audit.clone()));
	let records = Arc::new(RecordService::new(
		Arc::new(RecordRepository::new(pool.clone())),
		auth.clone(),
		audit.clone(),
	));

	AppState {
		pool,
		audit_store,
		audit,
		users,
		auth,
		records,
	}
}

/// The recorder wrapped in the configured failure policy, or a sink that
/// drops everything when auditing is disabled.
pub fn build_audit_sink(
	store: Arc<dyn AuditStore>,
	directory: Arc<SqliteEntityDirectory>,
	config: &AuditConfig,
) -> Arc<dyn AuditSink> {
	if !config.enabled {
		tracing::warn!("audit logging disabled, events will be dropped");
		return Arc::new(NoopAuditSink);
	}

	let recorder = Arc::new(AuditRecorder::new(store, directory));
	Arc::new(PolicyAuditSink::new(recorder, config.failure_policy))
}
