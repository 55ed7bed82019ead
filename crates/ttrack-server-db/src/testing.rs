// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pool helpers for tests in this crate and its dependents.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations::run_migrations;
use crate::timestamp::format_timestamp;

/// A single-connection in-memory pool with foreign keys on and no schema.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str("sqlite::memory:")
		.unwrap()
		.foreign_keys(true);
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.unwrap()
}

/// [`create_test_pool`] with every migration applied.
pub async fn create_migrated_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	pool
}

/// Insert a user row with a placeholder hash and return its id.
pub async fn insert_test_user(pool: &SqlitePool, name: &str, email: &str, is_admin: bool) -> i64 {
	sqlx::query(
		"INSERT INTO users (name, email, password_hash, is_admin, created_at) VALUES (?, ?, ?, ?, ?)",
	)
	.bind(name)
	.bind(email)
	.bind("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g")
	.bind(is_admin)
	.bind(format_timestamp(Utc::now()))
	.execute(pool)
	.await
	.unwrap()
	.last_insert_rowid()
}
