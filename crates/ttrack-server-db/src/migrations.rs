// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;
use ttrack_server_audit::AUDIT_RECORDS_SCHEMA;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_users",
		include_str!("../migrations/001_create_users.sql"),
	),
	(
		"002_create_records",
		include_str!("../migrations/002_create_records.sql"),
	),
];

/// Run all database migrations, then install the audit ledger schema.
///
/// # Note
/// Migrations are idempotent - safe to run multiple times.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in statements(sql) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = name, "migration applied");
	}

	for stmt in AUDIT_RECORDS_SCHEMA {
		sqlx::query(stmt).execute(pool).await?;
	}

	tracing::info!(count = MIGRATIONS.len() + 1, "database migrations complete");
	Ok(())
}

fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';')
		.map(strip_comments)
		.filter(|s| !s.is_empty())
}

fn strip_comments(chunk: &str) -> &str {
	let mut rest = chunk.trim();
	while rest.starts_with("--") {
		rest = rest.split_once('\n').map_or("", |(_, tail)| tail).trim();
	}
	rest
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	async fn table_names(pool: &SqlitePool) -> Vec<String> {
		sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
			.fetch_all(pool)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn creates_every_table() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();

		let tables = table_names(&pool).await;
		for expected in [
			"users",
			"projects",
			"awards",
			"partnerships",
			"resolutions",
			"impact_assessments",
			"audit_records",
		] {
			assert!(tables.iter().any(|t| t == expected), "missing {expected}");
		}
	}

	#[tokio::test]
	async fn is_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();
	}

	#[test]
	fn statements_skip_comment_headers() {
		let sql = "-- header\n-- more\n\nCREATE TABLE a (x INT);\n\nCREATE TABLE b (y INT);\n";
		let stmts: Vec<_> = statements(sql).collect();
		assert_eq!(stmts, vec!["CREATE TABLE a (x INT)", "CREATE TABLE b (y INT)"]);
	}
}
