// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ttrack_server_audit::AuditError;
use ttrack_server_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
	/// Maps a UNIQUE constraint violation to `Conflict`, anything else to `Sqlx`.
	pub(crate) fn from_insert(e: sqlx::Error, what: impl Into<String>) -> Self {
		match &e {
			sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
				DbError::Conflict(what.into())
			}
			_ => DbError::Sqlx(e),
		}
	}
}

impl From<DbError> for AuthError {
	fn from(e: DbError) -> Self {
		AuthError::Directory(e.to_string())
	}
}

impl From<DbError> for AuditError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::Sqlx(sqlx::Error::Io(_))
			| DbError::Sqlx(sqlx::Error::PoolTimedOut)
			| DbError::Sqlx(sqlx::Error::PoolClosed) => AuditError::TransientStoreFailure(e.to_string()),
			other => AuditError::StoreFailure(other.to_string()),
		}
	}
}
