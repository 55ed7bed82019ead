// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use ttrack_server_audit::AuditError;
use ttrack_server_auth::AuthError;
use ttrack_server_db::{DbError, RecordKind};

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Error, Debug)]
pub enum RecordError {
	#[error("{kind} {id} not found")]
	NotFound { kind: RecordKind, id: i64 },

	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error(transparent)]
	Db(#[from] DbError),

	/// The record change was committed but its audit entry was not written.
	#[error("audit error: {0}")]
	Audit(#[from] AuditError),
}
