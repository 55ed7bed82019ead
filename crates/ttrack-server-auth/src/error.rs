// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use ttrack_server_audit::AuditError;

use crate::user::Role;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
	/// Unknown email and wrong password are reported identically.
	#[error("invalid email or password")]
	InvalidCredentials,

	#[error("forbidden: {required} role required")]
	Forbidden { required: Role },

	#[error("password confirmation failed")]
	PasswordMismatch,

	#[error("password hashing failed: {0}")]
	Hash(String),

	#[error("user directory error: {0}")]
	Directory(String),

	#[error("audit error: {0}")]
	Audit(#[from] AuditError),
}
