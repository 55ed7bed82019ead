// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User types and the directory the auth service reads them from.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ttrack_server_audit::{EntityRef, RequestContext};

use crate::error::AuthResult;

/// The two access levels. Derived from the `is_admin` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Admin,
	User,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Admin => write!(f, "admin"),
			Role::User => write!(f, "user"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: i64,
	pub name: String,
	pub email: String,
	pub is_admin: bool,
	pub created_at: DateTime<Utc>,
}

impl User {
	pub fn role(&self) -> Role {
		if self.is_admin {
			Role::Admin
		} else {
			Role::User
		}
	}

	/// This user as an audit actor.
	pub fn entity_ref(&self) -> EntityRef {
		EntityRef::user(self.id)
	}
}

/// A user together with their stored password hash.
#[derive(Clone)]
pub struct UserCredentials {
	pub user: User,
	pub password_hash: String,
}

impl fmt::Debug for UserCredentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UserCredentials")
			.field("user", &self.user)
			.field("password_hash", &"[REDACTED]")
			.finish()
	}
}

/// The authenticated user for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
	pub user: User,
	pub context: RequestContext,
}

impl CurrentUser {
	pub fn new(user: User, context: RequestContext) -> Self {
		Self { user, context }
	}

	pub fn is_admin(&self) -> bool {
		self.user.is_admin
	}

	pub fn actor(&self) -> EntityRef {
		self.user.entity_ref()
	}
}

/// Read access to stored users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
	async fn user_by_id(&self, id: i64) -> AuthResult<Option<User>>;

	async fn credentials_by_email(&self, email: &str) -> AuthResult<Option<UserCredentials>>;
}
