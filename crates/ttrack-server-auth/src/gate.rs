// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{AuthError, AuthResult};
use crate::user::{CurrentUser, Role, User};

/// Binary admin/non-admin access check applied per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGate {
	AdminOnly,
	AnyUser,
}

impl RoleGate {
	pub fn allows(&self, user: &User) -> bool {
		match self {
			RoleGate::AdminOnly => user.is_admin,
			RoleGate::AnyUser => true,
		}
	}

	pub fn require(&self, current: &CurrentUser) -> AuthResult<()> {
		if self.allows(&current.user) {
			Ok(())
		} else {
			tracing::debug!(user_id = current.user.id, gate = ?self, "access denied");
			Err(AuthError::Forbidden {
				required: Role::Admin,
			})
		}
	}
}
