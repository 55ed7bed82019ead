// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login, logout and password confirmation.
//!
//! The service holds the [`AuditSink`] it reports session events to; there is
//! no global dispatcher.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use ttrack_server_audit::{AuditEvent, AuditSink, RecordOutcome, RequestContext};

use crate::error::{AuthError, AuthResult};
use crate::password::verify_password;
use crate::user::{CurrentUser, UserDirectory};

pub struct AuthService {
	users: Arc<dyn UserDirectory>,
	audit: Arc<dyn AuditSink>,
}

impl AuthService {
	pub fn new(users: Arc<dyn UserDirectory>, audit: Arc<dyn AuditSink>) -> Self {
		Self { users, audit }
	}

	/// Verify credentials and emit a login event.
	#[instrument(skip(self, password, context))]
	pub async fn login(
		&self,
		email: &str,
		password: &str,
		context: RequestContext,
	) -> AuthResult<CurrentUser> {
		let Some(credentials) = self.users.credentials_by_email(email).await? else {
			warn!("login failed: unknown email");
			return Err(AuthError::InvalidCredentials);
		};

		if !verify_password(password, &credentials.password_hash)? {
			warn!(user_id = credentials.user.id, "login failed: wrong password");
			return Err(AuthError::InvalidCredentials);
		}

		let current = CurrentUser::new(credentials.user, context);
		self.emit(AuditEvent::login(current.actor()).with_context(current.context.clone()))
			.await?;
		info!(user_id = current.user.id, "user logged in");
		Ok(current)
	}

	/// Emit a logout event for the current user.
	#[instrument(skip(self, current), fields(user_id = current.user.id))]
	pub async fn logout(&self, current: &CurrentUser) -> AuthResult<()> {
		self.emit(AuditEvent::logout(current.actor()).with_context(current.context.clone()))
			.await?;
		info!("user logged out");
		Ok(())
	}

	/// Re-check the current user's password before a sensitive change.
	/// Emits nothing.
	#[instrument(skip(self, current, password), fields(user_id = current.user.id))]
	pub async fn confirm_password(&self, current: &CurrentUser, password: &str) -> AuthResult<()> {
		let credentials = self
			.users
			.credentials_by_email(&current.user.email)
			.await?
			.filter(|c| c.user.id == current.user.id)
			.ok_or(AuthError::PasswordMismatch)?;

		if verify_password(password, &credentials.password_hash)? {
			Ok(())
		} else {
			warn!("password confirmation failed");
			Err(AuthError::PasswordMismatch)
		}
	}

	/// Rebuild a [`CurrentUser`] for an already-authenticated user id.
	pub async fn current_user(&self, user_id: i64, context: RequestContext) -> AuthResult<CurrentUser> {
		self.users
			.user_by_id(user_id)
			.await?
			.map(|user| CurrentUser::new(user, context))
			.ok_or(AuthError::InvalidCredentials)
	}

	async fn emit(&self, event: AuditEvent) -> AuthResult<RecordOutcome> {
		Ok(self.audit.record(event).await?)
	}
}
