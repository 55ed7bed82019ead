// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use ttrack_server_auth::{AuthResult, User, UserCredentials, UserDirectory};

use crate::error::DbError;
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Fields for a new user. `password_hash` is an argon2 PHC string.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub name: String,
	pub email: String,
	pub password_hash: String,
	pub is_admin: bool,
}

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a user.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email is already registered.
	#[tracing::instrument(skip(self, user), fields(email = %user.email, is_admin = user.is_admin))]
	pub async fn create_user(&self, user: &NewUser) -> Result<User, DbError> {
		let now = Utc::now();
		let result = sqlx::query(
			r#"
			INSERT INTO users (name, email, password_hash, is_admin, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(&user.name)
		.bind(&user.email)
		.bind(&user.password_hash)
		.bind(user.is_admin)
		.bind(format_timestamp(now))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, format!("email {} already registered", user.email)))?;

		let id = result.last_insert_rowid();
		tracing::info!(user_id = id, "user created");
		self.get_user_by_id(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("user {id}")))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			"SELECT id, name, email, password_hash, is_admin, created_at FROM users WHERE id = ?",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_user_row(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		Ok(self.get_credentials_by_email(email).await?.map(|c| c.user))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_credentials_by_email(
		&self,
		email: &str,
	) -> Result<Option<UserCredentials>, DbError> {
		let row = sqlx::query(
			"SELECT id, name, email, password_hash, is_admin, created_at FROM users WHERE email = ?",
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| -> Result<UserCredentials, DbError> {
			Ok(UserCredentials {
				user: parse_user_row(&r)?,
				password_hash: r.get("password_hash"),
			})
		})
		.transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
		let rows = sqlx::query(
			"SELECT id, name, email, password_hash, is_admin, created_at FROM users ORDER BY id",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_user_row).collect()
	}
}

#[async_trait]
impl UserDirectory for UserRepository {
	async fn user_by_id(&self, id: i64) -> AuthResult<Option<User>> {
		Ok(self.get_user_by_id(id).await?)
	}

	async fn credentials_by_email(&self, email: &str) -> AuthResult<Option<UserCredentials>> {
		Ok(self.get_credentials_by_email(email).await?)
	}
}

fn parse_user_row(row: &SqliteRow) -> Result<User, DbError> {
	let created_at: String = row.get("created_at");
	Ok(User {
		id: row.get("id"),
		name: row.get("name"),
		email: row.get("email"),
		is_admin: row.get("is_admin"),
		created_at: parse_timestamp(&created_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_migrated_test_pool;

	fn new_user(email: &str, is_admin: bool) -> NewUser {
		NewUser {
			name: "Ana Reyes".to_string(),
			email: email.to_string(),
			password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
			is_admin,
		}
	}

	#[tokio::test]
	async fn create_and_fetch() {
		let repo = UserRepository::new(create_migrated_test_pool().await);

		let user = repo
			.create_user(&new_user("ana@univ.edu.ph", true))
			.await
			.unwrap();
		assert!(user.is_admin);

		let by_id = repo.get_user_by_id(user.id).await.unwrap().unwrap();
		assert_eq!(by_id, user);

		let by_email = repo
			.get_user_by_email("ana@univ.edu.ph")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(by_email.id, user.id);
		assert!(repo.get_user_by_id(9999).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn duplicate_email_conflicts() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		repo.create_user(&new_user("ana@univ.edu.ph", false))
			.await
			.unwrap();

		let err = repo
			.create_user(&new_user("ana@univ.edu.ph", false))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn directory_exposes_credentials() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		let user = repo
			.create_user(&new_user("ana@univ.edu.ph", false))
			.await
			.unwrap();

		let creds = repo
			.credentials_by_email("ana@univ.edu.ph")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(creds.user.id, user.id);
		assert!(creds.password_hash.starts_with("$argon2id$"));
		assert!(repo.user_by_id(user.id).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn list_is_ordered_by_id() {
		let repo = UserRepository::new(create_migrated_test_pool().await);
		repo.create_user(&new_user("b@univ.edu.ph", false))
			.await
			.unwrap();
		repo.create_user(&new_user("a@univ.edu.ph", false))
			.await
			.unwrap();

		let users = repo.list_users().await.unwrap();
		assert_eq!(users.len(), 2);
		assert!(users[0].id < users[1].id);
	}
}
