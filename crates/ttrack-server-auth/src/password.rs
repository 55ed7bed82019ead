// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};

use crate::argon2_config::argon2_instance;
use crate::error::{AuthError, AuthResult};

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> AuthResult<String> {
	let salt = SaltString::generate(&mut OsRng);

	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
	let parsed_hash =
		PasswordHash::new(hash).map_err(|e| AuthError::Hash(format!("invalid hash format: {e}")))?;

	Ok(argon2_instance()
		.verify_password(password.as_bytes(), &parsed_hash)
		.is_ok())
}
