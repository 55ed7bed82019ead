// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and role gating for ttrack.
//!
//! - [`User`] / [`Role`] / [`CurrentUser`]: who is acting
//! - [`RoleGate`]: the admin/non-admin check
//! - [`hash_password`] / [`verify_password`]: argon2id credentials
//! - [`AuthService`]: login, logout and password confirmation, emitting
//!   session events to an injected audit sink

mod argon2_config;
pub mod error;
pub mod gate;
pub mod password;
pub mod service;
pub mod user;

pub use error::{AuthError, AuthResult};
pub use gate::RoleGate;
pub use password::{hash_password, verify_password};
pub use service::AuthService;
pub use user::{CurrentUser, Role, User, UserCredentials, UserDirectory};
