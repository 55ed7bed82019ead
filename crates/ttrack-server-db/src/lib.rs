// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the ttrack server.
//!
//! This crate provides the SQLite pool, schema migrations and the
//! repositories for users and tracked records. The audit ledger's own table
//! is owned by `ttrack-server-audit` and installed by [`run_migrations`].

pub mod directory;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod record;
pub mod timestamp;
pub mod user;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use directory::SqliteEntityDirectory;
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use record::{NewRecord, Record, RecordFilter, RecordKind, RecordRepository, RecordStore};
pub use user::{NewUser, UserRepository};
