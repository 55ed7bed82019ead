// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ttrack server.
//!
//! Wires configuration, the SQLite pool, the audit ledger and the services
//! that emit into it, and exposes the admin command line.

pub mod cli;
pub mod state;
pub mod telemetry;
pub mod version;

pub use state::{build_audit_sink, create_app_state, AppState};
pub use ttrack_server_config::ServerConfig;

use ttrack_server_db::{create_pool, run_migrations};

/// Open the configured database and apply migrations.
pub async fn connect(config: &ServerConfig) -> anyhow::Result<sqlx::SqlitePool> {
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
