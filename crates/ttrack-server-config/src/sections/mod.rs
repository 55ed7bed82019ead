// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod audit;
mod database;
mod logging;

pub use audit::{AuditConfig, AuditConfigLayer, AuditFailurePolicy};
pub use database::{DatabaseConfig, DatabaseConfigLayer, DEFAULT_DATABASE_URL};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
