// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;
use ttrack_server_audit::Snapshot;
use ttrack_server_db::timestamp::format_timestamp;
use ttrack_server_db::Record;

/// The audited fields of a record. Bookkeeping columns (`id`, `created_by`,
/// `created_at`, `updated_at`) are left out.
pub fn record_snapshot(record: &Record) -> Snapshot {
	Snapshot::new()
		.with("title", record.title.clone())
		.with("status", record.status.clone())
		.with("campus", record.campus.clone())
		.with("college", record.college.clone())
		.with("attributes", Value::Object(record.attributes.clone()))
		.with("archived_at", record.archived_at.map(format_timestamp))
}
