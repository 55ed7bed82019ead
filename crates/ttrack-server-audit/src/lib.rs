// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit ledger for ttrack.
//!
//! Domain components hold an [`AuditSink`] and hand it [`AuditEvent`]s. The
//! [`AuditRecorder`] resolves the actor and subject, suppresses repeated
//! login/logout events inside [`SESSION_DEDUP_WINDOW_SECS`], and appends one
//! [`AuditRecord`] per accepted event to an [`AuditStore`].

pub mod dedup;
pub mod directory;
pub mod error;
pub mod event;
pub mod policy;
pub mod recorder;
pub mod snapshot;
pub mod store;

pub use dedup::{session_dedup_window, DedupGuard, SESSION_DEDUP_WINDOW_SECS};
pub use directory::{EntityDirectory, StaticEntityDirectory, SYSTEM_ACTOR_NAME};
pub use error::{AuditError, AuditResult, ParseTagError};
pub use event::{
	ledger_time, AuditAction, AuditEvent, AuditRecord, AuditRecordBuilder, AuditRecordId, Change,
	EntityKind, EntityRef, NewAuditRecord, RequestContext,
};
pub use policy::PolicyAuditSink;
pub use recorder::{describe, AuditRecorder, AuditSink, NoopAuditSink, RecordOutcome};
pub use snapshot::Snapshot;
pub use store::memory::InMemoryAuditStore;
pub use store::{AuditQuery, AuditStore, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};

pub use ttrack_server_config::{AuditConfig, AuditFailurePolicy};

#[cfg(feature = "store-sqlite")]
pub use store::sqlite::{SqliteAuditStore, AUDIT_RECORDS_SCHEMA};
