// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Projects, awards, partnerships, resolutions and impact assessments.
//!
//! [`RecordService`] owns the record lifecycle and reports each committed
//! change to an injected audit sink.

pub mod error;
pub mod service;
pub mod snapshot;

pub use error::{RecordError, RecordResult};
pub use service::{RecordDraft, RecordPatch, RecordService};
pub use snapshot::record_snapshot;
