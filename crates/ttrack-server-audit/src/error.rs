// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::event::{AuditAction, EntityRef};

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
	#[error("transient store failure: {0}")]
	TransientStoreFailure(String),

	#[error("store failure: {0}")]
	StoreFailure(String),

	#[error("invalid reference: {0} does not resolve to an existing entity")]
	InvalidReference(EntityRef),

	#[error("'{0}' is not a session action")]
	NotSessionAction(AuditAction),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("corrupt audit row: {0}")]
	Corrupt(String),
}

impl AuditError {
	/// Whether retrying the same write later could succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, AuditError::TransientStoreFailure(_))
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseTagError {
	pub kind: &'static str,
	pub value: String,
}

impl ParseTagError {
	pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
		Self {
			kind,
			value: value.into(),
		}
	}
}
