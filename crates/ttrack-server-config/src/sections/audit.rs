// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a failed audit write does to the operation that emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditFailurePolicy {
	/// Return the audit error to the caller.
	#[default]
	Propagate,
	/// Log a warning and report success.
	Warn,
}

impl fmt::Display for AuditFailurePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuditFailurePolicy::Propagate => f.write_str("propagate"),
			AuditFailurePolicy::Warn => f.write_str("warn"),
		}
	}
}

impl FromStr for AuditFailurePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"propagate" => Ok(AuditFailurePolicy::Propagate),
			"warn" => Ok(AuditFailurePolicy::Warn),
			other => Err(format!("expected 'propagate' or 'warn', got '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub failure_policy: Option<AuditFailurePolicy>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.failure_policy.is_some() {
			self.failure_policy = other.failure_policy;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			failure_policy: self.failure_policy.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	pub enabled: bool,
	pub failure_policy: AuditFailurePolicy,
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			failure_policy: AuditFailurePolicy::default(),
		}
	}
}
