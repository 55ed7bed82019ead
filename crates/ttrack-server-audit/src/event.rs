// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the audit ledger.
//!
//! - [`EntityKind`] / [`EntityRef`]: polymorphic actor and subject references
//! - [`AuditAction`]: what happened
//! - [`AuditEvent`]: a domain event handed to an [`AuditSink`](crate::AuditSink)
//! - [`NewAuditRecord`] / [`AuditRecordBuilder`]: an entry before insertion
//! - [`AuditRecord`]: an entry as stored in the ledger

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseTagError;
use crate::snapshot::Snapshot;

/// Truncate to whole microseconds, the precision the ledger stores.
pub fn ledger_time(at: DateTime<Utc>) -> DateTime<Utc> {
	at.trunc_subsecs(6)
}

/// Kinds of entity that can act or be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	User,
	System,
	Project,
	Award,
	Partnership,
	Resolution,
	ImpactAssessment,
}

impl EntityKind {
	pub fn all() -> &'static [EntityKind] {
		&[
			EntityKind::User,
			EntityKind::System,
			EntityKind::Project,
			EntityKind::Award,
			EntityKind::Partnership,
			EntityKind::Resolution,
			EntityKind::ImpactAssessment,
		]
	}

	/// The tag persisted in `actor_type` / `subject_type`.
	pub fn as_str(&self) -> &'static str {
		match self {
			EntityKind::User => "user",
			EntityKind::System => "system",
			EntityKind::Project => "project",
			EntityKind::Award => "award",
			EntityKind::Partnership => "partnership",
			EntityKind::Resolution => "resolution",
			EntityKind::ImpactAssessment => "impact_assessment",
		}
	}

	/// Human-readable label used in record descriptions.
	pub fn label(&self) -> &'static str {
		match self {
			EntityKind::ImpactAssessment => "impact assessment",
			other => other.as_str(),
		}
	}

	/// Whether entities of this kind can perform actions.
	pub fn is_actor(&self) -> bool {
		matches!(self, EntityKind::User | EntityKind::System)
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EntityKind {
	type Err = ParseTagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EntityKind::all()
			.iter()
			.copied()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| ParseTagError::new("entity kind", s))
	}
}

/// A `(kind, id)` pair pointing at one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
	pub kind: EntityKind,
	pub id: i64,
}

impl EntityRef {
	pub const fn new(kind: EntityKind, id: i64) -> Self {
		Self { kind, id }
	}

	pub const fn user(id: i64) -> Self {
		Self::new(EntityKind::User, id)
	}

	/// The actor used for actions not attributable to a person.
	pub const fn system() -> Self {
		Self::new(EntityKind::System, 0)
	}
}

impl fmt::Display for EntityRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.kind, self.id)
	}
}

/// Parses `kind:id` or `kind#id`.
impl FromStr for EntityRef {
	type Err = ParseTagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (kind, id) = s
			.split_once(|c: char| c == ':' || c == '#')
			.ok_or_else(|| ParseTagError::new("entity reference", s))?;
		let id = id
			.parse::<i64>()
			.map_err(|_| ParseTagError::new("entity reference", s))?;
		Ok(Self::new(kind.parse()?, id))
	}
}

/// The action an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditAction {
	Login,
	Logout,
	Create,
	Update,
	Delete,
}

impl AuditAction {
	pub fn all() -> &'static [AuditAction] {
		&[
			AuditAction::Login,
			AuditAction::Logout,
			AuditAction::Create,
			AuditAction::Update,
			AuditAction::Delete,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditAction::Login => "login",
			AuditAction::Logout => "logout",
			AuditAction::Create => "create",
			AuditAction::Update => "update",
			AuditAction::Delete => "delete",
		}
	}

	/// Session actions are subject to deduplication and carry no subject.
	pub fn is_session(&self) -> bool {
		matches!(self, AuditAction::Login | AuditAction::Logout)
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditAction {
	type Err = ParseTagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditAction::all()
			.iter()
			.copied()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| ParseTagError::new("audit action", s))
	}
}

/// Request provenance attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl RequestContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}
}

/// Identifier assigned to a record by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecordId(i64);

impl AuditRecordId {
	pub const fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn as_i64(&self) -> i64 {
		self.0
	}
}

impl fmt::Display for AuditRecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for AuditRecordId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// What changed, for each kind of domain event.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
	Login,
	Logout,
	Created {
		subject: EntityRef,
		new_values: Snapshot,
	},
	Updated {
		subject: EntityRef,
		old_values: Snapshot,
		new_values: Snapshot,
	},
	Deleted {
		subject: EntityRef,
		old_values: Option<Snapshot>,
	},
}

/// A domain event emitted by the authentication or business-entity layers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
	pub actor: EntityRef,
	pub change: Change,
	pub context: RequestContext,
	pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
	fn new(actor: EntityRef, change: Change) -> Self {
		Self {
			actor,
			change,
			context: RequestContext::default(),
			occurred_at: ledger_time(Utc::now()),
		}
	}

	pub fn login(actor: EntityRef) -> Self {
		Self::new(actor, Change::Login)
	}

	pub fn logout(actor: EntityRef) -> Self {
		Self::new(actor, Change::Logout)
	}

	pub fn created(actor: EntityRef, subject: EntityRef, new_values: Snapshot) -> Self {
		Self::new(
			actor,
			Change::Created {
				subject,
				new_values,
			},
		)
	}

	pub fn updated(
		actor: EntityRef,
		subject: EntityRef,
		old_values: Snapshot,
		new_values: Snapshot,
	) -> Self {
		Self::new(
			actor,
			Change::Updated {
				subject,
				old_values,
				new_values,
			},
		)
	}

	pub fn deleted(actor: EntityRef, subject: EntityRef, old_values: Option<Snapshot>) -> Self {
		Self::new(
			actor,
			Change::Deleted {
				subject,
				old_values,
			},
		)
	}

	pub fn with_context(mut self, context: RequestContext) -> Self {
		self.context = context;
		self
	}

	/// Override the time the event occurred. Defaults to construction time.
	pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
		self.occurred_at = ledger_time(occurred_at);
		self
	}

	pub fn action(&self) -> AuditAction {
		match self.change {
			Change::Login => AuditAction::Login,
			Change::Logout => AuditAction::Logout,
			Change::Created { .. } => AuditAction::Create,
			Change::Updated { .. } => AuditAction::Update,
			Change::Deleted { .. } => AuditAction::Delete,
		}
	}

	pub fn subject(&self) -> Option<&EntityRef> {
		match &self.change {
			Change::Login | Change::Logout => None,
			Change::Created { subject, .. }
			| Change::Updated { subject, .. }
			| Change::Deleted { subject, .. } => Some(subject),
		}
	}
}

/// An audit entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
	pub actor: EntityRef,
	pub action: AuditAction,
	pub subject: Option<EntityRef>,
	pub old_values: Option<Snapshot>,
	pub new_values: Option<Snapshot>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub description: String,
	pub created_at: DateTime<Utc>,
}

impl NewAuditRecord {
	pub fn builder(actor: EntityRef, action: AuditAction) -> AuditRecordBuilder {
		AuditRecordBuilder::new(actor, action)
	}
}

/// Builder for [`NewAuditRecord`] with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditRecordBuilder {
	actor: EntityRef,
	action: AuditAction,
	subject: Option<EntityRef>,
	old_values: Option<Snapshot>,
	new_values: Option<Snapshot>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	description: Option<String>,
	created_at: Option<DateTime<Utc>>,
}

impl AuditRecordBuilder {
	pub fn new(actor: EntityRef, action: AuditAction) -> Self {
		Self {
			actor,
			action,
			subject: None,
			old_values: None,
			new_values: None,
			ip_address: None,
			user_agent: None,
			description: None,
			created_at: None,
		}
	}

	pub fn subject(mut self, subject: EntityRef) -> Self {
		self.subject = Some(subject);
		self
	}

	pub fn old_values(mut self, values: Snapshot) -> Self {
		self.old_values = Some(values);
		self
	}

	pub fn new_values(mut self, values: Snapshot) -> Self {
		self.new_values = Some(values);
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	/// Copy request provenance from a [`RequestContext`].
	pub fn context(mut self, context: RequestContext) -> Self {
		self.ip_address = context.ip_address;
		self.user_agent = context.user_agent;
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Set the creation time. Defaults to the time of `build()`.
	pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
		self.created_at = Some(ledger_time(at));
		self
	}

	pub fn build(self) -> NewAuditRecord {
		NewAuditRecord {
			actor: self.actor,
			action: self.action,
			subject: self.subject,
			old_values: self.old_values,
			new_values: self.new_values,
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			description: self
				.description
				.unwrap_or_else(|| self.action.to_string()),
			created_at: self
				.created_at
				.unwrap_or_else(|| ledger_time(Utc::now())),
		}
	}
}

/// An entry in the audit ledger. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
	pub id: AuditRecordId,
	pub actor: EntityRef,
	pub action: AuditAction,
	pub subject: Option<EntityRef>,
	pub old_values: Option<Snapshot>,
	pub new_values: Option<Snapshot>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub description: String,
	pub created_at: DateTime<Utc>,
}

impl AuditRecord {
	pub fn from_new(id: AuditRecordId, entry: NewAuditRecord) -> Self {
		Self {
			id,
			actor: entry.actor,
			action: entry.action,
			subject: entry.subject,
			old_values: entry.old_values,
			new_values: entry.new_values,
			ip_address: entry.ip_address,
			user_agent: entry.user_agent,
			description: entry.description,
			created_at: entry.created_at,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod entity_kind {
		use super::*;

		#[test]
		fn tags_are_snake_case() {
			assert_eq!(EntityKind::ImpactAssessment.to_string(), "impact_assessment");
			assert_eq!(
				serde_json::to_string(&EntityKind::ImpactAssessment).unwrap(),
				"\"impact_assessment\""
			);
		}

		#[test]
		fn label_is_human_readable() {
			assert_eq!(EntityKind::ImpactAssessment.label(), "impact assessment");
			assert_eq!(EntityKind::Award.label(), "award");
		}

		#[test]
		fn rejects_unknown_tag() {
			let err = "campus".parse::<EntityKind>().unwrap_err();
			assert_eq!(err.value, "campus");
		}

		#[test]
		fn only_users_and_system_act() {
			let actors: Vec<_> = EntityKind::all()
				.iter()
				.filter(|k| k.is_actor())
				.collect();
			assert_eq!(actors, vec![&EntityKind::User, &EntityKind::System]);
		}
	}

	mod entity_ref {
		use super::*;

		#[test]
		fn parses_both_separators() {
			assert_eq!(
				"project:42".parse::<EntityRef>().unwrap(),
				EntityRef::new(EntityKind::Project, 42)
			);
			assert_eq!("user#7".parse::<EntityRef>().unwrap(), EntityRef::user(7));
		}

		#[test]
		fn rejects_malformed() {
			assert!("project".parse::<EntityRef>().is_err());
			assert!("project:abc".parse::<EntityRef>().is_err());
			assert!("planet:1".parse::<EntityRef>().is_err());
		}

		#[test]
		fn displays_with_hash() {
			assert_eq!(EntityRef::new(EntityKind::Award, 9).to_string(), "award#9");
			assert_eq!(EntityRef::system().to_string(), "system#0");
		}
	}

	mod audit_action {
		use super::*;

		#[test]
		fn session_actions() {
			assert!(AuditAction::Login.is_session());
			assert!(AuditAction::Logout.is_session());
			assert!(!AuditAction::Create.is_session());
			assert!(!AuditAction::Update.is_session());
			assert!(!AuditAction::Delete.is_session());
		}

		#[test]
		fn rejects_unknown_tag() {
			assert!("archive".parse::<AuditAction>().is_err());
		}
	}

	mod audit_event {
		use super::*;

		#[test]
		fn action_follows_change() {
			let actor = EntityRef::user(7);
			let subject = EntityRef::new(EntityKind::Project, 42);

			assert_eq!(AuditEvent::login(actor).action(), AuditAction::Login);
			assert_eq!(AuditEvent::logout(actor).action(), AuditAction::Logout);
			assert_eq!(
				AuditEvent::created(actor, subject, Snapshot::new()).action(),
				AuditAction::Create
			);
			assert_eq!(
				AuditEvent::deleted(actor, subject, None).action(),
				AuditAction::Delete
			);
		}

		#[test]
		fn session_events_have_no_subject() {
			assert!(AuditEvent::login(EntityRef::user(1)).subject().is_none());
			let subject = EntityRef::new(EntityKind::Award, 9);
			assert_eq!(
				AuditEvent::deleted(EntityRef::user(1), subject, None).subject(),
				Some(&subject)
			);
		}
	}

	mod audit_record_builder {
		use super::*;
		use chrono::TimeZone;

		#[test]
		fn builds_minimal_entry() {
			let entry = NewAuditRecord::builder(EntityRef::user(3), AuditAction::Logout).build();

			assert_eq!(entry.actor, EntityRef::user(3));
			assert_eq!(entry.action, AuditAction::Logout);
			assert!(entry.subject.is_none());
			assert!(entry.old_values.is_none());
			assert!(entry.new_values.is_none());
			assert!(entry.ip_address.is_none());
			assert!(entry.user_agent.is_none());
			assert_eq!(entry.description, "logout");
		}

		#[test]
		fn context_sets_provenance() {
			let entry = NewAuditRecord::builder(EntityRef::user(3), AuditAction::Login)
				.context(
					RequestContext::new()
						.ip_address("10.0.0.4")
						.user_agent("Mozilla/5.0"),
				)
				.build();

			assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.4"));
			assert_eq!(entry.user_agent.as_deref(), Some("Mozilla/5.0"));
		}

		#[test]
		fn sets_timestamp_to_now() {
			let before = ledger_time(Utc::now());
			let entry = NewAuditRecord::builder(EntityRef::user(3), AuditAction::Login).build();
			let after = Utc::now();

			assert!(entry.created_at >= before);
			assert!(entry.created_at <= after);
		}

		#[test]
		fn timestamps_are_truncated_to_microseconds() {
			let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
				+ chrono::Duration::nanoseconds(176_253_154);
			let expected = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
				+ chrono::Duration::microseconds(176_253);

			let entry = NewAuditRecord::builder(EntityRef::user(3), AuditAction::Login)
				.created_at(at)
				.build();
			assert_eq!(entry.created_at, expected);
			assert_eq!(AuditEvent::login(EntityRef::user(3)).at(at).occurred_at, expected);
			let now = AuditEvent::logout(EntityRef::user(3)).occurred_at;
			assert_eq!(now.timestamp_subsec_nanos() % 1000, 0);
		}
	}

	fn arb_kind() -> impl Strategy<Value = EntityKind> {
		prop::sample::select(EntityKind::all().to_vec())
	}

	fn arb_action() -> impl Strategy<Value = AuditAction> {
		prop::sample::select(AuditAction::all().to_vec())
	}

	proptest! {
		#[test]
		fn entity_ref_display_parses_back(kind in arb_kind(), id in any::<i64>()) {
			let reference = EntityRef::new(kind, id);
			prop_assert_eq!(reference.to_string().parse::<EntityRef>().unwrap(), reference);
		}

		#[test]
		fn action_tag_parses_back(action in arb_action()) {
			prop_assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
		}
	}
}
