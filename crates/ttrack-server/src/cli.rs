// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin command line.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use ttrack_server_audit::{AuditAction, AuditQuery, AuditRecord, EntityRef};
use ttrack_server_auth::{hash_password, User};
use ttrack_server_db::NewUser;

use crate::state::AppState;

/// ttrack server - technology-transfer records audit core.
#[derive(Parser, Debug)]
#[command(name = "ttrack-server", about = "ttrack records audit core", version)]
pub struct Cli {
	/// Config file to read instead of /etc/ttrack/server.toml
	#[arg(long, global = true, env = "TTRACK_SERVER_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Create or upgrade the database schema
	Migrate,
	/// Manage users
	#[command(subcommand)]
	User(UserCommand),
	/// Read the audit ledger
	#[command(subcommand)]
	Audit(AuditCommand),
	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
	/// Create a user
	Create(CreateUserArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateUserArgs {
	#[arg(long)]
	pub name: String,
	#[arg(long)]
	pub email: String,
	#[arg(long, env = "TTRACK_SERVER_NEW_USER_PASSWORD")]
	pub password: String,
	/// Grant the admin role
	#[arg(long)]
	pub admin: bool,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
	/// List audit records, newest first
	List(AuditListArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct AuditListArgs {
	/// Actor as kind:id, e.g. user:7
	#[arg(long)]
	pub actor: Option<EntityRef>,
	/// login, logout, create, update or delete
	#[arg(long)]
	pub action: Option<AuditAction>,
	/// Subject as kind:id, e.g. project:42
	#[arg(long)]
	pub subject: Option<EntityRef>,
	/// Only records from the last N minutes
	#[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
	pub since_minutes: Option<i64>,
	#[arg(long, default_value_t = 50)]
	pub limit: i64,
	/// Print one JSON object per line
	#[arg(long)]
	pub json: bool,
}

impl AuditListArgs {
	/// Fails when `since_minutes` is negative or reaches back past the
	/// earliest representable time.
	pub fn to_query(&self) -> anyhow::Result<AuditQuery> {
		let mut query = AuditQuery::new().limit(self.limit);
		if let Some(actor) = self.actor {
			query = query.actor(actor);
		}
		if let Some(action) = self.action {
			query = query.action(action);
		}
		if let Some(subject) = self.subject {
			query = query.subject(subject);
		}
		if let Some(minutes) = self.since_minutes {
			if minutes < 0 {
				bail!("--since-minutes must not be negative, got {minutes}");
			}
			let since = Duration::try_minutes(minutes)
				.and_then(|window| Utc::now().checked_sub_signed(window))
				.ok_or_else(|| anyhow!("--since-minutes {minutes} is out of range"))?;
			query = query.since(since);
		}
		Ok(query)
	}
}

pub async fn create_user(state: &AppState, args: &CreateUserArgs) -> anyhow::Result<User> {
	if args.password.len() < 8 {
		bail!("password must be at least 8 characters");
	}
	let password_hash = hash_password(&args.password).context("hashing password")?;
	let user = state
		.users
		.create_user(&NewUser {
			name: args.name.clone(),
			email: args.email.clone(),
			password_hash,
			is_admin: args.admin,
		})
		.await
		.with_context(|| format!("creating user {}", args.email))?;
	Ok(user)
}

pub async fn list_audit(
	state: &AppState,
	args: &AuditListArgs,
) -> anyhow::Result<(Vec<AuditRecord>, i64)> {
	let (records, total) = state
		.audit_store
		.query(&args.to_query()?)
		.await
		.context("querying audit records")?;
	Ok((records, total))
}

/// One line per record: id, time, actor, action, subject, description.
pub fn format_audit_line(record: &AuditRecord) -> String {
	let subject = record
		.subject
		.map(|s| s.to_string())
		.unwrap_or_else(|| "-".to_string());
	format!(
		"{:>6}  {}  {:<14} {:<7} {:<22} {}",
		record.id.as_i64(),
		record.created_at.format("%Y-%m-%d %H:%M:%S"),
		record.actor.to_string(),
		record.action.as_str(),
		subject,
		record.description
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use ttrack_server_audit::{AuditRecordId, EntityKind, Snapshot};

	#[test]
	fn parses_audit_list_filters() {
		let cli = Cli::try_parse_from([
			"ttrack-server",
			"audit",
			"list",
			"--actor",
			"user:7",
			"--action",
			"update",
			"--subject",
			"project:42",
			"--limit",
			"10",
		])
		.unwrap();

		let Command::Audit(AuditCommand::List(args)) = cli.command else {
			panic!("expected audit list");
		};
		assert_eq!(args.actor, Some(EntityRef::user(7)));
		assert_eq!(args.action, Some(AuditAction::Update));
		assert_eq!(args.subject, Some(EntityRef::new(EntityKind::Project, 42)));

		let query = args.to_query().unwrap();
		assert_eq!(query.effective_limit(), 10);
		assert_eq!(query.actor, Some(EntityRef::user(7)));
	}

	#[test]
	fn since_minutes_reaches_back_from_now() {
		let args = AuditListArgs {
			since_minutes: Some(90),
			limit: 50,
			..Default::default()
		};
		let before = Utc::now();
		let since = args.to_query().unwrap().from.unwrap();
		assert!(since <= before - Duration::minutes(90) + Duration::seconds(5));
		assert!(since >= before - Duration::minutes(91));
	}

	#[test]
	fn since_minutes_out_of_range_is_an_error() {
		for minutes in [i64::MAX, i64::MAX / 2, 600_000_000_000] {
			let args = AuditListArgs {
				since_minutes: Some(minutes),
				limit: 50,
				..Default::default()
			};
			let err = args.to_query().unwrap_err();
			assert!(err.to_string().contains("out of range"), "{minutes}: {err}");
		}
	}

	#[test]
	fn negative_since_minutes_is_rejected() {
		let args = AuditListArgs {
			since_minutes: Some(-5),
			limit: 50,
			..Default::default()
		};
		assert!(args.to_query().is_err());

		assert!(Cli::try_parse_from([
			"ttrack-server",
			"audit",
			"list",
			"--since-minutes=-5",
		])
		.is_err());
		assert!(Cli::try_parse_from([
			"ttrack-server",
			"audit",
			"list",
			"--since-minutes",
			"0",
		])
		.is_ok());
	}

	#[test]
	fn rejects_unknown_action() {
		assert!(Cli::try_parse_from(["ttrack-server", "audit", "list", "--action", "archive"]).is_err());
	}

	#[test]
	fn parses_user_create() {
		let cli = Cli::try_parse_from([
			"ttrack-server",
			"user",
			"create",
			"--name",
			"Ben Cruz",
			"--email",
			"ben@univ.edu.ph",
			"--password",
			"correct horse",
			"--admin",
		])
		.unwrap();
		let Command::User(UserCommand::Create(args)) = cli.command else {
			panic!("expected user create");
		};
		assert!(args.admin);
		assert_eq!(args.email, "ben@univ.edu.ph");
	}

	#[test]
	fn audit_line_shows_subject_or_dash() {
		let mut record = AuditRecord {
			id: AuditRecordId::new(3),
			actor: EntityRef::user(7),
			action: AuditAction::Login,
			subject: None,
			old_values: None,
			new_values: Some(Snapshot::new()),
			ip_address: None,
			user_agent: None,
			description: "Ana Reyes logged into the system".to_string(),
			created_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
		};
		let line = format_audit_line(&record);
		assert!(line.contains("2026-03-02 09:30:00"));
		assert!(line.contains("user#7"));
		assert!(line.contains(" - "));

		record.subject = Some(EntityRef::new(EntityKind::Award, 9));
		assert!(format_audit_line(&record).contains("award#9"));
	}
}
