// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ttrack server binary.

use clap::Parser;
use ttrack_server::cli::{self, AuditCommand, Cli, Command, UserCommand};
use ttrack_server::{connect, create_app_state, telemetry, version};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Cli::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => ttrack_server_config::load_config_with_file(path)?,
		None => ttrack_server_config::load_config()?,
	};
	telemetry::init_tracing(&config.logging);

	tracing::info!(database = %config.database.url, "starting ttrack-server");
	let pool = connect(&config).await?;
	let state = create_app_state(pool, &config);

	match args.command {
		Command::Migrate => {
			println!("migrations applied to {}", config.database.url);
		}
		Command::User(UserCommand::Create(create)) => {
			let user = cli::create_user(&state, &create).await?;
			println!(
				"created user {} <{}> id={} role={}",
				user.name,
				user.email,
				user.id,
				user.role()
			);
		}
		Command::Audit(AuditCommand::List(list)) => {
			let (records, total) = cli::list_audit(&state, &list).await?;
			for record in &records {
				if list.json {
					println!("{}", serde_json::to_string(record)?);
				} else {
					println!("{}", cli::format_audit_line(record));
				}
			}
			if !list.json {
				println!("{} of {total} records", records.len());
			}
		}
		Command::Version => {}
	}

	state.pool.close().await;
	Ok(())
}
