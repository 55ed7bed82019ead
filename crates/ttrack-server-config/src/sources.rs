// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuditFailurePolicy, DatabaseConfigLayer, LogFormat, LoggingConfigLayer,
};

pub const ENV_PREFIX: &str = "TTRACK_SERVER_";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ttrack/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TTRACK_SERVER_<SECTION>_<FIELD>
#[derive(Default)]
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads from a fixed map instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, field: &str) -> Option<String> {
		let key = format!("{ENV_PREFIX}{field}");
		let value = match &self.vars {
			Some(vars) => vars.get(&key).cloned(),
			None => std::env::var(&key).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, field: &str) -> Result<Option<bool>, ConfigError> {
		match self.var(field) {
			Some(v) => match v.to_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Ok(Some(true)),
				"false" | "0" | "no" | "off" => Ok(Some(false)),
				_ => Err(invalid(field, format!("invalid boolean value '{v}'"))),
			},
			None => Ok(None),
		}
	}

	fn parsed<T>(&self, field: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr<Err = String>,
	{
		self.var(field)
			.map(|v| v.parse::<T>().map_err(|message| invalid(field, message)))
			.transpose()
	}

	fn load_database(&self) -> DatabaseConfigLayer {
		DatabaseConfigLayer {
			url: self.var("DATABASE_URL"),
		}
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.var("LOGGING_LEVEL"),
			format: self.parsed::<LogFormat>("LOGGING_FORMAT")?,
		})
	}

	fn load_audit(&self) -> Result<AuditConfigLayer, ConfigError> {
		Ok(AuditConfigLayer {
			enabled: self.bool("AUDIT_ENABLED")?,
			failure_policy: self.parsed::<AuditFailurePolicy>("AUDIT_FAILURE_POLICY")?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(self.load_database()),
			logging: Some(self.load_logging()?),
			audit: Some(self.load_audit()?),
		})
	}
}

fn invalid(field: &str, message: String) -> ConfigError {
	ConfigError::InvalidValue {
		key: format!("{ENV_PREFIX}{field}"),
		message,
	}
}
