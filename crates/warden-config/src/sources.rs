// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::WardenConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuditTarget, FileSinkConfigLayer, LoggingConfigLayer, PolicyConfigLayer,
	RemoteSinkConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<WardenConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<WardenConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(WardenConfigLayer::default())
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/warden.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<WardenConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(WardenConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: WardenConfigLayer =
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
/// Convention: WARDEN_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<WardenConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(WardenConfigLayer {
			audit: Some(load_audit_from_env()?),
			logging: Some(load_logging_from_env()),
			policy: Some(load_policy_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid usize value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_audit_target(name: &str) -> Result<Option<AuditTarget>, ConfigError> {
	env_var(name)
		.map(|v| {
			v.parse::<AuditTarget>().map_err(|message| ConfigError::InvalidValue {
				key: name.to_string(),
				message,
			})
		})
		.transpose()
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	let file = env_var("WARDEN_AUDIT_FILE_PATH").map(|path| FileSinkConfigLayer {
		path: Some(path.into()),
	});

	let remote = RemoteSinkConfigLayer {
		url: env_var("WARDEN_AUDIT_REMOTE_URL"),
		source_token: env_var("WARDEN_AUDIT_REMOTE_TOKEN"),
		timeout_ms: env_u64("WARDEN_AUDIT_REMOTE_TIMEOUT_MS")?,
		service: env_var("WARDEN_AUDIT_REMOTE_SERVICE"),
	};
	let remote = (remote != RemoteSinkConfigLayer::default()).then_some(remote);

	Ok(AuditConfigLayer {
		target: env_audit_target("WARDEN_AUDIT_TARGET")?,
		queue_capacity: env_usize("WARDEN_AUDIT_QUEUE_CAPACITY")?,
		max_in_flight: env_usize("WARDEN_AUDIT_MAX_IN_FLIGHT")?,
		file,
		remote,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("WARDEN_LOG_LEVEL"),
	}
}

fn load_policy_from_env() -> PolicyConfigLayer {
	PolicyConfigLayer {
		rules_path: env_var("WARDEN_RULES_PATH").map(PathBuf::from),
	}
}
