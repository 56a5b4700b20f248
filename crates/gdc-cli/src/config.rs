// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the `gdc` tool.
//!
//! Precedence, lowest first: built-in defaults, the TOML file
//! (`$XDG_CONFIG_HOME/gdc/config.toml` or `--config`), `GDC_*` environment
//! variables and command-line flags. The last two arrive already merged by
//! clap.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gdc_api::{GdcClient, GdcClientBuilder, DEFAULT_POLL_INTERVAL, DEFAULT_PORT};
use gdc_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_HOSTNAME: &str = "secure.gooddata.com";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Missing required field: {0}")]
	MissingField(&'static str),

	#[error("Could not determine config directory")]
	ConfigDirNotFound,
}

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
	pub hostname: Option<String>,
	pub port: Option<u16>,
	pub domain: Option<String>,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	/// Authorization token used when creating projects.
	pub token: Option<SecretString>,
	pub poll_interval_ms: Option<u64>,
	pub accept_invalid_certs: Option<bool>,
}

impl FileConfig {
	/// Reads `path`. A missing file yields the empty configuration.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			tracing::debug!(path = %path.display(), "no config file");
			return Ok(Self::default());
		}

		let content = std::fs::read_to_string(path)?;
		toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// `$XDG_CONFIG_HOME/gdc/config.toml`, falling back to the platform config
/// directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(dirs::config_dir)
		.ok_or(ConfigError::ConfigDirNotFound)?;
	Ok(config_home.join("gdc").join("config.toml"))
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
	pub hostname: Option<String>,
	pub port: Option<u16>,
	pub domain: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub token: Option<String>,
	pub debug: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
	pub hostname: String,
	pub port: u16,
	pub domain: Option<String>,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub token: Option<SecretString>,
	pub poll_interval: Duration,
	pub accept_invalid_certs: bool,
	pub debug: bool,
}

impl Settings {
	pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
		Self {
			hostname: overrides
				.hostname
				.or(file.hostname)
				.unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
			port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
			domain: overrides.domain.or(file.domain),
			username: overrides.username.or(file.username),
			password: overrides
				.password
				.and_then(SecretString::non_empty)
				.or(file.password),
			token: overrides
				.token
				.and_then(SecretString::non_empty)
				.or(file.token),
			poll_interval: file
				.poll_interval_ms
				.map(Duration::from_millis)
				.unwrap_or(DEFAULT_POLL_INTERVAL),
			accept_invalid_certs: file.accept_invalid_certs.unwrap_or(false),
			debug: overrides.debug,
		}
	}

	pub fn credentials(&self) -> Result<(&str, &SecretString), ConfigError> {
		let username = self
			.username
			.as_deref()
			.ok_or(ConfigError::MissingField("username"))?;
		let password = self
			.password
			.as_ref()
			.ok_or(ConfigError::MissingField("password"))?;
		Ok((username, password))
	}

	pub fn token(&self) -> Result<&SecretString, ConfigError> {
		self.token.as_ref().ok_or(ConfigError::MissingField("token"))
	}

	pub fn client_builder(&self) -> GdcClientBuilder {
		let builder = GdcClient::builder(&self.hostname)
			.port(self.port)
			.poll_interval(self.poll_interval)
			.accept_invalid_certs(self.accept_invalid_certs)
			.debug(self.debug);
		match &self.domain {
			Some(domain) => builder.domain(domain),
			None => builder,
		}
	}
}
