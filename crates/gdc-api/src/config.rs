// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration and validation.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Default HTTPS port.
pub const DEFAULT_PORT: u16 = 443;
/// Default delay between two poll requests for asynchronous tasks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`GdcClient`](crate::GdcClient).
///
/// Construct with [`ApiConfig::new`] or parse a connection string
/// (`domain@host:port`, `domain@host`, `host:port` or `host`):
///
/// ```
/// use gdc_api::ApiConfig;
///
/// let config: ApiConfig = "acme@secure.example.com:8443".parse().unwrap();
/// assert_eq!(config.domain.as_deref(), Some("acme"));
/// assert_eq!(config.port, 8443);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
	/// Remote server hostname.
	pub hostname: String,
	/// Remote server port.
	pub port: u16,
	/// Organization domain, needed to create users.
	pub domain: Option<String>,
	/// Delay between poll requests while the server answers 202.
	pub poll_interval: Duration,
	/// Emit a debug event for every request and response.
	pub debug: bool,
	/// Timeout for a single HTTP request.
	pub request_timeout: Duration,
	/// Use `https` (default) or plain `http`.
	pub tls: bool,
	/// Accept self-signed certificates (development backends).
	pub accept_invalid_certs: bool,
}

impl ApiConfig {
	/// Creates a configuration for `hostname` with default settings.
	pub fn new(hostname: impl Into<String>) -> Self {
		Self {
			hostname: hostname.into(),
			port: DEFAULT_PORT,
			domain: None,
			poll_interval: DEFAULT_POLL_INTERVAL,
			debug: false,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			tls: true,
			accept_invalid_certs: false,
		}
	}

	/// Checks hostname and port.
	pub fn validate(&self) -> Result<()> {
		validate_hostname(&self.hostname)?;
		if self.port == 0 {
			return Err(ApiError::Configuration(
				"Invalid port number: 0".to_string(),
			));
		}
		if let Some(domain) = &self.domain {
			if domain.is_empty() {
				return Err(ApiError::Configuration("domain must not be empty".to_string()));
			}
		}
		Ok(())
	}

	/// Base URL every relative request path is appended to.
	pub fn base_url(&self) -> String {
		let scheme = if self.tls { "https" } else { "http" };
		format!("{scheme}://{}:{}", self.hostname, self.port)
	}
}

/// Parses a port given as text.
pub fn parse_port(value: &str) -> Result<u16> {
	match value.parse::<u16>() {
		Ok(port) if port > 0 => Ok(port),
		_ => Err(ApiError::Configuration(format!(
			"Invalid port number: {value}"
		))),
	}
}

fn validate_hostname(hostname: &str) -> Result<()> {
	let valid = !hostname.is_empty()
		&& hostname
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
	if valid {
		Ok(())
	} else {
		Err(ApiError::Configuration(format!(
			"Invalid hostname: {hostname}"
		)))
	}
}

fn is_domain_char(c: char) -> bool {
	c.is_ascii_alphabetic() || matches!(c, '_' | '-')
}

impl FromStr for ApiConfig {
	type Err = ApiError;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = || ApiError::Configuration(format!("Invalid configuration string: {s}"));

		let (domain, rest) = match s.split_once('@') {
			Some((domain, rest)) => {
				if domain.is_empty() || !domain.chars().all(is_domain_char) {
					return Err(invalid());
				}
				(Some(domain.to_string()), rest)
			}
			None => (None, s),
		};

		let (host, port) = match rest.split_once(':') {
			Some((host, port)) => {
				if port.is_empty() || !port.chars().all(|c| c.is_ascii_alphanumeric()) {
					return Err(invalid());
				}
				(host, parse_port(port)?)
			}
			None => (rest, DEFAULT_PORT),
		};

		validate_hostname(host).map_err(|_| invalid())?;

		let mut config = ApiConfig::new(host);
		config.port = port;
		config.domain = domain;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn defaults() {
		let config = ApiConfig::new("secure.example.com");
		assert_eq!(config.port, 443);
		assert_eq!(config.poll_interval, Duration::from_millis(1000));
		assert!(!config.debug);
		assert!(config.tls);
		assert!(config.validate().is_ok());
		assert_eq!(config.base_url(), "https://secure.example.com:443");
	}

	#[test]
	fn plain_http_base_url() {
		let mut config = ApiConfig::new("127.0.0.1");
		config.tls = false;
		config.port = 8080;
		assert_eq!(config.base_url(), "http://127.0.0.1:8080");
	}

	#[test]
	fn rejects_bad_hostname() {
		let config = ApiConfig::new("exa mple.com");
		assert!(matches!(config.validate(), Err(ApiError::Configuration(_))));
		assert!(ApiConfig::new("").validate().is_err());
		assert!(ApiConfig::new("https://x.com").validate().is_err());
	}

	#[test]
	fn rejects_zero_port() {
		let mut config = ApiConfig::new("example.com");
		config.port = 0;
		assert!(matches!(config.validate(), Err(ApiError::Configuration(_))));
	}

	#[test]
	fn parses_every_connection_string_form() {
		let full: ApiConfig = "acme@host.example.com:8443".parse().unwrap();
		assert_eq!(full.domain.as_deref(), Some("acme"));
		assert_eq!(full.hostname, "host.example.com");
		assert_eq!(full.port, 8443);

		let no_port: ApiConfig = "acme@host.example.com".parse().unwrap();
		assert_eq!(no_port.port, 443);
		assert_eq!(no_port.domain.as_deref(), Some("acme"));

		let host_port: ApiConfig = "host.example.com:444".parse().unwrap();
		assert!(host_port.domain.is_none());
		assert_eq!(host_port.port, 444);

		let host: ApiConfig = "host.example.com".parse().unwrap();
		assert_eq!(host.port, 443);
		assert!(host.domain.is_none());
	}

	#[test]
	fn rejects_malformed_connection_strings() {
		for input in ["", "@host", "ac me@host", "host:", "host:abc", "host:0", "a@b@c"] {
			assert!(
				input.parse::<ApiConfig>().is_err(),
				"{input:?} should be rejected"
			);
		}
	}

	proptest! {
		#[test]
		fn any_valid_host_and_port_round_trip(
			host in "[a-z0-9][a-z0-9.-]{0,30}",
			port in 1u16..,
		) {
			let config: ApiConfig = format!("{host}:{port}").parse().unwrap();
			prop_assert_eq!(config.hostname, host);
			prop_assert_eq!(config.port, port);
		}
	}
}
