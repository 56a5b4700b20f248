// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gdc_common_version::BuildInfo;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{FileConfig, Overrides, Settings};

/// Command line tool for the GoodData analytics platform
#[derive(Parser, Debug)]
#[command(
	name = "gdc",
	version = gdc_common_version::sdk_version(),
	long_version = long_version()
)]
struct Cli {
	/// Config file (defaults to $XDG_CONFIG_HOME/gdc/config.toml)
	#[arg(long, global = true, env = "GDC_CONFIG")]
	config: Option<PathBuf>,

	/// API hostname
	#[arg(long, global = true, env = "GDC_HOSTNAME")]
	hostname: Option<String>,

	/// API port
	#[arg(long, global = true, env = "GDC_PORT")]
	port: Option<u16>,

	/// Organization domain, required for creating users
	#[arg(long, global = true, env = "GDC_DOMAIN")]
	domain: Option<String>,

	/// Account login
	#[arg(long, short, global = true, env = "GDC_USERNAME")]
	username: Option<String>,

	/// Account password
	#[arg(long, global = true, env = "GDC_PASSWORD", hide_env_values = true)]
	password: Option<String>,

	/// Authorization token for creating projects
	#[arg(long, global = true, env = "GDC_TOKEN", hide_env_values = true)]
	token: Option<String>,

	/// Log every request and response
	#[arg(long, global = true)]
	debug: bool,

	#[command(subcommand)]
	command: Command,
}

fn long_version() -> &'static str {
	static LONG_VERSION: OnceLock<String> = OnceLock::new();
	LONG_VERSION.get_or_init(|| BuildInfo::current().long_version())
}

impl Cli {
	fn overrides(&self) -> Overrides {
		Overrides {
			hostname: self.hostname.clone(),
			port: self.port,
			domain: self.domain.clone(),
			username: self.username.clone(),
			password: self.password.clone(),
			token: self.token.clone(),
			debug: self.debug,
		}
	}
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Log in and greet the user
	Login,

	/// List your projects
	Projects,

	/// List dashboards of a project
	Dashboards {
		/// Project id (defaults to the first non-demo project)
		#[arg(long)]
		project: Option<String>,
	},

	/// List metrics used on the first dashboard, or on every dashboard
	Metrics {
		#[arg(long)]
		project: Option<String>,

		/// Group metrics of every dashboard
		#[arg(long)]
		all: bool,
	},

	/// Lock the first dashboard of a project
	LockDashboard {
		#[arg(long)]
		project: Option<String>,
	},

	/// Lock the first report on the first dashboard of a project
	LockReport {
		#[arg(long)]
		project: Option<String>,
	},

	/// Create a project and delete it again unless --keep is given
	CreateProject {
		#[arg(long)]
		title: Option<String>,

		#[arg(long)]
		keep: bool,
	},

	/// Register a user in the configured domain
	CreateUser {
		/// Login of the new user (defaults to your login with a unique suffix)
		#[arg(long)]
		login: Option<String>,

		/// Password of the new user (defaults to yours)
		#[arg(long)]
		new_password: Option<String>,

		#[arg(long, default_value = "John")]
		first_name: String,

		#[arg(long, default_value = "Smith")]
		last_name: String,
	},

	/// Invite a user to a project
	Invite {
		#[arg(long)]
		project: Option<String>,

		/// Profile URI of the invited user
		#[arg(long)]
		user: String,

		/// Role title
		#[arg(long, default_value = "Editor")]
		role: String,
	},

	/// Show the server request id before and after a request
	RequestId,
}

fn init_tracing(debug: bool) -> Result<()> {
	let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	if debug {
		filter = filter.add_directive("gdc_api=debug".parse()?);
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
	Ok(())
}

fn load_file_config(path: Option<&PathBuf>) -> Result<FileConfig> {
	let path = match path {
		Some(path) => path.clone(),
		None => match config::default_config_path() {
			Ok(path) => path,
			Err(e) => {
				debug!(error = %e, "skipping config file");
				return Ok(FileConfig::default());
			}
		},
	};

	FileConfig::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.debug)?;

	let file = load_file_config(cli.config.as_ref())?;
	let settings = Settings::resolve(file, cli.overrides());
	let client = settings
		.client_builder()
		.build()
		.context("invalid client configuration")?;

	commands::run(cli.command, &client, &settings).await
}
