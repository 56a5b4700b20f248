// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use gdc_api::{
	Chained, Dashboard, Document, GdcClient, Project, Relations, Resource, RoleRef, User,
};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::Command;

pub async fn run(command: Command, client: &GdcClient, settings: &Settings) -> Result<()> {
	match command {
		Command::Login => {
			login(client, settings).await?;
		}
		Command::Projects => projects(client, settings).await?,
		Command::Dashboards { project } => dashboards(client, settings, project.as_deref()).await?,
		Command::Metrics { project, all } => {
			metrics(client, settings, project.as_deref(), all).await?
		}
		Command::LockDashboard { project } => {
			lock_dashboard(client, settings, project.as_deref()).await?
		}
		Command::LockReport { project } => lock_report(client, settings, project.as_deref()).await?,
		Command::CreateProject { title, keep } => {
			create_project(client, settings, title, keep).await?
		}
		Command::CreateUser {
			login,
			new_password,
			first_name,
			last_name,
		} => create_user(client, settings, login, new_password, first_name, last_name).await?,
		Command::Invite {
			project,
			user,
			role,
		} => invite(client, settings, project.as_deref(), user, role).await?,
		Command::RequestId => request_id(client, settings).await?,
	}
	Ok(())
}

#[instrument(skip_all)]
async fn login(client: &GdcClient, settings: &Settings) -> Result<User> {
	let (username, password) = settings.credentials()?;
	let user = client
		.login(username, password.clone())
		.wait()
		.await
		.with_context(|| format!("failed to log in as {username}"))?;

	println!("Hello {}!", user.first_name().unwrap_or_default());
	Ok(user)
}

async fn projects(client: &GdcClient, settings: &Settings) -> Result<()> {
	let user = login(client, settings).await?;
	let projects = user.projects().await.context("failed to list projects")?;

	println!("\nYour projects are:\n");
	for project in projects {
		println!(
			"{}\t{}",
			project.id().unwrap_or_default(),
			project.title().unwrap_or_default()
		);
	}
	Ok(())
}

/// Project with `id`, or the first project that is not a demo.
fn select_project(projects: Vec<Project>, id: Option<&str>) -> Result<Project> {
	if projects.is_empty() {
		bail!("You have to have at least one project");
	}

	match id {
		Some(id) => projects
			.into_iter()
			.find(|p| p.id().as_deref() == Some(id))
			.ok_or_else(|| anyhow!("project {id} not found")),
		None => projects
			.into_iter()
			.find(|p| !p.title().unwrap_or_default().contains("Demo"))
			.ok_or_else(|| anyhow!("You have to have at least one non-demo project")),
	}
}

async fn project_for(client: &GdcClient, settings: &Settings, id: Option<&str>) -> Result<Project> {
	let user = login(client, settings).await?;
	let projects = user.projects().await.context("failed to list projects")?;
	let project = select_project(projects, id)?;
	debug!(project = ?project.uri(), "selected project");
	Ok(project)
}

async fn first_dashboard(project: &Project) -> Result<Dashboard> {
	project
		.dashboards()
		.await
		.context("failed to list dashboards")?
		.into_iter()
		.next()
		.ok_or_else(|| anyhow!("You have to have at least one dashboard"))
}

async fn dashboards(client: &GdcClient, settings: &Settings, project: Option<&str>) -> Result<()> {
	let project = project_for(client, settings, project).await?;
	let dashboards = project.dashboards().await.context("failed to list dashboards")?;

	println!("Dashboards of {}:", project.title().unwrap_or_default());
	for dashboard in dashboards {
		println!(
			"\t{}\t{}",
			dashboard.uri().unwrap_or_default(),
			dashboard.title().unwrap_or_default()
		);
	}
	Ok(())
}

async fn metrics(
	client: &GdcClient,
	settings: &Settings,
	project: Option<&str>,
	all: bool,
) -> Result<()> {
	let project = project_for(client, settings, project).await?;

	if !all {
		let dashboard = first_dashboard(&project).await?;
		let uri = dashboard.uri().context("dashboard has no URI")?;
		println!(
			"Metrics from dashboard {} will be listed",
			dashboard.title().unwrap_or_default()
		);

		let metrics = project
			.using(uri, &["metric"])
			.await
			.context("failed to look up metrics")?
			.into_list();
		for metric in metrics {
			println!("\t{}", metric.title().unwrap_or_default());
		}
		return Ok(());
	}

	let dashboards = project.dashboards().await.context("failed to list dashboards")?;
	if dashboards.is_empty() {
		bail!("You have to have at least one dashboard");
	}
	let uris: Vec<String> = dashboards.iter().filter_map(|d| d.uri()).collect();

	let Relations::ByUri(by_uri) = project
		.using(uris, &["metric"])
		.await
		.context("failed to look up metrics")?
	else {
		bail!("expected metrics grouped by dashboard");
	};

	for dashboard in &dashboards {
		println!("Dashboard {}", dashboard.title().unwrap_or_default());
		let metrics = dashboard
			.uri()
			.and_then(|uri| by_uri.get(&uri))
			.map(Vec::as_slice)
			.unwrap_or_default();
		for metric in metrics {
			println!("\t{}", metric.title().unwrap_or_default());
		}
	}
	Ok(())
}

async fn lock_dashboard(client: &GdcClient, settings: &Settings, project: Option<&str>) -> Result<()> {
	let project = project_for(client, settings, project).await?;
	let dashboard = first_dashboard(&project).await?;

	println!(
		"Dashboard {} from project {} ({}) will be locked",
		dashboard.title().unwrap_or_default(),
		project.title().unwrap_or_default(),
		project.uri().unwrap_or_default()
	);
	dashboard
		.set_locked(true, false)
		.wait()
		.await
		.context("failed to lock dashboard")?;

	println!("Dashboard was locked");
	Ok(())
}

async fn lock_report(client: &GdcClient, settings: &Settings, project: Option<&str>) -> Result<()> {
	let project = project_for(client, settings, project).await?;
	let dashboard = first_dashboard(&project).await?;
	let report = dashboard
		.reports()
		.await
		.context("failed to list reports")?
		.into_iter()
		.next()
		.ok_or_else(|| anyhow!("You have to have at least one report"))?;

	println!(
		"Report {} from project {} ({}) will be locked",
		report.title().unwrap_or_default(),
		project.title().unwrap_or_default(),
		project.uri().unwrap_or_default()
	);
	report
		.set_locked(true, false)
		.wait()
		.await
		.context("failed to lock report")?;

	println!("Report was locked");
	Ok(())
}

fn unique_suffix() -> u128 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or_default()
}

fn project_payload(title: &str, token: &str) -> Document {
	Document::from(json!({
		"content": {
			"guidedNavigation": 1,
			"driver": "Pg",
			"authorizationToken": token,
		},
		"meta": {
			"title": title,
			"summary": "Automatically created project",
		}
	}))
}

async fn create_project(
	client: &GdcClient,
	settings: &Settings,
	title: Option<String>,
	keep: bool,
) -> Result<()> {
	let token = settings.token()?;
	let user = login(client, settings).await?;

	let title =
		title.unwrap_or_else(|| format!("Project generated by gdc, secret ID {}", unique_suffix()));
	println!("The project's title will be {title}");

	let project = user
		.create_project(project_payload(&title, token.expose()))
		.await
		.context("failed to create project")?;
	println!("URI of your new project is {}", project.uri().unwrap_or_default());

	if !keep {
		project
			.delete(None)
			.wait()
			.await
			.context("failed to delete project")?;
		println!("Your project was deleted!");
	}
	Ok(())
}

/// `jane@example.com` becomes `jane+<suffix>@example.com`.
fn derived_login(username: &str, suffix: u128) -> String {
	username.replacen('@', &format!("+{suffix}@"), 1)
}

async fn create_user(
	client: &GdcClient,
	settings: &Settings,
	login: Option<String>,
	password: Option<String>,
	first_name: String,
	last_name: String,
) -> Result<()> {
	if client.domain().is_none() {
		bail!("creating users requires --domain or GDC_DOMAIN");
	}
	let (username, own_password) = settings.credentials()?;
	let login = login.unwrap_or_else(|| derived_login(username, unique_suffix()));
	let password = password
		.map(Into::into)
		.unwrap_or_else(|| own_password.clone());

	// Registration needs an organization admin session.
	client
		.login(username, own_password.clone())
		.wait()
		.await
		.with_context(|| format!("failed to log in as {username}"))?;

	let user = client
		.register(login.as_str(), password, Some(first_name), Some(last_name))
		.wait()
		.await
		.with_context(|| format!("failed to register {login}"))?;

	info!(login = %login, "user created");
	println!("User {} was created", user.username().unwrap_or_default());
	Ok(())
}

async fn invite(
	client: &GdcClient,
	settings: &Settings,
	project: Option<&str>,
	user_uri: String,
	role: String,
) -> Result<()> {
	let project = project_for(client, settings, project).await?;

	project
		.invite(user_uri.as_str(), RoleRef::Title(role.clone()))
		.wait()
		.await
		.with_context(|| format!("failed to invite {user_uri} as {role}"))?;

	println!(
		"User {user_uri} was invited to project {}",
		project.title().unwrap_or_default()
	);
	Ok(())
}

async fn request_id(client: &GdcClient, settings: &Settings) -> Result<()> {
	println!(
		"Request ID is {} now",
		client.last_request_id().unwrap_or_else(|| "unset".to_string())
	);
	login(client, settings).await?;
	println!(
		"After a request was performed its value becomes {}",
		client.last_request_id().unwrap_or_else(|| "unset".to_string())
	);
	Ok(())
}
