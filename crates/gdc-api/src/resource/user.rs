// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use gdc_common_secret::SecretString;
use serde_json::{json, Value};
use tracing::info;

use super::{take_namespace, ProfileSettings, Project, Resource, ResourceCore};
use crate::client::GdcClient;
use crate::document::Document;
use crate::error::{ApiError, Result};
use crate::sequencer::{Chained, Sequencer};

const DEFAULT_FIRST_NAME: &str = "Dummy";
const DEFAULT_LAST_NAME: &str = "User";

/// A platform account (`accountSetting`).
#[derive(Debug, Clone)]
pub struct User {
	core: Arc<ResourceCore>,
}

impl User {
	pub fn new(client: GdcClient) -> Self {
		Self {
			core: Arc::new(ResourceCore::new(client, Document::new())),
		}
	}

	pub fn username(&self) -> Option<String> {
		self.core.get_str("login")
	}

	pub fn email(&self) -> Option<String> {
		self.core.get_str("email")
	}

	pub fn first_name(&self) -> Option<String> {
		self.core.get_str("firstName")
	}

	pub fn last_name(&self) -> Option<String> {
		self.core.get_str("lastName")
	}

	/// Logs in and loads the account behind the returned profile.
	pub fn login(&self, username: impl Into<String>, password: impl Into<SecretString>) -> &Self {
		let username = username.into();
		let password = password.into();
		self.and_then(move |user| async move {
			let profile = user.client().authenticate(&username, &password).await?;
			user.load_now(Some(profile)).await
		})
	}

	/// Ends the session and forgets the account data. Local state is cleared
	/// even when the server refuses the logout.
	pub fn logout(&self) -> &Self {
		self.and_then(|user| async move {
			let result = match user.uri() {
				Some(profile) => user.client().end_session(&profile).await,
				None => {
					user.client().clear_session();
					Ok(())
				}
			};
			user.set_data(Document::new());
			result
		})
	}

	/// Creates an account in the client's domain.
	pub fn register(
		&self,
		username: impl Into<String>,
		password: impl Into<SecretString>,
		first_name: Option<String>,
		last_name: Option<String>,
	) -> &Self {
		let username = username.into();
		let password = password.into();
		self.and_then(move |user| async move {
			user.register_now(&username, &password, first_name, last_name)
				.await
		})
	}

	async fn register_now(
		&self,
		username: &str,
		password: &SecretString,
		first_name: Option<String>,
		last_name: Option<String>,
	) -> Result<()> {
		let domain = self
			.client()
			.domain()
			.ok_or(ApiError::DomainRequired)?
			.to_string();

		let first_name = first_name
			.or_else(|| self.first_name())
			.unwrap_or_else(|| DEFAULT_FIRST_NAME.to_string());
		let last_name = last_name
			.or_else(|| self.last_name())
			.unwrap_or_else(|| DEFAULT_LAST_NAME.to_string());

		self.client()
			.post(
				&format!("/gdc/account/domain/{domain}/users"),
				json!({
					"accountSetting": {
						"login": username,
						"password": password.expose(),
						"email": username,
						"verifyPassword": password.expose(),
						"firstName": first_name,
						"lastName": last_name,
					}
				}),
			)
			.await?;

		self.core.set("login", json!(username));
		self.core.set("email", json!(username));
		self.core.set("firstName", json!(first_name));
		self.core.set("lastName", json!(last_name));
		info!(username = %username, domain = %domain, "User registered");
		Ok(())
	}

	/// Projects the user is a member of.
	pub async fn projects(&self) -> Result<Vec<Project>> {
		self.wait().await?;
		let uri = self
			.core
			.get_str("links.projects")
			.ok_or(ApiError::MissingUri("projects"))?;

		let response = self.client().get(&uri).await?;
		let projects = response
			.get("projects")
			.and_then(Value::as_array)
			.ok_or_else(|| ApiError::UnexpectedResponse("response lacks projects".to_string()))?;

		Ok(projects
			.iter()
			.filter_map(|entry| entry.get("project"))
			.map(|data| Project::with_data(self, Document::from(data.clone())))
			.collect())
	}

	/// Creates a project owned by this user and waits until it is enabled.
	pub async fn create_project(&self, data: Document) -> Result<Project> {
		self.wait().await?;
		let project = Project::for_user(self);
		project.create(Some(data));
		project.wait().await
	}

	/// Loads the user's profile settings.
	pub async fn settings(&self) -> Result<ProfileSettings> {
		self.wait().await?;
		let uri = self.uri().ok_or(ApiError::MissingUri("settings"))?;
		let settings = ProfileSettings::new(self);
		settings.load_now(Some(format!("{uri}/settings"))).await?;
		Ok(settings)
	}
}

impl Chained for User {
	fn sequencer(&self) -> &Sequencer {
		self.core.sequencer()
	}
}

#[async_trait]
impl Resource for User {
	const NAMESPACE: &'static str = "accountSetting";

	fn core(&self) -> &ResourceCore {
		&self.core
	}

	/// Loads the account from its profile URI, which also becomes the
	/// user's URI.
	async fn load_now(&self, uri: Option<String>) -> Result<()> {
		let uri = uri.or_else(|| self.uri()).ok_or(ApiError::MissingUri("load"))?;
		let response = self.client().get(&uri).await?;
		let data = take_namespace(response, Self::NAMESPACE)?;
		self.set_data(data);
		self.set_uri(Some(&uri));
		Ok(())
	}
}
