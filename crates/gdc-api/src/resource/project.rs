// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{
	take_namespace, AnyResource, Dashboard, Metric, ObjectKind, Relations, Report, Resource,
	ResourceCore, Role, Sources, User,
};
use crate::client::GdcClient;
use crate::document::Document;
use crate::error::{ApiError, Result};
use crate::sequencer::{Chained, Sequencer};

const PROJECTS_URI: &str = "/gdc/projects";
const ENABLED: &str = "ENABLED";

/// Role given to an invited user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
	/// Role title, e.g. `Editor`, resolved through [`Project::role_by_name`].
	Title(String),
	/// Role URI.
	Uri(String),
}

impl From<&Role> for RoleRef {
	fn from(role: &Role) -> Self {
		match role.uri() {
			Some(uri) => RoleRef::Uri(uri),
			None => RoleRef::Title(role.title().unwrap_or_default()),
		}
	}
}

/// A project (workspace) on the platform.
#[derive(Debug, Clone)]
pub struct Project {
	core: Arc<ResourceCore>,
	user: Option<User>,
}

impl Project {
	/// Project without an owning user. Operations touching profile settings
	/// need [`Project::for_user`].
	pub fn new(client: GdcClient) -> Self {
		Self {
			core: Arc::new(ResourceCore::new(client, Document::new())),
			user: None,
		}
	}

	pub fn for_user(user: &User) -> Self {
		Self::with_data(user, Document::new())
	}

	pub fn with_data(user: &User, data: Document) -> Self {
		Self {
			core: Arc::new(ResourceCore::new(user.client().clone(), data)),
			user: Some(user.clone()),
		}
	}

	pub fn user(&self) -> Option<&User> {
		self.user.as_ref()
	}

	/// Id taken from the URI (`/gdc/projects/<id>`).
	pub fn id(&self) -> Option<String> {
		self.uri()
			.map(|uri| uri.replacen(&format!("{PROJECTS_URI}/"), "", 1))
	}

	/// Sets the URI from an id. `None` clears it.
	pub fn set_id(&self, id: Option<&str>) -> &Self {
		match id {
			Some(id) if !id.is_empty() => self.set_uri(Some(&format!("{PROJECTS_URI}/{id}"))),
			_ => self.set_uri(None),
		}
		self
	}

	pub fn state(&self) -> Option<String> {
		self.core.get_str("content.state")
	}

	fn link(&self, name: &str) -> Option<String> {
		self.core.get_str(&format!("links.{name}"))
	}

	fn metadata_uri(&self, suffix: &str) -> Option<String> {
		self.link("metadata").map(|m| format!("{m}/{suffix}"))
	}

	fn permissions_uri(&self) -> Option<String> {
		self.id()
			.map(|id| format!("/gdc/internal/projects/{id}/objects/setPermissions"))
	}

	/// Makes this project the user's default.
	pub fn set_as_default(&self) -> &Self {
		self.and_then(|project| async move {
			let user = project.user.as_ref().ok_or_else(|| {
				ApiError::InvalidArgument("project has no user to store settings for".to_string())
			})?;
			let uri = project.uri().ok_or(ApiError::MissingUri("setAsDefault"))?;

			let settings = user.settings().await?;
			settings.set_default_project(uri).save(None);
			settings.wait().await?;
			Ok(())
		})
	}

	/// Chained form of [`Project::set_object_permissions_now`].
	pub fn set_object_permissions(
		&self,
		objects: Vec<String>,
		locked: Option<bool>,
		listed: Option<bool>,
		cascade: bool,
	) -> &Self {
		self.and_then(move |project| async move {
			project
				.set_object_permissions_now(objects, locked, listed, cascade)
				.await
		})
	}

	/// Locks, unlocks, lists or unlists objects of this project. Does
	/// nothing without flags or objects.
	pub async fn set_object_permissions_now(
		&self,
		objects: Vec<String>,
		locked: Option<bool>,
		listed: Option<bool>,
		cascade: bool,
	) -> Result<()> {
		let uri = self
			.permissions_uri()
			.ok_or(ApiError::MissingUri("setObjectPermissions"))?;

		let items: Vec<String> = objects.into_iter().filter(|u| !u.is_empty()).collect();
		if (locked.is_none() && listed.is_none()) || items.is_empty() {
			return Ok(());
		}

		let mut permissions = Map::new();
		permissions.insert("items".to_string(), json!(items));
		permissions.insert("cascade".to_string(), json!(cascade));
		if let Some(locked) = locked {
			permissions.insert("lock".to_string(), json!(locked));
		}
		if let Some(listed) = listed {
			permissions.insert("listed".to_string(), json!(listed));
		}

		debug!(project = %uri, items = items.len(), ?locked, ?listed, cascade, "Setting object permissions");
		self.client()
			.post(&uri, json!({ "permissions": permissions }))
			.await?;
		Ok(())
	}

	/// Loads every object of `query_type` (`projectdashboards`, `reports` or
	/// `metrics`).
	pub async fn query(&self, query_type: &str) -> Result<Vec<AnyResource>> {
		self.wait().await?;
		self.query_now(query_type).await
	}

	async fn query_now(&self, query_type: &str) -> Result<Vec<AnyResource>> {
		let uri = self.metadata_uri("query").ok_or(ApiError::MissingUri("query"))?;
		if query_type.is_empty() {
			return Err(ApiError::InvalidArgument(
				"type of resource to query must be specified".to_string(),
			));
		}
		let kind = ObjectKind::from_query_type(query_type)
			.ok_or_else(|| ApiError::UnsupportedType(query_type.to_string()))?;

		let response = self.client().get(&format!("{uri}/{query_type}")).await?;
		let links = entry_links(&response, "/query/entries")?;

		try_join_all(links.into_iter().map(|link| async move {
			let resource = kind.instantiate(self);
			resource.load_now(Some(link)).await?;
			Ok::<_, ApiError>(resource)
		}))
		.await
	}

	pub async fn dashboards(&self) -> Result<Vec<Dashboard>> {
		Ok(self
			.query("projectdashboards")
			.await?
			.into_iter()
			.filter_map(AnyResource::into_dashboard)
			.collect())
	}

	pub async fn reports(&self) -> Result<Vec<Report>> {
		Ok(self
			.query("reports")
			.await?
			.into_iter()
			.filter_map(AnyResource::into_report)
			.collect())
	}

	pub async fn metrics(&self) -> Result<Vec<Metric>> {
		Ok(self
			.query("metrics")
			.await?
			.into_iter()
			.filter_map(AnyResource::into_metric)
			.collect())
	}

	/// Every role defined in the project.
	pub async fn roles(&self) -> Result<Vec<Role>> {
		self.wait().await?;
		self.roles_now().await
	}

	async fn roles_now(&self) -> Result<Vec<Role>> {
		let uri = self.link("roles").ok_or(ApiError::MissingUri("roles"))?;
		let response = self.client().get(&uri).await?;
		let role_uris: Vec<String> = response
			.pointer("/projectRoles/roles")
			.and_then(Value::as_array)
			.ok_or_else(|| {
				ApiError::UnexpectedResponse("roles response lacks projectRoles.roles".to_string())
			})?
			.iter()
			.filter_map(|v| v.as_str().map(str::to_string))
			.collect();

		try_join_all(role_uris.into_iter().map(|role_uri| async move {
			let role = Role::new(self.clone());
			role.load_now(Some(role_uri)).await?;
			Ok::<_, ApiError>(role)
		}))
		.await
	}

	/// The role whose `meta.title` equals `name`.
	pub async fn role_by_name(&self, name: &str) -> Result<Role> {
		self.wait().await?;
		self.role_by_name_now(name).await
	}

	async fn role_by_name_now(&self, name: &str) -> Result<Role> {
		self.roles_now()
			.await?
			.into_iter()
			.find(|role| role.title().as_deref() == Some(name))
			.ok_or_else(|| ApiError::RoleNotFound(name.to_string()))
	}

	/// Invites the user at `user_uri` with `role`.
	pub fn invite(&self, user_uri: impl Into<String>, role: RoleRef) -> &Self {
		let user_uri = user_uri.into();
		self.and_then(move |project| async move { project.invite_now(&user_uri, role).await })
	}

	pub async fn invite_now(&self, user_uri: &str, role: RoleRef) -> Result<()> {
		let uri = self.link("users").ok_or(ApiError::MissingUri("invite"))?;
		if user_uri.is_empty() {
			return Err(ApiError::MissingUri("invite"));
		}

		let role_uri = match role {
			RoleRef::Uri(uri) => uri,
			RoleRef::Title(title) => self
				.role_by_name_now(&title)
				.await?
				.uri()
				.ok_or(ApiError::MissingUri("invite"))?,
		};

		let response = self
			.client()
			.post(
				&uri,
				json!({
					"user": {
						"content": {
							"status": ENABLED,
							"userRoles": [role_uri],
						},
						"links": { "self": user_uri },
					}
				}),
			)
			.await?;

		let invited = response
			.pointer("/projectUsersUpdateResult/successful")
			.and_then(Value::as_array)
			.is_some_and(|ok| ok.iter().any(|u| u.as_str() == Some(user_uri)));
		if !invited {
			return Err(ApiError::InviteRejected(user_uri.to_string()));
		}

		info!(project = ?self.id(), user = %user_uri, "User invited");
		Ok(())
	}

	/// Objects of `types` used by `sources`.
	pub async fn using(&self, sources: impl Into<Sources> + Send, types: &[&str]) -> Result<Relations> {
		let sources = sources.into();
		self.wait().await?;
		let uri = self.metadata_uri("using2").ok_or(ApiError::MissingUri("using"))?;
		self.relations_now(&uri, sources, types).await
	}

	/// Objects of `types` that use `sources`.
	pub async fn usedby(&self, sources: impl Into<Sources> + Send, types: &[&str]) -> Result<Relations> {
		let sources = sources.into();
		self.wait().await?;
		let uri = self.metadata_uri("usedby2").ok_or(ApiError::MissingUri("usedby"))?;
		self.relations_now(&uri, sources, types).await
	}

	async fn relations_now(&self, uri: &str, sources: Sources, types: &[&str]) -> Result<Relations> {
		let uris = sources.uris();
		if uris.iter().all(String::is_empty) {
			return Err(ApiError::InvalidArgument(
				"an URI of the root object is required for using/usedby".to_string(),
			));
		}
		if types.is_empty() {
			return Err(ApiError::InvalidArgument(
				"types of objects are required for using/usedby".to_string(),
			));
		}
		if let Some(unsupported) = types.iter().find(|t| ObjectKind::from_category(t).is_none()) {
			return Err(ApiError::UnsupportedType(unsupported.to_string()));
		}

		let response = self
			.client()
			.post(uri, json!({ "inUseMany": { "uris": uris, "types": types } }))
			.await?;

		let sets = response
			.get("useMany")
			.and_then(Value::as_array)
			.ok_or_else(|| ApiError::UnexpectedResponse("response lacks useMany".to_string()))?;

		let mut pending = Vec::new();
		for set in sets {
			let source = set.get("uri").and_then(Value::as_str).unwrap_or_default();
			for entry in set.get("entries").and_then(Value::as_array).into_iter().flatten() {
				let category = entry.get("category").and_then(Value::as_str).unwrap_or_default();
				let Some(kind) = ObjectKind::from_category(category) else {
					return Err(ApiError::UnsupportedType(category.to_string()));
				};
				let link = entry
					.get("link")
					.and_then(Value::as_str)
					.ok_or_else(|| ApiError::UnexpectedResponse("entry lacks link".to_string()))?;
				pending.push((source.to_string(), kind.instantiate(self), link.to_string()));
			}
		}

		try_join_all(
			pending
				.iter()
				.map(|(_, resource, link)| resource.load_now(Some(link.clone()))),
		)
		.await?;

		let mut by_uri: BTreeMap<String, Vec<AnyResource>> = BTreeMap::new();
		for (source, resource, _) in pending {
			by_uri.entry(source).or_default().push(resource);
		}

		Ok(match sources {
			Sources::One(uri) => Relations::List(by_uri.remove(&uri).unwrap_or_default()),
			Sources::Many(_) => Relations::ByUri(by_uri),
		})
	}
}

fn entry_links(response: &Value, pointer: &str) -> Result<Vec<String>> {
	let entries = response
		.pointer(pointer)
		.and_then(Value::as_array)
		.ok_or_else(|| ApiError::UnexpectedResponse(format!("response lacks {pointer}")))?;
	Ok(entries
		.iter()
		.filter_map(|e| e.get("link").and_then(Value::as_str).map(str::to_string))
		.collect())
}

impl Chained for Project {
	fn sequencer(&self) -> &Sequencer {
		self.core.sequencer()
	}
}

#[async_trait]
impl Resource for Project {
	const NAMESPACE: &'static str = "project";

	fn core(&self) -> &ResourceCore {
		&self.core
	}

	fn collection_uri(&self) -> Option<String> {
		Some(PROJECTS_URI.to_string())
	}

	/// Loads the project, polling until its state is `ENABLED`.
	async fn load_now(&self, uri: Option<String>) -> Result<()> {
		let uri = uri.or_else(|| self.uri()).ok_or(ApiError::MissingUri("load"))?;
		let interval = self.client().config().poll_interval;

		loop {
			let response = self.client().get(&uri).await?;
			let data = take_namespace(response, Self::NAMESPACE)?;

			if data.get_str("content.state").as_deref() == Some(ENABLED) {
				self.set_data(data);
				if self.uri().is_none() {
					self.set_uri(Some(&uri));
				}
				return Ok(());
			}

			debug!(project = %uri, state = ?data.get_str("content.state"), "Waiting for project");
			tokio::time::sleep(interval).await;
		}
	}
}
