// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource wrappers over the REST API.
//!
//! Every wrapper keeps its data without the namespace key, a handle to the
//! client and a [`Sequencer`]. Mutating methods are chained: they return
//! `&Self` at once and run in call order. Each chained method has a `*_now`
//! counterpart that performs the work directly and is what steps call.

mod dashboard;
mod metric;
mod profile_settings;
mod project;
mod report;
mod role;
mod user;

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::client::GdcClient;
use crate::document::Document;
use crate::error::{ApiError, Result};
use crate::sequencer::{Chained, Sequencer};

pub use dashboard::Dashboard;
pub use metric::Metric;
pub use profile_settings::ProfileSettings;
pub use project::{Project, RoleRef};
pub use report::{Report, ReportDefinition};
pub use role::Role;
pub use user::User;

/// State shared by every clone of one wrapper.
#[derive(Debug)]
pub struct ResourceCore {
	client: GdcClient,
	data: RwLock<Document>,
	sequencer: Sequencer,
}

impl ResourceCore {
	pub fn new(client: GdcClient, data: Document) -> Self {
		Self {
			client,
			data: RwLock::new(data),
			sequencer: Sequencer::new(),
		}
	}

	pub fn client(&self) -> &GdcClient {
		&self.client
	}

	pub fn sequencer(&self) -> &Sequencer {
		&self.sequencer
	}

	pub fn data(&self) -> Document {
		self.read().clone()
	}

	pub fn set_data(&self, data: Document) {
		*self.write() = data;
	}

	pub fn get(&self, path: &str) -> Option<Value> {
		self.read().get(path)
	}

	pub fn get_str(&self, path: &str) -> Option<String> {
		self.read().get_str(path)
	}

	pub fn set(&self, path: &str, value: Value) {
		self.write().set(path, value);
	}

	pub fn remove(&self, path: &str) -> Option<Value> {
		self.write().remove(path)
	}

	fn read(&self) -> RwLockReadGuard<'_, Document> {
		self.data.read().unwrap_or_else(|e| e.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, Document> {
		self.data.write().unwrap_or_else(|e| e.into_inner())
	}
}

/// Unwraps `response[namespace]` into a document.
pub(crate) fn take_namespace(response: Value, namespace: &'static str) -> Result<Document> {
	match response {
		Value::Object(mut map) => match map.remove(namespace) {
			Some(Value::Null) | None => Err(ApiError::MissingNamespace { namespace }),
			Some(data) => Ok(Document::from(data)),
		},
		_ => Err(ApiError::MissingNamespace { namespace }),
	}
}

/// Wraps `data` under `namespace` for create and update payloads.
pub(crate) fn namespaced(namespace: &str, data: Document) -> Value {
	let mut map = Map::new();
	map.insert(namespace.to_string(), data.into_value());
	Value::Object(map)
}

/// Common operations of every wrapper.
///
/// `find`/`parents` look up related objects through the owning project; on
/// [`Project`] itself the multi-source [`Project::using`] and
/// [`Project::usedby`] are used instead.
#[async_trait]
pub trait Resource: Chained {
	/// Key the server nests this resource's data under.
	const NAMESPACE: &'static str;
	/// Dotted path of the resource URI inside its data.
	const URI_PATH: &'static str = "links.self";

	fn core(&self) -> &ResourceCore;

	/// Owning project, for objects that live inside one.
	fn project(&self) -> Option<&Project> {
		None
	}

	/// Collection new resources of this kind are POSTed to.
	fn collection_uri(&self) -> Option<String> {
		None
	}

	fn client(&self) -> &GdcClient {
		self.core().client()
	}

	fn uri(&self) -> Option<String> {
		self.core().get_str(Self::URI_PATH)
	}

	fn set_uri(&self, uri: Option<&str>) {
		match uri {
			Some(uri) => self.core().set(Self::URI_PATH, json!(uri)),
			None => {
				self.core().remove(Self::URI_PATH);
			}
		}
	}

	/// Snapshot of the current data.
	fn data(&self) -> Document {
		self.core().data()
	}

	fn set_data(&self, data: Document) {
		self.core().set_data(data);
	}

	fn title(&self) -> Option<String> {
		self.core().get_str("meta.title")
	}

	/// Loads data from `uri`, or from the current URI.
	async fn load_now(&self, uri: Option<String>) -> Result<()> {
		let uri = uri.or_else(|| self.uri()).ok_or(ApiError::MissingUri("load"))?;
		let response = self.client().get(&uri).await?;
		let data = take_namespace(response, Self::NAMESPACE)?;
		self.set_data(data);
		if self.uri().is_none() {
			self.set_uri(Some(&uri));
		}
		Ok(())
	}

	/// POSTs to the collection, then loads the URI the server returns.
	async fn create_now(&self, data: Option<Document>) -> Result<()> {
		let uri = self.collection_uri().ok_or(ApiError::MissingUri("create"))?;
		let payload = namespaced(Self::NAMESPACE, data.unwrap_or_else(|| self.data()));

		let response = self.client().post(&uri, payload).await?;
		let created = response
			.get("uri")
			.and_then(Value::as_str)
			.ok_or_else(|| {
				ApiError::UnexpectedResponse("No URI returned from create call".to_string())
			})?
			.to_string();

		self.load_now(Some(created)).await
	}

	/// PUTs the data to the resource URI, then reloads it.
	async fn update_now(&self, data: Option<Document>) -> Result<()> {
		let uri = self.uri().ok_or(ApiError::MissingUri("update"))?;
		let payload = namespaced(Self::NAMESPACE, data.unwrap_or_else(|| self.data()));
		self.client().put(&uri, payload).await?;
		self.load_now(None).await
	}

	/// Creates without a URI, updates with one.
	async fn save_now(&self, data: Option<Document>) -> Result<()> {
		if self.uri().is_some() {
			self.update_now(data).await
		} else {
			self.create_now(data).await
		}
	}

	async fn delete_now(&self, uri: Option<String>) -> Result<()> {
		let uri = uri.or_else(|| self.uri()).ok_or(ApiError::MissingUri("delete"))?;
		self.client().delete(&uri).await?;
		self.set_data(Document::new());
		Ok(())
	}

	/// Changes lock or visibility flags through the owning project and
	/// mirrors them into `meta`.
	async fn set_permissions_now(
		&self,
		locked: Option<bool>,
		listed: Option<bool>,
		cascade: bool,
	) -> Result<()> {
		let project = self.project().ok_or_else(|| {
			ApiError::InvalidArgument(
				"resource must belong to a project to change its permissions".to_string(),
			)
		})?;
		let uri = self.uri().ok_or(ApiError::MissingUri("setObjectPermissions"))?;

		project.wait().await?;
		project
			.set_object_permissions_now(vec![uri], locked, listed, cascade)
			.await?;

		if let Some(locked) = locked {
			self.core().set("meta.locked", json!(u8::from(locked)));
		}
		if let Some(listed) = listed {
			self.core().set("meta.unlisted", json!(u8::from(!listed)));
		}
		Ok(())
	}

	fn load(&self, uri: Option<&str>) -> &Self {
		let uri = uri.map(str::to_string);
		self.and_then(move |this| async move { this.load_now(uri).await })
	}

	fn create(&self, data: Option<Document>) -> &Self {
		self.and_then(move |this| async move { this.create_now(data).await })
	}

	fn update(&self, data: Option<Document>) -> &Self {
		self.and_then(move |this| async move { this.update_now(data).await })
	}

	fn save(&self, data: Option<Document>) -> &Self {
		self.and_then(move |this| async move { this.save_now(data).await })
	}

	fn delete(&self, uri: Option<&str>) -> &Self {
		let uri = uri.map(str::to_string);
		self.and_then(move |this| async move { this.delete_now(uri).await })
	}

	fn set_locked(&self, locked: bool, cascade: bool) -> &Self {
		self.and_then(move |this| async move {
			this.set_permissions_now(Some(locked), None, cascade).await
		})
	}

	fn set_listed(&self, listed: bool, cascade: bool) -> &Self {
		self.and_then(move |this| async move {
			this.set_permissions_now(None, Some(listed), cascade).await
		})
	}

	/// Objects of `types` this resource uses.
	async fn find(&self, types: &[&str]) -> Result<Vec<AnyResource>> {
		self.wait().await?;
		let (project, uri) = self.relation_source()?;
		project.using(uri, types).await.map(Relations::into_list)
	}

	/// Objects of `types` that use this resource.
	async fn parents(&self, types: &[&str]) -> Result<Vec<AnyResource>> {
		self.wait().await?;
		let (project, uri) = self.relation_source()?;
		project.usedby(uri, types).await.map(Relations::into_list)
	}

	#[doc(hidden)]
	fn relation_source(&self) -> Result<(&Project, String)> {
		let project = self.project().ok_or_else(|| {
			ApiError::InvalidArgument(
				"resource must belong to a project to use using/usedby".to_string(),
			)
		})?;
		let uri = self.uri().ok_or(ApiError::MissingUri("using"))?;
		Ok((project, uri))
	}
}

/// Object types reachable through queries and using/usedby lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
	Dashboard,
	Report,
	ReportDefinition,
	Metric,
}

impl ObjectKind {
	/// Category name used by using2/usedby2.
	pub fn category(self) -> &'static str {
		match self {
			ObjectKind::Dashboard => "projectDashboard",
			ObjectKind::Report => "report",
			ObjectKind::ReportDefinition => "reportDefinition",
			ObjectKind::Metric => "metric",
		}
	}

	pub fn from_category(category: &str) -> Option<Self> {
		match category {
			"projectDashboard" => Some(ObjectKind::Dashboard),
			"report" => Some(ObjectKind::Report),
			"reportDefinition" => Some(ObjectKind::ReportDefinition),
			"metric" => Some(ObjectKind::Metric),
			_ => None,
		}
	}

	/// Type name accepted by the metadata query resource.
	pub fn from_query_type(query_type: &str) -> Option<Self> {
		match query_type {
			"projectdashboards" => Some(ObjectKind::Dashboard),
			"reports" => Some(ObjectKind::Report),
			"metrics" => Some(ObjectKind::Metric),
			_ => None,
		}
	}

	/// Empty wrapper of this kind inside `project`.
	pub fn instantiate(self, project: &Project) -> AnyResource {
		match self {
			ObjectKind::Dashboard => AnyResource::Dashboard(Dashboard::new(project.clone())),
			ObjectKind::Report => AnyResource::Report(Report::new(project.clone())),
			ObjectKind::ReportDefinition => {
				AnyResource::ReportDefinition(ReportDefinition::new(project.clone()))
			}
			ObjectKind::Metric => AnyResource::Metric(Metric::new(project.clone())),
		}
	}
}

/// A project object of any supported kind.
#[derive(Debug, Clone)]
pub enum AnyResource {
	Dashboard(Dashboard),
	Report(Report),
	ReportDefinition(ReportDefinition),
	Metric(Metric),
}

impl AnyResource {
	pub fn kind(&self) -> ObjectKind {
		match self {
			AnyResource::Dashboard(_) => ObjectKind::Dashboard,
			AnyResource::Report(_) => ObjectKind::Report,
			AnyResource::ReportDefinition(_) => ObjectKind::ReportDefinition,
			AnyResource::Metric(_) => ObjectKind::Metric,
		}
	}

	pub fn uri(&self) -> Option<String> {
		match self {
			AnyResource::Dashboard(r) => r.uri(),
			AnyResource::Report(r) => r.uri(),
			AnyResource::ReportDefinition(r) => r.uri(),
			AnyResource::Metric(r) => r.uri(),
		}
	}

	pub fn title(&self) -> Option<String> {
		match self {
			AnyResource::Dashboard(r) => r.title(),
			AnyResource::Report(r) => r.title(),
			AnyResource::ReportDefinition(r) => r.title(),
			AnyResource::Metric(r) => r.title(),
		}
	}

	pub fn data(&self) -> Document {
		match self {
			AnyResource::Dashboard(r) => r.data(),
			AnyResource::Report(r) => r.data(),
			AnyResource::ReportDefinition(r) => r.data(),
			AnyResource::Metric(r) => r.data(),
		}
	}

	pub async fn load_now(&self, uri: Option<String>) -> Result<()> {
		match self {
			AnyResource::Dashboard(r) => r.load_now(uri).await,
			AnyResource::Report(r) => r.load_now(uri).await,
			AnyResource::ReportDefinition(r) => r.load_now(uri).await,
			AnyResource::Metric(r) => r.load_now(uri).await,
		}
	}

	pub fn into_dashboard(self) -> Option<Dashboard> {
		match self {
			AnyResource::Dashboard(r) => Some(r),
			_ => None,
		}
	}

	pub fn into_report(self) -> Option<Report> {
		match self {
			AnyResource::Report(r) => Some(r),
			_ => None,
		}
	}

	pub fn into_report_definition(self) -> Option<ReportDefinition> {
		match self {
			AnyResource::ReportDefinition(r) => Some(r),
			_ => None,
		}
	}

	pub fn into_metric(self) -> Option<Metric> {
		match self {
			AnyResource::Metric(r) => Some(r),
			_ => None,
		}
	}
}

/// Source objects of a using/usedby lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sources {
	/// One object; the lookup yields a flat list.
	One(String),
	/// Several objects; the lookup yields a map keyed by source URI.
	Many(Vec<String>),
}

impl Sources {
	pub fn uris(&self) -> Vec<String> {
		match self {
			Sources::One(uri) => vec![uri.clone()],
			Sources::Many(uris) => uris.clone(),
		}
	}
}

impl From<String> for Sources {
	fn from(uri: String) -> Self {
		Sources::One(uri)
	}
}

impl From<&str> for Sources {
	fn from(uri: &str) -> Self {
		Sources::One(uri.to_string())
	}
}

impl From<Vec<String>> for Sources {
	fn from(uris: Vec<String>) -> Self {
		Sources::Many(uris)
	}
}

impl From<&[&str]> for Sources {
	fn from(uris: &[&str]) -> Self {
		Sources::Many(uris.iter().map(|u| u.to_string()).collect())
	}
}

/// Result of a using/usedby lookup, shaped after its [`Sources`].
#[derive(Debug, Clone)]
pub enum Relations {
	List(Vec<AnyResource>),
	ByUri(BTreeMap<String, Vec<AnyResource>>),
}

impl Relations {
	/// Flattens either shape into one list.
	pub fn into_list(self) -> Vec<AnyResource> {
		match self {
			Relations::List(list) => list,
			Relations::ByUri(map) => map.into_values().flatten().collect(),
		}
	}
}

/// Boilerplate for objects that live inside a project.
macro_rules! project_object {
	($(#[$attr:meta])* $name:ident, $namespace:literal, $uri_path:literal) => {
		$(#[$attr])*
		#[derive(Debug, Clone)]
		pub struct $name {
			core: ::std::sync::Arc<$crate::resource::ResourceCore>,
			project: $crate::resource::Project,
		}

		impl $name {
			pub fn new(project: $crate::resource::Project) -> Self {
				Self::with_data(project, $crate::document::Document::new())
			}

			pub fn with_data(
				project: $crate::resource::Project,
				data: $crate::document::Document,
			) -> Self {
				let client = $crate::resource::Resource::client(&project).clone();
				Self {
					core: ::std::sync::Arc::new($crate::resource::ResourceCore::new(client, data)),
					project,
				}
			}
		}

		impl $crate::sequencer::Chained for $name {
			fn sequencer(&self) -> &$crate::sequencer::Sequencer {
				self.core.sequencer()
			}
		}

		impl $crate::resource::Resource for $name {
			const NAMESPACE: &'static str = $namespace;
			const URI_PATH: &'static str = $uri_path;

			fn core(&self) -> &$crate::resource::ResourceCore {
				&self.core
			}

			fn project(&self) -> Option<&$crate::resource::Project> {
				Some(&self.project)
			}
		}
	};
}

pub(crate) use project_object;
