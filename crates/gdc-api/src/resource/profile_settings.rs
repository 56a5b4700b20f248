// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use serde_json::{json, Value};

use super::{Resource, ResourceCore, User};
use crate::document::Document;
use crate::sequencer::{Chained, Sequencer};

/// Per-user UI settings (`profileSetting`): default project and default
/// dashboard per project. Setters edit the local document; persist with
/// `save(None)`.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
	core: Arc<ResourceCore>,
	user: User,
}

impl ProfileSettings {
	pub fn new(user: &User) -> Self {
		Self {
			core: Arc::new(ResourceCore::new(user.client().clone(), Document::new())),
			user: user.clone(),
		}
	}

	pub fn user(&self) -> &User {
		&self.user
	}

	pub fn default_project(&self) -> Option<String> {
		self.core.get_str("currentProjectUri")
	}

	/// Default dashboard stored for `project_uri`.
	pub fn default_dashboard(&self, project_uri: &str) -> Option<String> {
		self.core
			.get("projectSettings")
			.and_then(|settings| settings.get(project_uri)?.get("dashboard").cloned())
			.and_then(|v| v.as_str().map(str::to_string))
	}

	pub fn set_default_project(&self, project_uri: impl Into<String>) -> &Self {
		let project_uri = project_uri.into();
		self.and_then(move |settings| async move {
			settings.core.set("currentProjectUri", json!(project_uri));
			Ok(())
		})
	}

	pub fn set_default_dashboard(
		&self,
		project_uri: impl Into<String>,
		dashboard_uri: impl Into<String>,
	) -> &Self {
		let project_uri = project_uri.into();
		let dashboard_uri = dashboard_uri.into();
		self.and_then(move |settings| async move {
			settings.apply_default_dashboard(&project_uri, &dashboard_uri);
			Ok(())
		})
	}

	// Project URIs contain dots, so the per-project entry is edited as a map
	// rather than through a dotted path.
	fn apply_default_dashboard(&self, project_uri: &str, dashboard_uri: &str) {
		let mut project_settings = match self.core.get("projectSettings") {
			Some(Value::Object(map)) => map,
			_ => Default::default(),
		};

		let entry = project_settings
			.entry(project_uri.to_string())
			.or_insert_with(|| {
				json!({
					"tab": null,
					"recentSearches": [],
					"manageReportsSettings": {},
				})
			});
		if let Value::Object(entry) = entry {
			entry.insert("dashboard".to_string(), json!(dashboard_uri));
		}

		self.core
			.set("projectSettings", Value::Object(project_settings));
	}
}

impl Chained for ProfileSettings {
	fn sequencer(&self) -> &Sequencer {
		self.core.sequencer()
	}
}

impl Resource for ProfileSettings {
	const NAMESPACE: &'static str = "profileSetting";

	fn core(&self) -> &ResourceCore {
		&self.core
	}
}
