// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::{project_object, AnyResource, Report, Resource};
use crate::error::{ApiError, Result};
use crate::sequencer::Chained;

project_object!(
	/// A project dashboard (`projectDashboard`).
	Dashboard,
	"projectDashboard",
	"meta.uri"
);

impl Dashboard {
	/// Makes this dashboard the default one of its project for the
	/// project's user.
	pub fn set_as_default(&self) -> &Self {
		self.and_then(|dashboard| async move {
			let project = &dashboard.project;
			let user = project.user().ok_or_else(|| {
				ApiError::InvalidArgument("project has no user to store settings for".to_string())
			})?;
			let project_uri = project.uri().ok_or(ApiError::MissingUri("setAsDefault"))?;
			let dashboard_uri = dashboard.uri().ok_or(ApiError::MissingUri("setAsDefault"))?;

			let settings = user.settings().await?;
			settings
				.set_default_dashboard(project_uri, dashboard_uri)
				.save(None);
			settings.wait().await?;
			Ok(())
		})
	}

	/// Reports placed on this dashboard.
	pub async fn reports(&self) -> Result<Vec<Report>> {
		Ok(self
			.find(&["report"])
			.await?
			.into_iter()
			.filter_map(AnyResource::into_report)
			.collect())
	}
}
