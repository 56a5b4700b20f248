// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::json;
use tracing::info;

use super::{project_object, Resource};
use crate::error::{ApiError, Result};
use crate::sequencer::Chained;

project_object!(
	/// A project role (`projectRole`).
	Role,
	"projectRole",
	"links.self"
);

impl Role {
	/// Assigns this role to the user at `user_uri`.
	pub fn add_user(&self, user_uri: impl Into<String>) -> &Self {
		let user_uri = user_uri.into();
		self.and_then(move |role| async move { role.add_user_now(&user_uri).await })
	}

	pub async fn add_user_now(&self, user_uri: &str) -> Result<()> {
		let uri = self
			.core
			.get_str("links.roleUsers")
			.ok_or(ApiError::MissingUri("addUser"))?;
		if user_uri.is_empty() {
			return Err(ApiError::InvalidArgument(
				"user must have an URI to be assigned a role".to_string(),
			));
		}

		self.client()
			.post(&uri, json!({ "associateUser": { "user": user_uri } }))
			.await?;
		info!(role = ?self.title(), user = %user_uri, "User added to role");
		Ok(())
	}
}
