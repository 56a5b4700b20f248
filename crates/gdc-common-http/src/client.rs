// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use gdc_common_version::{BuildInfo, SDK_NAME};
use reqwest::{Client, ClientBuilder};

/// Creates a client builder with the standard User-Agent.
///
/// # Example
/// ```ignore
/// let client = gdc_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	builder_with_user_agent(user_agent())
}

/// Creates a client builder with a caller-supplied User-Agent.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Returns the SDK User-Agent.
///
/// Format: `gdc-rust/{version} ({platform}; {git_sha})`
pub fn user_agent() -> String {
	let info = BuildInfo::current();
	format!(
		"{SDK_NAME}/{} ({}; {})",
		info.version, info.platform, info.git_sha
	)
}
