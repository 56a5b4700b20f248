// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for the GDC SDK and the `gdc` command line tool.
//!
//! The SDK identifies itself to the analytics platform with the values
//! exposed here (see `gdc_common_http::user_agent`).

shadow_rs::shadow!(build);

#[cfg(feature = "serde")]
use serde::Serialize;

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = env!("GDC_PLATFORM");

/// Name the SDK reports in its User-Agent.
pub const SDK_NAME: &str = "gdc-rust";

/// Compile-time build information.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
	pub version: &'static str,
	pub git_sha: &'static str,
	pub build_timestamp: &'static str,
	pub platform: &'static str,
}

impl BuildInfo {
	/// Get the current build information.
	#[allow(clippy::const_is_empty)]
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			git_sha: if build::SHORT_COMMIT.is_empty() {
				"unknown"
			} else {
				build::SHORT_COMMIT
			},
			build_timestamp: build::BUILD_TIME,
			platform: PLATFORM,
		}
	}

	/// Long form shown by `gdc --version`.
	pub fn long_version(&self) -> String {
		format!(
			"{} ({} {}, built {})",
			self.version, self.git_sha, self.platform, self.build_timestamp
		)
	}
}

/// SDK version string.
pub const fn sdk_version() -> &'static str {
	build::PKG_VERSION
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn build_info_has_version() {
		let info = BuildInfo::current();
		assert!(!info.version.is_empty());
		assert!(!info.git_sha.is_empty());
	}

	#[test]
	fn platform_format_is_valid() {
		assert!(PLATFORM.contains('-'));
	}

	#[test]
	fn sdk_version_matches_build_info() {
		assert_eq!(sdk_version(), BuildInfo::current().version);
	}

	#[test]
	fn long_version_mentions_platform() {
		let info = BuildInfo::current();
		assert!(info.long_version().contains(info.platform));
	}
}
