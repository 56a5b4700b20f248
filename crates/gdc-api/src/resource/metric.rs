// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::project_object;

project_object!(
	/// A metric (`metric`).
	Metric,
	"metric",
	"meta.uri"
);

impl Metric {
	/// MAQL expression of the metric.
	pub fn expression(&self) -> Option<String> {
		self.core.get_str("content.expression")
	}
}
