// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use super::{project_object, AnyResource, Metric, Resource};
use crate::error::Result;

project_object!(
	/// A report (`report`).
	Report,
	"report",
	"meta.uri"
);

// Responses for report definitions are keyed `reportDefinition`.
project_object!(
	/// A report definition (`reportDefinition`).
	ReportDefinition,
	"reportDefinition",
	"meta.uri"
);

impl Report {
	pub async fn metrics(&self) -> Result<Vec<Metric>> {
		Ok(self
			.find(&["metric"])
			.await?
			.into_iter()
			.filter_map(AnyResource::into_metric)
			.collect())
	}

	pub async fn report_definitions(&self) -> Result<Vec<ReportDefinition>> {
		Ok(self
			.find(&["reportDefinition"])
			.await?
			.into_iter()
			.filter_map(AnyResource::into_report_definition)
			.collect())
	}
}

impl ReportDefinition {
	pub async fn metrics(&self) -> Result<Vec<Metric>> {
		Ok(self
			.find(&["metric"])
			.await?
			.into_iter()
			.filter_map(AnyResource::into_metric)
			.collect())
	}
}
