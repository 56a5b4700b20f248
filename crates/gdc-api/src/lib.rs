// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK for the GoodData analytics platform REST API.
//!
//! The [`GdcClient`] owns the session (a long-lived SST and a short-lived TT
//! cookie) and runs every call through the authenticated request pipeline:
//!
//! - **Transparent token renewal**: a 401 triggers a single shared call to the
//!   token endpoint, after which the request is retried once.
//! - **Asynchronous tasks**: 202 responses are polled until the task finishes.
//! - **Structured errors**: `{error: {message, parameters}}` bodies become
//!   [`ApiError::Server`] with the parameters substituted.
//!
//! Resource wrappers ([`User`], [`Project`], [`Dashboard`], [`Report`],
//! [`ReportDefinition`], [`Metric`], [`Role`], [`ProfileSettings`]) chain
//! their mutating operations through a per-object [`Sequencer`].
//!
//! # Example
//!
//! ```ignore
//! use gdc_api::{Chained, GdcClient, Resource};
//!
//! #[tokio::main]
//! async fn main() -> gdc_api::Result<()> {
//!     let client = GdcClient::builder("secure.gooddata.com").build()?;
//!     let user = client.login("user@example.com", "secret").wait().await?;
//!
//!     let project = user.projects().await?.remove(0);
//!     for dashboard in project.dashboards().await? {
//!         dashboard.set_locked(true, false);
//!         dashboard.wait().await?;
//!     }
//!
//!     user.logout().wait().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod cookies;
mod document;
mod error;
mod resource;
mod sequencer;
mod session;
mod transport;

pub use client::{
	format_message, ApiResponse, GdcClient, GdcClientBuilder, RequestOptions, LOGIN_URI, TOKEN_URI,
};
pub use config::{ApiConfig, DEFAULT_POLL_INTERVAL, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT};
pub use cookies::{SST_COOKIE, TT_COOKIE};
pub use document::Document;
pub use error::{ApiError, Result};
pub use resource::{
	AnyResource, Dashboard, Metric, ObjectKind, ProfileSettings, Project, Relations, Report,
	ReportDefinition, Resource, ResourceCore, Role, RoleRef, Sources, User,
};
pub use sequencer::{Chained, Sequencer};
pub use transport::{
	HttpTransport, Transport, TransportRequest, TransportResponse, REQUEST_ID_HEADER,
};

pub use gdc_common_secret::SecretString;
