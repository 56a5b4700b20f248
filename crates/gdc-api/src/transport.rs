// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The single-request seam between the pipeline and the network.

use std::sync::Mutex;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::Result;

/// Response header carrying the server-side request id.
pub const REQUEST_ID_HEADER: &str = "X-GDC-Request";

/// One HTTP request as the pipeline hands it to a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
	pub method: Method,
	/// Absolute URL or path relative to the configured host.
	pub path: String,
	pub headers: HeaderMap,
	/// Serialized JSON body.
	pub body: Option<String>,
	pub query: Vec<(String, String)>,
}

impl TransportRequest {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			query: Vec::new(),
		}
	}
}

/// Raw response: status code, headers and body text.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
	pub status: u16,
	pub headers: HeaderMap,
	pub body: String,
}

/// Performs exactly one HTTP exchange. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;

	/// Id of the most recent request as reported by the server.
	fn last_request_id(&self) -> Option<String> {
		None
	}
}

/// [`Transport`] backed by a shared `reqwest` client.
pub struct HttpTransport {
	client: reqwest::Client,
	base_url: String,
	last_request_id: Mutex<Option<String>>,
}

impl HttpTransport {
	/// Builds a transport for the configured host with the SDK User-Agent.
	pub fn new(config: &ApiConfig) -> Result<Self> {
		let client = gdc_common_http::builder()
			.timeout(config.request_timeout)
			.danger_accept_invalid_certs(config.accept_invalid_certs)
			.build()?;
		Ok(Self::with_client(client, config.base_url()))
	}

	/// Uses a caller-provided client, e.g. one with a proxy configured.
	pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			last_request_id: Mutex::new(None),
		}
	}

	fn url_for(&self, path: &str) -> String {
		if path.starts_with("http://") || path.starts_with("https://") {
			path.to_string()
		} else if path.starts_with('/') {
			format!("{}{}", self.base_url, path)
		} else {
			format!("{}/{}", self.base_url, path)
		}
	}
}

impl std::fmt::Debug for HttpTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpTransport")
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
		let url = self.url_for(&request.path);

		let mut builder = self
			.client
			.request(request.method, &url)
			.headers(request.headers)
			.header(http::header::ACCEPT, "application/json");
		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}
		if let Some(body) = request.body {
			builder = builder
				.header(http::header::CONTENT_TYPE, "application/json")
				.body(body);
		}

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let headers = response.headers().clone();

		if let Some(id) = headers
			.get(REQUEST_ID_HEADER)
			.and_then(|v| v.to_str().ok())
		{
			debug!(request_id = %id, "server request id");
			if let Ok(mut last) = self.last_request_id.lock() {
				*last = Some(id.to_string());
			}
		}

		let body = response.text().await?;
		Ok(TransportResponse {
			status,
			headers,
			body,
		})
	}

	fn last_request_id(&self) -> Option<String> {
		self.last_request_id.lock().ok().and_then(|id| id.clone())
	}
}
