// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gdc_api::{
	GdcClient, Result, Transport, TransportRequest, TransportResponse, REQUEST_ID_HEADER,
};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Method};
use serde_json::Value;

type Handler = dyn Fn(&TransportRequest) -> TransportResponse + Send + Sync;

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
	pub method: Method,
	pub path: String,
	pub cookie: Option<String>,
	pub body: Option<Value>,
}

/// Answers every request through a handler closure and records what was
/// sent. Each send yields once so concurrent callers interleave.
pub struct MockTransport {
	handler: Box<Handler>,
	delays: Mutex<HashMap<(Method, String), Duration>>,
	requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
	pub fn new<F>(handler: F) -> Arc<Self>
	where
		F: Fn(&TransportRequest) -> TransportResponse + Send + Sync + 'static,
	{
		Arc::new(Self {
			handler: Box::new(handler),
			delays: Mutex::new(HashMap::new()),
			requests: Mutex::new(Vec::new()),
		})
	}

	/// Delays the answer to `method path`.
	pub fn delay(&self, method: Method, path: &str, delay: Duration) {
		self.delays
			.lock()
			.unwrap()
			.insert((method, path.to_string()), delay);
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.requests.lock().unwrap().clone()
	}

	pub fn count(&self, method: &Method, path: &str) -> usize {
		self.requests()
			.iter()
			.filter(|r| &r.method == method && r.path == path)
			.count()
	}

	/// `METHOD path` for every request, in send order.
	pub fn trace(&self) -> Vec<String> {
		self.requests()
			.iter()
			.map(|r| format!("{} {}", r.method, r.path))
			.collect()
	}
}

#[async_trait]
impl Transport for MockTransport {
	async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
		self.requests.lock().unwrap().push(Recorded {
			method: request.method.clone(),
			path: request.path.clone(),
			cookie: request
				.headers
				.get(COOKIE)
				.and_then(|v| v.to_str().ok())
				.map(str::to_string),
			body: request
				.body
				.as_deref()
				.and_then(|b| serde_json::from_str(b).ok()),
		});

		tokio::task::yield_now().await;
		let delay = self
			.delays
			.lock()
			.unwrap()
			.get(&(request.method.clone(), request.path.clone()))
			.copied();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		Ok((self.handler)(&request))
	}
}

pub fn respond(status: u16, body: Value) -> TransportResponse {
	TransportResponse {
		status,
		headers: HeaderMap::new(),
		body: body.to_string(),
	}
}

pub fn respond_text(status: u16, body: &str) -> TransportResponse {
	TransportResponse {
		status,
		headers: HeaderMap::new(),
		body: body.to_string(),
	}
}

pub fn with_cookie(mut response: TransportResponse, cookie: &str) -> TransportResponse {
	response
		.headers
		.append(SET_COOKIE, HeaderValue::from_str(cookie).unwrap());
	response
}

pub fn with_request_id(mut response: TransportResponse, id: &str) -> TransportResponse {
	response
		.headers
		.insert(REQUEST_ID_HEADER, HeaderValue::from_str(id).unwrap());
	response
}

pub fn cookie_of(request: &TransportRequest) -> String {
	request
		.headers
		.get(COOKIE)
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default()
		.to_string()
}

pub fn client(transport: &Arc<MockTransport>) -> GdcClient {
	builder(transport).build().unwrap()
}

pub fn builder(transport: &Arc<MockTransport>) -> gdc_api::GdcClientBuilder {
	GdcClient::builder("secure.example.com")
		.poll_interval(Duration::from_millis(1000))
		.transport(transport.clone())
}
