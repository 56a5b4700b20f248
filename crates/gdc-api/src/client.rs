// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session manager and authenticated request pipeline.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use gdc_common_secret::SecretString;
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue, Method};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::cookies::{self, SST_COOKIE, TT_COOKIE};
use crate::error::{ApiError, Result};
use crate::resource::User;
use crate::session::TokenStore;
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Login endpoint. A POST here hands out the SST.
pub const LOGIN_URI: &str = "/gdc/account/login";
/// Token-refresh endpoint. A GET here hands out a fresh TT.
pub const TOKEN_URI: &str = "/gdc/account/token";

/// Options for [`GdcClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
	/// HTTP method, GET unless set.
	pub method: Method,
	/// JSON body.
	pub body: Option<Value>,
	pub query: Vec<(String, String)>,
	/// Extra request headers.
	pub headers: HeaderMap,
	/// Surface a 401 as an error instead of renewing the token.
	pub fail_on_401: bool,
}

impl RequestOptions {
	pub fn get() -> Self {
		Self::default()
	}

	pub fn post(body: Value) -> Self {
		Self {
			method: Method::POST,
			body: Some(body),
			..Self::default()
		}
	}

	pub fn put(body: Value) -> Self {
		Self {
			method: Method::PUT,
			body: Some(body),
			..Self::default()
		}
	}

	pub fn delete() -> Self {
		Self {
			method: Method::DELETE,
			..Self::default()
		}
	}

	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));
		self
	}

	pub fn fail_on_401(mut self) -> Self {
		self.fail_on_401 = true;
		self
	}
}

/// Final, non-202 response of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct ApiResponse {
	pub status: u16,
	pub headers: HeaderMap,
	/// Parsed body. Non-JSON bodies parse to an empty object.
	pub data: Value,
}

/// Builder for constructing a [`GdcClient`].
pub struct GdcClientBuilder {
	config: ApiConfig,
	transport: Option<Arc<dyn Transport>>,
}

impl GdcClientBuilder {
	/// Creates a builder for `hostname` with default settings.
	pub fn new(hostname: impl Into<String>) -> Self {
		Self::from_config(ApiConfig::new(hostname))
	}

	/// Starts from an existing configuration.
	pub fn from_config(config: ApiConfig) -> Self {
		Self {
			config,
			transport: None,
		}
	}

	pub fn port(mut self, port: u16) -> Self {
		self.config.port = port;
		self
	}

	/// Sets the organization domain, needed to register users.
	pub fn domain(mut self, domain: impl Into<String>) -> Self {
		self.config.domain = Some(domain.into());
		self
	}

	/// Sets the delay between poll requests for asynchronous tasks.
	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.config.poll_interval = interval;
		self
	}

	/// Emits a `debug!` event for every request and response.
	pub fn debug(mut self, debug: bool) -> Self {
		self.config.debug = debug;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn tls(mut self, tls: bool) -> Self {
		self.config.tls = tls;
		self
	}

	pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
		self.config.accept_invalid_certs = accept;
		self
	}

	/// Replaces the default reqwest transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Validates the configuration and builds the client.
	pub fn build(self) -> Result<GdcClient> {
		self.config.validate()?;

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(&self.config)?),
		};

		info!(
			hostname = %self.config.hostname,
			port = self.config.port,
			sdk_name = gdc_common_version::SDK_NAME,
			sdk_version = %gdc_common_version::sdk_version(),
			"GDC client initialized"
		);

		Ok(GdcClient {
			inner: Arc::new(ClientInner {
				config: self.config,
				transport,
				tokens: Arc::new(TokenStore::new()),
				renewal: Mutex::new(RenewalSlot::default()),
			}),
		})
	}
}

type RenewalFuture = Shared<BoxFuture<'static, Result<()>>>;

#[derive(Default)]
struct RenewalSlot {
	next_id: u64,
	pending: Option<(u64, RenewalFuture)>,
}

struct ClientInner {
	config: ApiConfig,
	transport: Arc<dyn Transport>,
	tokens: Arc<TokenStore>,
	renewal: Mutex<RenewalSlot>,
}

/// Client for the analytics platform REST API.
///
/// Owns the SST/TT token pair and runs every call through the
/// authenticated request pipeline: a 401 triggers one shared token renewal
/// followed by a single retry, 202 responses are polled until the task
/// finishes, and error bodies are turned into [`ApiError`]s.
///
/// # Example
///
/// ```ignore
/// use gdc_api::{Chained, GdcClient};
///
/// let client = GdcClient::builder("secure.gooddata.com").build()?;
/// let user = client.login("user@example.com", "secret").wait().await?;
///
/// for project in user.projects().await? {
///     println!("{}", project.title().unwrap_or_default());
/// }
/// ```
#[derive(Clone)]
pub struct GdcClient {
	inner: Arc<ClientInner>,
}

impl std::fmt::Debug for GdcClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GdcClient")
			.field("config", &self.inner.config)
			.field("tokens", &self.inner.tokens)
			.finish_non_exhaustive()
	}
}

impl GdcClient {
	/// Creates a new builder for `hostname`.
	pub fn builder(hostname: impl Into<String>) -> GdcClientBuilder {
		GdcClientBuilder::new(hostname)
	}

	/// Builds a client from `domain@host:port` and its shorter forms.
	pub fn from_connection_string(connection: &str) -> Result<Self> {
		GdcClientBuilder::from_config(connection.parse()?).build()
	}

	pub fn config(&self) -> &ApiConfig {
		&self.inner.config
	}

	pub fn domain(&self) -> Option<&str> {
		self.inner.config.domain.as_deref()
	}

	/// True while an SST is held.
	pub fn is_logged_in(&self) -> bool {
		self.inner.tokens.is_logged_in()
	}

	/// Server id of the most recent request, for support tickets.
	pub fn last_request_id(&self) -> Option<String> {
		self.inner.transport.last_request_id()
	}

	/// A fresh, empty user bound to this client.
	pub fn user(&self) -> User {
		User::new(self.clone())
	}

	/// Logs in and loads the account into the returned user.
	pub fn login(&self, username: impl Into<String>, password: impl Into<SecretString>) -> User {
		let user = self.user();
		user.login(username, password);
		user
	}

	/// Registers a new account in the configured domain.
	pub fn register(
		&self,
		username: impl Into<String>,
		password: impl Into<SecretString>,
		first_name: Option<String>,
		last_name: Option<String>,
	) -> User {
		let user = self.user();
		user.register(username, password, first_name, last_name);
		user
	}

	/// Sends the login request, stores the SST and returns the profile URI.
	pub async fn authenticate(&self, username: &str, password: &SecretString) -> Result<String> {
		let body = json!({
			"postUserLogin": {
				"login": username,
				"password": password.expose(),
				"captcha": "",
				"remember": "0",
				"verifyCaptcha": "",
			}
		});

		let response = self
			.execute(LOGIN_URI, RequestOptions::post(body))
			.await
			.map_err(|e| match e {
				ApiError::Server { message, .. } => ApiError::Authentication(message),
				ApiError::Http { status } => {
					ApiError::Authentication(format!("HTTP Error {status}"))
				}
				other => other,
			})?;

		let sst = cookies::extract(&response.headers, SST_COOKIE).ok_or_else(|| {
			ApiError::Authentication(format!("{SST_COOKIE} not found in response headers"))
		})?;
		self.inner.tokens.set_sst(Some(SecretString::new(sst)));

		info!(username = %username, "Logged in");

		response
			.data
			.pointer("/userLogin/profile")
			.and_then(Value::as_str)
			.map(str::to_string)
			.ok_or_else(|| {
				ApiError::UnexpectedResponse("login response lacks userLogin.profile".to_string())
			})
	}

	/// Deletes the server-side login belonging to `profile_uri` and drops both
	/// tokens. Tokens are dropped even when the server call fails.
	pub async fn end_session(&self, profile_uri: &str) -> Result<()> {
		let login_uri = profile_uri.replacen("/profile", "/login", 1);
		let result = self.request(&login_uri, RequestOptions::delete()).await;
		self.clear_session();
		info!("Logged out");
		result.map(|_| ())
	}

	/// Drops both tokens without contacting the server.
	pub fn clear_session(&self) {
		self.inner.tokens.clear();
	}

	pub async fn get(&self, uri: &str) -> Result<Value> {
		self.request(uri, RequestOptions::get()).await
	}

	pub async fn post(&self, uri: &str, body: Value) -> Result<Value> {
		self.request(uri, RequestOptions::post(body)).await
	}

	pub async fn put(&self, uri: &str, body: Value) -> Result<Value> {
		self.request(uri, RequestOptions::put(body)).await
	}

	pub async fn delete(&self, uri: &str) -> Result<Value> {
		self.request(uri, RequestOptions::delete()).await
	}

	/// Runs `uri` through the pipeline and returns the parsed body.
	pub async fn request(&self, uri: &str, options: RequestOptions) -> Result<Value> {
		self.execute(uri, options).await.map(|response| response.data)
	}

	/// Runs `uri` through the pipeline and returns the full final response.
	pub async fn execute(&self, uri: &str, options: RequestOptions) -> Result<ApiResponse> {
		let RequestOptions {
			mut method,
			body,
			query,
			headers,
			fail_on_401,
		} = options;

		let mut uri = uri.to_string();
		let mut body = body.map(|b| serde_json::to_string(&b)).transpose()?;
		let mut renewed = false;

		loop {
			let path = endpoint_path(&uri);
			let is_login = path == LOGIN_URI;
			let is_token = path == TOKEN_URI;

			if is_login && method == Method::POST {
				self.inner.tokens.clear_tt();
			}

			let snapshot = self.inner.tokens.snapshot();
			let mut request_headers = headers.clone();
			if let Some(cookie) = &snapshot.cookie {
				request_headers.insert(COOKIE, cookie_header(cookie)?);
			}

			if self.inner.config.debug {
				debug!(method = %method, path = %uri, "http request");
			}

			let response = self
				.inner
				.transport
				.send(TransportRequest {
					method: method.clone(),
					path: uri.clone(),
					headers: request_headers,
					body: body.clone(),
					query: query.clone(),
				})
				.await?;
			let status = response.status;

			if self.inner.config.debug {
				debug!(method = %method, path = %uri, status, "http response");
			}

			if status == 401 && !renewed && !fail_on_401 && !is_login && !is_token {
				self.renew_after(snapshot.generation).await?;
				renewed = true;
				continue;
			}

			if status >= 400 {
				return Err(extract_error(status, &response.body, is_login));
			}

			let data = parse_body(&response.body);

			if status == 202 {
				if let Some(poll) = data.pointer("/asyncTask/link/poll").and_then(Value::as_str) {
					uri = poll.to_string();
				}
				method = Method::GET;
				body = None;
				renewed = false;
				tokio::time::sleep(self.inner.config.poll_interval).await;
				continue;
			}

			return Ok(ApiResponse {
				status,
				headers: response.headers,
				data,
			});
		}
	}

	/// Waits for a TT newer than `generation`, starting a renewal only when
	/// none is in flight and nobody renewed since the request was sent.
	async fn renew_after(&self, generation: u64) -> Result<()> {
		let (id, renewal) = {
			let mut slot = self
				.inner
				.renewal
				.lock()
				.unwrap_or_else(|e| e.into_inner());

			if self.inner.tokens.generation() != generation {
				return Ok(());
			}

			match &slot.pending {
				Some((id, renewal)) => (*id, renewal.clone()),
				None => {
					let id = slot.next_id;
					slot.next_id += 1;
					let renewal = renew_token(
						Arc::clone(&self.inner.transport),
						Arc::clone(&self.inner.tokens),
						self.inner.config.debug,
					)
					.boxed()
					.shared();
					slot.pending = Some((id, renewal.clone()));
					(id, renewal)
				}
			}
		};

		let result = renewal.await;

		let mut slot = self
			.inner
			.renewal
			.lock()
			.unwrap_or_else(|e| e.into_inner());
		if matches!(&slot.pending, Some((current, _)) if *current == id) {
			slot.pending = None;
		}

		result
	}
}

/// GETs the token endpoint once and stores the TT it hands out.
async fn renew_token(
	transport: Arc<dyn Transport>,
	tokens: Arc<TokenStore>,
	debug_enabled: bool,
) -> Result<()> {
	let mut request = TransportRequest::new(Method::GET, TOKEN_URI);
	if let Some(cookie) = tokens.snapshot().cookie {
		request.headers.insert(COOKIE, cookie_header(&cookie)?);
	}

	if debug_enabled {
		debug!(method = "GET", path = TOKEN_URI, "http request");
	}

	let response = transport.send(request).await?;

	if debug_enabled {
		debug!(method = "GET", path = TOKEN_URI, status = response.status, "http response");
	}

	if response.status >= 400 {
		warn!(status = response.status, "Token renewal rejected");
		return Err(ApiError::TokenRenewal(format!(
			"HTTP Error {}",
			response.status
		)));
	}

	match cookies::extract(&response.headers, TT_COOKIE) {
		Some(tt) => {
			tokens.set_tt(SecretString::new(tt));
			info!("Temporary token renewed");
			Ok(())
		}
		None => {
			warn!("Token renewal response carried no temporary token");
			Err(ApiError::TokenRenewal(format!(
				"{TT_COOKIE} not found in response headers"
			)))
		}
	}
}

fn cookie_header(cookie: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(cookie)
		.map_err(|_| ApiError::InvalidArgument("token contains invalid header characters".to_string()))
}

/// Path part of `uri` without scheme, host or query, always rooted at `/`
/// so relative paths the transport accepts compare equal to the endpoints.
fn endpoint_path(uri: &str) -> Cow<'_, str> {
	let path = match uri.split_once("://") {
		Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
		None => uri,
	};
	let path = path.split(['?', '#']).next().unwrap_or(path);
	if path.starts_with('/') {
		Cow::Borrowed(path)
	} else {
		Cow::Owned(format!("/{path}"))
	}
}

fn parse_body(body: &str) -> Value {
	serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Maps an error status and body to [`ApiError::Server`] or [`ApiError::Http`].
fn extract_error(status: u16, body: &str, is_login: bool) -> ApiError {
	let data = parse_body(body);
	let error = if is_login && data.get("message").is_some() {
		Some(&data)
	} else {
		data.get("error")
	};

	let template = error
		.and_then(|e| e.get("message"))
		.and_then(Value::as_str);

	match template {
		Some(template) => {
			let parameters = error
				.and_then(|e| e.get("parameters"))
				.and_then(Value::as_array)
				.map(Vec::as_slice)
				.unwrap_or_default();
			ApiError::Server {
				status,
				message: format_message(template, parameters),
			}
		}
		None => ApiError::Http { status },
	}
}

/// Substitutes `%s` placeholders in order. Placeholders without a matching
/// parameter are left as they are.
pub fn format_message(template: &str, parameters: &[Value]) -> String {
	let mut parameters = parameters.iter();
	let mut pieces = template.split("%s");
	let mut message = pieces.next().unwrap_or_default().to_string();

	for piece in pieces {
		match parameters.next() {
			Some(Value::String(s)) => message.push_str(s),
			Some(other) => message.push_str(&other.to_string()),
			None => message.push_str("%s"),
		}
		message.push_str(piece);
	}

	message
}
