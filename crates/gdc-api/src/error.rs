// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the GDC SDK.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced by the client, the request pipeline and the resource
/// wrappers.
///
/// `ApiError` is `Clone` because a single failure is handed to every waiter of
/// a shared token renewal and to every caller awaiting a broken chain.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
	/// Invalid hostname, port or connection string.
	#[error("invalid configuration: {0}")]
	Configuration(String),

	/// Login was rejected or the server did not hand out a session token.
	#[error("authentication failed: {0}")]
	Authentication(String),

	/// The token-refresh call did not produce a usable temporary token.
	#[error("token renewal failed: {0}")]
	TokenRenewal(String),

	/// Error status without a structured error body.
	#[error("HTTP Error {status}")]
	Http {
		/// HTTP status code.
		status: u16,
	},

	/// Error status with a structured `{message, parameters}` body.
	#[error("{message}")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Message with parameters substituted.
		message: String,
	},

	/// A resource response lacked the expected namespace key.
	#[error("No data or invalid namespace: {namespace}")]
	MissingNamespace {
		/// The namespace key that was expected.
		namespace: &'static str,
	},

	/// The transport could not complete the request.
	#[error("HTTP request failed: {0}")]
	RequestFailed(Arc<reqwest::Error>),

	/// Payload could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(Arc<serde_json::Error>),

	/// An operation needs a URI the wrapper does not know.
	#[error("No URI specified for {0}()")]
	MissingUri(&'static str),

	/// A caller-supplied argument was rejected before any request was sent.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// Query or relation lookup for an unsupported resource type.
	#[error("resource type `{0}` is not supported")]
	UnsupportedType(String),

	/// Project has no role with the requested title.
	#[error("No such role: {0}")]
	RoleNotFound(String),

	/// The server did not list the user among successful invitations.
	#[error("Could not invite user {0} to project")]
	InviteRejected(String),

	/// A response did not have the shape the wrapper relies on.
	#[error("unexpected response: {0}")]
	UnexpectedResponse(String),

	/// User creation needs a domain in the client configuration.
	#[error("creating users requires a configured domain and an organization admin session")]
	DomainRequired,

	/// A sequenced step awaited the chain it is part of.
	#[error("a chained step awaited its own chain; this would never resolve")]
	SelfReferentialChain,
}

impl ApiError {
	/// HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			ApiError::Http { status } | ApiError::Server { status, .. } => Some(*status),
			ApiError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	/// True for errors raised by the login/renewal machinery.
	pub fn is_auth_error(&self) -> bool {
		matches!(
			self,
			ApiError::Authentication(_) | ApiError::TokenRenewal(_)
		) || self.status() == Some(401)
	}
}

impl From<reqwest::Error> for ApiError {
	fn from(err: reqwest::Error) -> Self {
		ApiError::RequestFailed(Arc::new(err))
	}
}

impl From<serde_json::Error> for ApiError {
	fn from(err: serde_json::Error) -> Self {
		ApiError::Serialization(Arc::new(err))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn http_error_message_matches_wire_convention() {
		let err = ApiError::Http { status: 500 };
		assert_eq!(err.to_string(), "HTTP Error 500");
		assert_eq!(err.status(), Some(500));
	}

	#[test]
	fn server_error_displays_message_only() {
		let err = ApiError::Server {
			status: 403,
			message: "Error: nope".to_string(),
		};
		assert_eq!(err.to_string(), "Error: nope");
	}

	#[test]
	fn missing_namespace_names_the_key() {
		let err = ApiError::MissingNamespace {
			namespace: "project",
		};
		assert!(err.to_string().ends_with("project"));
	}

	#[test]
	fn auth_errors_are_classified() {
		assert!(ApiError::Authentication("x".into()).is_auth_error());
		assert!(ApiError::TokenRenewal("x".into()).is_auth_error());
		assert!(ApiError::Http { status: 401 }.is_auth_error());
		assert!(!ApiError::Http { status: 404 }.is_auth_error());
		assert!(!ApiError::DomainRequired.is_auth_error());
	}

	#[test]
	fn errors_clone_for_shared_waiters() {
		let err = ApiError::TokenRenewal("no token".into());
		let cloned = err.clone();
		assert_eq!(err.to_string(), cloned.to_string());
	}
}
