// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{client, cookie_of, respond, respond_text, with_cookie, with_request_id, MockTransport};
use futures::future::join_all;
use gdc_api::{ApiError, RequestOptions, SecretString, LOGIN_URI, TOKEN_URI};
use http::Method;
use serde_json::json;

fn login_ok(sst: &str) -> gdc_api::TransportResponse {
	with_cookie(
		respond(200, json!({"userLogin": {"profile": "/gdc/account/profile/42"}})),
		&format!("GDCAuthSST={sst}; Path=/; HttpOnly"),
	)
}

#[tokio::test]
async fn concurrent_401s_share_one_renewal() {
	let renewals = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&renewals);

	let transport = MockTransport::new(move |req| {
		if req.path == TOKEN_URI {
			counter.fetch_add(1, Ordering::SeqCst);
			return with_cookie(respond(200, json!({})), "GDCAuthTT=fresh; Path=/gdc");
		}
		if cookie_of(req).contains("GDCAuthTT=fresh") {
			respond(200, json!({"path": req.path}))
		} else {
			respond(401, json!({}))
		}
	});
	transport.delay(Method::GET, TOKEN_URI, Duration::from_millis(10));
	let client = client(&transport);

	let paths: Vec<String> = (0..5).map(|i| format!("/gdc/md/obj/{i}")).collect();
	let results = join_all(paths.iter().map(|p| client.get(p))).await;

	for (path, result) in paths.iter().zip(results) {
		assert_eq!(result.unwrap(), json!({"path": path}));
	}
	assert_eq!(renewals.load(Ordering::SeqCst), 1);
	assert_eq!(transport.count(&Method::GET, TOKEN_URI), 1);
}

#[tokio::test(start_paused = true)]
async fn late_401_retries_with_token_renewed_meanwhile() {
	let renewals = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&renewals);

	let transport = MockTransport::new(move |req| {
		if req.path == TOKEN_URI {
			counter.fetch_add(1, Ordering::SeqCst);
			return with_cookie(respond(200, json!({})), "GDCAuthTT=fresh; Path=/gdc");
		}
		if cookie_of(req).contains("GDCAuthTT=fresh") {
			respond(200, json!({"path": req.path}))
		} else {
			respond(401, json!({}))
		}
	});
	transport.delay(Method::GET, "/gdc/md/slow", Duration::from_millis(100));
	let client = client(&transport);

	let (fast, slow) = tokio::join!(client.get("/gdc/md/fast"), client.get("/gdc/md/slow"));

	assert_eq!(fast.unwrap(), json!({"path": "/gdc/md/fast"}));
	assert_eq!(slow.unwrap(), json!({"path": "/gdc/md/slow"}));
	assert_eq!(renewals.load(Ordering::SeqCst), 1);
	assert_eq!(
		transport.trace(),
		vec![
			"GET /gdc/md/fast",
			"GET /gdc/md/slow",
			"GET /gdc/account/token",
			"GET /gdc/md/fast",
			"GET /gdc/md/slow"
		]
	);
}

#[tokio::test]
async fn second_401_is_surfaced() {
	let transport = MockTransport::new(|req| {
		if req.path == TOKEN_URI {
			with_cookie(respond(200, json!({})), "GDCAuthTT=t1")
		} else {
			respond(401, json!({}))
		}
	});
	let client = client(&transport);

	let err = client.get("/gdc/md/obj/1").await.unwrap_err();
	assert!(matches!(err, ApiError::Http { status: 401 }));
	assert_eq!(
		transport.trace(),
		vec![
			"GET /gdc/md/obj/1",
			"GET /gdc/account/token",
			"GET /gdc/md/obj/1"
		]
	);
}

#[tokio::test]
async fn failed_renewal_is_not_retried() {
	let transport = MockTransport::new(|_| respond(401, json!({})));
	let client = client(&transport);

	let err = client.get("/gdc/md/obj/1").await.unwrap_err();
	assert!(matches!(err, ApiError::TokenRenewal(_)));
	assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn renewal_without_token_cookie_fails() {
	let transport = MockTransport::new(|req| {
		if req.path == TOKEN_URI {
			respond(200, json!({}))
		} else {
			respond(401, json!({}))
		}
	});
	let client = client(&transport);

	let err = client.get("/gdc/md/obj/1").await.unwrap_err();
	assert!(matches!(err, ApiError::TokenRenewal(msg) if msg.contains("GDCAuthTT")));
}

#[tokio::test]
async fn fail_on_401_skips_renewal() {
	let transport = MockTransport::new(|_| respond(401, json!({})));
	let client = client(&transport);

	let err = client
		.request("/gdc/md/obj/1", RequestOptions::get().fail_on_401())
		.await
		.unwrap_err();
	assert!(matches!(err, ApiError::Http { status: 401 }));
	assert_eq!(transport.count(&Method::GET, TOKEN_URI), 0);
}

#[tokio::test(start_paused = true)]
async fn polls_until_task_completes() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	let transport = MockTransport::new(move |_| {
		if counter.fetch_add(1, Ordering::SeqCst) < 3 {
			respond(202, json!({"asyncTask": {"link": {"poll": "/gdc/poll/7"}}}))
		} else {
			respond(200, json!({"done": true}))
		}
	});
	let client = client(&transport);

	let started = tokio::time::Instant::now();
	let data = client
		.post("/gdc/md/etl", json!({"pull": "upload.zip"}))
		.await
		.unwrap();

	assert_eq!(data, json!({"done": true}));
	assert_eq!(calls.load(Ordering::SeqCst), 4);
	assert!(started.elapsed() >= Duration::from_millis(3000));

	let requests = transport.requests();
	assert_eq!(requests[0].method, Method::POST);
	assert!(requests[0].body.is_some());
	for poll in &requests[1..] {
		assert_eq!(poll.method, Method::GET);
		assert_eq!(poll.path, "/gdc/poll/7");
		assert!(poll.body.is_none());
	}
}

#[tokio::test(start_paused = true)]
async fn poll_without_link_repeats_same_uri() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	let transport = MockTransport::new(move |_| {
		if counter.fetch_add(1, Ordering::SeqCst) == 0 {
			respond_text(202, "")
		} else {
			respond(200, json!({"ready": 1}))
		}
	});
	let client = client(&transport);

	assert_eq!(client.get("/gdc/md/export").await.unwrap(), json!({"ready": 1}));
	assert_eq!(transport.trace(), vec!["GET /gdc/md/export", "GET /gdc/md/export"]);
}

#[tokio::test]
async fn structured_errors_are_templated() {
	let transport = MockTransport::new(|_| {
		respond(
			403,
			json!({"error": {"message": "Error: %s", "parameters": ["nope"]}}),
		)
	});
	let client = client(&transport);

	let err = client.get("/gdc/md/obj/1").await.unwrap_err();
	assert_eq!(err.to_string(), "Error: nope");
	assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn unstructured_errors_report_status() {
	let transport = MockTransport::new(|_| respond_text(502, "<html>bad gateway</html>"));
	let client = client(&transport);

	let err = client.get("/gdc/md/obj/1").await.unwrap_err();
	assert_eq!(err.to_string(), "HTTP Error 502");
}

#[tokio::test]
async fn login_extracts_sst_cookie() {
	let transport = MockTransport::new(|req| match req.path.as_str() {
		LOGIN_URI => login_ok("abc123"),
		_ => respond(200, json!({"echo": cookie_of(req)})),
	});
	let client = client(&transport);

	let profile = client
		.authenticate("user@example.com", &SecretString::from("pw"))
		.await
		.unwrap();
	assert_eq!(profile, "/gdc/account/profile/42");
	assert!(client.is_logged_in());

	let echoed = client.get("/gdc/md").await.unwrap();
	assert_eq!(echoed, json!({"echo": "GDCAuthSST=abc123"}));

	let login = &transport.requests()[0];
	assert_eq!(login.method, Method::POST);
	assert_eq!(
		login.body.as_ref().unwrap()["postUserLogin"],
		json!({
			"login": "user@example.com",
			"password": "pw",
			"captcha": "",
			"remember": "0",
			"verifyCaptcha": "",
		})
	);
}

#[tokio::test]
async fn login_without_cookie_is_an_authentication_error() {
	let transport = MockTransport::new(|_| {
		respond(200, json!({"userLogin": {"profile": "/gdc/account/profile/42"}}))
	});
	let client = client(&transport);

	let err = client
		.authenticate("user@example.com", &SecretString::from("pw"))
		.await
		.unwrap_err();
	assert!(matches!(err, ApiError::Authentication(_)));
	assert!(!client.is_logged_in());
}

#[tokio::test]
async fn rejected_login_is_an_authentication_error_without_renewal() {
	let transport = MockTransport::new(|_| {
		respond(401, json!({"message": "Bad login for %s", "parameters": ["bob"]}))
	});
	let client = client(&transport);

	let err = client
		.authenticate("bob", &SecretString::from("pw"))
		.await
		.unwrap_err();
	assert!(matches!(&err, ApiError::Authentication(msg) if msg == "Bad login for bob"));
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn relative_login_path_is_not_renewed() {
	let transport = MockTransport::new(|_| {
		respond(401, json!({"message": "Bad login for %s", "parameters": ["bob"]}))
	});
	let client = client(&transport);

	let err = client
		.request("gdc/account/login", RequestOptions::post(json!({})))
		.await
		.unwrap_err();
	assert!(matches!(&err, ApiError::Server { status: 401, .. }));
	assert_eq!(err.to_string(), "Bad login for bob");
	assert_eq!(transport.trace(), vec!["POST gdc/account/login"]);
}

#[tokio::test]
async fn login_post_drops_cached_tt() {
	let transport = MockTransport::new(|req| match req.path.as_str() {
		LOGIN_URI => login_ok("second"),
		TOKEN_URI => with_cookie(respond(200, json!({})), "GDCAuthTT=tt1"),
		_ if cookie_of(req).contains("GDCAuthTT") => respond(200, json!({})),
		_ => respond(401, json!({})),
	});
	let client = client(&transport);

	client.get("/gdc/md").await.unwrap();
	client
		.authenticate("user@example.com", &SecretString::from("pw"))
		.await
		.unwrap();

	let login = transport
		.requests()
		.into_iter()
		.find(|r| r.path == LOGIN_URI)
		.unwrap();
	assert!(!login.cookie.unwrap_or_default().contains("GDCAuthTT"));
}

#[tokio::test]
async fn repeated_gets_return_equal_data() {
	let transport = MockTransport::new(|_| {
		respond(200, json!({"metric": {"meta": {"title": "Revenue"}}}))
	});
	let client = client(&transport);

	let first = client.get("/gdc/md/p/obj/1").await.unwrap();
	let second = client.get("/gdc/md/p/obj/1").await.unwrap();
	assert_eq!(first, second);
}

#[tokio::test]
async fn logout_deletes_login_resource_and_clears_tokens() {
	let transport = MockTransport::new(|req| match (req.method.as_str(), req.path.as_str()) {
		("POST", LOGIN_URI) => login_ok("abc"),
		_ => respond(204, json!({})),
	});
	let client = client(&transport);

	client
		.authenticate("user@example.com", &SecretString::from("pw"))
		.await
		.unwrap();
	client.end_session("/gdc/account/profile/42").await.unwrap();

	assert!(!client.is_logged_in());
	assert_eq!(transport.count(&Method::DELETE, "/gdc/account/login/42"), 1);
}

#[tokio::test]
async fn logout_clears_tokens_even_when_server_fails() {
	let transport = MockTransport::new(|req| match (req.method.as_str(), req.path.as_str()) {
		("POST", LOGIN_URI) => login_ok("abc"),
		_ => respond(500, json!({})),
	});
	let client = client(&transport);

	client
		.authenticate("user@example.com", &SecretString::from("pw"))
		.await
		.unwrap();
	let err = client.end_session("/gdc/account/profile/42").await.unwrap_err();

	assert!(matches!(err, ApiError::Http { status: 500 }));
	assert!(!client.is_logged_in());
}

#[tokio::test]
async fn mock_transport_without_request_ids_reports_none() {
	let transport = MockTransport::new(|_| with_request_id(respond(200, json!({})), "abc:1"));
	let client = client(&transport);

	client.get("/gdc").await.unwrap();
	assert_eq!(client.last_request_id(), None);
}

#[test]
fn connection_strings_configure_the_client() {
	let client = gdc_api::GdcClient::from_connection_string("acme@secure.example.com:8443").unwrap();
	assert_eq!(client.domain(), Some("acme"));
	assert_eq!(client.config().port, 8443);

	let err = gdc_api::GdcClient::from_connection_string("acme@:x").unwrap_err();
	assert!(matches!(err, ApiError::Configuration(_)));
}
