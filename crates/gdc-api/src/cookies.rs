// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Auth cookie composition and extraction.

use http::header::SET_COOKIE;
use http::HeaderMap;

/// Cookie carrying the long-lived super-secured token.
pub const SST_COOKIE: &str = "GDCAuthSST";
/// Cookie carrying the short-lived temporary token.
pub const TT_COOKIE: &str = "GDCAuthTT";

/// Builds the `Cookie` request header value. Absent tokens are omitted.
pub fn compose(sst: Option<&str>, tt: Option<&str>) -> Option<String> {
	let parts: Vec<String> = [(SST_COOKIE, sst), (TT_COOKIE, tt)]
		.into_iter()
		.filter_map(|(name, value)| value.map(|v| format!("{name}={v}")))
		.collect();
	if parts.is_empty() {
		None
	} else {
		Some(parts.join("; "))
	}
}

/// Finds `name=` in any `Set-Cookie` header and returns its value up to the
/// first `;` or space. Empty values count as absent.
pub fn extract(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(SET_COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.find_map(|value| extract_from(value, name))
}

/// Cookie names match case-insensitively. ASCII lowercasing keeps byte
/// offsets, so the match position indexes the original header.
fn extract_from(header: &str, name: &str) -> Option<String> {
	let needle = format!("{name}=").to_ascii_lowercase();
	let start = header.to_ascii_lowercase().find(&needle)? + needle.len();
	let value: String = header[start..]
		.chars()
		.take_while(|c| *c != ';' && *c != ' ')
		.collect();
	if value.is_empty() {
		None
	} else {
		Some(value)
	}
}
