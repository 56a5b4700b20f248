// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token state shared by every request of one client.

use std::sync::RwLock;

use gdc_common_secret::SecretString;

use crate::cookies;

#[derive(Debug, Default)]
struct Tokens {
	sst: Option<SecretString>,
	tt: Option<SecretString>,
	generation: u64,
}

/// The SST/TT pair plus a generation counter bumped on every stored TT.
///
/// Only login, logout and the renewal routine write here.
#[derive(Debug, Default)]
pub struct TokenStore {
	tokens: RwLock<Tokens>,
}

/// Cookie header and the TT generation it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
	pub cookie: Option<String>,
	pub generation: u64,
}

impl TokenStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn snapshot(&self) -> Snapshot {
		let tokens = self.read();
		Snapshot {
			cookie: cookies::compose(
				tokens.sst.as_ref().map(|s| s.expose().as_str()),
				tokens.tt.as_ref().map(|s| s.expose().as_str()),
			),
			generation: tokens.generation,
		}
	}

	pub fn is_logged_in(&self) -> bool {
		self.read().sst.is_some()
	}

	pub fn generation(&self) -> u64 {
		self.read().generation
	}

	/// Stores a new SST. The TT always goes with it.
	pub fn set_sst(&self, sst: Option<SecretString>) {
		let mut tokens = self.write();
		tokens.sst = sst;
		tokens.tt = None;
	}

	pub fn set_tt(&self, tt: SecretString) {
		let mut tokens = self.write();
		tokens.tt = Some(tt);
		tokens.generation += 1;
	}

	pub fn clear_tt(&self) {
		self.write().tt = None;
	}

	pub fn clear(&self) {
		self.set_sst(None);
	}

	// A poisoned lock only means a writer panicked mid-assignment of an Option;
	// the value is still usable.
	fn read(&self) -> std::sync::RwLockReadGuard<'_, Tokens> {
		self.tokens.read().unwrap_or_else(|e| e.into_inner())
	}

	fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tokens> {
		self.tokens.write().unwrap_or_else(|e| e.into_inner())
	}
}
