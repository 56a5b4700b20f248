// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-owner ordering of asynchronous operations.
//!
//! Every resource wrapper owns a [`Sequencer`]. Mutating methods append a
//! step to it and return immediately, so calls can be written as
//! `project.load(None).set_as_default()` and still execute one after the
//! other. A failed step poisons the chain: later steps are skipped and every
//! waiter sees the same error until [`Sequencer::reset`] is called.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::{ApiError, Result};

type Chain = Shared<BoxFuture<'static, Result<()>>>;

static NEXT_SEQUENCER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
	/// Ids of the sequencers whose step the current task is executing.
	static ACTIVE_SEQUENCERS: Vec<u64>;
}

/// Serializes the operations chained on one owner.
pub struct Sequencer {
	id: u64,
	tail: Mutex<Chain>,
}

impl Sequencer {
	/// Creates a sequencer whose chain is already resolved.
	pub fn new() -> Self {
		Self {
			id: NEXT_SEQUENCER_ID.fetch_add(1, Ordering::Relaxed),
			tail: Mutex::new(resolved()),
		}
	}

	/// Appends `step`; it runs once every earlier step has succeeded.
	///
	/// Inside a Tokio runtime the continuation is spawned right away, so it
	/// completes even if nobody awaits the chain. Outside a runtime it runs
	/// when the chain is first awaited.
	pub fn enqueue<F, Fut>(&self, step: F)
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<()>> + Send + 'static,
	{
		let id = self.id;
		let mut tail = self.lock();
		let previous = tail.clone();

		let next: Chain = async move {
			previous.await?;
			let mut active = ACTIVE_SEQUENCERS
				.try_with(|ids| ids.clone())
				.unwrap_or_default();
			active.push(id);
			ACTIVE_SEQUENCERS.scope(active, step()).await
		}
		.boxed()
		.shared();

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			let driver = next.clone();
			handle.spawn(async move {
				if let Err(e) = driver.await {
					debug!(sequencer = id, error = %e, "Chained step failed");
				}
			});
		}

		*tail = next;
	}

	/// Resolves when every step queued so far has settled.
	pub async fn wait(&self) -> Result<()> {
		if self.is_running_step() {
			return Err(ApiError::SelfReferentialChain);
		}
		let tail = self.lock().clone();
		tail.await
	}

	/// Drops a failed chain so new steps run again.
	pub fn reset(&self) {
		*self.lock() = resolved();
	}

	/// True when called from inside one of this sequencer's own steps.
	pub fn is_running_step(&self) -> bool {
		ACTIVE_SEQUENCERS
			.try_with(|ids| ids.contains(&self.id))
			.unwrap_or(false)
	}

	fn lock(&self) -> MutexGuard<'_, Chain> {
		self.tail.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl Default for Sequencer {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Sequencer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Sequencer").field("id", &self.id).finish()
	}
}

fn resolved() -> Chain {
	future::ready(Ok(())).boxed().shared()
}

/// Fluent access to an owner's [`Sequencer`].
#[async_trait]
pub trait Chained: Clone + Send + Sync + 'static {
	fn sequencer(&self) -> &Sequencer;

	/// Resolves with the owner once its chain drains.
	async fn wait(&self) -> Result<Self> {
		self.sequencer().wait().await?;
		Ok(self.clone())
	}

	/// Runs `on_success` or `on_failure` once the chain settles.
	async fn settle<T, S, F>(&self, on_success: S, on_failure: F) -> T
	where
		T: Send,
		S: FnOnce(Self) -> T + Send,
		F: FnOnce(ApiError, Self) -> T + Send,
	{
		match self.sequencer().wait().await {
			Ok(()) => on_success(self.clone()),
			Err(e) => on_failure(e, self.clone()),
		}
	}

	/// Appends an arbitrary step that receives the owner.
	fn and_then<F, Fut>(&self, step: F) -> &Self
	where
		F: FnOnce(Self) -> Fut + Send + 'static,
		Fut: Future<Output = Result<()>> + Send + 'static,
	{
		let owner = self.clone();
		self.sequencer().enqueue(move || step(owner));
		self
	}

	/// Starts a fresh chain after a failure.
	fn reset_chain(&self) -> &Self {
		self.sequencer().reset();
		self
	}
}
