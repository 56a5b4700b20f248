// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client construction for the GDC SDK.
//!
//! Every client built here carries the SDK User-Agent so server-side request
//! logs (and the `X-GDC-Request` id they hand back) can be tied to a build.

mod client;

pub use client::{builder, builder_with_user_agent, user_agent};
