// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server for the leadloop qualification bot.
//!
//! Receives the two inbound triggers — CRM lead events and gateway message
//! events — and dispatches each onto an independent background task so the
//! HTTP response returns immediately. Also exposes a liveness endpoint and
//! the guarded test-environment reset.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, AppState, ServerConfig};
