// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRM REST client for the leadloop qualification bot.
//!
//! Implements [`CrmClient`](leadloop_core::CrmClient) against a
//! Kommo-v4-shaped API: lead and contact reads, pipeline stage updates,
//! and plain-text notes. Transient failures (429/5xx, transport errors)
//! retry with bounded exponential backoff.

pub mod client;

pub use client::CrmHttpClient;
