// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits for the external collaborators.
//!
//! The engine only ever talks to the CRM, the messaging gateway, and the
//! classifier through these traits, so the state machine can be exercised
//! with deterministic fakes. All traits use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod classifier;
pub mod crm;
pub mod messaging;
pub mod transcriber;

pub use classifier::IntentClassifier;
pub use crm::CrmClient;
pub use messaging::MessageGateway;
pub use transcriber::AudioTranscriber;
