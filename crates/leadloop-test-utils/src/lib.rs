// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for leadloop integration tests.
//!
//! Deterministic mocks for the three external collaborators plus a temp-DB
//! harness, so engine and end-to-end tests run without any network or a
//! real database file.

pub mod harness;
pub mod mock_classifier;
pub mod mock_crm;
pub mod mock_gateway;

pub use harness::{seed_buyer_with_identity, temp_db};
pub use mock_classifier::MockClassifier;
pub use mock_crm::MockCrm;
pub use mock_gateway::MockGateway;
