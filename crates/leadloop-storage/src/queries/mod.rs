// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod admin;
pub mod leads;
pub mod messages;
pub mod numbers;
pub mod outbound;
pub mod templates;
