// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRM collaborator trait: lead/contact lookup, pipeline stage, notes.

use async_trait::async_trait;

use crate::error::LeadloopError;
use crate::types::{CrmContact, CrmLead};

/// Client for the CRM holding lead and contact records.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Fetch a lead with its embedded contacts.
    async fn get_lead(&self, lead_id: i64) -> Result<CrmLead, LeadloopError>;

    /// Fetch a contact, including its phone custom fields.
    async fn get_contact(&self, contact_id: i64) -> Result<CrmContact, LeadloopError>;

    /// Move a lead to another pipeline stage.
    async fn update_lead_stage(&self, lead_id: i64, stage_id: i64) -> Result<(), LeadloopError>;

    /// Attach a plain-text note to a lead.
    async fn create_note(&self, lead_id: i64, text: &str) -> Result<(), LeadloopError>;
}
