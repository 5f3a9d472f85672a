// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Status columns are stored as text but surface as the typed enums from
//! `leadloop-core`; a row with an unparseable status is a conversion error,
//! never a silent default.

use leadloop_core::types::{LeadStatus, NumberStatus, Sender};

/// A lead row. `crm_lead_id` is the external CRM identifier; `id` is local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub id: i64,
    pub crm_lead_id: i64,
    pub crm_contact_id: Option<i64>,
    pub buyer_id: Option<i64>,
    pub contact_name: Option<String>,
    pub status: LeadStatus,
    pub created_at: String,
}

/// A phone number belonging to a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNumber {
    pub id: i64,
    pub lead_id: i64,
    pub number: String,
    pub status: NumberStatus,
    pub created_at: String,
}

/// One stored conversation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub number_id: i64,
    pub sender: Sender,
    pub content: String,
    pub created_at: String,
}

/// Local/external id pair for scheduler sweeps (finalize, expire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadRef {
    pub id: i64,
    pub crm_lead_id: i64,
}

/// A lead dequeued for the next initial-contact attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLead {
    pub lead_id: i64,
    pub crm_lead_id: i64,
}

/// Everything the reply pipeline needs to know about an inbound sender.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub lead_id: i64,
    pub number_id: i64,
    pub number: String,
    pub status: NumberStatus,
    pub history: Vec<leadloop_core::ChatMessage>,
}
