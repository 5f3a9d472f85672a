// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock CRM client for deterministic testing.
//!
//! Leads and contacts are scripted up front; stage updates and notes are
//! captured for assertions. Individual operations can be made to fail to
//! exercise error isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadloop_core::types::{CrmContact, CrmLead};
use leadloop_core::{CrmClient, LeadloopError};

/// A mock CRM with scripted records and captured mutations.
#[derive(Default)]
pub struct MockCrm {
    leads: Mutex<HashMap<i64, CrmLead>>,
    contacts: Mutex<HashMap<i64, CrmContact>>,
    stage_updates: Arc<Mutex<Vec<(i64, i64)>>>,
    notes: Arc<Mutex<Vec<(i64, String)>>>,
    fail_stage_updates: AtomicBool,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a lead response.
    pub async fn put_lead(&self, lead: CrmLead) {
        self.leads.lock().await.insert(lead.id, lead);
    }

    /// Script a contact response.
    pub async fn put_contact(&self, contact: CrmContact) {
        self.contacts.lock().await.insert(contact.id, contact);
    }

    /// Make every `update_lead_stage` call fail until reset.
    pub fn fail_stage_updates(&self, fail: bool) {
        self.fail_stage_updates.store(fail, Ordering::SeqCst);
    }

    /// All captured (lead_id, stage_id) stage updates.
    pub async fn stage_updates(&self) -> Vec<(i64, i64)> {
        self.stage_updates.lock().await.clone()
    }

    /// All captured (lead_id, text) notes.
    pub async fn notes(&self) -> Vec<(i64, String)> {
        self.notes.lock().await.clone()
    }
}

#[async_trait]
impl CrmClient for MockCrm {
    async fn get_lead(&self, lead_id: i64) -> Result<CrmLead, LeadloopError> {
        self.leads
            .lock()
            .await
            .get(&lead_id)
            .cloned()
            .ok_or_else(|| LeadloopError::not_found("lead", lead_id))
    }

    async fn get_contact(&self, contact_id: i64) -> Result<CrmContact, LeadloopError> {
        self.contacts
            .lock()
            .await
            .get(&contact_id)
            .cloned()
            .ok_or_else(|| LeadloopError::not_found("contact", contact_id))
    }

    async fn update_lead_stage(&self, lead_id: i64, stage_id: i64) -> Result<(), LeadloopError> {
        if self.fail_stage_updates.load(Ordering::SeqCst) {
            return Err(LeadloopError::Crm {
                message: "mock stage update failure".into(),
                source: None,
            });
        }
        self.stage_updates.lock().await.push((lead_id, stage_id));
        Ok(())
    }

    async fn create_note(&self, lead_id: i64, text: &str) -> Result<(), LeadloopError> {
        self.notes.lock().await.push((lead_id, text.to_string()));
        Ok(())
    }
}
