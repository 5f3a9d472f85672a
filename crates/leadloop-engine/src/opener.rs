// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The initial-contact flow: from a CRM lead id to one opening message on
//! the next untried number.
//!
//! Every lookup miss short-circuits the flow quietly; a failed send leaves
//! the number untried so the scheduler retries it on a later cycle.

use std::sync::Arc;

use leadloop_core::{CrmClient, LeadloopError, MessageGateway};
use leadloop_storage::queries::{leads, numbers, outbound};
use leadloop_storage::Database;
use tracing::{info, warn};

use crate::compose::MessageComposer;

/// Fallback addressee when no contact name could be resolved.
const DEFAULT_FIRST_NAME: &str = "Cliente";

/// Runs the opening send for one lead.
pub struct InitialContactFlow {
    db: Database,
    crm: Arc<dyn CrmClient>,
    gateway: Arc<dyn MessageGateway>,
    composer: Arc<MessageComposer>,
}

impl InitialContactFlow {
    pub fn new(
        db: Database,
        crm: Arc<dyn CrmClient>,
        gateway: Arc<dyn MessageGateway>,
        composer: Arc<MessageComposer>,
    ) -> Self {
        Self {
            db,
            crm,
            gateway,
            composer,
        }
    }

    /// Contact the next untried number of `crm_lead_id`.
    ///
    /// `name_hint` seeds the addressee name when the CRM contact carries
    /// none (manual dispatches pass one; the scheduler passes `None`).
    pub async fn run(
        &self,
        crm_lead_id: i64,
        name_hint: Option<&str>,
    ) -> Result<(), LeadloopError> {
        let lead = match self.crm.get_lead(crm_lead_id).await {
            Ok(lead) => lead,
            Err(LeadloopError::NotFound { .. }) => {
                warn!(crm_lead_id, "lead not found in CRM, skipping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let region = lead
            .custom_field("uf")
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| outbound::REGION_ANY.to_string());

        let Some(responsible_user_id) = lead.responsible_user_id else {
            warn!(crm_lead_id, "lead has no responsible user, skipping");
            return Ok(());
        };
        let Some(buyer_id) = leads::buyer_local_id(&self.db, responsible_user_id).await? else {
            warn!(crm_lead_id, responsible_user_id, "responsible user is not a known buyer");
            return Ok(());
        };

        let identity = match outbound::select_outbound(&self.db, buyer_id, &region).await {
            Ok(identity) => identity,
            Err(LeadloopError::NotFound { .. }) => {
                warn!(crm_lead_id, buyer_id, region, "no active outbound identity");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // Resolve the contact: addressee name and the raw phone list.
        let mut first_name = name_hint
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_FIRST_NAME.to_string());
        let mut raw_numbers = Vec::new();
        let contact_id = lead.main_contact_id();
        if let Some(contact_id) = contact_id {
            match self.crm.get_contact(contact_id).await {
                Ok(contact) => {
                    if let Some(name) = contact.preferred_first_name() {
                        first_name = name;
                    }
                    raw_numbers = contact.phone_numbers();
                }
                Err(LeadloopError::NotFound { .. }) => {
                    warn!(contact_id, "main contact not found in CRM");
                }
                Err(e) => return Err(e),
            }
        }

        numbers::sync_numbers(&self.db, crm_lead_id, raw_numbers.clone()).await?;

        let Some(destination) = numbers::next_untried(&self.db, crm_lead_id).await? else {
            info!(crm_lead_id, "every known number was already contacted");
            return Ok(());
        };

        let message = self.composer.opening_message(&first_name).await;
        info!(
            crm_lead_id,
            number = destination.number,
            instance = identity.instance_id,
            "sending opening message"
        );

        match self
            .gateway
            .send_text(&destination.number, &message, &identity.instance_id)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                // Number stays untried; the next scheduler cycle retries.
                warn!(crm_lead_id, error = %e, "opening send failed");
                return Ok(());
            }
        }

        leads::record_initial_send(
            &self.db,
            crm_lead_id,
            contact_id,
            Some(buyer_id),
            Some(first_name),
            raw_numbers,
            destination.number,
            message,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadloop_config::model::MaterialConfig;
    use leadloop_core::types::{CrmContact, CrmLead, NumberStatus};
    use leadloop_test_utils::{seed_buyer_with_identity, temp_db, MockClassifier, MockCrm, MockGateway};

    struct Rig {
        db: Database,
        crm: Arc<MockCrm>,
        gateway: Arc<MockGateway>,
        flow: InitialContactFlow,
        _dir: tempfile::TempDir,
    }

    async fn rig() -> Rig {
        let (db, dir) = temp_db().await;
        seed_buyer_with_identity(&db, 11, "Carlos").await;

        let crm = Arc::new(MockCrm::new());
        let gateway = Arc::new(MockGateway::new());
        let composer = Arc::new(MessageComposer::new(
            db.clone(),
            Arc::new(MockClassifier::new()),
            MaterialConfig::default(),
        ));
        let flow = InitialContactFlow::new(db.clone(), crm.clone(), gateway.clone(), composer);

        Rig {
            db,
            crm,
            gateway,
            flow,
            _dir: dir,
        }
    }

    fn lead(id: i64, responsible: i64, contact_id: i64) -> CrmLead {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "responsible_user_id": responsible,
            "custom_fields_values": [
                {"field_name": "uf", "values": [{"value": "MG"}]}
            ],
            "_embedded": {"contacts": [{"id": contact_id, "is_main": true}]}
        }))
        .unwrap()
    }

    fn contact(id: i64, name: &str, phones: &[&str]) -> CrmContact {
        let values: Vec<serde_json::Value> = phones
            .iter()
            .map(|p| serde_json::json!({"value": p}))
            .collect();
        serde_json::from_value(serde_json::json!({
            "id": id,
            "first_name": name,
            "custom_fields_values": [
                {"field_code": "PHONE", "values": values}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn happy_path_sends_and_records() {
        let rig = rig().await;
        rig.crm.put_lead(lead(21500005, 11, 24803037)).await;
        rig.crm
            .put_contact(contact(
                24803037,
                "Francisca",
                &["+55 32 99174-9187", "+55 32 99806-8067"],
            ))
            .await;

        rig.flow.run(21500005, None).await.unwrap();

        let texts = rig.gateway.sent_texts().await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].number, "+5532991749187");
        assert!(texts[0].text.contains("Francisca"));
        assert_eq!(texts[0].instance, "inst-11");

        // First number is awaiting a reply, the second stays queued.
        let ctx = numbers::conversation_context(&rig.db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.status, NumberStatus::AwaitingReply);
        assert_eq!(ctx.history.len(), 1);
        let second = numbers::next_untried(&rig.db, 21500005).await.unwrap().unwrap();
        assert_eq!(second.number, "+5532998068067");
    }

    #[tokio::test]
    async fn second_run_contacts_the_next_number() {
        let rig = rig().await;
        rig.crm.put_lead(lead(21500005, 11, 24803037)).await;
        rig.crm
            .put_contact(contact(
                24803037,
                "Francisca",
                &["+5532991749187", "+5532998068067"],
            ))
            .await;

        rig.flow.run(21500005, None).await.unwrap();
        rig.flow.run(21500005, None).await.unwrap();

        let texts = rig.gateway.sent_texts().await;
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1].number, "+5532998068067");
        assert!(numbers::next_untried(&rig.db, 21500005).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_lead_is_a_quiet_no_op() {
        let rig = rig().await;
        rig.flow.run(404404, None).await.unwrap();
        assert_eq!(rig.gateway.send_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_buyer_skips_sending() {
        let rig = rig().await;
        rig.crm.put_lead(lead(21500005, 999, 24803037)).await;

        rig.flow.run(21500005, None).await.unwrap();
        assert_eq!(rig.gateway.send_count().await, 0);
    }

    #[tokio::test]
    async fn send_failure_leaves_number_untried() {
        let rig = rig().await;
        rig.crm.put_lead(lead(21500005, 11, 24803037)).await;
        rig.crm
            .put_contact(contact(24803037, "Francisca", &["+5532991749187"]))
            .await;
        rig.gateway.fail_text(true);

        rig.flow.run(21500005, None).await.unwrap();

        let untried = numbers::next_untried(&rig.db, 21500005).await.unwrap();
        assert!(untried.is_some(), "failed send must not consume the number");
        let ctx = numbers::conversation_context(&rig.db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.history.is_empty(), "no message recorded on failure");
    }

    #[tokio::test]
    async fn name_hint_is_used_when_contact_has_no_name() {
        let rig = rig().await;
        rig.crm.put_lead(lead(21500005, 11, 24803037)).await;
        rig.crm
            .put_contact(contact(24803037, "", &["+5532991749187"]))
            .await;

        rig.flow.run(21500005, Some("Francisca")).await.unwrap();

        let texts = rig.gateway.sent_texts().await;
        assert!(texts[0].text.contains("Francisca"));
    }
}
