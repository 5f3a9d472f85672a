// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across leadloop crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a lead.
///
/// Leads are never deleted; `Concluded` is the soft-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    InProgress,
    Concluded,
}

/// Status of a single contact number under a lead.
///
/// `Untried`, `AwaitingReply`, and `InProgress` are the open states; every
/// other status is terminal for that number. A lead is exhausted iff none of
/// its numbers is in an open state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NumberStatus {
    Untried,
    AwaitingReply,
    InProgress,
    Confirmed,
    Objection,
    Denied,
    FakeMismatch,
    Relative,
}

impl NumberStatus {
    /// Whether this status still allows further contact on the number.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            NumberStatus::Untried | NumberStatus::AwaitingReply | NumberStatus::InProgress
        )
    }
}

/// Who authored a stored conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Agent,
    User,
}

/// Intent category returned by the classifier.
///
/// Closed set. Anything the classifier produces outside this set is mapped
/// to `Unclassified` at the classifier boundary, never surfaced as an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Confirmation,
    Objection,
    Denial,
    Relative,
    Neutral,
    Unclassified,
}

/// Grammatical gender used for pronoun agreement in templated messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

/// Identifier assigned by the messaging gateway to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// One entry of a stored conversation history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
}

/// The debounced unit of work handed to the reply router.
///
/// Built when an inbound message passes the status gate; the debouncer
/// replaces it wholesale on each new fragment so the freshest metadata
/// (gateway instance, profile name) wins.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    /// Local lead row id.
    pub lead_id: i64,
    /// Local contact-number row id.
    pub number_id: i64,
    /// Sender number, digits only, no leading `+`.
    pub remote_number: String,
    /// The (possibly debounce-joined) inbound message text.
    pub message: String,
    /// Conversation history for this number, oldest first.
    pub history: Vec<ChatMessage>,
    /// Gateway instance the message arrived on.
    pub instance_id: String,
    /// WhatsApp profile display name, when the gateway provided one.
    pub profile_name: Option<String>,
}

/// An outbound phone identity selected for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundIdentity {
    pub id: i64,
    pub number: String,
    pub instance_id: String,
}

// --- CRM data transfer types ---

/// A custom field value group as the CRM returns it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomFieldValues {
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub field_code: Option<String>,
    #[serde(default)]
    pub values: Vec<CustomValue>,
}

/// A single custom field value. The CRM serializes these as strings or
/// numbers depending on field type, so the raw JSON value is kept.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomValue {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl CustomValue {
    /// Render the value as a plain string, without JSON quoting.
    pub fn as_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Contact reference embedded in a lead response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddedContact {
    pub id: i64,
    #[serde(default)]
    pub is_main: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrmLeadEmbedded {
    #[serde(default)]
    pub contacts: Vec<EmbeddedContact>,
}

/// A lead as returned by the CRM, with embedded contacts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmLead {
    pub id: i64,
    #[serde(default)]
    pub responsible_user_id: Option<i64>,
    #[serde(default)]
    pub custom_fields_values: Option<Vec<CustomFieldValues>>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<CrmLeadEmbedded>,
}

impl CrmLead {
    /// Look up a custom field by its display name.
    pub fn custom_field(&self, name: &str) -> Option<String> {
        self.custom_fields_values
            .as_deref()?
            .iter()
            .find(|f| f.field_name.as_deref() == Some(name))?
            .values
            .first()?
            .as_text()
    }

    /// The id of the lead's main embedded contact, if any.
    pub fn main_contact_id(&self) -> Option<i64> {
        self.embedded
            .as_ref()?
            .contacts
            .iter()
            .find(|c| c.is_main)
            .map(|c| c.id)
    }
}

/// A contact as returned by the CRM.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmContact {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub custom_fields_values: Option<Vec<CustomFieldValues>>,
}

impl CrmContact {
    /// The first name to address the contact by: the `primeiro_nome` custom
    /// field when present, otherwise the CRM's own first name field.
    pub fn preferred_first_name(&self) -> Option<String> {
        let custom = self
            .custom_fields_values
            .as_deref()
            .and_then(|fields| {
                fields
                    .iter()
                    .find(|f| f.field_name.as_deref() == Some("primeiro_nome"))
            })
            .and_then(|f| f.values.first())
            .and_then(CustomValue::as_text)
            .filter(|s| !s.is_empty());
        custom.or_else(|| self.first_name.clone().filter(|s| !s.is_empty()))
    }

    /// All raw phone values carried by `PHONE`-coded custom fields.
    pub fn phone_numbers(&self) -> Vec<String> {
        self.custom_fields_values
            .as_deref()
            .into_iter()
            .flatten()
            .filter(|f| f.field_code.as_deref() == Some("PHONE"))
            .flat_map(|f| f.values.iter())
            .filter_map(CustomValue::as_text)
            .collect()
    }
}
