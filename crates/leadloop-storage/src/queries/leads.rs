// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead lifecycle operations: upsert, conclusion, scheduler sweeps, and the
//! initial-send transaction.

use leadloop_core::phone;
use leadloop_core::types::Sender;
use leadloop_core::LeadloopError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::LeadRef;

/// Insert or refresh a lead keyed by its CRM id. Returns the local row id.
///
/// A lead that already reached `concluded` stays concluded no matter what
/// the caller passes; everything else about the row is refreshed with any
/// non-null incoming values.
pub async fn upsert_lead(
    db: &Database,
    crm_lead_id: i64,
    crm_contact_id: Option<i64>,
    buyer_id: Option<i64>,
    contact_name: Option<String>,
) -> Result<i64, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads (crm_lead_id, crm_contact_id, buyer_id, contact_name, status)
                 VALUES (?1, ?2, ?3, ?4, 'in_progress')
                 ON CONFLICT(crm_lead_id) DO UPDATE SET
                     crm_contact_id = COALESCE(excluded.crm_contact_id, crm_contact_id),
                     buyer_id = COALESCE(excluded.buyer_id, buyer_id),
                     contact_name = COALESCE(excluded.contact_name, contact_name),
                     status = CASE WHEN leads.status = 'concluded'
                                   THEN leads.status ELSE excluded.status END",
                params![crm_lead_id, crm_contact_id, buyer_id, contact_name],
            )?;
            conn.query_row(
                "SELECT id FROM leads WHERE crm_lead_id = ?1",
                params![crm_lead_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Local row id for a CRM lead id, if the lead is known.
pub async fn local_id_for(db: &Database, crm_lead_id: i64) -> Result<Option<i64>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id FROM leads WHERE crm_lead_id = ?1",
                params![crm_lead_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// CRM lead id for a local row id.
pub async fn crm_id_for(db: &Database, lead_id: i64) -> Result<Option<i64>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT crm_lead_id FROM leads WHERE id = ?1",
                params![lead_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The lead's stored contact display name.
pub async fn contact_name_for(
    db: &Database,
    lead_id: i64,
) -> Result<Option<String>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT contact_name FROM leads WHERE id = ?1",
                params![lead_id],
                |row| row.get(0),
            )
            .optional()
            .map(Option::flatten)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Name of the buyer responsible for a lead, via the buyers table.
pub async fn buyer_name_for_lead(
    db: &Database,
    lead_id: i64,
) -> Result<Option<String>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT b.name FROM leads l
                 JOIN buyers b ON l.buyer_id = b.id
                 WHERE l.id = ?1",
                params![lead_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Local buyer id for a CRM responsible-user id.
pub async fn buyer_local_id(
    db: &Database,
    crm_user_id: i64,
) -> Result<Option<i64>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id FROM buyers WHERE crm_user_id = ?1",
                params![crm_user_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Register a buyer (owning agent). Returns the local id.
pub async fn insert_buyer(
    db: &Database,
    crm_user_id: i64,
    name: String,
) -> Result<i64, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO buyers (crm_user_id, name) VALUES (?1, ?2)
                 ON CONFLICT(crm_user_id) DO UPDATE SET name = excluded.name",
                params![crm_user_id, name],
            )?;
            conn.query_row(
                "SELECT id FROM buyers WHERE crm_user_id = ?1",
                params![crm_user_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Soft-terminate a lead.
pub async fn mark_concluded(db: &Database, lead_id: i64) -> Result<(), LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = 'concluded' WHERE id = ?1",
                params![lead_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Leads whose every contact number reached a terminal status.
///
/// The JOIN keeps leads with zero synced numbers out of the result: a fresh
/// lead whose numbers have not arrived yet must never be auto-closed.
pub async fn leads_to_finalize(db: &Database) -> Result<Vec<LeadRef>, LeadloopError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id, l.crm_lead_id
                 FROM leads l
                 JOIN contact_numbers cn ON cn.lead_id = l.id
                 WHERE l.status = 'in_progress'
                 GROUP BY l.id, l.crm_lead_id
                 HAVING SUM(CASE WHEN cn.status IN ('untried', 'awaiting_reply', 'in_progress')
                                 THEN 1 ELSE 0 END) = 0",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(LeadRef {
                    id: row.get(0)?,
                    crm_lead_id: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Leads created more than `ttl_hours` ago that are not yet concluded.
pub async fn leads_expired(db: &Database, ttl_hours: i64) -> Result<Vec<LeadRef>, LeadloopError> {
    let cutoff_modifier = format!("-{ttl_hours} hours");
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, crm_lead_id FROM leads
                 WHERE status != 'concluded'
                   AND created_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
            )?;
            let rows = stmt.query_map(params![cutoff_modifier], |row| {
                Ok(LeadRef {
                    id: row.get(0)?,
                    crm_lead_id: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a successful opening send in one transaction: upsert the lead,
/// register every known number, store the agent message, and move the used
/// number to `awaiting_reply`.
#[allow(clippy::too_many_arguments)]
pub async fn record_initial_send(
    db: &Database,
    crm_lead_id: i64,
    crm_contact_id: Option<i64>,
    buyer_id: Option<i64>,
    contact_name: Option<String>,
    known_numbers: Vec<String>,
    used_number: String,
    message_text: String,
) -> Result<(), LeadloopError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO leads (crm_lead_id, crm_contact_id, buyer_id, contact_name, status)
                 VALUES (?1, ?2, ?3, ?4, 'in_progress')
                 ON CONFLICT(crm_lead_id) DO UPDATE SET
                     crm_contact_id = COALESCE(excluded.crm_contact_id, crm_contact_id),
                     buyer_id = COALESCE(excluded.buyer_id, buyer_id),
                     contact_name = COALESCE(excluded.contact_name, contact_name),
                     status = CASE WHEN leads.status = 'concluded'
                                   THEN leads.status ELSE excluded.status END",
                params![crm_lead_id, crm_contact_id, buyer_id, contact_name],
            )?;
            let lead_id: i64 = tx.query_row(
                "SELECT id FROM leads WHERE crm_lead_id = ?1",
                params![crm_lead_id],
                |row| row.get(0),
            )?;

            for raw in &known_numbers {
                let normalized = phone::normalize(raw);
                if phone::is_plausible(&normalized) {
                    tx.execute(
                        "INSERT OR IGNORE INTO contact_numbers (lead_id, number) VALUES (?1, ?2)",
                        params![lead_id, normalized],
                    )?;
                }
            }

            let used = phone::normalize(&used_number);
            tx.execute(
                "INSERT OR IGNORE INTO contact_numbers (lead_id, number) VALUES (?1, ?2)",
                params![lead_id, used],
            )?;
            let number_id: i64 = tx.query_row(
                "SELECT id FROM contact_numbers WHERE lead_id = ?1 AND number = ?2",
                params![lead_id, used],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO messages (number_id, sender, content) VALUES (?1, ?2, ?3)",
                params![number_id, Sender::Agent.to_string(), message_text],
            )?;
            tx.execute(
                "UPDATE contact_numbers SET status = 'awaiting_reply' WHERE id = ?1",
                params![number_id],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
