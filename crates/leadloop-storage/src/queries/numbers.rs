// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Number rotation bookkeeping: which numbers have been tried, which lead
//! to contact next, and whether a lead is exhausted.

use leadloop_core::phone;
use leadloop_core::types::{ChatMessage, NumberStatus, Sender};
use leadloop_core::LeadloopError;
use rusqlite::{params, OptionalExtension};

use crate::database::{column_parse_err, Database};
use crate::models::{ContactNumber, ConversationContext, PendingLead};

fn read_contact_number(row: &rusqlite::Row<'_>) -> Result<ContactNumber, rusqlite::Error> {
    let status_text: String = row.get(3)?;
    Ok(ContactNumber {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        number: row.get(2)?,
        status: status_text
            .parse::<NumberStatus>()
            .map_err(|e| column_parse_err(3, e))?,
        created_at: row.get(4)?,
    })
}

/// Register every plausible number of a lead, creating the lead row when it
/// does not exist yet. New numbers enter as `untried`; duplicates are
/// ignored, so calling twice with the same list is a no-op. Returns the
/// local lead id.
pub async fn sync_numbers(
    db: &Database,
    crm_lead_id: i64,
    raw_numbers: Vec<String>,
) -> Result<i64, LeadloopError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let lead_id: i64 = match tx
                .query_row(
                    "SELECT id FROM leads WHERE crm_lead_id = ?1",
                    params![crm_lead_id],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(id) => id,
                None => {
                    tx.execute(
                        "INSERT INTO leads (crm_lead_id) VALUES (?1)",
                        params![crm_lead_id],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            for raw in &raw_numbers {
                let normalized = phone::normalize(raw);
                if phone::is_plausible(&normalized) {
                    tx.execute(
                        "INSERT OR IGNORE INTO contact_numbers (lead_id, number, status)
                         VALUES (?1, ?2, 'untried')",
                        params![lead_id, normalized],
                    )?;
                }
            }

            tx.commit()?;
            Ok(lead_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The earliest-inserted number of a lead still in `untried`, if any.
pub async fn next_untried(
    db: &Database,
    crm_lead_id: i64,
) -> Result<Option<ContactNumber>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT cn.id, cn.lead_id, cn.number, cn.status, cn.created_at
                 FROM contact_numbers cn
                 JOIN leads l ON cn.lead_id = l.id
                 WHERE l.crm_lead_id = ?1 AND cn.status = 'untried'
                 ORDER BY cn.id ASC
                 LIMIT 1",
                params![crm_lead_id],
                read_contact_number,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The oldest in-progress lead that still has an untried number, if any.
pub async fn dequeue_pending(db: &Database) -> Result<Option<PendingLead>, LeadloopError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT l.id, l.crm_lead_id
                 FROM contact_numbers cn
                 JOIN leads l ON cn.lead_id = l.id
                 WHERE l.status = 'in_progress' AND cn.status = 'untried'
                 ORDER BY l.created_at ASC, l.id ASC
                 LIMIT 1",
                [],
                |row| {
                    Ok(PendingLead {
                        lead_id: row.get(0)?,
                        crm_lead_id: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a number's status unconditionally.
pub async fn set_status(
    db: &Database,
    number_id: i64,
    status: NumberStatus,
) -> Result<(), LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contact_numbers SET status = ?1 WHERE id = ?2",
                params![status.to_string(), number_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a number from `awaiting_reply` to `in_progress` when the user
/// answers. A no-op in any other state, so classification outcomes are
/// never overwritten by late fragments.
pub async fn mark_replied(db: &Database, number_id: i64) -> Result<(), LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contact_numbers SET status = 'in_progress'
                 WHERE id = ?1 AND status = 'awaiting_reply'",
                params![number_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether every number of a lead reached a terminal status.
///
/// A lead with zero numbers is NOT exhausted: finalization must wait until
/// at least one number was synced and resolved.
pub async fn is_exhausted(db: &Database, lead_id: i64) -> Result<bool, LeadloopError> {
    db.connection()
        .call(move |conn| {
            let (total, open): (i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        SUM(CASE WHEN status IN ('untried', 'awaiting_reply', 'in_progress')
                                 THEN 1 ELSE 0 END)
                 FROM contact_numbers WHERE lead_id = ?1",
                params![lead_id],
                |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0))),
            )?;
            Ok(total > 0 && open == 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve an inbound sender to its lead, number row, current status, and
/// conversation history.
///
/// `remote_digits` is the sender's number without `+`. Brazilian numbers
/// stored with the mobile ninth digit may arrive without it over WhatsApp,
/// so a 12-digit `55`-prefixed number is also matched against the variant
/// with a `9` inserted after the area code.
pub async fn conversation_context(
    db: &Database,
    remote_digits: &str,
) -> Result<Option<ConversationContext>, LeadloopError> {
    let primary = format!("+{remote_digits}");
    let alternative = if remote_digits.starts_with("55") && remote_digits.len() == 12 {
        Some(format!(
            "+{}9{}",
            &remote_digits[0..4],
            &remote_digits[4..]
        ))
    } else {
        None
    };

    db.connection()
        .call(move |conn| {
            let found = conn
                .query_row(
                    "SELECT cn.id, cn.lead_id, cn.number, cn.status
                     FROM contact_numbers cn
                     WHERE TRIM(cn.number) = ?1 OR TRIM(cn.number) = ?2
                     LIMIT 1",
                    params![primary, alternative],
                    |row| {
                        let status_text: String = row.get(3)?;
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            status_text
                                .parse::<NumberStatus>()
                                .map_err(|e| column_parse_err(3, e))?,
                        ))
                    },
                )
                .optional()?;

            let Some((number_id, lead_id, number, status)) = found else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT sender, content FROM messages
                 WHERE number_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let history = stmt
                .query_map(params![number_id], |row| {
                    let sender_text: String = row.get(0)?;
                    Ok(ChatMessage {
                        sender: sender_text
                            .parse::<Sender>()
                            .map_err(|e| column_parse_err(0, e))?,
                        content: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(ConversationContext {
                lead_id,
                number_id,
                number,
                status,
                history,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{leads, messages};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn sync_is_idempotent_per_normalized_number() {
        let (db, _dir) = setup_db().await;

        let raw = vec![
            "+55 32 99174-9187".to_string(),
            "55 (32) 99174 9187".to_string(), // same number, different formatting
            "+5532998068067".to_string(),
        ];
        let lead_id = sync_numbers(&db, 100, raw.clone()).await.unwrap();
        sync_numbers(&db, 100, raw).await.unwrap();

        let count: i64 = db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM contact_numbers WHERE lead_id = ?1",
                    params![lead_id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        // Three raw entries, two distinct normalized numbers, synced twice.
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn sync_skips_implausible_numbers() {
        let (db, _dir) = setup_db().await;

        let lead_id = sync_numbers(
            &db,
            100,
            vec!["ramal 123".into(), "".into(), "+5532991749187".into()],
        )
        .await
        .unwrap();

        let count: i64 = db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM contact_numbers WHERE lead_id = ?1",
                    params![lead_id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn next_untried_returns_earliest_inserted() {
        let (db, _dir) = setup_db().await;

        sync_numbers(
            &db,
            100,
            vec!["+5532991749187".into(), "+5532998068067".into()],
        )
        .await
        .unwrap();

        let first = next_untried(&db, 100).await.unwrap().unwrap();
        assert_eq!(first.number, "+5532991749187");

        set_status(&db, first.id, NumberStatus::AwaitingReply)
            .await
            .unwrap();
        let second = next_untried(&db, 100).await.unwrap().unwrap();
        assert_eq!(second.number, "+5532998068067");

        set_status(&db, second.id, NumberStatus::Denied).await.unwrap();
        assert!(next_untried(&db, 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dequeue_pending_prefers_oldest_lead() {
        let (db, _dir) = setup_db().await;

        // Older lead inserted with an explicit past creation time.
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO leads (crm_lead_id, created_at)
                     VALUES (1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-2 hours'))",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        sync_numbers(&db, 1, vec!["+5532991749187".into()]).await.unwrap();
        sync_numbers(&db, 2, vec!["+5532998068067".into()]).await.unwrap();

        let pending = dequeue_pending(&db).await.unwrap().unwrap();
        assert_eq!(pending.crm_lead_id, 1);
    }

    #[tokio::test]
    async fn dequeue_pending_requires_untried_number() {
        let (db, _dir) = setup_db().await;

        // A lead whose only number is already awaiting a reply is not pending.
        sync_numbers(&db, 1, vec!["+5532991749187".into()]).await.unwrap();
        let n = next_untried(&db, 1).await.unwrap().unwrap();
        set_status(&db, n.id, NumberStatus::AwaitingReply)
            .await
            .unwrap();

        assert!(dequeue_pending(&db).await.unwrap().is_none());

        // A concluded lead with untried numbers is not pending either.
        let lead_id = sync_numbers(&db, 2, vec!["+5532998068067".into()])
            .await
            .unwrap();
        leads::mark_concluded(&db, lead_id).await.unwrap();
        assert!(dequeue_pending(&db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exhaustion_guard_for_zero_numbers() {
        let (db, _dir) = setup_db().await;

        let empty_lead = leads::upsert_lead(&db, 1, None, None, None).await.unwrap();
        assert!(!is_exhausted(&db, empty_lead).await.unwrap());

        let lead_id = sync_numbers(&db, 2, vec!["+5532991749187".into()])
            .await
            .unwrap();
        assert!(!is_exhausted(&db, lead_id).await.unwrap());

        let n = next_untried(&db, 2).await.unwrap().unwrap();
        set_status(&db, n.id, NumberStatus::FakeMismatch)
            .await
            .unwrap();
        assert!(is_exhausted(&db, lead_id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_replied_only_transitions_awaiting() {
        let (db, _dir) = setup_db().await;

        sync_numbers(&db, 1, vec!["+5532991749187".into()]).await.unwrap();
        let n = next_untried(&db, 1).await.unwrap().unwrap();

        // Untried stays untried.
        mark_replied(&db, n.id).await.unwrap();
        let ctx = conversation_context(&db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.status, NumberStatus::Untried);

        set_status(&db, n.id, NumberStatus::AwaitingReply)
            .await
            .unwrap();
        mark_replied(&db, n.id).await.unwrap();
        let ctx = conversation_context(&db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.status, NumberStatus::InProgress);

        // Terminal statuses are never overwritten by a late reply.
        set_status(&db, n.id, NumberStatus::Confirmed).await.unwrap();
        mark_replied(&db, n.id).await.unwrap();
        let ctx = conversation_context(&db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.status, NumberStatus::Confirmed);
    }

    #[tokio::test]
    async fn context_matches_brazilian_ninth_digit_variant() {
        let (db, _dir) = setup_db().await;

        // Stored with the ninth digit; the sender arrives without it.
        sync_numbers(&db, 1, vec!["+5532991749187".into()]).await.unwrap();
        let ctx = conversation_context(&db, "553291749187").await.unwrap();
        assert!(ctx.is_some(), "12-digit variant should match stored number");

        assert!(conversation_context(&db, "551199998888")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn context_history_is_chronological() {
        let (db, _dir) = setup_db().await;

        sync_numbers(&db, 1, vec!["+5532991749187".into()]).await.unwrap();
        let n = next_untried(&db, 1).await.unwrap().unwrap();
        messages::insert_message(&db, n.id, Sender::Agent, "Bom dia, Francisca.")
            .await
            .unwrap();
        messages::insert_message(&db, n.id, Sender::User, "quem fala?")
            .await
            .unwrap();

        let ctx = conversation_context(&db, "5532991749187")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.history[0].sender, Sender::Agent);
        assert_eq!(ctx.history[1].sender, Sender::User);
        assert_eq!(ctx.history[1].content, "quem fala?");
    }
}
