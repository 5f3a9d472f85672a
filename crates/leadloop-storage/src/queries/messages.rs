// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation message operations. Messages are append-only; their
//! insertion order defines the transcript fed to the classifier.

use leadloop_core::types::{ChatMessage, Sender};
use leadloop_core::LeadloopError;
use rusqlite::params;

use crate::database::{column_parse_err, Database};

/// Append a message to a number's conversation.
pub async fn insert_message(
    db: &Database,
    number_id: i64,
    sender: Sender,
    content: &str,
) -> Result<i64, LeadloopError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (number_id, sender, content) VALUES (?1, ?2, ?3)",
                params![number_id, sender.to_string(), content],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The full conversation for a number, oldest first.
pub async fn history_for_number(
    db: &Database,
    number_id: i64,
) -> Result<Vec<ChatMessage>, LeadloopError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT sender, content FROM messages
                 WHERE number_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![number_id], |row| {
                let sender_text: String = row.get(0)?;
                Ok(ChatMessage {
                    sender: sender_text
                        .parse::<Sender>()
                        .map_err(|e| column_parse_err(0, e))?,
                    content: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::numbers;
    use tempfile::tempdir;

    #[tokio::test]
    async fn insert_and_read_back_in_order() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        numbers::sync_numbers(&db, 1, vec!["+5532991749187".into()])
            .await
            .unwrap();
        let n = numbers::next_untried(&db, 1).await.unwrap().unwrap();

        insert_message(&db, n.id, Sender::Agent, "Bom dia.").await.unwrap();
        insert_message(&db, n.id, Sender::User, "oi").await.unwrap();
        insert_message(&db, n.id, Sender::User, "quem fala?").await.unwrap();

        let history = history_for_number(&db, n.id).await.unwrap();
        assert_eq!(
            history
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>(),
            vec!["Bom dia.", "oi", "quem fala?"]
        );
    }
}
