// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template selection with usage balancing.
//!
//! Several template variants can exist per kind; picking the least-used one
//! spreads wording across conversations the same way outbound identities
//! rotate.

use leadloop_core::LeadloopError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// Register a template variant. Returns the row id.
pub async fn insert_template(
    db: &Database,
    kind: &str,
    body: &str,
) -> Result<i64, LeadloopError> {
    let kind = kind.to_string();
    let body = body.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_templates (kind, body) VALUES (?1, ?2)",
                params![kind, body],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the least-used active template of a kind and bump its usage in the
/// same transaction. `None` when the kind has no active template; callers
/// fall back to built-in wording.
pub async fn fetch_balanced(db: &Database, kind: &str) -> Result<Option<String>, LeadloopError> {
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let found: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, body FROM message_templates
                     WHERE kind = ?1 AND status = 'active'
                     ORDER BY usage_count ASC, id ASC
                     LIMIT 1",
                    params![kind],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let body = match found {
                Some((id, body)) => {
                    tx.execute(
                        "UPDATE message_templates SET usage_count = usage_count + 1
                         WHERE id = ?1",
                        params![id],
                    )?;
                    Some(body)
                }
                None => None,
            };

            tx.commit()?;
            Ok(body)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
