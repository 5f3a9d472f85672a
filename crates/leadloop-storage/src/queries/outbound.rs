// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound identity selection: round-robin by usage counter with a
//! wildcard-region fallback.

use leadloop_core::types::OutboundIdentity;
use leadloop_core::LeadloopError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// Region value matching any lead region.
pub const REGION_ANY: &str = "all";

/// Register an outbound identity for a buyer. Returns the row id.
pub async fn insert_identity(
    db: &Database,
    buyer_id: i64,
    number: String,
    instance_id: String,
    region: String,
) -> Result<i64, LeadloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO outbound_identities (buyer_id, number, instance_id, region)
                 VALUES (?1, ?2, ?3, ?4)",
                params![buyer_id, number, instance_id, region],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pick the least-used active identity for (buyer, region), falling back to
/// the wildcard region, and bump its usage inside the same transaction.
///
/// The select and the counter increment commit together: two concurrent
/// callers are serialized by the single-writer connection, so neither can
/// observe the other's pick as still least-used.
pub async fn select_outbound(
    db: &Database,
    buyer_id: i64,
    region: &str,
) -> Result<OutboundIdentity, LeadloopError> {
    let region = region.to_string();
    let region_for_err = region.clone();

    let selected = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let pick = |tx: &rusqlite::Transaction<'_>,
                        region: &str|
             -> Result<Option<OutboundIdentity>, rusqlite::Error> {
                tx.query_row(
                    "SELECT id, number, instance_id
                     FROM outbound_identities
                     WHERE buyer_id = ?1 AND region = ?2 AND status = 'active'
                     ORDER BY usage_count ASC, last_used_at ASC
                     LIMIT 1",
                    params![buyer_id, region],
                    |row| {
                        Ok(OutboundIdentity {
                            id: row.get(0)?,
                            number: row.get(1)?,
                            instance_id: row.get(2)?,
                        })
                    },
                )
                .optional()
            };

            let mut found = pick(&tx, &region)?;
            if found.is_none() && region != REGION_ANY {
                found = pick(&tx, REGION_ANY)?;
            }

            if let Some(ref identity) = found {
                tx.execute(
                    "UPDATE outbound_identities
                     SET usage_count = usage_count + 1,
                         last_used_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![identity.id],
                )?;
            }

            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    selected.ok_or_else(|| {
        LeadloopError::not_found(
            "outbound identity",
            format!("buyer={buyer_id} region={region_for_err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::leads;
    use tempfile::tempdir;

    async fn setup() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let buyer_id = leads::insert_buyer(&db, 9001, "Carlos".into()).await.unwrap();
        (db, buyer_id, dir)
    }

    async fn usage_of(db: &Database, id: i64) -> i64 {
        db.connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT usage_count FROM outbound_identities WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn selection_is_fair_round_robin() {
        let (db, buyer_id, _dir) = setup().await;

        let a = insert_identity(&db, buyer_id, "+551100000001".into(), "inst-a".into(), "SP".into())
            .await
            .unwrap();
        let b = insert_identity(&db, buyer_id, "+551100000002".into(), "inst-b".into(), "SP".into())
            .await
            .unwrap();
        let c = insert_identity(&db, buyer_id, "+551100000003".into(), "inst-c".into(), "SP".into())
            .await
            .unwrap();

        // Seed skewed usage counts [0, 1, 2].
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE outbound_identities SET usage_count = 1 WHERE id = ?1",
                    params![b],
                )?;
                conn.execute(
                    "UPDATE outbound_identities SET usage_count = 2 WHERE id = ?1",
                    params![c],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        // Repeated selections return identities in non-decreasing usage order.
        let mut seen_usage = Vec::new();
        for _ in 0..6 {
            let picked = select_outbound(&db, buyer_id, "SP").await.unwrap();
            // usage_count at pick time is the post-increment value minus one.
            seen_usage.push(usage_of(&db, picked.id).await - 1);
        }
        let mut sorted = seen_usage.clone();
        sorted.sort_unstable();
        assert_eq!(seen_usage, sorted, "picks must follow usage order");

        // Seeded 0+1+2 plus six selections.
        let total = usage_of(&db, a).await + usage_of(&db, b).await + usage_of(&db, c).await;
        assert_eq!(total, 9);
    }

    #[tokio::test]
    async fn wildcard_fallback_when_region_missing() {
        let (db, buyer_id, _dir) = setup().await;

        insert_identity(
            &db,
            buyer_id,
            "+551100000009".into(),
            "inst-any".into(),
            REGION_ANY.into(),
        )
        .await
        .unwrap();

        let picked = select_outbound(&db, buyer_id, "SP").await.unwrap();
        assert_eq!(picked.instance_id, "inst-any");
    }

    #[tokio::test]
    async fn region_match_wins_over_wildcard() {
        let (db, buyer_id, _dir) = setup().await;

        insert_identity(&db, buyer_id, "+551100000001".into(), "inst-sp".into(), "SP".into())
            .await
            .unwrap();
        insert_identity(
            &db,
            buyer_id,
            "+551100000009".into(),
            "inst-any".into(),
            REGION_ANY.into(),
        )
        .await
        .unwrap();

        let picked = select_outbound(&db, buyer_id, "SP").await.unwrap();
        assert_eq!(picked.instance_id, "inst-sp");
    }

    #[tokio::test]
    async fn no_identity_is_not_found() {
        let (db, buyer_id, _dir) = setup().await;

        let err = select_outbound(&db, buyer_id, "SP").await.unwrap_err();
        assert!(matches!(err, LeadloopError::NotFound { .. }));
    }

    #[tokio::test]
    async fn inactive_identities_are_skipped() {
        let (db, buyer_id, _dir) = setup().await;

        let id = insert_identity(
            &db,
            buyer_id,
            "+551100000001".into(),
            "inst-off".into(),
            "SP".into(),
        )
        .await
        .unwrap();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE outbound_identities SET status = 'inactive' WHERE id = ?1",
                    params![id],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        assert!(select_outbound(&db, buyer_id, "SP").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_selection_increments_exactly_once_each() {
        let (db, buyer_id, _dir) = setup().await;

        let id = insert_identity(
            &db,
            buyer_id,
            "+551100000001".into(),
            "inst-a".into(),
            "SP".into(),
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                select_outbound(&db, buyer_id, "SP").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(usage_of(&db, id).await, 10);
    }
}
