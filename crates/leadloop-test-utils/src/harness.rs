// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database harness and seed helpers.

use leadloop_storage::queries::{leads, outbound};
use leadloop_storage::Database;
use tempfile::TempDir;

/// Open a fresh migrated database in a private temp directory.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn temp_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("leadloop-test.db");
    let db = Database::open(path.to_str().expect("utf-8 path"))
        .await
        .expect("open test database");
    (db, dir)
}

/// Seed one buyer with a single wildcard-region outbound identity.
///
/// Returns (buyer local id, identity instance id).
pub async fn seed_buyer_with_identity(
    db: &Database,
    crm_user_id: i64,
    name: &str,
) -> (i64, String) {
    let buyer_id = leads::insert_buyer(db, crm_user_id, name.to_string())
        .await
        .expect("insert buyer");
    let instance = format!("inst-{crm_user_id}");
    outbound::insert_identity(
        db,
        buyer_id,
        format!("+55119{crm_user_id:08}"),
        instance.clone(),
        outbound::REGION_ANY.to_string(),
    )
    .await
    .expect("insert outbound identity");
    (buyer_id, instance)
}
