// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destructive maintenance operations for test environments.

use leadloop_core::LeadloopError;
use tracing::warn;

use crate::database::Database;

/// Delete every conversation row: messages, contact numbers, leads.
///
/// Buyers, outbound identities, and templates survive, so a test
/// environment keeps its seed data. The HTTP surface exposing this refuses
/// to run unless `server.allow_reset` is set.
pub async fn reset_conversation_data(db: &Database) -> Result<(), LeadloopError> {
    warn!("resetting all conversation data");
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages", [])?;
            tx.execute("DELETE FROM contact_numbers", [])?;
            tx.execute("DELETE FROM leads", [])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
