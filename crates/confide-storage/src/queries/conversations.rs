// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use confide_core::ConfideError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Conversation, ConversationId, OwnerId};

const SELECT_COLUMNS: &str = "SELECT id, owner_id, title, history, memo, created_at FROM conversation";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        owner_id: OwnerId(row.get(1)?),
        title: row.get(2)?,
        history: row.get(3)?,
        memo: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Turn a zero-row update into `NotFound`.
fn require_changed(changed: usize, id: &str) -> Result<(), ConfideError> {
    if changed == 0 {
        Err(ConfideError::conversation_not_found(id))
    } else {
        Ok(())
    }
}

/// Create a new conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), ConfideError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation (id, owner_id, title, history, memo, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![c.id.0, c.owner_id.0, c.title, c.history, c.memo, c.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<Conversation>, ConfideError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_conversation) {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List an owner's conversations, newest first.
///
/// Rows created within the same millisecond keep insertion order via rowid.
pub async fn list_conversations(
    db: &Database,
    owner: &OwnerId,
) -> Result<Vec<Conversation>, ConfideError> {
    let owner = owner.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![owner], row_to_conversation)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a conversation's title.
pub async fn update_title(
    db: &Database,
    id: &ConversationId,
    title: &str,
) -> Result<(), ConfideError> {
    let (key, title) = (id.0.clone(), title.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation SET title = ?1 WHERE id = ?2",
                params![title, key],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    require_changed(changed, &id.0)
}

/// Replace a conversation's memo.
pub async fn update_memo(
    db: &Database,
    id: &ConversationId,
    memo: &str,
) -> Result<(), ConfideError> {
    let (key, memo) = (id.0.clone(), memo.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation SET memo = ?1 WHERE id = ?2",
                params![memo, key],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    require_changed(changed, &id.0)
}

/// Append a summary to the long-term history in one statement.
///
/// Entries are newline-separated; the first entry has no leading separator.
pub async fn append_history(
    db: &Database,
    id: &ConversationId,
    summary: &str,
) -> Result<(), ConfideError> {
    let (key, summary) = (id.0.clone(), summary.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation
                 SET history = CASE WHEN history = '' THEN ?1 ELSE history || char(10) || ?1 END
                 WHERE id = ?2",
                params![summary, key],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    require_changed(changed, &id.0)
}

/// Delete a conversation; its messages go with it via `ON DELETE CASCADE`.
pub async fn delete_conversation(db: &Database, id: &ConversationId) -> Result<(), ConfideError> {
    let key = id.0.clone();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM conversation WHERE id = ?1", params![key]))
        .await
        .map_err(crate::database::map_tr_err)?;
    require_changed(changed, &id.0)
}
