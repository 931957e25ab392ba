// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and retrieval. There is no update or per-message delete.

use std::str::FromStr;

use confide_core::ConfideError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ConversationId, Message, Sender};

/// Insert a message into the log.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), ConfideError> {
    let msg = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message (id, conversation_id, sender, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.conversation_id.0,
                    msg.sender.to_string(),
                    msg.content,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation's messages, oldest first.
pub async fn get_messages(
    db: &Database,
    conversation_id: &ConversationId,
) -> Result<Vec<Message>, ConfideError> {
    let conversation_id = conversation_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender, content, created_at
                 FROM message WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                let sender: String = row.get(2)?;
                let sender = Sender::from_str(&sender).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(Message {
                    id: row.get(0)?,
                    conversation_id: ConversationId(row.get(1)?),
                    sender,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
