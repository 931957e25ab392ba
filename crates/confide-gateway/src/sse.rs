// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events rendering of a chat turn.
//!
//! SSE event format:
//! ```text
//! event: text_delta
//! data: {"text": "partial content here"}
//!
//! event: message_stop
//! data: {"conversation_id": "..."}
//! ```
//!
//! An upstream failure ends the stream with an `error` event instead of
//! `message_stop`.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use confide_core::{ConfideError, ConversationId};
use confide_engine::ChatTurn;
use futures::stream::{self, Stream, StreamExt};

fn text_delta(text: &str) -> Event {
    Event::default()
        .event("text_delta")
        .data(serde_json::json!({ "text": text }).to_string())
}

fn message_stop(id: &ConversationId) -> Event {
    Event::default()
        .event("message_stop")
        .data(serde_json::json!({ "conversation_id": id }).to_string())
}

fn error_event(err: &ConfideError) -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "error": err.to_string() }).to_string())
}

pub fn chat_events(turn: ChatTurn) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = turn.conversation_id;
    let events = stream::unfold(Some(turn.fragments), move |state| {
        let id = id.clone();
        async move {
            let mut fragments = state?;
            let event = match fragments.next().await {
                Some(Ok(text)) => return Some((Ok(text_delta(&text)), Some(fragments))),
                Some(Err(e)) => error_event(&e),
                None => message_stop(&id),
            };
            Some((Ok(event), None))
        }
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}
