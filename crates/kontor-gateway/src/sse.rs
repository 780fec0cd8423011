// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound SSE framing.
//!
//! Every turn streams as OpenAI-style `chat.completion.chunk` events so
//! existing chat frontends can consume it unchanged: content deltas,
//! then one finish chunk, then the `[DONE]` sentinel. Status lines from
//! the orchestrator ride inside ordinary content deltas.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use kontor_core::new_id;
use serde_json::json;
use tokio::sync::mpsc;

/// Fixed identity fields stamped on every chunk of one response.
#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    id: String,
    created: i64,
    model: String,
}

impl ChunkEnvelope {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", new_id()),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
        }
    }

    pub fn content_chunk(&self, text: &str) -> String {
        json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}],
        })
        .to_string()
    }

    pub fn finish_chunk(&self) -> String {
        json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
        })
        .to_string()
    }
}

/// Adapts the orchestrator's delta channel into the SSE event stream.
/// The stream ends with a finish chunk and `[DONE]` once the sender side
/// is dropped.
pub fn chat_stream(
    envelope: ChunkEnvelope,
    rx: mpsc::Receiver<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let finish = envelope.finish_chunk();
    let deltas = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|text| (text, rx))
    });
    let events = deltas
        .map(move |text| Ok(Event::default().data(envelope.content_chunk(&text))))
        .chain(stream::iter([
            Ok(Event::default().data(finish)),
            Ok(Event::default().data("[DONE]")),
        ]));
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn content_chunks_share_the_response_identity() {
        let envelope = ChunkEnvelope::new("gpt-test");
        let first: Value = serde_json::from_str(&envelope.content_chunk("Hel")).unwrap();
        let second: Value = serde_json::from_str(&envelope.content_chunk("lo")).unwrap();

        assert_eq!(first["id"], second["id"]);
        assert_eq!(first["object"], "chat.completion.chunk");
        assert_eq!(first["model"], "gpt-test");
        assert_eq!(first["choices"][0]["delta"]["content"], "Hel");
        assert!(first["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn finish_chunk_carries_stop_and_an_empty_delta() {
        let envelope = ChunkEnvelope::new("gpt-test");
        let finish: Value = serde_json::from_str(&envelope.finish_chunk()).unwrap();
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert!(finish["choices"][0]["delta"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delta_stream_ends_when_the_sender_drops() {
        let (tx, rx) = mpsc::channel::<String>(8);
        tx.send("Hello".to_string()).await.unwrap();
        tx.send(" world".to_string()).await.unwrap();
        drop(tx);

        let collected: Vec<String> = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|text| (text, rx))
        })
        .collect()
        .await;
        assert_eq!(collected, vec!["Hello".to_string(), " world".to_string()]);
    }
}
