//! Fan-out of rendered chat messages to everyone watching a room.
//!
//! Each room has a named stream (`chat_<room_id>`) backed by a tokio
//! broadcast channel. Publishing is fire-and-forget: subscribers that fall
//! behind lose the oldest frames, and nothing is retried.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

const STREAM_CAPACITY: usize = 64;

pub fn stream_name(chat_room_id: i64) -> String {
    format!("chat_{chat_room_id}")
}

/// Wraps a fragment so the page appends it to the element named after the stream.
pub fn append_envelope(stream: &str, fragment: &str) -> String {
    format!(
        r#"<turbo-stream action="append" target="{stream}"><template>{fragment}</template></turbo-stream>"#
    )
}

#[derive(Clone, Default)]
pub struct ChatHub {
    streams: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, stream: &str) -> broadcast::Receiver<String> {
        self.streams
            .entry(stream.to_owned())
            .or_insert_with(|| broadcast::channel(STREAM_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many subscribers the envelope was handed to.
    pub fn broadcast_append(&self, stream: &str, fragment: &str) -> usize {
        let sent = match self.streams.get(stream) {
            Some(tx) => tx.send(append_envelope(stream, fragment)).unwrap_or(0),
            None => 0,
        };
        if sent == 0 {
            self.prune(stream);
        }
        sent
    }

    /// Forgets a stream nobody listens to anymore.
    pub fn prune(&self, stream: &str) {
        self.streams.remove_if(stream, |_, tx| tx.receiver_count() == 0);
    }
}

#[cfg(test)]
impl ChatHub {
    pub(crate) fn subscriber_count(&self, stream: &str) -> usize {
        self.streams
            .get(stream)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub(crate) fn stream_count(&self) -> usize {
        self.streams.len()
    }
}
