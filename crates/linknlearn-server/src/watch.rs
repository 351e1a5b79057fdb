//! Live subscriptions.
//!
//! The [`StreamHub`] is the realtime half of the backend surface: every
//! mutation that a screen observes live (a message append, a pending-request
//! change) is published to a topic, and subscribers receive it over SSE.
//!
//! A dropped SSE stream drops its `broadcast::Receiver`, so no registration
//! outlives its consumer; topics with no remaining subscribers are pruned on
//! the next publish.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use futures::StreamExt;
use linknlearn_shared::constants::{TOPIC_CHAT, TOPIC_REQUESTS};
use linknlearn_shared::{ConversationId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Event name for a message appended to an observed conversation.
pub const EVENT_NEW_MESSAGE: &str = "new-message";
/// Event name for any change to a user's pending-request list.
pub const EVENT_REQUESTS_CHANGED: &str = "requests-changed";

/// One published event: a name plus a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    pub event: String,
    pub data: serde_json::Value,
}

/// Per-topic broadcast channels feeding SSE subscribers.
#[derive(Debug, Clone, Default)]
pub struct StreamHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>>,
}

/// Capacity per topic; a subscriber lagging this far behind loses the
/// oldest events and continues from the live edge.
const TOPIC_CAPACITY: usize = 256;

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic for one conversation's message stream.
    pub fn chat_topic(conversation: &ConversationId) -> String {
        format!("{TOPIC_CHAT}{conversation}")
    }

    /// Topic for one user's pending-request list.
    pub fn requests_topic(user: &UserId) -> String {
        format!("{TOPIC_REQUESTS}{user}")
    }

    /// Publish an event to everyone subscribed to `topic`.
    pub fn publish<T: Serialize>(&self, topic: &str, event: &str, data: &T) {
        let payload = match serde_json::to_value(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(topic, event, error = %e, "failed to serialize stream event");
                return;
            }
        };

        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = topics.get(topic) {
            let _ = sender.send(StreamEvent {
                event: event.to_string(),
                data: payload,
            });
            if sender.receiver_count() == 0 {
                topics.remove(topic);
            }
        }
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<StreamEvent> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Number of live subscribers on a topic.
    #[cfg(test)]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics.get(topic).map_or(0, |s| s.receiver_count())
    }
}

/// Turn a subscription into an SSE response. Lagged receivers skip the
/// lost events rather than terminating the stream.
pub fn sse_stream(
    receiver: broadcast::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(receiver).filter_map(|result| async move {
        let event = result.ok()?;
        let sse = Event::default()
            .event(event.event)
            .json_data(event.data)
            .ok()?;
        Some(Ok(sse))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let hub = StreamHub::new();
        let topic = "chat:u1_u2";

        let mut rx = hub.subscribe(topic);
        hub.publish(topic, EVENT_NEW_MESSAGE, &serde_json::json!({ "text": "hello" }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, EVENT_NEW_MESSAGE);
        assert_eq!(event.data["text"], "hello");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let hub = StreamHub::new();
        // Must not panic or allocate a topic.
        hub.publish("chat:nobody", EVENT_NEW_MESSAGE, &serde_json::json!({}));
        assert_eq!(hub.subscriber_count("chat:nobody"), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_prunes_topic_on_next_publish() {
        let hub = StreamHub::new();
        let topic = "requests:u1";

        let rx = hub.subscribe(topic);
        assert_eq!(hub.subscriber_count(topic), 1);
        drop(rx);

        hub.publish(topic, EVENT_REQUESTS_CHANGED, &serde_json::json!({}));
        assert_eq!(hub.subscriber_count(topic), 0);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let hub = StreamHub::new();
        let mut rx_a = hub.subscribe("chat:a_b");
        let _rx_b = hub.subscribe("chat:c_d");

        hub.publish("chat:a_b", EVENT_NEW_MESSAGE, &serde_json::json!({ "n": 1 }));

        assert!(rx_a.try_recv().is_ok());
        let mut rx_b = hub.subscribe("chat:c_d");
        assert!(rx_b.try_recv().is_err());
    }
}
