//! Asynchronous scoring queue — decouples webhook acknowledgement from
//! ledger writes.
//!
//! A single background worker drains events in arrival order, so two
//! events for the same user are never reordered. Submission never
//! blocks; when the queue is full the event is counted and dropped
//! (at-least-once delivery redelivers it).

use crate::ingestor::Ingestor;
use chrono::{DateTime, Utc};
use quest_core::QuestError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// One inbound platform event awaiting scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub source_app: String,
    pub event_type: String,
    pub user_id: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn new(
        source_app: impl Into<String>,
        event_type: impl Into<String>,
        user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            source_app: source_app.into(),
            event_type: event_type.into(),
            user_id: user_id.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Bounded queue with a background scoring worker.
pub struct ScoringQueue {
    sender: mpsc::Sender<InboundEvent>,
}

impl ScoringQueue {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn new(ingestor: Arc<Ingestor>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<InboundEvent>(capacity);

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match ingestor.ingest(
                    &event.source_app,
                    &event.event_type,
                    &event.user_id,
                    &event.payload,
                ) {
                    Ok(_) => {}
                    // Already logged and counted by the ingestor.
                    Err(QuestError::UnknownEvent(_)) => {}
                    Err(e) => {
                        error!(
                            error = %e,
                            event_type = %event.event_type,
                            user_id = %event.user_id,
                            "Scoring failed"
                        );
                        metrics::counter!("scoring.errors").increment(1);
                    }
                }
            }
            info!("Scoring queue worker stopped");
        });

        Self { sender }
    }

    /// Non-blocking submit; the webhook boundary never waits on scoring.
    pub fn submit(&self, event: InboundEvent) {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("scoring.dropped").increment(1);
            warn!("Inbound event dropped: {}", e);
        } else {
            metrics::counter!("scoring.queued").increment(1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quest_core::levels::LevelStore;
    use quest_ledger::{EngagementLedger, MemoryStore};
    use serde_json::json;
    use std::time::Duration;

    fn test_queue() -> (ScoringQueue, Arc<EngagementLedger>) {
        let ledger = Arc::new(EngagementLedger::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LevelStore::default()),
        ));
        let ingestor = Arc::new(Ingestor::new(ledger.clone()));
        (ScoringQueue::new(ingestor, 1024), ledger)
    }

    async fn wait_for_points(ledger: &EngagementLedger, user_id: &str, expected: i64) {
        for _ in 0..100 {
            if ledger.user(user_id).map(|u| u.total_points) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "user {user_id} never reached {expected} points, has {:?}",
            ledger.user(user_id).map(|u| u.total_points)
        );
    }

    #[tokio::test]
    async fn test_submitted_events_are_scored() {
        let (queue, ledger) = test_queue();
        queue.submit(InboundEvent::new("chat_app", "message_sent", "u1", json!({})));
        queue.submit(InboundEvent::new("forum_app", "post_created", "u1", json!({})));

        wait_for_points(&ledger, "u1", 17).await;
    }

    #[tokio::test]
    async fn test_unknown_events_are_swallowed() {
        let (queue, ledger) = test_queue();
        queue.submit(InboundEvent::new("chat_app", "foo.bar", "u1", json!({})));
        queue.submit(InboundEvent::new("chat_app", "message_sent", "u1", json!({})));

        // The bad event is logged and skipped, the good one still lands.
        wait_for_points(&ledger, "u1", 2).await;
        assert!(ledger.user("u1").is_some());
    }

    #[tokio::test]
    async fn test_same_user_events_keep_arrival_order() {
        let (queue, ledger) = test_queue();
        // A one-time introduction followed by its duplicate: order
        // determines which one scores.
        queue.submit(InboundEvent::new("community", "member_introduced", "u1", json!({})));
        queue.submit(InboundEvent::new("community", "member_introduced", "u1", json!({})));
        queue.submit(InboundEvent::new("chat_app", "message_sent", "u1", json!({})));

        wait_for_points(&ledger, "u1", 12).await;
    }
}
