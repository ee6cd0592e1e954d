//! Engagement event bus — trait for emitting domain events from any module.
//!
//! Modules accept an `Arc<dyn EventSink>` to surface what happened
//! (activity recorded, level up, reward claimed) to notification and
//! analytics collaborators without coupling to their delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngagementEventType {
    ActivityRecorded,
    /// Inbound event did not map to a known activity kind.
    EventRejected,
    LevelUp,
    RewardClaimed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub event_id: Uuid,
    pub event_type: EngagementEventType,
    pub user_id: Option<String>,
    pub activity_id: Option<Uuid>,
    /// Free-form context: activity kind, level transition, reward id.
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Trait for emitting engagement events. Implementations route events to
/// notification lists, analytics pipelines, or customer webhooks.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngagementEvent);
}

/// No-op sink for tests and modules that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: EngagementEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<EngagementEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<EngagementEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: EngagementEventType) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: EngagementEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

/// Convenience builder for creating `EngagementEvent` with minimal boilerplate.
pub fn make_event(
    event_type: EngagementEventType,
    user_id: Option<String>,
    activity_id: Option<Uuid>,
    detail: Option<String>,
) -> EngagementEvent {
    EngagementEvent {
        event_id: Uuid::new_v4(),
        event_type,
        user_id,
        activity_id,
        detail,
        timestamp: Utc::now(),
    }
}

/// Convenience: create a no-op event bus for modules that don't need it.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        sink.emit(make_event(
            EngagementEventType::ActivityRecorded,
            Some("user-1".into()),
            Some(Uuid::new_v4()),
            Some("chat_message".into()),
        ));
        sink.emit(make_event(
            EngagementEventType::LevelUp,
            Some("user-1".into()),
            None,
            Some("1 -> 2".into()),
        ));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_type(EngagementEventType::ActivityRecorded), 1);
        assert_eq!(sink.count_type(EngagementEventType::LevelUp), 1);

        let events = sink.events();
        assert_eq!(events[0].user_id, Some("user-1".into()));
        assert_eq!(events[1].detail, Some("1 -> 2".into()));
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        // Should not panic
        sink.emit(make_event(
            EngagementEventType::EventRejected,
            None,
            None,
            None,
        ));
    }
}
