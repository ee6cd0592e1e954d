//! Activity ingestor — stateless translation of inbound platform events
//! into ledger activities, applying the point catalog's eligibility rules.
//!
//! Unknown event names are rejected and logged but never crash the
//! boundary; eligibility failures are legitimate no-ops.

use crate::events::{resolve_event, MappedEvent};
use quest_core::catalog::{ActivityKind, Eligibility};
use quest_core::event_bus::{make_event, EngagementEventType, EventSink};
use quest_core::types::Activity;
use quest_core::{QuestError, QuestResult};
use quest_ledger::EngagementLedger;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of ingesting a recognized event.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Event accepted and recorded in the ledger.
    Recorded(Activity),
    /// Legitimate event below its eligibility threshold. Not an error,
    /// nothing is recorded.
    Ineligible(ActivityKind),
}

/// Stateless, re-entrant event-to-activity translator. All state lives
/// in the ledger it writes to.
pub struct Ingestor {
    ledger: Arc<EngagementLedger>,
    event_sink: Arc<dyn EventSink>,
}

impl Ingestor {
    pub fn new(ledger: Arc<EngagementLedger>) -> Self {
        Self {
            ledger,
            event_sink: quest_core::event_bus::noop_sink(),
        }
    }

    /// Attach an event sink for emitting rejection events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Translate one inbound event into a ledger activity.
    ///
    /// Unknown event names return `QuestError::UnknownEvent`; the webhook
    /// boundary logs it and still acknowledges the delivery.
    pub fn ingest(
        &self,
        source_app: &str,
        event_type: &str,
        user_id: &str,
        payload: &serde_json::Value,
    ) -> QuestResult<IngestOutcome> {
        let Some(mapped) = resolve_event(event_type) else {
            warn!(source_app, event_type, "Unknown event type");
            metrics::counter!("ingest.unknown_events").increment(1);
            self.event_sink.emit(make_event(
                EngagementEventType::EventRejected,
                Some(user_id.to_string()),
                None,
                Some(event_type.to_string()),
            ));
            return Err(QuestError::UnknownEvent(event_type.to_string()));
        };
        let kind = mapped.kind();

        // A new-user event credits the referrer, not the new user.
        let credited = if event_type == "user.created" {
            match payload.get("referred_by").and_then(serde_json::Value::as_str) {
                Some(referrer) => referrer.to_string(),
                None => {
                    debug!(user_id, "New user without referrer, nothing to score");
                    return Ok(IngestOutcome::Ineligible(kind));
                }
            }
        } else {
            user_id.to_string()
        };

        let rule = kind.eligibility();
        if !rule.check(payload) {
            debug!(
                source_app,
                event_type,
                kind = kind.as_str(),
                "Event below eligibility threshold"
            );
            metrics::counter!("ingest.ineligible").increment(1);
            return Ok(IngestOutcome::Ineligible(kind));
        }
        if matches!(rule, Eligibility::OncePerUser) && self.ledger.has_kind(&credited, kind) {
            debug!(user_id = %credited, kind = kind.as_str(), "One-time activity already credited");
            metrics::counter!("ingest.ineligible").increment(1);
            return Ok(IngestOutcome::Ineligible(kind));
        }

        let (points, description) = match mapped {
            MappedEvent::Kind(_) => (kind.base_points(), kind.description().to_string()),
            MappedEvent::Reversal(_) => (
                -kind.base_points(),
                format!("Reversal: {}", kind.description().to_lowercase()),
            ),
        };

        let mut metadata: HashMap<String, serde_json::Value> = match payload {
            serde_json::Value::Object(map) => map.clone().into_iter().collect(),
            serde_json::Value::Null => HashMap::new(),
            other => HashMap::from([("data".to_string(), other.clone())]),
        };
        metadata.insert("source_app".to_string(), source_app.into());
        metadata.insert("event_type".to_string(), event_type.into());

        let activity = self
            .ledger
            .record(&credited, kind, points, description, metadata)?;

        metrics::counter!("ingest.accepted").increment(1);
        Ok(IngestOutcome::Recorded(activity))
    }
}
