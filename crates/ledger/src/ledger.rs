//! Engagement ledger: append-only activity log plus per-user running
//! aggregates (all-time, weekly, monthly) and level resolution.
//!
//! `record` is the only write path. It appends the activity, bumps the
//! three counters under the store's per-user guard, and re-resolves the
//! user's level from the shared level table. `query` recomputes the same
//! aggregates from the log and must agree with the counters.

use quest_core::catalog::ActivityKind;
use quest_core::event_bus::{make_event, EngagementEventType, EventSink};
use quest_core::levels::LevelStore;
use quest_core::types::{Activity, EngagementSummary, User, Window};
use quest_core::QuestResult;
use crate::store::EngagementStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct EngagementLedger {
    store: Arc<dyn EngagementStore>,
    levels: Arc<LevelStore>,
    event_sink: Arc<dyn EventSink>,
    clamp_display_totals: bool,
}

impl EngagementLedger {
    pub fn new(store: Arc<dyn EngagementStore>, levels: Arc<LevelStore>) -> Self {
        Self {
            store,
            levels,
            event_sink: quest_core::event_bus::noop_sink(),
            clamp_display_totals: true,
        }
    }

    /// Attach an event sink for emitting engagement events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Whether displayed totals clamp at zero (stored counters never do).
    pub fn with_clamped_display(mut self, clamp: bool) -> Self {
        self.clamp_display_totals = clamp;
        self
    }

    /// Append an accepted activity and update the user's aggregates.
    /// Unknown users are registered on first record (idempotent upsert).
    pub fn record(
        &self,
        user_id: &str,
        kind: ActivityKind,
        points: i64,
        description: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> QuestResult<Activity> {
        let activity = Activity::new(user_id, kind, points, description, metadata);
        self.store.append(activity.clone());

        let mut level_change: Option<(u32, u32)> = None;
        let user = self.store.update_user(user_id, &mut |user| {
            user.total_points += points;
            user.weekly_points += points;
            user.monthly_points += points;
            user.last_active = activity.timestamp;

            let resolved = self.levels.resolve(user.total_points);
            if resolved != user.current_level {
                level_change = Some((user.current_level, resolved));
                user.current_level = resolved;
            }
        });

        metrics::counter!("engagement.activities_recorded").increment(1);
        if points > 0 {
            metrics::counter!("engagement.points_awarded").increment(points as u64);
        }

        self.event_sink.emit(make_event(
            EngagementEventType::ActivityRecorded,
            Some(user.id.clone()),
            Some(activity.id),
            Some(kind.as_str().to_string()),
        ));

        if let Some((old, new)) = level_change {
            if new > old {
                metrics::counter!("engagement.level_ups").increment(1);
                info!(user_id = %user.id, old = old, new = new, "Level up");
                self.event_sink.emit(make_event(
                    EngagementEventType::LevelUp,
                    Some(user.id.clone()),
                    Some(activity.id),
                    Some(format!("{old} -> {new}")),
                ));
            } else {
                metrics::counter!("engagement.level_downgrades").increment(1);
            }
        }

        debug!(
            user_id = %user.id,
            kind = kind.as_str(),
            points = points,
            total = user.total_points,
            level = user.current_level,
            "Activity recorded"
        );

        Ok(activity)
    }

    /// Windowed engagement summary, recomputed from the log. Agrees with
    /// the incremental counters maintained by `record`.
    pub fn query(&self, user_id: &str, window: Window) -> EngagementSummary {
        let now = Utc::now();
        let activities: Vec<Activity> = self
            .store
            .activities_for(user_id)
            .into_iter()
            .filter(|a| window.contains(now, a.timestamp))
            .collect();

        let total_points = activities.iter().map(|a| a.points).sum();
        let mut breakdown_by_kind: HashMap<ActivityKind, u64> = HashMap::new();
        for activity in &activities {
            *breakdown_by_kind.entry(activity.kind).or_insert(0) += 1;
        }

        EngagementSummary {
            user_id: user_id.to_string(),
            window,
            total_points,
            activities,
            breakdown_by_kind,
        }
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.store.user(user_id)
    }

    /// Whether the user already has an activity of this kind (one-time
    /// kinds consult this before scoring).
    pub fn has_kind(&self, user_id: &str, kind: ActivityKind) -> bool {
        self.store
            .activities_for(user_id)
            .iter()
            .any(|a| a.kind == kind)
    }

    /// Displayed total for a user, clamped at zero when configured.
    pub fn display_points(&self, points: i64) -> i64 {
        if self.clamp_display_totals {
            points.max(0)
        } else {
            points
        }
    }

    /// Recompute every user's weekly/monthly counters from the log,
    /// aging out activity that left the window, and re-resolve levels so
    /// an edited level table propagates to idle users. Run periodically
    /// from a background task.
    pub fn refresh_window_counters(&self) {
        let now = Utc::now();
        let mut refreshed = 0usize;
        for user in self.store.users() {
            let activities = self.store.activities_for(&user.id);
            let weekly: i64 = activities
                .iter()
                .filter(|a| Window::Week.contains(now, a.timestamp))
                .map(|a| a.points)
                .sum();
            let monthly: i64 = activities
                .iter()
                .filter(|a| Window::Month.contains(now, a.timestamp))
                .map(|a| a.points)
                .sum();
            let level = self.levels.resolve(user.total_points);

            if weekly != user.weekly_points
                || monthly != user.monthly_points
                || level != user.current_level
            {
                self.store.update_user(&user.id, &mut |u| {
                    u.weekly_points = weekly;
                    u.monthly_points = monthly;
                    u.current_level = self.levels.resolve(u.total_points);
                });
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!(users = refreshed, "User aggregates refreshed");
        }
    }
}
