//! Core domain types shared across the engagement engine.

use crate::catalog::ActivityKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ─── Activities ─────────────────────────────────────────────────────────────

/// One accepted, points-bearing event for a user. Activities are created
/// only by the ingestor and are immutable once stored; the ledger is
/// append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: String,
    pub kind: ActivityKind,
    /// Negative for corrective activities (e.g. a membership reversal).
    pub points: i64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Activity {
    pub fn new(
        user_id: impl Into<String>,
        kind: ActivityKind,
        points: i64,
        description: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            kind,
            points,
            description: description.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

// ─── Aggregation windows ────────────────────────────────────────────────────

/// Time range over which points are aggregated for stats and leaderboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Week,
    Month,
    #[serde(alias = "all")]
    AllTime,
}

impl Window {
    /// Inclusive cutoff for this window relative to `now`; `None` means
    /// the beginning of time.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Window::Week => Some(now - Duration::days(7)),
            Window::Month => Some(now - Duration::days(30)),
            Window::AllTime => None,
        }
    }

    pub fn contains(&self, now: DateTime<Utc>, timestamp: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => timestamp >= cutoff,
            None => true,
        }
    }
}

// ─── Users ──────────────────────────────────────────────────────────────────

/// Per-user engagement snapshot. The level and the three point counters
/// are derived from the activity log; the ledger keeps them in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub current_level: u32,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub join_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Fresh record for a user seen for the first time. Auto-registration
    /// is an explicit upsert on first activity, not a silent fallback.
    pub fn register(id: impl Into<String>) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            display_name: id.clone(),
            id,
            avatar: None,
            current_level: 1,
            total_points: 0,
            weekly_points: 0,
            monthly_points: 0,
            join_date: now,
            last_active: now,
        }
    }
}

// ─── Summaries & leaderboards ───────────────────────────────────────────────

/// Windowed engagement summary for one user, recomputed from the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementSummary {
    pub user_id: String,
    pub window: Window,
    pub total_points: i64,
    pub activities: Vec<Activity>,
    /// Activity count per kind within the window.
    pub breakdown_by_kind: HashMap<ActivityKind, u64>,
}

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based, contiguous.
    pub rank: u32,
    pub user: User,
    /// Points summed within the requested window.
    pub points: i64,
    /// Number of qualifying activities within the window.
    pub activities: u64,
    /// Rank movement since the previous aggregator run for this window;
    /// positive means the user moved up. 0 on first appearance.
    pub change: i64,
}

// ─── Rewards ────────────────────────────────────────────────────────────────

/// Level-gated benefit a user may claim once unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: RewardKind,
    /// Magnitude, meaningful only for discounts (percentage).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    pub required_level: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Discount,
    Access,
    Badge,
    Content,
}
