//! Reward catalog — level-gated benefits (discounts, access, badges,
//! content) with per-user claim state.
//!
//! A reward is visible to a user once their level meets its requirement
//! and it is active. Claiming is a set-membership fact: claimed or not,
//! no partial or expiring claims.

use dashmap::DashMap;
use quest_core::event_bus::{make_event, EngagementEventType, EventSink};
use quest_core::levels::LevelTable;
use quest_core::types::{Reward, RewardKind, User};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Outcome of a claim attempt. A second claim of the same reward is a
/// distinct rejection, never a silent success.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
    Inactive,
    NotFound,
}

/// Progress toward the next level's first reward.
#[derive(Debug, Clone, Serialize)]
pub struct RewardProgress {
    pub next_reward: Option<Reward>,
    pub points_needed: i64,
    pub progress_percentage: f64,
}

pub struct RewardCatalog {
    rewards: DashMap<String, Reward>,
    claims: DashMap<String, HashSet<String>>,
    event_sink: Arc<dyn EventSink>,
}

impl RewardCatalog {
    pub fn new() -> Self {
        Self {
            rewards: DashMap::new(),
            claims: DashMap::new(),
            event_sink: quest_core::event_bus::noop_sink(),
        }
    }

    /// Catalog seeded with the default level-gated rewards.
    pub fn with_defaults() -> Self {
        let catalog = Self::new();
        for reward in default_rewards() {
            catalog.rewards.insert(reward.id.clone(), reward);
        }
        catalog
    }

    /// Attach an event sink for emitting claim events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    // ─── Admin surface ──────────────────────────────────────────────────────

    pub fn insert(&self, reward: Reward) {
        self.rewards.insert(reward.id.clone(), reward);
    }

    pub fn remove(&self, reward_id: &str) -> bool {
        self.rewards.remove(reward_id).is_some()
    }

    pub fn get(&self, reward_id: &str) -> Option<Reward> {
        self.rewards.get(reward_id).map(|r| r.clone())
    }

    // ─── User-facing queries ────────────────────────────────────────────────

    /// Active rewards unlocked at the given level, sorted by level then id.
    pub fn rewards_for_level(&self, level: u32) -> Vec<Reward> {
        let mut rewards: Vec<Reward> = self
            .rewards
            .iter()
            .filter(|r| r.is_active && r.required_level <= level)
            .map(|r| r.clone())
            .collect();
        rewards.sort_by(|a, b| (a.required_level, &a.id).cmp(&(b.required_level, &b.id)));
        rewards
    }

    /// Unlocked, active rewards the user has not claimed yet.
    pub fn available_for(&self, user: &User) -> Vec<Reward> {
        let claimed = self.claimed_ids(&user.id);
        self.rewards_for_level(user.current_level)
            .into_iter()
            .filter(|r| !claimed.contains(&r.id))
            .collect()
    }

    /// Rewards the user has claimed, regardless of current level.
    pub fn claimed_for(&self, user: &User) -> Vec<Reward> {
        let claimed = self.claimed_ids(&user.id);
        let mut rewards: Vec<Reward> = self
            .rewards
            .iter()
            .filter(|r| claimed.contains(&r.id))
            .map(|r| r.clone())
            .collect();
        rewards.sort_by(|a, b| (a.required_level, &a.id).cmp(&(b.required_level, &b.id)));
        rewards
    }

    pub fn has_claimed(&self, user_id: &str, reward_id: &str) -> bool {
        self.claims
            .get(user_id)
            .map(|set| set.contains(reward_id))
            .unwrap_or(false)
    }

    /// Claim a reward for a user. The claim set entry guard serializes
    /// concurrent claims by the same user.
    pub fn claim(&self, user_id: &str, reward_id: &str) -> ClaimOutcome {
        let Some(reward) = self.rewards.get(reward_id) else {
            return ClaimOutcome::NotFound;
        };
        if !reward.is_active {
            return ClaimOutcome::Inactive;
        }

        let mut claimed = self.claims.entry(user_id.to_string()).or_default();
        if !claimed.insert(reward_id.to_string()) {
            return ClaimOutcome::AlreadyClaimed;
        }

        metrics::counter!("rewards.claimed").increment(1);
        info!(user_id, reward_id, "Reward claimed");
        self.event_sink.emit(make_event(
            EngagementEventType::RewardClaimed,
            Some(user_id.to_string()),
            None,
            Some(reward_id.to_string()),
        ));
        ClaimOutcome::Claimed
    }

    /// Best discount percentage among the user's unlocked, active
    /// discount rewards. Discounts never stack; only the maximum applies.
    pub fn discount_for(&self, user: &User) -> u32 {
        self.rewards_for_level(user.current_level)
            .iter()
            .filter(|r| r.kind == RewardKind::Discount)
            .filter_map(|r| r.value)
            .max()
            .unwrap_or(0)
    }

    pub fn apply_discount(&self, price: f64, user: &User) -> f64 {
        price * (1.0 - self.discount_for(user) as f64 / 100.0)
    }

    /// First reward waiting at the next level, if there is a next level.
    pub fn next_reward(&self, user: &User, table: &LevelTable) -> Option<Reward> {
        let next = table.next_after(user.current_level)?;
        self.rewards_for_level(next.level)
            .into_iter()
            .find(|r| r.required_level == next.level)
    }

    /// Points remaining and percentage progress toward the next reward.
    pub fn progress_to_next_reward(&self, user: &User, table: &LevelTable) -> RewardProgress {
        let Some(next_reward) = self.next_reward(user, table) else {
            return RewardProgress {
                next_reward: None,
                points_needed: 0,
                progress_percentage: 100.0,
            };
        };

        let (Some(current), Some(next)) = (
            table.get(user.current_level),
            table.get(next_reward.required_level),
        ) else {
            return RewardProgress {
                next_reward: Some(next_reward),
                points_needed: 0,
                progress_percentage: 0.0,
            };
        };

        let span = (next.required_points - current.required_points) as f64;
        let into = (user.total_points - current.required_points) as f64;
        RewardProgress {
            points_needed: (next.required_points - user.total_points).max(0),
            progress_percentage: (into / span * 100.0).clamp(0.0, 100.0),
            next_reward: Some(next_reward),
        }
    }

    /// Claim every available discount and access reward for the user.
    /// Returns the newly claimed rewards. Badges and content stay manual.
    pub fn auto_unlock(&self, user: &User) -> Vec<Reward> {
        let mut unlocked = Vec::new();
        for reward in self.available_for(user) {
            if matches!(reward.kind, RewardKind::Discount | RewardKind::Access)
                && self.claim(&user.id, &reward.id) == ClaimOutcome::Claimed
            {
                unlocked.push(reward);
            }
        }
        unlocked
    }

    fn claimed_ids(&self, user_id: &str) -> HashSet<String> {
        self.claims
            .get(user_id)
            .map(|set| set.clone())
            .unwrap_or_default()
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn reward(
    id: &str,
    name: &str,
    description: &str,
    kind: RewardKind,
    value: Option<u32>,
    required_level: u32,
) -> Reward {
    Reward {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        kind,
        value,
        required_level,
        is_active: true,
    }
}

/// Default reward set across levels 2-9.
pub fn default_rewards() -> Vec<Reward> {
    vec![
        reward(
            "level_2_discount",
            "Member Discount",
            "5% discount on all purchases",
            RewardKind::Discount,
            Some(5),
            2,
        ),
        reward(
            "level_3_vip_support",
            "VIP Support",
            "Priority customer support",
            RewardKind::Access,
            None,
            3,
        ),
        reward(
            "level_3_early_access",
            "Early Access",
            "Early access to new features and content",
            RewardKind::Access,
            None,
            3,
        ),
        reward(
            "level_4_mentorship",
            "Mentorship Program",
            "Access to mentorship opportunities",
            RewardKind::Access,
            None,
            4,
        ),
        reward(
            "level_4_custom_badge",
            "Custom Badge",
            "Custom community badge",
            RewardKind::Badge,
            None,
            4,
        ),
        reward(
            "level_5_moderator",
            "Moderator Privileges",
            "Community moderation tools",
            RewardKind::Access,
            None,
            5,
        ),
        reward(
            "level_5_founder_access",
            "Founder Access",
            "Direct access to community founders",
            RewardKind::Access,
            None,
            5,
        ),
        reward(
            "level_6_revenue_sharing",
            "Revenue Sharing",
            "Eligibility for revenue sharing program",
            RewardKind::Access,
            None,
            6,
        ),
        reward(
            "level_7_cofounder",
            "Co-founder Status",
            "Official co-founder recognition",
            RewardKind::Badge,
            None,
            7,
        ),
        reward(
            "level_7_equity",
            "Equity Opportunities",
            "Eligibility for equity participation",
            RewardKind::Access,
            None,
            7,
        ),
        reward(
            "level_8_named_feature",
            "Named Feature",
            "Community feature named after you",
            RewardKind::Badge,
            None,
            8,
        ),
        reward(
            "level_8_lifetime",
            "Lifetime Benefits",
            "All benefits for life",
            RewardKind::Access,
            None,
            8,
        ),
        reward(
            "level_9_ultimate",
            "Ultimate Recognition",
            "Ultimate community recognition",
            RewardKind::Badge,
            None,
            9,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quest_core::event_bus::capture_sink;
    use quest_core::types::User;

    fn user_at_level(level: u32, total_points: i64) -> User {
        let mut user = User::register("u1");
        user.current_level = level;
        user.total_points = total_points;
        user
    }

    #[test]
    fn test_fresh_user_sees_nothing() {
        let catalog = RewardCatalog::with_defaults();
        let user = user_at_level(1, 0);
        assert!(catalog.available_for(&user).is_empty());
        assert_eq!(catalog.discount_for(&user), 0);
    }

    #[test]
    fn test_level_gating() {
        let catalog = RewardCatalog::with_defaults();
        let user = user_at_level(3, 300);
        let available = catalog.available_for(&user);
        assert_eq!(available.len(), 3);
        assert!(available.iter().all(|r| r.required_level <= 3));
    }

    #[test]
    fn test_claim_then_already_claimed() {
        let catalog = RewardCatalog::with_defaults();
        assert_eq!(catalog.claim("u1", "level_2_discount"), ClaimOutcome::Claimed);
        assert_eq!(
            catalog.claim("u1", "level_2_discount"),
            ClaimOutcome::AlreadyClaimed
        );
        // A different user still gets their own claim
        assert_eq!(catalog.claim("u2", "level_2_discount"), ClaimOutcome::Claimed);
    }

    #[test]
    fn test_available_never_includes_claimed() {
        let catalog = RewardCatalog::with_defaults();
        let user = user_at_level(2, 100);
        catalog.claim("u1", "level_2_discount");

        assert!(catalog
            .available_for(&user)
            .iter()
            .all(|r| r.id != "level_2_discount"));
        assert_eq!(catalog.claimed_for(&user).len(), 1);
    }

    #[test]
    fn test_claim_inactive_and_unknown() {
        let catalog = RewardCatalog::with_defaults();
        let mut dormant = catalog.get("level_2_discount").unwrap();
        dormant.is_active = false;
        catalog.insert(dormant);

        assert_eq!(catalog.claim("u1", "level_2_discount"), ClaimOutcome::Inactive);
        assert_eq!(catalog.claim("u1", "no_such_reward"), ClaimOutcome::NotFound);
    }

    #[test]
    fn test_discount_is_max_not_sum() {
        let catalog = RewardCatalog::with_defaults();
        catalog.insert(reward(
            "level_3_flash_discount",
            "Flash Discount",
            "12% off",
            RewardKind::Discount,
            Some(12),
            3,
        ));

        let user = user_at_level(3, 300);
        assert_eq!(catalog.discount_for(&user), 12);
        assert!((catalog.apply_discount(100.0, &user) - 88.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inactive_discount_ignored() {
        let catalog = RewardCatalog::with_defaults();
        let mut dormant = catalog.get("level_2_discount").unwrap();
        dormant.is_active = false;
        catalog.insert(dormant);

        let user = user_at_level(2, 100);
        assert_eq!(catalog.discount_for(&user), 0);
    }

    #[test]
    fn test_next_reward_and_progress() {
        let catalog = RewardCatalog::with_defaults();
        let table = LevelTable::default();

        // 200 points: level 2, halfway between 100 and 300
        let user = user_at_level(2, 200);
        let progress = catalog.progress_to_next_reward(&user, &table);
        let next = progress.next_reward.unwrap();
        assert_eq!(next.required_level, 3);
        assert_eq!(progress.points_needed, 100);
        assert!((progress.progress_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_at_top_level() {
        let catalog = RewardCatalog::with_defaults();
        let table = LevelTable::default();
        let user = user_at_level(9, 10_000);
        let progress = catalog.progress_to_next_reward(&user, &table);
        assert!(progress.next_reward.is_none());
        assert_eq!(progress.points_needed, 0);
        assert!((progress.progress_percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_auto_unlock_claims_discount_and_access_only() {
        let sink = capture_sink();
        let catalog = RewardCatalog::with_defaults().with_event_sink(sink.clone());
        let user = user_at_level(4, 600);

        let unlocked = catalog.auto_unlock(&user);
        assert!(!unlocked.is_empty());
        assert!(unlocked
            .iter()
            .all(|r| matches!(r.kind, RewardKind::Discount | RewardKind::Access)));
        // The level 4 badge stays manual
        assert!(!catalog.has_claimed("u1", "level_4_custom_badge"));
        assert_eq!(
            sink.count_type(EngagementEventType::RewardClaimed),
            unlocked.len()
        );

        // Second pass claims nothing new
        assert!(catalog.auto_unlock(&user).is_empty());
    }
}
