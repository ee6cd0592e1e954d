//! Point catalog — the fixed mapping from canonical activity kind to
//! point value and eligibility rule.
//!
//! The kind set is closed. Older integrations still deliver legacy event
//! names (`chat`, `forum_comment`, `event_attendance`); those are resolved
//! to canonical kinds at the ingestion boundary and never stored.

use serde::{Deserialize, Serialize};

/// Canonical, closed set of point-bearing activity kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    // Chat & communication
    ChatMessage,
    ChatReply,
    DiscussionStart,
    ChatReactionBonus,
    ChatStreakBonus,
    // Forum activity
    ForumPost,
    ForumReply,
    ForumPinned,
    ForumHelpfulBonus,
    ForumEngagementBonus,
    // Course & learning
    CourseModule,
    CourseCompletion,
    QuizExcellence,
    CourseProgressShare,
    // Community value
    MemberHelp,
    ResourceShare,
    SelfIntroduction,
    LiveEventAttendance,
    WeeklyCheckin,
    // Referrals & growth
    Referral,
    ReferralTierBonus,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 21] = [
        ActivityKind::ChatMessage,
        ActivityKind::ChatReply,
        ActivityKind::DiscussionStart,
        ActivityKind::ChatReactionBonus,
        ActivityKind::ChatStreakBonus,
        ActivityKind::ForumPost,
        ActivityKind::ForumReply,
        ActivityKind::ForumPinned,
        ActivityKind::ForumHelpfulBonus,
        ActivityKind::ForumEngagementBonus,
        ActivityKind::CourseModule,
        ActivityKind::CourseCompletion,
        ActivityKind::QuizExcellence,
        ActivityKind::CourseProgressShare,
        ActivityKind::MemberHelp,
        ActivityKind::ResourceShare,
        ActivityKind::SelfIntroduction,
        ActivityKind::LiveEventAttendance,
        ActivityKind::WeeklyCheckin,
        ActivityKind::Referral,
        ActivityKind::ReferralTierBonus,
    ];

    /// Base points awarded for one accepted activity of this kind.
    pub fn base_points(&self) -> i64 {
        match self {
            ActivityKind::ChatMessage => 2,
            ActivityKind::ChatReply => 3,
            ActivityKind::DiscussionStart => 10,
            ActivityKind::ChatReactionBonus => 5,
            ActivityKind::ChatStreakBonus => 20,
            ActivityKind::ForumPost => 15,
            ActivityKind::ForumReply => 8,
            ActivityKind::ForumPinned => 50,
            ActivityKind::ForumHelpfulBonus => 15,
            ActivityKind::ForumEngagementBonus => 25,
            ActivityKind::CourseModule => 50,
            ActivityKind::CourseCompletion => 200,
            ActivityKind::QuizExcellence => 30,
            ActivityKind::CourseProgressShare => 20,
            ActivityKind::MemberHelp => 40,
            ActivityKind::ResourceShare => 25,
            ActivityKind::SelfIntroduction => 10,
            ActivityKind::LiveEventAttendance => 75,
            ActivityKind::WeeklyCheckin => 15,
            ActivityKind::Referral => 100,
            ActivityKind::ReferralTierBonus => 50,
        }
    }

    /// Eligibility rule evaluated before scoring. Most kinds are always
    /// eligible; bonus kinds require a payload field to meet a minimum.
    pub fn eligibility(&self) -> Eligibility {
        match self {
            ActivityKind::ChatReactionBonus => Eligibility::MinField {
                field: "reaction_count",
                min: 5,
            },
            ActivityKind::ChatStreakBonus => Eligibility::MinField {
                field: "streak_days",
                min: 7,
            },
            ActivityKind::ForumHelpfulBonus => Eligibility::MinField {
                field: "helpful_count",
                min: 3,
            },
            ActivityKind::ForumEngagementBonus => Eligibility::MinField {
                field: "reply_count",
                min: 10,
            },
            ActivityKind::QuizExcellence => Eligibility::MinField {
                field: "score",
                min: 90,
            },
            ActivityKind::SelfIntroduction => Eligibility::OncePerUser,
            ActivityKind::ReferralTierBonus => Eligibility::TierReached("contributor"),
            _ => Eligibility::Always,
        }
    }

    /// Ledger description for an accepted activity of this kind.
    pub fn description(&self) -> &'static str {
        match self {
            ActivityKind::ChatMessage => "Sent a chat message",
            ActivityKind::ChatReply => "Replied in chat",
            ActivityKind::DiscussionStart => "Started a discussion",
            ActivityKind::ChatReactionBonus => "Received reactions in chat",
            ActivityKind::ChatStreakBonus => "Kept a chat activity streak",
            ActivityKind::ForumPost => "Created a forum post",
            ActivityKind::ForumReply => "Replied to a forum post",
            ActivityKind::ForumPinned => "Had a forum post pinned",
            ActivityKind::ForumHelpfulBonus => "Received helpful reactions",
            ActivityKind::ForumEngagementBonus => "Drove high forum engagement",
            ActivityKind::CourseModule => "Completed a course module",
            ActivityKind::CourseCompletion => "Completed a course",
            ActivityKind::QuizExcellence => "Scored excellent on a quiz",
            ActivityKind::CourseProgressShare => "Shared course progress",
            ActivityKind::MemberHelp => "Helped another member",
            ActivityKind::ResourceShare => "Shared a resource",
            ActivityKind::SelfIntroduction => "Introduced themselves",
            ActivityKind::LiveEventAttendance => "Attended a live event",
            ActivityKind::WeeklyCheckin => "Checked in for the week",
            ActivityKind::Referral => "Referred a new member",
            ActivityKind::ReferralTierBonus => "Referred member reached a tier",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::ChatMessage => "chat_message",
            ActivityKind::ChatReply => "chat_reply",
            ActivityKind::DiscussionStart => "discussion_start",
            ActivityKind::ChatReactionBonus => "chat_reaction_bonus",
            ActivityKind::ChatStreakBonus => "chat_streak_bonus",
            ActivityKind::ForumPost => "forum_post",
            ActivityKind::ForumReply => "forum_reply",
            ActivityKind::ForumPinned => "forum_pinned",
            ActivityKind::ForumHelpfulBonus => "forum_helpful_bonus",
            ActivityKind::ForumEngagementBonus => "forum_engagement_bonus",
            ActivityKind::CourseModule => "course_module",
            ActivityKind::CourseCompletion => "course_completion",
            ActivityKind::QuizExcellence => "quiz_excellence",
            ActivityKind::CourseProgressShare => "course_progress_share",
            ActivityKind::MemberHelp => "member_help",
            ActivityKind::ResourceShare => "resource_share",
            ActivityKind::SelfIntroduction => "self_introduction",
            ActivityKind::LiveEventAttendance => "live_event_attendance",
            ActivityKind::WeeklyCheckin => "weekly_checkin",
            ActivityKind::Referral => "referral",
            ActivityKind::ReferralTierBonus => "referral_tier_bonus",
        }
    }

    /// Parse a canonical kind name (the `as_str` form).
    pub fn parse(name: &str) -> Option<ActivityKind> {
        ActivityKind::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

/// Eligibility rule gating an activity kind on the event payload.
/// Failing a rule is a legitimate no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Always eligible.
    Always,
    /// A numeric payload field must meet a minimum value.
    MinField { field: &'static str, min: u64 },
    /// The payload `tier` field must name the given tier.
    TierReached(&'static str),
    /// At most one activity of this kind per user, ever. The payload
    /// check passes; the ingestor consults the ledger history.
    OncePerUser,
}

impl Eligibility {
    /// Evaluate this rule against the event payload. `OncePerUser` passes
    /// here — history is the ingestor's concern, not the payload's.
    pub fn check(&self, payload: &serde_json::Value) -> bool {
        match self {
            Eligibility::Always | Eligibility::OncePerUser => true,
            Eligibility::MinField { field, min } => payload
                .get(field)
                .and_then(serde_json::Value::as_u64)
                .map(|v| v >= *min)
                .unwrap_or(false),
            Eligibility::TierReached(tier) => payload
                .get("tier")
                .and_then(serde_json::Value::as_str)
                .map(|t| t.eq_ignore_ascii_case(tier))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_points_table() {
        assert_eq!(ActivityKind::ChatMessage.base_points(), 2);
        assert_eq!(ActivityKind::ForumPinned.base_points(), 50);
        assert_eq!(ActivityKind::CourseCompletion.base_points(), 200);
        assert_eq!(ActivityKind::LiveEventAttendance.base_points(), 75);
        assert_eq!(ActivityKind::Referral.base_points(), 100);
    }

    #[test]
    fn test_reaction_bonus_threshold() {
        let rule = ActivityKind::ChatReactionBonus.eligibility();
        assert!(!rule.check(&json!({ "reaction_count": 3 })));
        assert!(rule.check(&json!({ "reaction_count": 5 })));
        assert!(rule.check(&json!({ "reaction_count": 6 })));
        // Missing field counts as below threshold
        assert!(!rule.check(&json!({})));
    }

    #[test]
    fn test_quiz_score_threshold() {
        let rule = ActivityKind::QuizExcellence.eligibility();
        assert!(!rule.check(&json!({ "score": 89 })));
        assert!(rule.check(&json!({ "score": 90 })));
    }

    #[test]
    fn test_streak_threshold() {
        let rule = ActivityKind::ChatStreakBonus.eligibility();
        assert!(!rule.check(&json!({ "streak_days": 6 })));
        assert!(rule.check(&json!({ "streak_days": 7 })));
    }

    #[test]
    fn test_referral_tier_rule() {
        let rule = ActivityKind::ReferralTierBonus.eligibility();
        assert!(rule.check(&json!({ "tier": "contributor" })));
        assert!(rule.check(&json!({ "tier": "Contributor" })));
        assert!(!rule.check(&json!({ "tier": "newcomer" })));
        assert!(!rule.check(&json!({})));
    }

    #[test]
    fn test_kind_name_roundtrip() {
        for kind in ActivityKind::ALL {
            assert_eq!(ActivityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityKind::parse("foo.bar"), None);
    }
}
