//! External event mapping — translates event names delivered by source
//! apps (chat, forum, course, events, livestreaming, referrals) into
//! canonical activity kinds.
//!
//! Legacy names from older webhook integrations (`chat.message`,
//! `forum_comment`, `event_attendance`, ...) resolve here too, so the
//! stored activity always carries a canonical kind.

use quest_core::catalog::ActivityKind;

/// Resolution of an external event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedEvent {
    /// Scores the kind's base points.
    Kind(ActivityKind),
    /// Corrective reversal: scores the kind's base points negated.
    Reversal(ActivityKind),
}

impl MappedEvent {
    pub fn kind(&self) -> ActivityKind {
        match self {
            MappedEvent::Kind(kind) | MappedEvent::Reversal(kind) => *kind,
        }
    }
}

/// Map an external event name to a canonical activity kind. Returns
/// `None` for event names no integration emits.
pub fn resolve_event(event_type: &str) -> Option<MappedEvent> {
    use ActivityKind::*;
    use MappedEvent::{Kind, Reversal};

    let mapped = match event_type {
        // Chat app
        "message_sent" => Kind(ChatMessage),
        "message_replied" => Kind(ChatReply),
        "discussion_started" => Kind(DiscussionStart),
        "reaction_received" => Kind(ChatReactionBonus),
        "streak_achieved" => Kind(ChatStreakBonus),

        // Forum app
        "post_created" => Kind(ForumPost),
        "post_replied" => Kind(ForumReply),
        "post_pinned" => Kind(ForumPinned),
        "helpful_reaction" => Kind(ForumHelpfulBonus),
        "high_engagement" => Kind(ForumEngagementBonus),

        // Course app
        "module_completed" => Kind(CourseModule),
        "course_completed" => Kind(CourseCompletion),
        "quiz_excellent" => Kind(QuizExcellence),
        "progress_shared" => Kind(CourseProgressShare),

        // Event + livestreaming apps
        "event_attended" | "stream_started" | "stream_attended" | "speaker_joined"
        | "raised_hand" => Kind(LiveEventAttendance),
        "stream_chat_message" => Kind(ChatMessage),
        "stream_reaction" => Kind(ChatReactionBonus),

        // Community features
        "member_helped" => Kind(MemberHelp),
        "resource_shared" => Kind(ResourceShare),
        "member_introduced" => Kind(SelfIntroduction),
        "weekly_checkin" => Kind(WeeklyCheckin),

        // Referral program
        "user_referred" => Kind(Referral),
        "tier_achieved" => Kind(ReferralTierBonus),

        // Platform webhook actions
        "payment.succeeded" => Kind(CourseCompletion),
        "membership.went_valid" => Kind(LiveEventAttendance),
        "membership.went_invalid" => Reversal(CourseCompletion),
        "membership.experience_claimed" => Kind(CourseCompletion),
        "membership.metadata_updated" => Kind(ChatMessage),
        "user.created" => Kind(Referral),

        // Legacy webhook aliases
        "chat.message" | "chat" => Kind(ChatMessage),
        "chat.reaction_received" => Kind(ChatReactionBonus),
        "forum.post" => Kind(ForumPost),
        "forum.comment" | "forum_comment" => Kind(ForumReply),
        "course.completed" => Kind(CourseCompletion),
        "event.attended" | "event_attendance" => Kind(LiveEventAttendance),

        // Canonical kind names pass through unchanged
        other => return ActivityKind::parse(other).map(Kind),
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_app_events_resolve() {
        assert_eq!(
            resolve_event("message_sent"),
            Some(MappedEvent::Kind(ActivityKind::ChatMessage))
        );
        assert_eq!(
            resolve_event("post_pinned"),
            Some(MappedEvent::Kind(ActivityKind::ForumPinned))
        );
        assert_eq!(
            resolve_event("quiz_excellent"),
            Some(MappedEvent::Kind(ActivityKind::QuizExcellence))
        );
        assert_eq!(
            resolve_event("tier_achieved"),
            Some(MappedEvent::Kind(ActivityKind::ReferralTierBonus))
        );
    }

    #[test]
    fn test_livestream_events_collapse_to_attendance() {
        for name in ["stream_started", "stream_attended", "speaker_joined", "raised_hand"] {
            assert_eq!(
                resolve_event(name),
                Some(MappedEvent::Kind(ActivityKind::LiveEventAttendance)),
                "{name}"
            );
        }
    }

    #[test]
    fn test_legacy_aliases_resolve_to_canonical_kinds() {
        assert_eq!(
            resolve_event("chat"),
            Some(MappedEvent::Kind(ActivityKind::ChatMessage))
        );
        assert_eq!(
            resolve_event("forum_comment"),
            Some(MappedEvent::Kind(ActivityKind::ForumReply))
        );
        assert_eq!(
            resolve_event("event_attendance"),
            Some(MappedEvent::Kind(ActivityKind::LiveEventAttendance))
        );
        assert_eq!(
            resolve_event("course.completed"),
            Some(MappedEvent::Kind(ActivityKind::CourseCompletion))
        );
    }

    #[test]
    fn test_membership_invalidation_is_a_reversal() {
        assert_eq!(
            resolve_event("membership.went_invalid"),
            Some(MappedEvent::Reversal(ActivityKind::CourseCompletion))
        );
    }

    #[test]
    fn test_canonical_names_pass_through() {
        assert_eq!(
            resolve_event("weekly_checkin"),
            Some(MappedEvent::Kind(ActivityKind::WeeklyCheckin))
        );
        assert_eq!(
            resolve_event("chat_message"),
            Some(MappedEvent::Kind(ActivityKind::ChatMessage))
        );
    }

    #[test]
    fn test_unknown_event_is_none() {
        assert_eq!(resolve_event("foo.bar"), None);
        assert_eq!(resolve_event(""), None);
    }
}
