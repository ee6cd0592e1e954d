//! Leaderboard aggregation — windowed point sums ranked across users.
//!
//! Reads the ledger's store directly and on demand; it maintains no
//! derived state beyond a per-window snapshot of the previous run's
//! ranks, used to fill each entry's `change` column.

use chrono::Utc;
use dashmap::DashMap;
use quest_core::types::{LeaderboardEntry, User, Window};
use quest_ledger::EngagementStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct LeaderboardAggregator {
    store: Arc<dyn EngagementStore>,
    /// Ranks from the previous run of each window.
    previous: DashMap<Window, HashMap<String, u32>>,
}

impl LeaderboardAggregator {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self {
            store,
            previous: DashMap::new(),
        }
    }

    /// Rank all users with qualifying activity in the window, descending
    /// by windowed points. Ranks are contiguous and 1-based. Ties break
    /// toward the user active earliest, then by id, so repeated runs
    /// over unchanged data are stable. An empty result is valid output.
    pub fn rank(&self, window: Window) -> Vec<LeaderboardEntry> {
        let now = Utc::now();

        let mut sums: HashMap<String, (i64, u64)> = HashMap::new();
        for activity in self.store.activities() {
            if !window.contains(now, activity.timestamp) {
                continue;
            }
            let entry = sums.entry(activity.user_id).or_insert((0, 0));
            entry.0 += activity.points;
            entry.1 += 1;
        }

        let mut rows: Vec<(User, i64, u64)> = sums
            .into_iter()
            .map(|(user_id, (points, activities))| {
                let user = self
                    .store
                    .user(&user_id)
                    .unwrap_or_else(|| User::register(&user_id));
                (user, points, activities)
            })
            .collect();

        rows.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.last_active.cmp(&b.0.last_active))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        let previous = self.previous.get(&window).map(|p| p.clone()).unwrap_or_default();
        let mut snapshot = HashMap::with_capacity(rows.len());

        let entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .enumerate()
            .map(|(index, (user, points, activities))| {
                let rank = index as u32 + 1;
                snapshot.insert(user.id.clone(), rank);
                let change = previous
                    .get(&user.id)
                    .map(|prev| *prev as i64 - rank as i64)
                    .unwrap_or(0);
                LeaderboardEntry {
                    rank,
                    user,
                    points,
                    activities,
                    change,
                }
            })
            .collect();

        self.previous.insert(window, snapshot);
        metrics::histogram!("leaderboard.entries").record(entries.len() as f64);
        debug!(window = ?window, entries = entries.len(), "Leaderboard ranked");
        entries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quest_core::catalog::ActivityKind;
    use quest_core::levels::LevelStore;
    use quest_ledger::{EngagementLedger, MemoryStore};
    use std::collections::HashMap as StdHashMap;

    fn setup() -> (Arc<EngagementLedger>, LeaderboardAggregator) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(EngagementLedger::new(
            store.clone(),
            Arc::new(LevelStore::default()),
        ));
        (ledger, LeaderboardAggregator::new(store))
    }

    fn score(ledger: &EngagementLedger, user_id: &str, points: i64) {
        ledger
            .record(
                user_id,
                ActivityKind::MemberHelp,
                points,
                "Helped another member",
                StdHashMap::new(),
            )
            .unwrap();
    }

    #[test]
    fn test_empty_window_is_valid() {
        let (_ledger, board) = setup();
        assert!(board.rank(Window::Week).is_empty());
    }

    #[test]
    fn test_ranks_descending_and_contiguous() {
        let (ledger, board) = setup();
        score(&ledger, "low", 10);
        score(&ledger, "high", 100);
        score(&ledger, "mid", 40);
        score(&ledger, "mid", 10);

        let entries = board.rank(Window::AllTime);
        let ids: Vec<&str> = entries.iter().map(|e| e.user.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        let ranks: Vec<u32> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(entries[1].points, 50);
        assert_eq!(entries[1].activities, 2);

        for pair in entries.windows(2) {
            assert!(pair[0].points >= pair[1].points);
        }
    }

    #[test]
    fn test_ties_break_toward_earlier_activity() {
        let (ledger, board) = setup();
        score(&ledger, "first", 25);
        score(&ledger, "second", 25);

        let entries = board.rank(Window::AllTime);
        assert_eq!(entries[0].user.id, "first");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn test_user_without_activity_is_absent() {
        let (ledger, board) = setup();
        score(&ledger, "active", 10);

        let entries = board.rank(Window::AllTime);
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| e.user.id != "idle"));
    }

    #[test]
    fn test_change_tracks_rank_movement() {
        let (ledger, board) = setup();
        score(&ledger, "a", 50);
        score(&ledger, "b", 30);

        let first = board.rank(Window::AllTime);
        assert_eq!(first[0].change, 0);
        assert_eq!(first[1].change, 0);

        // b overtakes a
        score(&ledger, "b", 100);
        let second = board.rank(Window::AllTime);
        assert_eq!(second[0].user.id, "b");
        assert_eq!(second[0].change, 1);
        assert_eq!(second[1].user.id, "a");
        assert_eq!(second[1].change, -1);
    }

    #[test]
    fn test_windows_tracked_independently() {
        let (ledger, board) = setup();
        score(&ledger, "a", 50);
        board.rank(Window::Week);

        // The all-time window has no previous snapshot yet
        let alltime = board.rank(Window::AllTime);
        assert_eq!(alltime[0].change, 0);
    }
}
