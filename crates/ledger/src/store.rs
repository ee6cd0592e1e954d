//! Storage abstraction for the engagement ledger.
//!
//! The engine only talks to `EngagementStore`; swapping the in-memory
//! store for a persistent backend does not touch the scoring logic.

use dashmap::DashMap;
use parking_lot::RwLock;
use quest_core::types::{Activity, User};

/// Repository interface over the append-only activity log and the
/// per-user snapshots derived from it.
pub trait EngagementStore: Send + Sync {
    /// Append an immutable activity to the log.
    fn append(&self, activity: Activity);

    /// All activities, oldest first.
    fn activities(&self) -> Vec<Activity>;

    /// Activities for one user, oldest first.
    fn activities_for(&self, user_id: &str) -> Vec<Activity>;

    fn user(&self, user_id: &str) -> Option<User>;

    fn users(&self) -> Vec<User>;

    /// Serialized read-modify-write of one user's snapshot, creating the
    /// record on first use. Calls for the same user are mutually
    /// exclusive; distinct users proceed in parallel. Returns the
    /// snapshot after the update.
    fn update_user(&self, user_id: &str, apply: &mut dyn FnMut(&mut User)) -> User;
}

/// In-process store: a log behind an `RwLock` plus user snapshots in a
/// `DashMap`. The entry guard holds its shard lock for the duration of
/// `update_user`, which serializes writers of the same user.
#[derive(Default)]
pub struct MemoryStore {
    log: RwLock<Vec<Activity>>,
    users: DashMap<String, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngagementStore for MemoryStore {
    fn append(&self, activity: Activity) {
        self.log.write().push(activity);
    }

    fn activities(&self) -> Vec<Activity> {
        self.log.read().clone()
    }

    fn activities_for(&self, user_id: &str) -> Vec<Activity> {
        self.log
            .read()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    fn user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    fn users(&self) -> Vec<User> {
        self.users.iter().map(|u| u.clone()).collect()
    }

    fn update_user(&self, user_id: &str, apply: &mut dyn FnMut(&mut User)) -> User {
        let mut entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| User::register(user_id));
        apply(entry.value_mut());
        entry.value().clone()
    }
}
