//! Level table — named tiers unlocked by cumulative points, and the
//! resolver mapping a point total to the highest qualifying level.
//!
//! The table is deployment configuration: it can be replaced at runtime
//! through the admin surface, but every write is validated against the
//! table invariants before it becomes visible to the engine.

use crate::error::{QuestError, QuestResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A named tier with its unlock threshold and perks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub level: u32,
    pub name: String,
    pub required_points: i64,
    #[serde(default)]
    pub perks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<u32>,
    #[serde(default)]
    pub badge_color: String,
    /// Share of the community expected at this tier, for display.
    #[serde(default)]
    pub member_percentage: f64,
    #[serde(default)]
    pub is_unlocked: bool,
}

/// Validated, ascending level table.
///
/// Invariants: level numbers are unique and sorted ascending,
/// `required_points` is strictly increasing, and the first level requires
/// 0 points (everyone qualifies).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Level>", into = "Vec<Level>")]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    /// Build a table from raw entries: sorts by level number, validates
    /// the invariants, and marks the base level unlocked.
    pub fn new(mut levels: Vec<Level>) -> QuestResult<Self> {
        levels.sort_by_key(|l| l.level);
        Self::validate(&levels)?;
        levels[0].is_unlocked = true;
        Ok(Self { levels })
    }

    fn validate(levels: &[Level]) -> QuestResult<()> {
        if levels.is_empty() {
            return Err(QuestError::LevelTable("level table is empty".into()));
        }
        for level in levels {
            if level.level == 0 {
                return Err(QuestError::LevelTable(
                    "level numbers must be positive".into(),
                ));
            }
            if level.name.trim().is_empty() {
                return Err(QuestError::LevelTable(format!(
                    "level {} is missing a name",
                    level.level
                )));
            }
        }
        if levels[0].required_points != 0 {
            return Err(QuestError::LevelTable(format!(
                "base level {} must require 0 points, requires {}",
                levels[0].level, levels[0].required_points
            )));
        }
        for pair in levels.windows(2) {
            if pair[0].level == pair[1].level {
                return Err(QuestError::LevelTable(format!(
                    "duplicate level number {}",
                    pair[0].level
                )));
            }
            if pair[1].required_points <= pair[0].required_points {
                return Err(QuestError::LevelTable(format!(
                    "level {} threshold {} does not exceed level {} threshold {}",
                    pair[1].level,
                    pair[1].required_points,
                    pair[0].level,
                    pair[0].required_points
                )));
            }
        }
        Ok(())
    }

    /// Highest level whose threshold the total meets. Negative totals
    /// resolve to the base level.
    pub fn resolve(&self, total_points: i64) -> u32 {
        self.levels
            .iter()
            .rev()
            .find(|l| l.required_points <= total_points.max(0))
            .map(|l| l.level)
            .unwrap_or(self.levels[0].level)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn get(&self, number: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.level == number)
    }

    /// Next level strictly above the given one, if any.
    pub fn next_after(&self, number: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.level > number)
    }
}

impl TryFrom<Vec<Level>> for LevelTable {
    type Error = QuestError;

    fn try_from(levels: Vec<Level>) -> QuestResult<Self> {
        LevelTable::new(levels)
    }
}

impl From<LevelTable> for Vec<Level> {
    fn from(table: LevelTable) -> Self {
        table.levels
    }
}

impl Default for LevelTable {
    /// The 9-tier default: Newcomer through GOAT, thresholds
    /// 0/100/300/600/1000/2000/3500/5500/8000.
    fn default() -> Self {
        let levels = vec![
            level(1, "Newcomer", 0, None, "bg-blue-400", 100.0, &[
                "Access to community chat",
                "View leaderboard rankings",
                "Access to welcome resources and guides",
            ]),
            level(2, "Contributor", 100, Some(5), "bg-green-400", 25.0, &[
                "5% discount on all products",
                "Early access to new content releases",
                "Priority support response",
            ]),
            level(3, "Active Member", 300, Some(10), "bg-purple-400", 15.0, &[
                "10% discount on all products",
                "Access to exclusive community polls",
                "Monthly featured member spotlight",
            ]),
            level(4, "Community Builder", 600, Some(15), "bg-orange-400", 8.0, &[
                "15% discount on all products",
                "Access to beta features and early releases",
                "Double points on weekend activities",
            ]),
            level(5, "Expert", 1000, Some(20), "bg-red-400", 5.0, &[
                "20% discount on all products",
                "Access to Expert-only forum discussions",
                "Monthly group coaching call access",
                "Free access to one premium course/month",
            ]),
            level(6, "Grandmaster", 2000, Some(25), "bg-indigo-400", 3.0, &[
                "25% discount on all products",
                "Revenue share on referrals (5%)",
                "Access to founder's exclusive content library",
            ]),
            level(7, "Community Leader", 3500, Some(30), "bg-pink-400", 2.0, &[
                "30% discount on all products",
                "Invitation to exclusive community events",
                "Revenue share on referrals (10%)",
                "Direct messaging access to founder",
            ]),
            level(8, "Wizard", 5500, Some(35), "bg-yellow-400", 1.0, &[
                "35% discount on all products",
                "Monthly private mastermind with founder",
                "Revenue share on referrals (15%)",
                "Exclusive \"Wizard Council\" forum access",
                "Free lifetime access to all products",
            ]),
            level(9, "GOAT", 8000, Some(50), "bg-gradient-to-r from-purple-400 to-pink-400", 0.1, &[
                "50% discount on all products",
                "Monthly 1:1 coaching session with founder (30 min)",
                "Revenue share on referrals (20%)",
                "Equity/partnership opportunities discussed",
                "Free ticket to annual in-person event",
                "Co-founder status consideration",
            ]),
        ];
        // The defaults satisfy the table invariants.
        LevelTable::new(levels).expect("default level table is valid")
    }
}

fn level(
    number: u32,
    name: &str,
    required_points: i64,
    discount_percentage: Option<u32>,
    badge_color: &str,
    member_percentage: f64,
    perks: &[&str],
) -> Level {
    Level {
        level: number,
        name: name.to_string(),
        required_points,
        perks: perks.iter().map(|p| p.to_string()).collect(),
        discount_percentage,
        badge_color: badge_color.to_string(),
        member_percentage,
        is_unlocked: false,
    }
}

/// Shared, validated level configuration. The engine reads it on every
/// level resolution; the admin surface replaces it atomically. Writes
/// that fail validation leave the current table untouched.
pub struct LevelStore {
    table: RwLock<LevelTable>,
}

impl LevelStore {
    pub fn new(table: LevelTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    pub fn snapshot(&self) -> LevelTable {
        self.table.read().clone()
    }

    pub fn resolve(&self, total_points: i64) -> u32 {
        self.table.read().resolve(total_points)
    }

    /// Replace the whole table. Entries are re-sorted and validated.
    pub fn replace(&self, levels: Vec<Level>) -> QuestResult<LevelTable> {
        let table = LevelTable::new(levels)?;
        *self.table.write() = table.clone();
        Ok(table)
    }

    /// Add one level. Rejected if the level number already exists or the
    /// resulting table would violate an invariant.
    pub fn add(&self, entry: Level) -> QuestResult<LevelTable> {
        let mut guard = self.table.write();
        if guard.get(entry.level).is_some() {
            return Err(QuestError::LevelTable(format!(
                "level {} already exists",
                entry.level
            )));
        }
        let mut levels = guard.levels.clone();
        levels.push(entry);
        let table = LevelTable::new(levels)?;
        *guard = table.clone();
        Ok(table)
    }

    /// Remove one level by number. The remaining table must still be valid.
    pub fn remove(&self, number: u32) -> QuestResult<LevelTable> {
        let mut guard = self.table.write();
        if guard.get(number).is_none() {
            return Err(QuestError::LevelTable(format!(
                "level {} does not exist",
                number
            )));
        }
        let levels: Vec<Level> = guard
            .levels
            .iter()
            .filter(|l| l.level != number)
            .cloned()
            .collect();
        let table = LevelTable::new(levels)?;
        *guard = table.clone();
        Ok(table)
    }
}

impl Default for LevelStore {
    fn default() -> Self {
        Self::new(LevelTable::default())
    }
}
