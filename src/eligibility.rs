use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::badges;
use crate::error::ProgressionError;
use crate::models::{LevelInfo, StreakInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgeRule {
    MinActions { count: u32 },
    MaxGlobalRank { rank: u32 },
    MaxClassRank { rank: u32 },
    MinStreak { days: u32 },
    MinLevel { level: u32 },
}

/// What a rule gets to look at for one student.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityInput<'a> {
    pub total_points: u32,
    pub actions_count: u32,
    pub global_rank: u32,
    pub class_rank: Option<u32>,
    pub level: &'a LevelInfo,
    pub streak: StreakInfo,
}

impl BadgeRule {
    pub fn is_met(&self, input: &EligibilityInput<'_>) -> bool {
        match *self {
            BadgeRule::MinActions { count } => input.actions_count >= count,
            // a zero-point student can be "first" of an empty board
            BadgeRule::MaxGlobalRank { rank } => {
                input.total_points > 0 && input.global_rank <= rank
            }
            BadgeRule::MaxClassRank { rank } => {
                input.total_points > 0 && input.class_rank.is_some_and(|r| r <= rank)
            }
            BadgeRule::MinStreak { days } => input.streak.longest_streak >= days,
            BadgeRule::MinLevel { level } => input.level.level >= level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub badge: String,
    #[serde(flatten)]
    pub rule: BadgeRule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    entries: Vec<RuleEntry>,
}

impl RuleTable {
    pub fn new(entries: Vec<RuleEntry>) -> Result<Self, ProgressionError> {
        for entry in &entries {
            if badges::find_badge(&entry.badge).is_none() {
                return Err(ProgressionError::UnknownBadge(entry.badge.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let entries: Vec<RuleEntry> =
            serde_json::from_str(raw).context("badge rules must be a JSON array of rules")?;
        Ok(Self::new(entries)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read badge rules from {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    /// Earned badge ids, in catalog order, without duplicates.
    pub fn earned(&self, input: &EligibilityInput<'_>) -> Vec<String> {
        badges::CATALOG
            .iter()
            .filter(|def| {
                self.entries
                    .iter()
                    .any(|e| e.badge == def.id && e.rule.is_met(input))
            })
            .map(|def| def.id.to_string())
            .collect()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let rule = |badge: &str, rule: BadgeRule| RuleEntry {
            badge: badge.to_string(),
            rule,
        };

        Self {
            entries: vec![
                rule("first_action", BadgeRule::MinActions { count: 1 }),
                rule("top_100", BadgeRule::MaxGlobalRank { rank: 100 }),
                rule("top_50", BadgeRule::MaxGlobalRank { rank: 50 }),
                rule("top_20", BadgeRule::MaxGlobalRank { rank: 20 }),
                rule("top_10", BadgeRule::MaxGlobalRank { rank: 10 }),
                rule("top_3", BadgeRule::MaxGlobalRank { rank: 3 }),
                rule("champion", BadgeRule::MaxGlobalRank { rank: 1 }),
                rule("class_champion", BadgeRule::MaxClassRank { rank: 1 }),
                rule("streak_7", BadgeRule::MinStreak { days: 7 }),
                rule("streak_30", BadgeRule::MinStreak { days: 30 }),
                rule("level_5", BadgeRule::MinLevel { level: 5 }),
                rule("level_10", BadgeRule::MinLevel { level: 10 }),
            ],
        }
    }
}
