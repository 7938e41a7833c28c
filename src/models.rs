use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub classe: Option<String>,
    pub total_points: u32,
    pub actions_count: u32,
    pub last_update: DateTime<Utc>,
}

impl StudentRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<'a> {
    pub student: &'a StudentRecord,
    pub rank: u32,
    pub points_for_rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelName {
    Novice,
    Apprenti,
    Expert,
    #[serde(rename = "Maître")]
    Maitre,
    #[serde(rename = "Légende")]
    Legende,
    Immortel,
}

impl LevelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelName::Novice => "Novice",
            LevelName::Apprenti => "Apprenti",
            LevelName::Expert => "Expert",
            LevelName::Maitre => "Maître",
            LevelName::Legende => "Légende",
            LevelName::Immortel => "Immortel",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub name: LevelName,
    pub progress_percent: f64,
    pub next_level_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Everything the leaderboard and profile views show for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgress {
    pub email: String,
    pub display_name: String,
    pub classe: Option<String>,
    pub total_points: u32,
    pub actions_count: u32,
    pub global_rank: u32,
    pub class_rank: Option<u32>,
    pub level: LevelInfo,
    pub level_color: &'static str,
    pub streak: StreakInfo,
    pub earned_badges: Vec<String>,
    pub badge_completion: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionType {
    pub id: String,
    pub label: String,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Validated,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Validated => "validated",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub submission_id: Uuid,
    pub email: String,
    pub status: SubmissionStatus,
    pub points_awarded: u32,
}
