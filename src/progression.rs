use std::collections::HashMap;

use chrono::NaiveDate;

use crate::badges;
use crate::eligibility::{EligibilityInput, RuleTable};
use crate::level::{calculate_level, level_color};
use crate::models::{StudentProgress, StudentRecord};
use crate::ranking::{rank_by_class, rank_students};
use crate::streak::compute_streak;

/// Activity days per student email.
pub type ActivityLog = HashMap<String, Vec<NaiveDate>>;

#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    rules: RuleTable,
}

impl ProgressionEngine {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Progress of every student, in global rank order.
    pub fn evaluate(
        &self,
        snapshot: &[StudentRecord],
        activity: &ActivityLog,
        today: NaiveDate,
    ) -> Vec<StudentProgress> {
        let class_ranks: HashMap<&str, u32> = rank_by_class(snapshot)
            .into_values()
            .flatten()
            .map(|entry| (entry.student.email.as_str(), entry.rank))
            .collect();

        rank_students(snapshot)
            .into_iter()
            .map(|entry| {
                let student = entry.student;
                let level = calculate_level(student.total_points);
                let days = activity
                    .get(&student.email)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let streak = compute_streak(days, today);
                let class_rank = class_ranks.get(student.email.as_str()).copied();

                let earned_badges = self.rules.earned(&EligibilityInput {
                    total_points: student.total_points,
                    actions_count: student.actions_count,
                    global_rank: entry.rank,
                    class_rank,
                    level: &level,
                    streak,
                });
                let badge_completion =
                    badges::badge_completion_ratio(earned_badges.iter().map(String::as_str));

                StudentProgress {
                    email: student.email.clone(),
                    display_name: student.display_name(),
                    classe: student.classe.clone(),
                    total_points: student.total_points,
                    actions_count: student.actions_count,
                    global_rank: entry.rank,
                    class_rank,
                    level_color: level_color(level.level),
                    level,
                    streak,
                    earned_badges,
                    badge_completion,
                }
            })
            .collect()
    }

    pub fn profile(
        &self,
        snapshot: &[StudentRecord],
        activity: &ActivityLog,
        today: NaiveDate,
        email: &str,
    ) -> Option<StudentProgress> {
        self.evaluate(snapshot, activity, today)
            .into_iter()
            .find(|p| p.email == email)
    }
}

/// Keeps only the students of one classe, preserving rank order.
pub fn filter_classe<'a>(
    progress: &'a [StudentProgress],
    classe: Option<&'a str>,
) -> impl Iterator<Item = &'a StudentProgress> + 'a {
    progress
        .iter()
        .filter(move |p| classe.is_none() || p.classe.as_deref() == classe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelName;
    use chrono::Utc;

    fn student(email: &str, classe: Option<&str>, points: u32, actions: u32) -> StudentRecord {
        StudentRecord {
            email: email.to_string(),
            first_name: "Camille".to_string(),
            last_name: email.to_uppercase(),
            classe: classe.map(str::to_string),
            total_points: points,
            actions_count: actions,
            last_update: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 20).expect("valid date")
    }

    #[test]
    fn evaluates_snapshot_in_rank_order() {
        let snapshot = vec![
            student("s1", Some("B1"), 80, 2),
            student("s2", Some("B1"), 80, 2),
            student("s3", Some("B2"), 200, 4),
        ];
        let progress = ProgressionEngine::default().evaluate(&snapshot, &ActivityLog::new(), today());

        let ranks: Vec<(&str, u32, Option<u32>)> = progress
            .iter()
            .map(|p| (p.email.as_str(), p.global_rank, p.class_rank))
            .collect();
        assert_eq!(
            ranks,
            vec![("s3", 1, Some(1)), ("s1", 2, Some(1)), ("s2", 2, Some(1))]
        );

        assert_eq!(progress[0].level.name, LevelName::Expert);
        assert_eq!(progress[0].level_color, "green");
        assert!(progress[0].earned_badges.contains(&"champion".to_string()));
        assert!(!progress[1].earned_badges.contains(&"champion".to_string()));
        assert!(progress[1].earned_badges.contains(&"class_champion".to_string()));
    }

    #[test]
    fn streak_comes_from_activity_log() {
        let snapshot = vec![student("s1", None, 10, 1)];
        let mut activity = ActivityLog::new();
        let days = (0..7)
            .map(|offset| today() - chrono::Duration::days(offset))
            .collect();
        activity.insert("s1".to_string(), days);

        let profile = ProgressionEngine::default()
            .profile(&snapshot, &activity, today(), "s1")
            .expect("student present");
        assert_eq!(profile.streak.current_streak, 7);
        assert_eq!(profile.class_rank, None);
        assert!(profile.earned_badges.contains(&"streak_7".to_string()));
        assert!((profile.badge_completion - profile.earned_badges.len() as f64 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_profile_is_none() {
        let snapshot = vec![student("s1", None, 10, 1)];
        assert!(ProgressionEngine::default()
            .profile(&snapshot, &ActivityLog::new(), today(), "nobody")
            .is_none());
    }

    #[test]
    fn classe_filter_keeps_order() {
        let snapshot = vec![
            student("a", Some("B1"), 10, 1),
            student("b", Some("B2"), 30, 1),
            student("c", Some("B1"), 20, 1),
        ];
        let progress = ProgressionEngine::default().evaluate(&snapshot, &ActivityLog::new(), today());
        let b1: Vec<&str> = filter_classe(&progress, Some("B1"))
            .map(|p| p.email.as_str())
            .collect();
        assert_eq!(b1, vec!["c", "a"]);
        assert_eq!(filter_classe(&progress, None).count(), 3);
    }
}
