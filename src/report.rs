use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{LevelName, StudentProgress};
use crate::progression::filter_classe;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub name: LevelName,
    pub count: usize,
}

pub fn summarize_levels<'a, I>(progress: I) -> Vec<LevelSummary>
where
    I: IntoIterator<Item = &'a StudentProgress>,
{
    // keyed by the lowest level of each name so the output follows the curve
    let mut map: BTreeMap<u32, LevelSummary> = BTreeMap::new();

    for student in progress {
        let key = match student.level.name {
            LevelName::Novice => 1,
            LevelName::Apprenti => 3,
            LevelName::Expert => 5,
            LevelName::Maitre => 7,
            LevelName::Legende => 9,
            LevelName::Immortel => 11,
        };
        map.entry(key)
            .or_insert(LevelSummary {
                name: student.level.name,
                count: 0,
            })
            .count += 1;
    }

    map.into_values().collect()
}

pub fn build_report(
    classe: Option<&str>,
    generated_on: NaiveDate,
    progress: &[StudentProgress],
    limit: usize,
) -> String {
    let scoped: Vec<&StudentProgress> = filter_classe(progress, classe).collect();
    let levels = summarize_levels(scoped.iter().copied());

    let mut output = String::new();
    let scope_label = classe.map_or("all classes".to_string(), |c| format!("classe {c}"));

    let _ = writeln!(output, "# Campus Leaderboard Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");

    if scoped.is_empty() {
        let _ = writeln!(output, "No students recorded for this scope.");
    } else {
        for student in scoped.iter().take(limit) {
            let rank = match (classe, student.class_rank) {
                (Some(_), Some(class_rank)) => class_rank,
                _ => student.global_rank,
            };
            let _ = writeln!(
                output,
                "- #{} {} ({}) {} pts, level {} {} ({:.0}% to {})",
                rank,
                student.display_name,
                student.classe.as_deref().unwrap_or("no classe"),
                student.total_points,
                student.level.level,
                student.level.name,
                student.level.progress_percent,
                student.level.next_level_threshold
            );
        }
    }

    let mut podiums: BTreeMap<&str, Vec<&StudentProgress>> = BTreeMap::new();
    for student in &scoped {
        if let (Some(classe), Some(rank)) = (student.classe.as_deref(), student.class_rank) {
            if rank <= 3 {
                podiums.entry(classe).or_default().push(student);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Podiums");

    if podiums.is_empty() {
        let _ = writeln!(output, "No class rankings for this scope.");
    } else {
        for (classe, students) in podiums {
            let _ = writeln!(output, "### {classe}");
            for student in students {
                let _ = writeln!(
                    output,
                    "- #{} {} {} pts",
                    student.class_rank.unwrap_or_default(),
                    student.display_name,
                    student.total_points
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Level Distribution");

    if levels.is_empty() {
        let _ = writeln!(output, "No students recorded for this scope.");
    } else {
        for summary in &levels {
            let _ = writeln!(output, "- {}: {} students", summary.name, summary.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Badges");

    if scoped.is_empty() {
        let _ = writeln!(output, "No badges earned in this scope.");
    } else {
        let average =
            scoped.iter().map(|s| s.badge_completion).sum::<f64>() / scoped.len() as f64;
        let _ = writeln!(output, "Average catalog completion {:.0}%", average * 100.0);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;
    use crate::progression::{ActivityLog, ProgressionEngine};
    use chrono::Utc;

    fn student(email: &str, classe: &str, points: u32) -> StudentRecord {
        StudentRecord {
            email: email.to_string(),
            first_name: "Sam".to_string(),
            last_name: email.to_string(),
            classe: Some(classe.to_string()),
            total_points: points,
            actions_count: 1,
            last_update: Utc::now(),
        }
    }

    fn progress() -> Vec<StudentProgress> {
        let snapshot = vec![
            student("a", "B1", 40),
            student("b", "B1", 120),
            student("c", "B2", 1100),
            student("d", "B2", 30),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date");
        ProgressionEngine::default().evaluate(&snapshot, &ActivityLog::new(), today)
    }

    #[test]
    fn levels_follow_the_curve() {
        let progress = progress();
        let summary = summarize_levels(&progress);
        assert_eq!(
            summary,
            vec![
                LevelSummary { name: LevelName::Novice, count: 2 },
                LevelSummary { name: LevelName::Apprenti, count: 1 },
                LevelSummary { name: LevelName::Immortel, count: 1 },
            ]
        );
    }

    #[test]
    fn report_lists_sections() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date");
        let report = build_report(None, today, &progress(), 10);
        assert!(report.contains("Generated for all classes on 2026-05-04"));
        assert!(report.contains("- #1 Sam c (B2) 1100 pts, level 11 Immortel"));
        assert!(report.contains("### B1"));
        assert!(report.contains("- Novice: 2 students"));
        assert!(report.contains("Average catalog completion"));
    }

    #[test]
    fn classe_scope_and_empty_scope() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date");
        let report = build_report(Some("B1"), today, &progress(), 10);
        assert!(report.contains("classe B1"));
        // b is second overall but first of B1
        assert!(report.contains("- #1 Sam b (B1) 120 pts"));
        assert!(report.contains("- #2 Sam a (B1) 40 pts"));
        assert!(!report.contains("### B2"));

        let empty = build_report(Some("B9"), today, &progress(), 10);
        assert!(empty.contains("No students recorded for this scope."));
        assert!(empty.contains("No class rankings for this scope."));
    }
}
