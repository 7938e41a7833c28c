use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{RankedEntry, StudentRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: String,
    pub points: u32,
}

/// Competition ranking ("1224") over arbitrary items.
///
/// Returns `(index, rank)` pairs in rank order. Items with equal points keep
/// their input order.
pub fn competition_order<T>(items: &[T], points: impl Fn(&T) -> u32) -> Vec<(usize, u32)> {
    let mut indices: Vec<usize> = (0..items.len()).collect();
    // sort_by is stable, so ties keep input order
    indices.sort_by(|&a, &b| points(&items[b]).cmp(&points(&items[a])));

    let mut ranked = Vec::with_capacity(indices.len());
    let mut current_rank = 0u32;
    let mut previous: Option<u32> = None;

    for (position, index) in indices.into_iter().enumerate() {
        let value = points(&items[index]);
        if previous != Some(value) {
            current_rank = position as u32 + 1;
            previous = Some(value);
        }
        ranked.push((index, current_rank));
    }

    ranked
}

/// Maps each id to its competition rank. When an id appears more than once
/// its best rank wins.
pub fn compute_ranks(entries: &[ScoreEntry]) -> HashMap<String, u32> {
    let mut ranks = HashMap::with_capacity(entries.len());
    for (index, rank) in competition_order(entries, |e| e.points) {
        ranks.entry(entries[index].id.clone()).or_insert(rank);
    }
    ranks
}

pub fn rank_students(students: &[StudentRecord]) -> Vec<RankedEntry<'_>> {
    competition_order(students, |s| s.total_points)
        .into_iter()
        .map(|(index, rank)| RankedEntry {
            student: &students[index],
            rank,
            points_for_rank: students[index].total_points,
        })
        .collect()
}

/// Ranks every classe independently. Students without a classe are left out.
pub fn rank_by_class(students: &[StudentRecord]) -> HashMap<String, Vec<RankedEntry<'_>>> {
    let mut groups: HashMap<&str, Vec<&StudentRecord>> = HashMap::new();
    for student in students {
        if let Some(classe) = student.classe.as_deref() {
            groups.entry(classe).or_default().push(student);
        }
    }

    groups
        .into_iter()
        .map(|(classe, members)| {
            let entries = competition_order(&members, |s| s.total_points)
                .into_iter()
                .map(|(index, rank)| RankedEntry {
                    student: members[index],
                    rank,
                    points_for_rank: members[index].total_points,
                })
                .collect();
            (classe.to_string(), entries)
        })
        .collect()
}

/// Rank of one student among the members of their own classe.
pub fn class_rank(students: &[StudentRecord], email: &str) -> Option<u32> {
    let student = students.iter().find(|s| s.email == email)?;
    let classe = student.classe.as_deref()?;
    let members: Vec<&StudentRecord> = students
        .iter()
        .filter(|s| s.classe.as_deref() == Some(classe))
        .collect();

    competition_order(&members, |s| s.total_points)
        .into_iter()
        .find(|(index, _)| members[*index].email == email)
        .map(|(_, rank)| rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, points: u32) -> ScoreEntry {
        ScoreEntry {
            id: id.to_string(),
            points,
        }
    }

    fn student(email: &str, classe: Option<&str>, points: u32) -> StudentRecord {
        StudentRecord {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: email.to_string(),
            classe: classe.map(str::to_string),
            total_points: points,
            actions_count: 0,
            last_update: Utc::now(),
        }
    }

    #[test]
    fn ties_share_rank_and_next_value_skips() {
        let ranks = compute_ranks(&[entry("a", 100), entry("b", 100), entry("c", 50)]);
        assert_eq!(ranks["a"], 1);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 3);
    }

    #[test]
    fn empty_population_has_no_ranks() {
        assert!(compute_ranks(&[]).is_empty());
        assert!(rank_students(&[]).is_empty());
    }

    #[test]
    fn ranking_is_idempotent() {
        let entries = vec![entry("x", 10), entry("y", 30), entry("z", 10), entry("w", 0)];
        assert_eq!(compute_ranks(&entries), compute_ranks(&entries));
        assert_eq!(
            competition_order(&entries, |e| e.points),
            competition_order(&entries, |e| e.points)
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let entries = vec![entry("first", 5), entry("top", 9), entry("second", 5)];
        let order: Vec<&str> = competition_order(&entries, |e| e.points)
            .into_iter()
            .map(|(index, _)| entries[index].id.as_str())
            .collect();
        assert_eq!(order, vec!["top", "first", "second"]);
    }

    #[test]
    fn duplicate_ids_keep_best_rank() {
        let ranks = compute_ranks(&[entry("a", 10), entry("b", 20), entry("a", 30)]);
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks["a"], 1);
        assert_eq!(ranks["b"], 2);
    }

    #[test]
    fn class_ranks_are_scoped_to_the_classe() {
        let students = vec![
            student("s1", Some("B1"), 80),
            student("s2", Some("B1"), 80),
            student("s3", Some("B2"), 200),
            student("s4", None, 500),
        ];

        let global: Vec<(&str, u32)> = rank_students(&students)
            .iter()
            .map(|e| (e.student.email.as_str(), e.rank))
            .collect();
        assert_eq!(global, vec![("s4", 1), ("s3", 2), ("s1", 3), ("s2", 3)]);

        let by_class = rank_by_class(&students);
        assert_eq!(by_class.len(), 2);
        let b1: Vec<u32> = by_class["B1"].iter().map(|e| e.rank).collect();
        assert_eq!(b1, vec![1, 1]);

        assert_eq!(class_rank(&students, "s2"), Some(1));
        assert_eq!(class_rank(&students, "s3"), Some(1));
        assert_eq!(class_rank(&students, "s4"), None);
        assert_eq!(class_rank(&students, "missing"), None);
    }
}
