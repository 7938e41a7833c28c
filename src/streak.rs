use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::models::StreakInfo;

/// Derives streak counters from the days a student was active.
///
/// The current streak survives until a whole day is missed, so activity
/// yesterday still counts when nothing has happened today yet.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> StreakInfo {
    let days: BTreeSet<NaiveDate> = days.iter().copied().filter(|d| *d <= today).collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for day in &days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let current = match previous {
        Some(last) if last == today || last.succ_opt() == Some(today) => run,
        _ => 0,
    };

    StreakInfo {
        current_streak: current,
        longest_streak: longest,
    }
}
