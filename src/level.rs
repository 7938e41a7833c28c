use crate::error::ProgressionError;
use crate::models::{LevelInfo, LevelName};

struct Tier {
    level: u32,
    min: u32,
    max: u32,
    name: LevelName,
}

/// Must stay sorted and contiguous.
static TIERS: &[Tier] = &[
    Tier { level: 1, min: 0, max: 50, name: LevelName::Novice },
    Tier { level: 2, min: 50, max: 100, name: LevelName::Novice },
    Tier { level: 3, min: 100, max: 150, name: LevelName::Apprenti },
    Tier { level: 4, min: 150, max: 200, name: LevelName::Apprenti },
    Tier { level: 5, min: 200, max: 300, name: LevelName::Expert },
    Tier { level: 6, min: 300, max: 400, name: LevelName::Expert },
    Tier { level: 7, min: 400, max: 500, name: LevelName::Maitre },
    Tier { level: 8, min: 500, max: 600, name: LevelName::Maitre },
    Tier { level: 9, min: 600, max: 750, name: LevelName::Legende },
    Tier { level: 10, min: 750, max: 1000, name: LevelName::Legende },
];

pub const IMMORTEL_THRESHOLD: u32 = 1000;
pub const IMMORTEL_STEP: u32 = 250;

pub fn calculate_level(points: u32) -> LevelInfo {
    if let Some(tier) = TIERS.iter().find(|t| points >= t.min && points < t.max) {
        return LevelInfo {
            level: tier.level,
            name: tier.name,
            progress_percent: progress(points, tier.min, tier.max),
            next_level_threshold: tier.max,
        };
    }

    let steps = (points - IMMORTEL_THRESHOLD) / IMMORTEL_STEP;
    let level = steps + 11;
    let min = IMMORTEL_THRESHOLD + steps * IMMORTEL_STEP;
    let next = (level - 10)
        .saturating_mul(IMMORTEL_STEP)
        .saturating_add(IMMORTEL_THRESHOLD);

    LevelInfo {
        level,
        name: LevelName::Immortel,
        progress_percent: progress(points, min, min.saturating_add(IMMORTEL_STEP)),
        next_level_threshold: next,
    }
}

fn progress(points: u32, min: u32, max: u32) -> f64 {
    if max <= min {
        return 100.0;
    }
    let ratio = (points.saturating_sub(min)) as f64 / (max - min) as f64;
    (ratio * 100.0).clamp(0.0, 100.0)
}

/// Badge colour for a level band, as shown next to the level name.
pub fn level_color(level: u32) -> &'static str {
    match level {
        0..=2 => "gray",
        3..=4 => "blue",
        5..=6 => "green",
        7..=8 => "orange",
        9..=10 => "purple",
        _ => "red",
    }
}

/// Converts a stored point total into the engine's unsigned domain.
pub fn points_from_i64(points: i64) -> Result<u32, ProgressionError> {
    if points < 0 {
        return Err(ProgressionError::NegativePoints(points));
    }
    u32::try_from(points).map_err(|_| ProgressionError::PointsOverflow(points))
}
