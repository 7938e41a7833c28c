use std::collections::HashSet;

use crate::models::Badge;

pub const DEFAULT_BADGE_COLOR: &str = "gray";
pub const FALLBACK_BADGE_ICON: &str = "🏅";

pub struct BadgeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl BadgeDef {
    fn to_badge(&self) -> Badge {
        Badge {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            color: self.color.to_string(),
        }
    }
}

pub static CATALOG: &[BadgeDef] = &[
    BadgeDef {
        id: "first_action",
        name: "Premier pas",
        description: "Première action validée",
        icon: "🎯",
        color: "green",
    },
    BadgeDef {
        id: "top_100",
        name: "Top 100",
        description: "Classé dans le top 100",
        icon: "📈",
        color: "gray",
    },
    BadgeDef {
        id: "top_50",
        name: "Top 50",
        description: "Classé dans le top 50",
        icon: "🥉",
        color: "blue",
    },
    BadgeDef {
        id: "top_20",
        name: "Top 20",
        description: "Classé dans le top 20",
        icon: "🥈",
        color: "green",
    },
    BadgeDef {
        id: "top_10",
        name: "Top 10",
        description: "Classé dans le top 10",
        icon: "🥇",
        color: "orange",
    },
    BadgeDef {
        id: "top_3",
        name: "Podium",
        description: "Classé dans le top 3",
        icon: "🏆",
        color: "purple",
    },
    BadgeDef {
        id: "champion",
        name: "Champion",
        description: "Premier du classement général",
        icon: "👑",
        color: "red",
    },
    BadgeDef {
        id: "class_champion",
        name: "Champion de classe",
        description: "Premier du classement de sa classe",
        icon: "🎖️",
        color: "orange",
    },
    BadgeDef {
        id: "streak_7",
        name: "Régulier",
        description: "7 jours d'activité consécutifs",
        icon: "🔥",
        color: "orange",
    },
    BadgeDef {
        id: "streak_30",
        name: "Inarrêtable",
        description: "30 jours d'activité consécutifs",
        icon: "⚡",
        color: "red",
    },
    BadgeDef {
        id: "level_5",
        name: "Expert",
        description: "Atteindre le niveau 5",
        icon: "⭐",
        color: "green",
    },
    BadgeDef {
        id: "level_10",
        name: "Légende",
        description: "Atteindre le niveau 10",
        icon: "🌟",
        color: "purple",
    },
];

pub fn find_badge(id: &str) -> Option<&'static BadgeDef> {
    CATALOG.iter().find(|b| b.id == id)
}

/// Catalog metadata for `id`, or a generic badge for ids the catalog
/// doesn't know.
pub fn badge_info(id: &str) -> Badge {
    match find_badge(id) {
        Some(def) => def.to_badge(),
        None => Badge {
            id: id.to_string(),
            name: id.to_string(),
            description: "Badge".to_string(),
            icon: FALLBACK_BADGE_ICON.to_string(),
            color: DEFAULT_BADGE_COLOR.to_string(),
        },
    }
}

/// Share of the catalog present in `earned`, in `[0, 1]`.
pub fn badge_completion_ratio<'a, I>(earned: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    if CATALOG.is_empty() {
        return 0.0;
    }
    let valid: HashSet<&str> = earned
        .into_iter()
        .filter(|id| find_badge(id).is_some())
        .collect();
    (valid.len() as f64 / CATALOG.len() as f64).clamp(0.0, 1.0)
}
