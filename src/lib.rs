pub mod badges;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod fields;
pub mod level;
pub mod models;
pub mod progression;
pub mod ranking;
pub mod report;
pub mod store;
pub mod streak;

pub use badges::{badge_completion_ratio, badge_info};
pub use error::ProgressionError;
pub use level::{calculate_level, level_color};
pub use progression::ProgressionEngine;
pub use ranking::compute_ranks;
