use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use campus_progression::badges::badge_info;
use campus_progression::config::Settings;
use campus_progression::db;
use campus_progression::eligibility::RuleTable;
use campus_progression::fields;
use campus_progression::models::StudentRecord;
use campus_progression::progression::{filter_classe, ActivityLog, ProgressionEngine};
use campus_progression::report;
use campus_progression::store::{snapshot_or_cached, FileStore, KeyValueStore};

const SNAPSHOT_KEY: &str = "leaderboard_snapshot";

#[derive(Parser)]
#[command(name = "campus-progression")]
#[command(about = "Points, levels and badges for the campus engagement platform", long_about = None)]
struct Cli {
    /// JSON badge rule table replacing the built-in rules
    #[arg(long, global = true)]
    badge_rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import students from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the leaderboard
    Leaderboard {
        #[arg(long)]
        classe: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one student's rank, level, streak and badges
    Profile {
        #[arg(long)]
        email: String,
    },
    /// List action types and their form fields
    ActionTypes,
    /// Submit an action for review
    Submit {
        #[arg(long)]
        email: String,
        #[arg(long)]
        action: String,
        /// Form value as name=value, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        values: Vec<(String, String)>,
    },
    /// Validate or reject a pending submission
    Review {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        reject: bool,
    },
    /// Set a student's point total
    Adjust {
        #[arg(long)]
        email: String,
        #[arg(long, allow_negative_numbers = true)]
        points: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        classe: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw}"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campus_progression=info,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = Settings::database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Fetches the snapshot from Postgres, falling back to the last cached copy.
async fn load_snapshot(store: &dyn KeyValueStore) -> anyhow::Result<(Vec<StudentRecord>, ActivityLog)> {
    let live = async {
        let pool = connect().await?;
        let students = db::fetch_students(&pool).await?;
        let activity = db::fetch_activity(&pool).await?;
        anyhow::Ok((students, activity))
    };

    snapshot_or_cached(live.await, store, SNAPSHOT_KEY)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::from_env();
    let store = FileStore::new(&settings.cache_path);

    let rules = match &cli.badge_rules {
        Some(path) => RuleTable::load(path)?,
        None => RuleTable::default(),
    };
    let engine = ProgressionEngine::new(rules);
    let today = chrono::Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let imported = db::import_csv(&pool, &csv, &settings.email_policy).await?;
            println!("Imported {imported} students from {}.", csv.display());
        }
        Commands::Leaderboard { classe, limit } => {
            let (students, activity) = load_snapshot(&store).await?;
            let progress = engine.evaluate(&students, &activity, today);
            let rows: Vec<_> = filter_classe(&progress, classe.as_deref()).take(limit).collect();

            if rows.is_empty() {
                println!("No students found for this scope.");
                return Ok(());
            }

            for row in rows {
                let rank = match (&classe, row.class_rank) {
                    (Some(_), Some(class_rank)) => class_rank,
                    _ => row.global_rank,
                };
                println!(
                    "#{:<3} {:<28} {:>6} pts  lvl {:>2} {:<9} {} badges",
                    rank,
                    row.display_name,
                    row.total_points,
                    row.level.level,
                    row.level.name,
                    row.earned_badges.len()
                );
            }
        }
        Commands::Profile { email } => {
            let email = settings.email_policy.validate(&email)?;
            let (students, activity) = load_snapshot(&store).await?;
            let Some(profile) = engine.profile(&students, &activity, today, &email) else {
                bail!("no student registered as {email}");
            };

            println!("{} ({})", profile.display_name, profile.email);
            println!(
                "Rank #{} overall{}",
                profile.global_rank,
                profile
                    .class_rank
                    .zip(profile.classe.as_deref())
                    .map(|(rank, classe)| format!(", #{rank} in {classe}"))
                    .unwrap_or_default()
            );
            println!(
                "Level {} {} [{}] {:.0}% toward {} pts",
                profile.level.level,
                profile.level.name,
                profile.level_color,
                profile.level.progress_percent,
                profile.level.next_level_threshold
            );
            println!(
                "{} pts from {} actions, streak {} (best {})",
                profile.total_points,
                profile.actions_count,
                profile.streak.current_streak,
                profile.streak.longest_streak
            );
            println!("Badges {:.0}% complete:", profile.badge_completion * 100.0);
            for id in &profile.earned_badges {
                let badge = badge_info(id);
                println!("  {} {} - {}", badge.icon, badge.name, badge.description);
            }
        }
        Commands::ActionTypes => {
            let pool = connect().await?;
            for (action_type, stored) in db::fetch_action_types(&pool).await? {
                println!("{} ({}): {} pts", action_type.label, action_type.id, action_type.points);
                for field in fields::resolve_fields(&action_type.id, stored.as_ref()) {
                    println!(
                        "  - {} [{}]{}",
                        field.name,
                        field.label,
                        if field.required { " required" } else { "" }
                    );
                }
            }
        }
        Commands::Submit {
            email,
            action,
            values,
        } => {
            let pool = connect().await?;
            let values: HashMap<String, String> = values.into_iter().collect();
            let id =
                db::submit_action(&pool, &email, &action, &values, &settings.email_policy).await?;
            println!("Submission {id} awaiting review.");
        }
        Commands::Review { id, reject } => {
            let pool = connect().await?;
            let outcome = db::review_submission(&pool, id, !reject).await?;
            println!(
                "Submission {} {} for {} (+{} pts).",
                outcome.submission_id,
                outcome.status.as_str(),
                outcome.email,
                outcome.points_awarded
            );
        }
        Commands::Adjust { email, points } => {
            let pool = connect().await?;
            db::adjust_points(&pool, &email, points).await?;
            println!("Set {email} to {points} pts.");
        }
        Commands::Report { classe, limit, out } => {
            let (students, activity) = load_snapshot(&store).await?;
            let progress = engine.evaluate(&students, &activity, today);
            let report = report::build_report(classe.as_deref(), today, &progress, limit);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
