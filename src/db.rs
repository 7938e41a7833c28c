use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::config::EmailPolicy;
use crate::fields;
use crate::level::points_from_i64;
use crate::models::{ActionType, ReviewOutcome, StudentRecord, SubmissionStatus};
use crate::progression::ActivityLog;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let action_types = vec![
        ("linkedin_post", "Post LinkedIn", 10),
        ("event", "Participation à un événement", 20),
        ("association", "Création d'association", 50),
    ];

    for (id, label, points) in action_types {
        sqlx::query(
            r#"
            INSERT INTO campus.action_types (id, label, points)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET label = EXCLUDED.label, points = EXCLUDED.points
            "#,
        )
        .bind(id)
        .bind(label)
        .bind(points)
        .execute(pool)
        .await?;
    }

    let students = vec![
        (
            Uuid::parse_str("6f1c2b8e-5a0d-4f5e-9d53-1f0b8a7c2e41")?,
            "lea.martin@campus-nord.fr",
            "Léa",
            "Martin",
            Some("B1"),
            180,
            9,
        ),
        (
            Uuid::parse_str("b2f4e0c1-7d3a-4c8b-a6e9-30d5f1c4b9a7")?,
            "hugo.bernard@campus-nord.fr",
            "Hugo",
            "Bernard",
            Some("B1"),
            180,
            7,
        ),
        (
            Uuid::parse_str("0d9a7e35-c1b2-4f6d-8e4a-9b3c2d1e0f58")?,
            "ines.dubois@campus-sud.fr",
            "Inès",
            "Dubois",
            Some("B2"),
            1040,
            31,
        ),
        (
            Uuid::parse_str("e7c3a1d9-2b4f-4e6a-b8c0-5d7f9a1b3c2e")?,
            "noah.petit@campus-sud.fr",
            "Noah",
            "Petit",
            None,
            0,
            0,
        ),
    ];

    for (id, email, first_name, last_name, classe, points, actions) in students {
        upsert_student(pool, id, email, first_name, last_name, classe, points, actions).await?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn upsert_student(
    pool: &PgPool,
    id: Uuid,
    email: &str,
    first_name: &str,
    last_name: &str,
    classe: Option<&str>,
    total_points: i32,
    actions_count: i32,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO campus.students
        (id, email, first_name, last_name, classe, total_points, actions_count, last_update)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (email) DO UPDATE
        SET first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            classe = EXCLUDED.classe,
            total_points = EXCLUDED.total_points,
            actions_count = EXCLUDED.actions_count,
            last_update = NOW()
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(classe)
    .bind(total_points)
    .bind(actions_count)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn student_from_row(row: &PgRow) -> anyhow::Result<StudentRecord> {
    let email: String = row.get("email");
    let total_points: i32 = row.get("total_points");
    let actions_count: i32 = row.get("actions_count");

    Ok(StudentRecord {
        total_points: points_from_i64(total_points.into())
            .with_context(|| format!("corrupt point total for {email}"))?,
        actions_count: u32::try_from(actions_count)
            .with_context(|| format!("corrupt action count for {email}"))?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        classe: row.get("classe"),
        last_update: row.get("last_update"),
        email,
    })
}

#[instrument(skip(pool))]
pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<StudentRecord>> {
    let rows = sqlx::query(
        "SELECT email, first_name, last_name, classe, total_points, actions_count, last_update \
         FROM campus.students \
         ORDER BY email",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

/// Days on which each student had a submission validated.
#[instrument(skip(pool))]
pub async fn fetch_activity(pool: &PgPool) -> anyhow::Result<ActivityLog> {
    let rows = sqlx::query(
        "SELECT st.email, s.reviewed_at \
         FROM campus.submissions s \
         JOIN campus.students st ON st.id = s.student_id \
         WHERE s.status = 'validated' AND s.reviewed_at IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut activity: ActivityLog = HashMap::new();
    for row in rows {
        let reviewed_at: DateTime<Utc> = row.get("reviewed_at");
        activity
            .entry(row.get("email"))
            .or_default()
            .push(reviewed_at.date_naive());
    }

    Ok(activity)
}

#[instrument(skip(pool))]
pub async fn fetch_action_types(
    pool: &PgPool,
) -> anyhow::Result<Vec<(ActionType, Option<serde_json::Value>)>> {
    let rows = sqlx::query("SELECT id, label, points, fields FROM campus.action_types ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut action_types = Vec::with_capacity(rows.len());
    for row in rows {
        let points: i32 = row.get("points");
        action_types.push((
            ActionType {
                id: row.get("id"),
                label: row.get("label"),
                points: points_from_i64(points.into())?,
            },
            row.get("fields"),
        ));
    }

    Ok(action_types)
}

#[instrument(skip(pool, policy))]
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    policy: &EmailPolicy,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        first_name: String,
        last_name: String,
        classe: Option<String>,
        #[serde(default)]
        total_points: i64,
        #[serde(default)]
        actions_count: i64,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let email = policy
            .validate(&row.email)
            .with_context(|| format!("row {}", line + 1))?;
        let points = points_from_i64(row.total_points)
            .with_context(|| format!("row {} ({email})", line + 1))?;
        let actions = parse_actions_count(row.actions_count)
            .with_context(|| format!("row {} ({email})", line + 1))?;
        let classe = row.classe.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let changed = upsert_student(
            pool,
            Uuid::new_v4(),
            &email,
            row.first_name.trim(),
            row.last_name.trim(),
            classe,
            i32::try_from(points).context("point total exceeds storage range")?,
            actions,
        )
        .await?;

        if changed {
            imported += 1;
        }
    }

    Ok(imported)
}

fn parse_actions_count(count: i64) -> anyhow::Result<i32> {
    if count < 0 {
        bail!("action count cannot be negative (got {count})");
    }
    i32::try_from(count).context("action count exceeds storage range")
}

#[instrument(skip(pool, values, policy))]
pub async fn submit_action(
    pool: &PgPool,
    email: &str,
    action_type: &str,
    values: &HashMap<String, String>,
    policy: &EmailPolicy,
) -> anyhow::Result<Uuid> {
    let email = policy.validate(email)?;

    let student_id: Uuid = sqlx::query("SELECT id FROM campus.students WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no student registered as {email}"))?
        .get("id");

    let stored_fields: Option<serde_json::Value> =
        sqlx::query("SELECT fields FROM campus.action_types WHERE id = $1")
            .bind(action_type)
            .fetch_optional(pool)
            .await?
            .with_context(|| format!("unknown action type {action_type}"))?
            .get("fields");

    let specs = fields::resolve_fields(action_type, stored_fields.as_ref());
    fields::validate_submission(&specs, values)?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO campus.submissions (id, student_id, action_type, payload, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(action_type)
    .bind(sqlx::types::Json(values))
    .bind(SubmissionStatus::Pending.as_str())
    .execute(pool)
    .await?;

    tracing::info!(%id, email = %email, action_type, "submission recorded");
    Ok(id)
}

/// Validates or rejects a pending submission. Validation credits the action
/// type's points in the same transaction.
#[instrument(skip(pool))]
pub async fn review_submission(
    pool: &PgPool,
    submission_id: Uuid,
    approve: bool,
) -> anyhow::Result<ReviewOutcome> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT s.student_id, st.email, t.points
        FROM campus.submissions s
        JOIN campus.students st ON st.id = s.student_id
        JOIN campus.action_types t ON t.id = s.action_type
        WHERE s.id = $1 AND s.status = 'pending'
        FOR UPDATE OF s
        "#,
    )
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        bail!("submission {submission_id} does not exist or was already reviewed");
    };

    let student_id: Uuid = row.get("student_id");
    let email: String = row.get("email");
    let points: i32 = row.get("points");
    let (status, awarded) = if approve {
        (SubmissionStatus::Validated, points)
    } else {
        (SubmissionStatus::Rejected, 0)
    };

    sqlx::query(
        r#"
        UPDATE campus.submissions
        SET status = $2, points_awarded = $3, reviewed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(submission_id)
    .bind(status.as_str())
    .bind(awarded)
    .execute(&mut *tx)
    .await?;

    if approve {
        sqlx::query(
            r#"
            UPDATE campus.students
            SET total_points = total_points + $2,
                actions_count = actions_count + 1,
                last_update = NOW()
            WHERE id = $1
            "#,
        )
        .bind(student_id)
        .bind(awarded)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(%submission_id, email = %email, status = status.as_str(), awarded, "submission reviewed");

    Ok(ReviewOutcome {
        submission_id,
        email,
        status,
        points_awarded: points_from_i64(awarded.into())?,
    })
}

/// Administrative correction of a student's point total.
#[instrument(skip(pool))]
pub async fn adjust_points(pool: &PgPool, email: &str, points: i64) -> anyhow::Result<()> {
    let points = points_from_i64(points)?;
    let points = i32::try_from(points).context("point total exceeds storage range")?;

    let result = sqlx::query(
        r#"
        UPDATE campus.students
        SET total_points = $2, last_update = NOW()
        WHERE email = $1
        "#,
    )
    .bind(email.trim().to_ascii_lowercase())
    .bind(points)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("no student registered as {email}");
    }

    tracing::info!(email, points, "point total adjusted");
    Ok(())
}
