use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Row};

use crate::config::DatabaseArgs;
use crate::models::{ContentTemplate, PerformanceUpdate, StudentRecord, SubmissionEvent};
use crate::scoring;

const STUDENT_COLUMNS: &str =
    "id, name, email, grade, performance, last_submission_date, last_feedback";

pub async fn connect(args: &DatabaseArgs) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(args.max_connections)
        .connect(args.url()?)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn student_from_row(row: &PgRow) -> StudentRecord {
    StudentRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        grade: row.get("grade"),
        performance: row.get("performance"),
        last_submission_date: row.get("last_submission_date"),
        last_feedback: row.get("last_feedback"),
    }
}

/// Checks a record entering the store through a creation path.
fn validate_student(student: &StudentRecord, now: DateTime<Utc>) -> anyhow::Result<()> {
    ensure!(
        (0..=100).contains(&student.performance),
        "performance {} for student {} is outside 0..=100",
        student.performance,
        student.id
    );
    if let Some(last) = student.last_submission_date {
        ensure!(
            last <= now,
            "last submission {} for student {} is in the future",
            last.to_rfc3339(),
            student.id
        );
    }
    Ok(())
}

async fn upsert_student<'e, E>(executor: E, student: &StudentRecord) -> anyhow::Result<u64>
where
    E: PgExecutor<'e>,
{
    validate_student(student, Utc::now())?;

    let result = sqlx::query(
        r#"
        INSERT INTO eduassist.students
        (id, name, email, grade, performance, last_submission_date, last_feedback)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, email = EXCLUDED.email, grade = EXCLUDED.grade
        "#,
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(&student.email)
    .bind(&student.grade)
    .bind(student.performance)
    .bind(student.last_submission_date)
    .bind(&student.last_feedback)
    .execute(executor)
    .await
    .with_context(|| format!("failed to store student {}", student.id))?;

    Ok(result.rows_affected())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = [
        ("1", "John Doe", "john.doe@school.com", 88, "Strong analytical skills, needs to improve problem-solving speed"),
        ("2", "Jane Smith", "jane.smith@school.com", 92, "Excellent work, consistently high performer"),
        ("3", "Mike Johnson", "mike.j@school.com", 85, "Good theoretical understanding, needs more practice"),
        ("4", "Sarah Williams", "sarah.w@school.com", 95, "Outstanding performance in all areas"),
        ("5", "Alex Chen", "alex.c@school.com", 89, "Strong problem-solving skills, good progress"),
        ("6", "Emily Brown", "emily.b@school.com", 87, "Consistent performer, good understanding"),
        ("7", "David Kim", "david.k@school.com", 91, "Excellent analytical abilities"),
        ("8", "Maria Garcia", "maria.g@school.com", 86, "Good progress, needs more attention to detail"),
        ("9", "James Wilson", "james.w@school.com", 83, "Showing improvement, needs more practice"),
        ("10", "Lisa Anderson", "lisa.a@school.com", 90, "Very consistent, strong understanding"),
    ];

    for (id, name, email, performance, feedback) in students {
        upsert_student(
            pool,
            &StudentRecord {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                grade: "12th".to_string(),
                performance,
                last_submission_date: None,
                last_feedback: Some(feedback.to_string()),
            },
        )
        .await?;
    }

    Ok(())
}

pub async fn fetch_student(pool: &PgPool, id: &str) -> anyhow::Result<Option<StudentRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {STUDENT_COLUMNS} FROM eduassist.students WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch student {id}"))?;

    Ok(row.as_ref().map(student_from_row))
}

/// All students, highest performance first.
pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<StudentRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {STUDENT_COLUMNS} FROM eduassist.students ORDER BY performance DESC, name"
    ))
    .fetch_all(pool)
    .await
    .context("failed to fetch students")?;

    Ok(rows.iter().map(student_from_row).collect())
}

/// Applies a graded submission to one student inside a single transaction.
///
/// The row is locked for the duration, so two gradings for the same student
/// cannot both read the same starting performance. Returns `None` when the
/// student does not exist.
pub async fn apply_submission(
    pool: &PgPool,
    student_id: &str,
    event: &SubmissionEvent,
) -> anyhow::Result<Option<PerformanceUpdate>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!(
        "SELECT {STUDENT_COLUMNS} FROM eduassist.students WHERE id = $1 FOR UPDATE"
    ))
    .bind(student_id)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("failed to lock student {student_id}"))?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Ok(None);
    };

    let record = student_from_row(&row);
    let update = scoring::apply_submission(&record, event);

    sqlx::query(
        r#"
        UPDATE eduassist.students
        SET performance = $2, last_feedback = $3, last_submission_date = $4
        WHERE id = $1
        "#,
    )
    .bind(student_id)
    .bind(update.performance)
    .bind(&update.feedback)
    .bind(update.graded_at)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("failed to update student {student_id}"))?;

    tx.commit().await?;
    Ok(Some(update))
}

/// Names a CSV data row for error messages; `index` counts from zero.
fn csv_row_label(index: usize, id: &str, email: &str) -> String {
    format!("CSV row {} (student {id}, {email})", index + 1)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: String,
        name: String,
        email: String,
        grade: String,
        performance: i32,
        last_submission_date: Option<DateTime<Utc>>,
        last_feedback: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut stored = 0usize;
    // All rows land together or not at all.
    let mut tx = pool.begin().await?;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let row_label = csv_row_label(line, &row.id, &row.email);
        let student = StudentRecord {
            id: row.id,
            name: row.name,
            email: row.email,
            grade: row.grade,
            performance: row.performance,
            last_submission_date: row.last_submission_date,
            last_feedback: row.last_feedback.filter(|text| !text.is_empty()),
        };

        let affected = upsert_student(&mut *tx, &student)
            .await
            .with_context(|| format!("failed to import {row_label}"))?;
        if affected > 0 {
            stored += 1;
        }
    }

    tx.commit().await.context("failed to commit CSV import")?;
    Ok(stored)
}

pub async fn insert_content_template(
    pool: &PgPool,
    template: &ContentTemplate,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO eduassist.content_templates
        (id, kind, topic, title, content, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(template.id)
    .bind(&template.kind)
    .bind(&template.topic)
    .bind(&template.title)
    .bind(&template.content)
    .bind(template.created_at)
    .execute(pool)
    .await
    .context("failed to store content template")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn student(performance: i32, last_submission_date: Option<DateTime<Utc>>) -> StudentRecord {
        StudentRecord {
            id: "21".to_string(),
            name: "Rachel Martinez".to_string(),
            email: "rachel.m@school.com".to_string(),
            grade: "12th".to_string(),
            performance,
            last_submission_date,
            last_feedback: None,
        }
    }

    #[test]
    fn accepts_past_and_missing_submission_dates() {
        assert!(validate_student(&student(75, None), now()).is_ok());
        assert!(validate_student(&student(75, Some(now() - Duration::days(40))), now()).is_ok());
        assert!(validate_student(&student(0, Some(now())), now()).is_ok());
    }

    #[test]
    fn rejects_future_submission_date() {
        let err = validate_student(&student(75, Some(now() + Duration::days(365))), now())
            .unwrap_err();
        assert!(err.to_string().contains("is in the future"));
        assert!(err.to_string().contains("student 21"));
    }

    #[test]
    fn import_errors_name_the_row() {
        assert_eq!(
            csv_row_label(2, "31", "kiara.p@school.com"),
            "CSV row 3 (student 31, kiara.p@school.com)"
        );
    }

    #[test]
    fn rejects_out_of_range_performance() {
        assert!(validate_student(&student(101, None), now()).is_err());
        assert!(validate_student(&student(-1, None), now()).is_err());
    }
}
