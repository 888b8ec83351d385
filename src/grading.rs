//! Batch grading of submission files.
//!
//! Each file is matched to its student, assessed by the model and, on
//! success, folded into the student's performance. Files that cannot be read, assessed or
//! matched to a student are reported and left out; they never move a
//! student's metric.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::assessment::{Assessment, AssessmentError, GenerativeClient};
use crate::db;
use crate::models::{PerformanceUpdate, StudentRecord, SubmissionEvent};
use crate::scoring;

pub const MAX_SUBMISSION_BYTES: u64 = 10 * 1024 * 1024;
const ACCEPTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnsupportedType(String),
    TooLarge(u64),
    Empty,
    Unreadable(String),
    NoStudentId,
    AssessmentFailed(String),
    UnknownStudent(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType(ext) => write!(f, "unsupported file type '{ext}'"),
            Self::TooLarge(bytes) => write!(
                f,
                "file is {bytes} bytes, limit is {MAX_SUBMISSION_BYTES}"
            ),
            Self::Empty => write!(f, "file is empty"),
            Self::Unreadable(err) => write!(f, "could not read file: {err}"),
            Self::NoStudentId => write!(f, "file name does not start with a student id"),
            Self::AssessmentFailed(err) => write!(f, "assessment failed: {err}"),
            Self::UnknownStudent(id) => write!(f, "no student with id {id}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedSubmission {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct GradingSummary {
    pub updates: Vec<PerformanceUpdate>,
    pub skipped: Vec<SkippedSubmission>,
}

/// Student id encoded in a submission file name: the stem up to the first
/// underscore, e.g. `42_essay.txt` belongs to student `42`.
pub fn student_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.split('_').next().unwrap_or(stem).trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Checks type and size, then reads the submission text.
pub fn read_submission(path: &Path) -> Result<String, SkipReason> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(SkipReason::UnsupportedType(extension));
    }

    let metadata = std::fs::metadata(path).map_err(|err| SkipReason::Unreadable(err.to_string()))?;
    if metadata.len() > MAX_SUBMISSION_BYTES {
        return Err(SkipReason::TooLarge(metadata.len()));
    }

    let text =
        std::fs::read_to_string(path).map_err(|err| SkipReason::Unreadable(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(SkipReason::Empty);
    }

    Ok(text)
}

/// Decides what a graded file does to its student: an update computed from
/// the record, or the reason it is left alone. A failed assessment never
/// turns into an update.
pub fn plan_update(
    student_id: &str,
    record: Option<&StudentRecord>,
    assessment: Result<Assessment, AssessmentError>,
    graded_at: DateTime<Utc>,
) -> Result<PerformanceUpdate, SkipReason> {
    let record = record.ok_or_else(|| SkipReason::UnknownStudent(student_id.to_string()))?;
    let assessment = assessment.map_err(|err| SkipReason::AssessmentFailed(err.to_string()))?;

    let event = SubmissionEvent {
        quality_score: assessment.score,
        feedback: assessment.feedback,
        graded_at,
    };
    Ok(scoring::apply_submission(record, &event))
}

fn event_of(update: &PerformanceUpdate) -> SubmissionEvent {
    SubmissionEvent {
        quality_score: update.quality_score,
        feedback: update.feedback.clone(),
        graded_at: update.graded_at,
    }
}

pub async fn grade_files(
    pool: &PgPool,
    client: &GenerativeClient,
    paths: &[PathBuf],
    dry_run: bool,
) -> anyhow::Result<GradingSummary> {
    let mut summary = GradingSummary::default();

    for path in paths {
        let skip = |reason: SkipReason| {
            tracing::warn!(file = %path.display(), %reason, "skipping submission");
            SkippedSubmission {
                path: path.clone(),
                reason,
            }
        };

        let Some(student_id) = student_id_from_path(path) else {
            summary.skipped.push(skip(SkipReason::NoStudentId));
            continue;
        };

        let text = match read_submission(path) {
            Ok(text) => text,
            Err(reason) => {
                summary.skipped.push(skip(reason));
                continue;
            }
        };

        // Look the student up before paying for an assessment.
        let Some(record) = db::fetch_student(pool, &student_id).await? else {
            summary.skipped.push(skip(SkipReason::UnknownStudent(student_id)));
            continue;
        };

        let assessment = client.assess(&text).await;
        let planned = match plan_update(&student_id, Some(&record), assessment, Utc::now()) {
            Ok(planned) => planned,
            Err(reason) => {
                summary.skipped.push(skip(reason));
                continue;
            }
        };
        tracing::debug!(student_id = %student_id, score = planned.quality_score, "submission assessed");

        // The locked read inside the store is authoritative for real writes.
        let update = if dry_run {
            Some(planned)
        } else {
            db::apply_submission(pool, &student_id, &event_of(&planned)).await?
        };

        match update {
            Some(update) => {
                tracing::info!(
                    student_id = %student_id,
                    previous = update.previous,
                    performance = update.performance,
                    dry_run,
                    "performance updated"
                );
                summary.updates.push(update);
            }
            None => summary.skipped.push(skip(SkipReason::UnknownStudent(student_id))),
        }
    }

    Ok(summary)
}
