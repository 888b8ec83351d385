use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub grade: String,
    pub performance: i32,
    pub last_submission_date: Option<DateTime<Utc>>,
    pub last_feedback: Option<String>,
}

/// A single graded submission. Never persisted on its own; it only moves
/// the owning student's record.
#[derive(Debug, Clone)]
pub struct SubmissionEvent {
    pub quality_score: f64,
    pub feedback: String,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PerformanceUpdate {
    pub student_id: String,
    pub previous: i32,
    pub consistency_factor: f64,
    pub performance: i32,
    pub quality_score: f64,
    pub feedback: String,
    pub graded_at: DateTime<Utc>,
}

impl PerformanceUpdate {
    pub fn delta(&self) -> i32 {
        self.performance - self.previous
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StandingSummary {
    pub total: usize,
    pub top_performers: usize,
    pub on_track: usize,
    pub needs_support: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBand {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct ContentTemplate {
    pub id: Uuid,
    pub kind: String,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
