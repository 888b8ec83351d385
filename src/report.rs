use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{ScoreBand, StandingSummary, StudentRecord};
use crate::scoring;

/// Highest performance first; ties broken by name so listings are stable.
pub fn rank_students(students: &[StudentRecord]) -> Vec<StudentRecord> {
    let mut ranked = students.to_vec();
    ranked.sort_by(|a, b| b.performance.cmp(&a.performance).then_with(|| a.name.cmp(&b.name)));
    ranked
}

/// Case-insensitive match against name or email.
pub fn filter_students<'a>(students: &'a [StudentRecord], search: &str) -> Vec<&'a StudentRecord> {
    let needle = search.trim().to_lowercase();
    students
        .iter()
        .filter(|student| {
            needle.is_empty()
                || student.name.to_lowercase().contains(&needle)
                || student.email.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn summarize_standing<'a, I>(students: I) -> StandingSummary
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut summary = StandingSummary::default();
    for student in students {
        summary.total += 1;
        match student.performance {
            90.. => summary.top_performers += 1,
            70..=89 => summary.on_track += 1,
            _ => summary.needs_support += 1,
        }
    }
    summary
}

pub fn score_bands(students: &[StudentRecord]) -> Vec<ScoreBand> {
    let mut bands = vec![
        ScoreBand { label: "90-100%", count: 0 },
        ScoreBand { label: "80-89%", count: 0 },
        ScoreBand { label: "70-79%", count: 0 },
        ScoreBand { label: "Below 70%", count: 0 },
    ];

    for student in students {
        let index = match student.performance {
            90.. => 0,
            80..=89 => 1,
            70..=79 => 2,
            _ => 3,
        };
        bands[index].count += 1;
    }

    bands
}

/// Students who never submitted or whose last submission is at least
/// [`scoring::RECENCY_WINDOW_DAYS`] days old.
pub fn inactive_students(students: &[StudentRecord], now: DateTime<Utc>) -> Vec<&StudentRecord> {
    students
        .iter()
        .filter(|student| match student.last_submission_date {
            None => true,
            Some(last) => scoring::days_since(last, now) >= scoring::RECENCY_WINDOW_DAYS,
        })
        .collect()
}

pub fn build_report(students: &[StudentRecord], now: DateTime<Utc>) -> String {
    let ranked = rank_students(students);
    let summary = summarize_standing(&ranked);
    let bands = score_bands(&ranked);

    let mut output = String::new();

    let _ = writeln!(output, "# Student Performance Report");
    let _ = writeln!(output, "Generated {}", now.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Standing");
    let _ = writeln!(output, "- Total students: {}", summary.total);
    let _ = writeln!(output, "- Top performers (90+): {}", summary.top_performers);
    let _ = writeln!(output, "- On track (70-89): {}", summary.on_track);
    let _ = writeln!(output, "- Needs support (<70): {}", summary.needs_support);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Distribution");
    for band in &bands {
        let _ = writeln!(output, "- {}: {}", band.label, band.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Rankings");
    if ranked.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for (index, student) in ranked.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}) {}%",
                index + 1,
                student.name,
                student.email,
                student.performance
            );
        }
    }

    let mut recent: Vec<&StudentRecord> = ranked
        .iter()
        .filter(|student| student.last_submission_date.is_some())
        .collect();
    recent.sort_by(|a, b| b.last_submission_date.cmp(&a.last_submission_date));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");
    if recent.is_empty() {
        let _ = writeln!(output, "No graded submissions yet.");
    } else {
        for student in recent.iter().take(5) {
            let submitted = student
                .last_submission_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                student.name,
                submitted,
                student.last_feedback.as_deref().unwrap_or("No feedback yet")
            );
        }
    }

    let inactive = inactive_students(&ranked, now);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Inactive Students");
    if inactive.is_empty() {
        let _ = writeln!(output, "Everyone has submitted within the last 30 days.");
    } else {
        for student in inactive {
            let last = student
                .last_submission_date
                .map(|date| format!("last submission {}", date.format("%Y-%m-%d")))
                .unwrap_or_else(|| "no submissions".to_string());
            let _ = writeln!(output, "- {} ({})", student.name, last);
        }
    }

    output
}
