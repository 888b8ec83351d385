use chrono::{DateTime, Utc};

use crate::models::{PerformanceUpdate, StudentRecord, SubmissionEvent};

const PREVIOUS_WEIGHT: f64 = 0.7;
const SUBMISSION_WEIGHT: f64 = 0.3;
const CONSISTENCY_BOOST: f64 = 0.1;
/// Days over which recency decays; also the inactivity threshold.
pub const RECENCY_WINDOW_DAYS: i64 = 30;
const RECENCY_FLOOR: f64 = 0.5;

/// Linear decay over the recency window, held at the floor afterwards.
pub fn recency_factor(days_since_last_submission: i64) -> f64 {
    let days = days_since_last_submission.max(0) as f64;
    (1.0 - days / RECENCY_WINDOW_DAYS as f64).max(RECENCY_FLOOR)
}

/// Whole days between the last submission and `now`. A last submission in
/// the future counts as zero days.
pub fn days_since(last_submission: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_submission).num_days().max(0)
}

/// Blend of submission recency and current standing, in `[0.25, 1.0]`.
///
/// A student with no submission history gets exactly `1.0`.
pub fn consistency_factor(
    current_performance: i32,
    last_submission: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(last_submission) = last_submission else {
        return 1.0;
    };

    let recency = recency_factor(days_since(last_submission, now));
    let performance = f64::from(current_performance.clamp(0, 100)) / 100.0;

    (recency + performance) / 2.0
}

/// Updated performance metric after a submission of the given quality.
///
/// Total over its inputs: the result is always in `[0, 100]`. Rounds half
/// away from zero before clamping.
pub fn new_performance(current_performance: i32, submission_quality: f64, consistency: f64) -> i32 {
    // f64::max drops NaN, so a NaN factor behaves like zero.
    let consistency = consistency.max(0.0);
    let blended =
        f64::from(current_performance) * PREVIOUS_WEIGHT + submission_quality * SUBMISSION_WEIGHT;
    let boosted = blended * (1.0 + consistency * CONSISTENCY_BOOST);

    if boosted.is_nan() {
        return current_performance.clamp(0, 100);
    }

    boosted.round().clamp(0.0, 100.0) as i32
}

/// Applies one graded submission to a student record, using the grading
/// time as the reference for recency.
pub fn apply_submission(record: &StudentRecord, event: &SubmissionEvent) -> PerformanceUpdate {
    let consistency = consistency_factor(
        record.performance,
        record.last_submission_date,
        event.graded_at,
    );
    let performance = new_performance(record.performance, event.quality_score, consistency);

    PerformanceUpdate {
        student_id: record.id.clone(),
        previous: record.performance,
        consistency_factor: consistency,
        performance,
        quality_score: event.quality_score,
        feedback: event.feedback.clone(),
        graded_at: event.graded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn sample_record(performance: i32, last_submission: Option<DateTime<Utc>>) -> StudentRecord {
        StudentRecord {
            id: "7".to_string(),
            name: "David Kim".to_string(),
            email: "david.k@school.com".to_string(),
            grade: "12th".to_string(),
            performance,
            last_submission_date: last_submission,
            last_feedback: None,
        }
    }

    #[test]
    fn no_history_is_fully_consistent() {
        for performance in [0, 37, 50, 100] {
            assert_eq!(consistency_factor(performance, None, now()), 1.0);
        }
    }

    #[test]
    fn recency_decays_linearly_to_floor() {
        assert_eq!(recency_factor(0), 1.0);
        assert!((recency_factor(15) - 0.5).abs() < 1e-12);
        assert!((recency_factor(10) - (1.0 - 10.0 / 30.0)).abs() < 1e-12);
        for days in [30, 31, 45, 365, 10_000] {
            assert_eq!(recency_factor(days), 0.5);
        }
    }

    #[test]
    fn future_submission_counts_as_today() {
        let tomorrow = now() + Duration::days(3);
        assert_eq!(days_since(tomorrow, now()), 0);
        let factor = consistency_factor(100, Some(tomorrow), now());
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn partial_days_are_floored() {
        let last = now() - Duration::hours(47);
        assert_eq!(days_since(last, now()), 1);
    }

    #[test]
    fn consistency_lower_bound_is_a_quarter() {
        let long_ago = now() - Duration::days(90);
        assert_eq!(consistency_factor(0, Some(long_ago), now()), 0.25);
        assert_eq!(consistency_factor(100, Some(now()), now()), 1.0);
    }

    #[test]
    fn consistency_stays_in_range_for_any_input() {
        for performance in [-50, 0, 20, 80, 100, 250] {
            for days in [-5, 0, 1, 10, 29, 30, 400] {
                let last = now() - Duration::days(days);
                let factor = consistency_factor(performance, Some(last), now());
                assert!((0.25..=1.0).contains(&factor), "{performance} {days} -> {factor}");
            }
        }
    }

    #[test]
    fn recent_strong_student_matches_worked_example() {
        let last = now() - Duration::days(10);
        let factor = consistency_factor(80, Some(last), now());
        assert!((factor - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-9);
        assert_eq!(new_performance(80, 100.0, factor), 92);
    }

    #[test]
    fn first_submission_rounds_half_up() {
        let factor = consistency_factor(50, None, now());
        assert_eq!(new_performance(50, 0.0, factor), 39);
    }

    #[test]
    fn boost_is_clamped_to_hundred() {
        assert_eq!(new_performance(100, 100.0, 1.0), 100);
    }

    #[test]
    fn result_is_bounded_for_degenerate_inputs() {
        let qualities = [-1_000.0, -1.0, 0.0, 55.5, 100.0, 250.0, f64::INFINITY];
        let factors = [0.0, 0.25, 1.0, 5.0, f64::MAX];
        for current in [-300, 0, 42, 100, 900] {
            for quality in qualities {
                for factor in factors {
                    let value = new_performance(current, quality, factor);
                    assert!((0..=100).contains(&value), "{current} {quality} {factor}");
                }
            }
        }
        assert_eq!(new_performance(120, f64::NEG_INFINITY, 1.0), 0);
    }

    #[test]
    fn nan_quality_leaves_performance_unchanged() {
        assert_eq!(new_performance(64, f64::NAN, 0.8), 64);
        assert_eq!(new_performance(140, f64::NAN, 0.8), 100);
    }

    #[test]
    fn negative_consistency_never_penalizes() {
        assert_eq!(new_performance(60, 60.0, -3.0), new_performance(60, 60.0, 0.0));
        assert_eq!(new_performance(60, 60.0, f64::NAN), 60);
    }

    #[test]
    fn higher_quality_never_lowers_the_result() {
        for current in [0, 35, 70, 100] {
            for factor in [0.25, 0.6, 1.0] {
                let mut previous = new_performance(current, 0.0, factor);
                for quality in 1..=100 {
                    let value = new_performance(current, f64::from(quality), factor);
                    assert!(value >= previous);
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let last = Some(now() - Duration::days(12));
        assert_eq!(
            consistency_factor(73, last, now()),
            consistency_factor(73, last, now())
        );
        assert_eq!(new_performance(73, 81.0, 0.7), new_performance(73, 81.0, 0.7));
    }

    #[test]
    fn apply_submission_uses_grading_time() {
        let record = sample_record(80, Some(now() - Duration::days(10)));
        let event = SubmissionEvent {
            quality_score: 100.0,
            feedback: "Clear structure".to_string(),
            graded_at: now(),
        };

        let update = apply_submission(&record, &event);
        assert_eq!(update.student_id, "7");
        assert_eq!(update.previous, 80);
        assert_eq!(update.performance, 92);
        assert_eq!(update.delta(), 12);
        assert_eq!(update.feedback, "Clear structure");
        assert_eq!(update.graded_at, now());
    }
}
