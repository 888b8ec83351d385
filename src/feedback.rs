/// Performance tiers used for automated messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    Excellent,
    Great,
    Good,
    NeedsSupport,
}

impl FeedbackTier {
    pub fn for_performance(performance: i32) -> Self {
        match performance {
            90.. => Self::Excellent,
            80..=89 => Self::Great,
            70..=79 => Self::Good,
            _ => Self::NeedsSupport,
        }
    }

    fn tips(self) -> &'static [&'static str] {
        match self {
            Self::Excellent => &[
                "Continue your consistent study habits",
                "Consider helping peers to reinforce your knowledge",
                "Challenge yourself with advanced topics",
            ],
            Self::Great => &[
                "Review the few questions you missed",
                "Focus on strengthening problem-solving speed",
                "Practice more complex examples",
            ],
            Self::Good => &[
                "Schedule regular review sessions",
                "Focus on understanding core concepts",
                "Practice with more examples",
                "Don't hesitate to ask questions",
            ],
            Self::NeedsSupport => &[
                "Schedule a one-on-one session",
                "Review fundamental concepts",
                "Create a structured study plan",
                "Use additional learning resources",
            ],
        }
    }
}

pub fn automated_feedback(student_name: &str, performance: i32) -> String {
    let tier = FeedbackTier::for_performance(performance);
    let opening = match tier {
        FeedbackTier::Excellent => format!(
            "Excellent work, {student_name}! Your score of {performance}% demonstrates outstanding understanding. Keep up the great work! Some tips to maintain your performance:"
        ),
        FeedbackTier::Great => format!(
            "Great job, {student_name}! Your score of {performance}% shows strong comprehension. To improve further:"
        ),
        FeedbackTier::Good => format!(
            "Good effort, {student_name}. Your score of {performance}% shows you're on the right track. Here's how you can improve:"
        ),
        FeedbackTier::NeedsSupport => format!(
            "{student_name}, your score of {performance}% indicates you might need some additional support. Let's work together to improve:"
        ),
    };

    let mut message = opening;
    for tip in tier.tips() {
        message.push_str("\n  - ");
        message.push_str(tip);
    }
    message
}
