use anyhow::Context;
use chrono::Utc;
use clap::ValueEnum;
use uuid::Uuid;

use crate::assessment::GenerativeClient;
use crate::models::ContentTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    Quiz,
    Lesson,
    Assignment,
    Study,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Lesson => "lesson",
            Self::Assignment => "assignment",
            Self::Study => "study",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Quiz => "Quiz",
            Self::Lesson => "Lesson Plan",
            Self::Assignment => "Assignment",
            Self::Study => "Study Guide",
        }
    }

    pub fn prompt(self, topic: &str) -> String {
        let body = match self {
            Self::Quiz => "Write a quiz of 5 multiple-choice questions. Give four options per \
                           question and list the correct answers at the end.",
            Self::Lesson => "Write a detailed lesson plan with learning objectives, required \
                             materials, a timed sequence of activities and an assessment.",
            Self::Assignment => "Design a homework assignment with clear instructions, \
                                 deliverables and a grading rubric.",
            Self::Study => "Write a comprehensive study guide with key concepts, worked \
                            examples, practice questions and additional resources.",
        };
        format!(
            "{body}\nTopic: {topic}\nStart with a one-line title, then the content in markdown."
        )
    }
}

/// First non-empty line with markdown heading and emphasis marks removed.
pub fn extract_title(kind: ContentKind, topic: &str, text: &str) -> String {
    text.lines()
        .map(|line| line.trim().trim_start_matches('#').trim().trim_matches('*').trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}: {}", kind.display_name(), topic.trim()))
}

pub async fn generate(
    client: &GenerativeClient,
    kind: ContentKind,
    topic: &str,
) -> anyhow::Result<ContentTemplate> {
    anyhow::ensure!(!topic.trim().is_empty(), "topic must not be empty");

    tracing::info!(kind = kind.as_str(), topic, "generating content");
    let text = client
        .generate_text(&kind.prompt(topic))
        .await
        .with_context(|| format!("failed to generate {}", kind.display_name()))?;

    Ok(ContentTemplate {
        id: Uuid::new_v4(),
        kind: kind.as_str().to_string(),
        topic: topic.trim().to_string(),
        title: extract_title(kind, topic, &text),
        content: text,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_markdown() {
        let text = "\n## **Photosynthesis Lesson Plan**\n\nObjectives...";
        assert_eq!(
            extract_title(ContentKind::Lesson, "photosynthesis", text),
            "Photosynthesis Lesson Plan"
        );
    }

    #[test]
    fn title_falls_back_to_kind_and_topic() {
        assert_eq!(
            extract_title(ContentKind::Study, " Python basics ", "  \n# \n"),
            "Study Guide: Python basics"
        );
    }

    #[test]
    fn prompts_include_topic() {
        for kind in [
            ContentKind::Quiz,
            ContentKind::Lesson,
            ContentKind::Assignment,
            ContentKind::Study,
        ] {
            assert!(kind.prompt("fractions").contains("Topic: fractions"));
        }
        assert!(ContentKind::Quiz.prompt("x").contains("multiple-choice"));
    }
}
