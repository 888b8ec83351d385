//! Client for the hosted generative-text API.
//!
//! Grading asks the model for a JSON object with a score and narrative
//! feedback. Every way that can go wrong is a distinct [`AssessmentError`]
//! so callers can skip the submission instead of recording a zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelConfig;

#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Network failure or timeout before a response arrived.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("model API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered but produced no candidate text.
    #[error("model response contained no text")]
    EmptyResponse,

    /// The candidate text was not the expected JSON object.
    #[error("malformed assessment: {0}")]
    Malformed(String),

    #[error("assessment score {0} is outside 0..=100")]
    ScoreOutOfRange(f64),
}

/// Outcome of a successful assessment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GenerativeClient {
    client: reqwest::Client,
    config: ModelConfig,
}

impl GenerativeClient {
    pub fn new(config: ModelConfig) -> Result<Self, AssessmentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Sends a single-turn prompt and returns the first candidate's text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, AssessmentError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        tracing::debug!(endpoint = %self.config.endpoint, "sending generate request");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssessmentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        candidate_text(&raw)
    }

    /// Scores a submission. Never reports a failure as a zero score.
    pub async fn assess(&self, submission: &str) -> Result<Assessment, AssessmentError> {
        let text = self.generate_text(&grading_prompt(submission)).await?;
        parse_assessment(&text)
    }
}

pub fn grading_prompt(submission: &str) -> String {
    format!(
        "Analyze this student submission and provide a score out of 100 and feedback.\n\
         Respond with JSON only, in this format:\n\
         {{\"score\": number, \"feedback\": \"detailed feedback\"}}\n\n\
         Submission:\n{submission}"
    )
}

/// Extracts `candidates[0].content.parts[0].text` from a raw API response.
pub fn candidate_text(raw: &str) -> Result<String, AssessmentError> {
    let response: GenerateResponse = serde_json::from_str(raw)
        .map_err(|err| AssessmentError::Malformed(format!("response body: {err}")))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(AssessmentError::EmptyResponse)
}

/// Parses the model's answer, tolerating a surrounding markdown code fence.
pub fn parse_assessment(text: &str) -> Result<Assessment, AssessmentError> {
    let assessment: Assessment = serde_json::from_str(strip_code_fence(text))
        .map_err(|err| AssessmentError::Malformed(err.to_string()))?;

    if !assessment.score.is_finite() || !(0.0..=100.0).contains(&assessment.score) {
        return Err(AssessmentError::ScoreOutOfRange(assessment.score));
    }

    Ok(assessment)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening fence.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}
