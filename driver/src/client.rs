use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "models/gemini-pro-latest";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that turns a prompt into text.
pub trait Completion {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

impl<T: Completion + ?Sized> Completion for &T {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).complete(prompt)
    }
}

/// Blocking client for the Generative Language REST API.
///
/// One request per call. There is no retry and no streaming, a failed call
/// surfaces as a [`GenerationError`] and the caller decides what to do.
pub struct GeminiClient {
    agent: ureq::Agent,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: &str) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();

        Self {
            agent,
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: qualify_model(model),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}/{path}", self.api_base))
            .set("x-goog-api-key", &self.api_key)
    }

    fn post(&self, path: &str) -> ureq::Request {
        self.agent
            .post(&format!("{}/{path}", self.api_base))
            .set("x-goog-api-key", &self.api_key)
    }
}

impl Completion for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response: GenerateResponse = self
            .post(&format!("{}:generateContent", self.model))
            .send_json(&request)?
            .into_json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let text = response.into_text()?;

        Ok(tidy(&text))
    }
}

/// Accept both `gemini-pro-latest` and `models/gemini-pro-latest`.
fn qualify_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Trim the response and drop a surrounding markdown code fence.
pub fn tidy(text: &str) -> String {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            // the fence line may carry a language tag
            Some(newline) => &rest[newline + 1..],
            None => rest
                .strip_prefix("sql")
                .or_else(|| rest.strip_prefix("SQL"))
                .unwrap_or(rest),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map(|reason| format!("prompt blocked: {reason}"))
                .unwrap_or_else(|| "no candidates".to_string());

            return Err(GenerationError::Empty(reason));
        };

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .map(|reason| format!("finish reason: {reason}"))
                .unwrap_or_else(|| "empty candidate".to_string());

            return Err(GenerationError::Empty(reason));
        }

        Ok(text)
    }
}
