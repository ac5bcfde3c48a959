use crate::prompt::GenerationPlan;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use reqwest::Client;
use tracing::{info, debug, error};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Content blocked: {0}")] Blocked(String),
    #[error("Other: {0}")] Other(String),
}

/// A backend able to run one structured-output generation call.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Whether a credential is available; calls must not be attempted otherwise.
    fn is_configured(&self) -> bool;

    /// Issues exactly one call and returns the response text, if the model produced any.
    async fn generate_content(&self, plan: &GenerationPlan) -> Result<Option<String>, GeminiError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn request_body(plan: &GenerationPlan) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": plan.prompt}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": plan.schema,
                "temperature": 0.7,
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        })
    }
}

#[async_trait]
impl ContentProvider for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_content(&self, plan: &GenerationPlan) -> Result<Option<String>, GeminiError> {
        let api_key = self.api_key.as_deref()
            .ok_or_else(|| GeminiError::Other("no API key configured".into()))?;
        let url = self.endpoint(&plan.model);

        info!("🔗 Making request to: {} (key: ***)", url);
        debug!("📤 Prompt: {}", plan.prompt);

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(plan))
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Http(format!("status={} body={}", status, response_text)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}: {}", e, response_text)))?;

        extract_text(parsed)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Joins the text parts of the first candidate; blocked prompts and
/// safety-stopped candidates surface as [`GeminiError::Blocked`].
fn extract_text(resp: GeminiResponse) -> Result<Option<String>, GeminiError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GeminiError::Blocked(format!("prompt blocked, blockReason: {reason}")));
    }
    let Some(candidate) = resp.candidates.into_iter().next() else {
        info!("⚠️ No candidates in API response");
        return Ok(None);
    };
    let text: String = candidate.content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r == "SAFETY") {
            return Err(GeminiError::Blocked(format!("candidate stopped, finishReason: {reason}")));
        }
        return Ok(None);
    }
    Ok(Some(text))
}
