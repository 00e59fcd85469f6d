//! Gemini `generateContent` summarizer.
//!
//! One request per call, no streaming, no conversation state. The credential is
//! looked up on every call and a missing key short-circuits before any request
//! is built.

use crate::env;
use serde::{Deserialize, Serialize};
use webbrief_core::{Error, Result, Summarizer};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Credential variables, in lookup order.
pub const API_KEY_VARS: &[&str] = &["WEBBRIEF_GEMINI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub fn gemini_api_key_from_env() -> Option<String> {
    API_KEY_VARS.iter().find_map(|k| env(k))
}

pub fn gemini_model_from_env() -> Option<String> {
    env("WEBBRIEF_GEMINI_MODEL")
}

fn gemini_base_url_from_env() -> Option<String> {
    env("WEBBRIEF_GEMINI_BASE_URL")
}

fn gemini_timeout_ms_from_env() -> Option<u64> {
    env("WEBBRIEF_GEMINI_TIMEOUT_MS").and_then(|s| s.parse::<u64>().ok())
}

/// The single prompt sent for a query.
pub fn summary_prompt(query: &str, text: &str) -> String {
    format!(
        "Based on the following text, please provide a concise summary that directly answers the question: '{query}'\n\nText:\n{text}"
    )
}

#[derive(Debug, Serialize)]
struct ReqPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct ReqContent {
    role: &'static str,
    parts: Vec<ReqPart>,
}

#[derive(Debug, Serialize)]
struct GeminiReq {
    contents: Vec<ReqContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Debug, Deserialize)]
struct RespPart {
    text: Option<String>,
}

impl GeminiResp {
    /// `candidates[0].content.parts[*].text`, concatenated as-is.
    fn first_candidate_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let out = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>();
        out.chars().any(|c| !c.is_whitespace()).then_some(out)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_ms: Option<u64>,
    /// Fixed key; when unset the environment is consulted on every call.
    api_key: Option<String>,
}

impl GeminiSummarizer {
    pub fn from_env(client: reqwest::Client, model_override: Option<String>) -> Self {
        Self {
            client,
            base_url: gemini_base_url_from_env().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model_override
                .or_else(gemini_model_from_env)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: gemini_timeout_ms_from_env(),
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait::async_trait]
impl Summarizer for GeminiSummarizer {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn summarize(&self, query: &str, text: &str) -> Result<String> {
        let Some(key) = self.api_key.clone().or_else(gemini_api_key_from_env) else {
            return Err(Error::NotConfigured(format!(
                "missing {}",
                API_KEY_VARS.join(" / ")
            )));
        };

        let req = GeminiReq {
            contents: vec![ReqContent {
                role: "user",
                parts: vec![ReqPart {
                    text: summary_prompt(query, text),
                }],
            }],
        };

        let mut rb = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(&req);
        if let Some(ms) = self.timeout_ms {
            rb = rb.timeout(std::time::Duration::from_millis(ms));
        }
        tracing::debug!(model = %self.model, prompt_chars = text.len(), "calling gemini");
        let resp = rb.send().await.map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("gemini generateContent HTTP {status}")));
        }

        let parsed: GeminiResp = resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        parsed.first_candidate_text().ok_or_else(|| {
            let reason = parsed
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            Error::Llm(format!("gemini returned no text ({reason})"))
        })
    }
}
