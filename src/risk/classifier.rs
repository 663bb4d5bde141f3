use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1/models";

/// External text-generation service. The reply is untrusted free text that
/// is merely expected to contain a JSON array.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// `None` when the configuration is `Disabled`.
pub fn build_classifier(
    config: &ClassifierConfig,
    timeout: Duration,
) -> Result<Option<Arc<dyn RiskClassifier>>> {
    if !config.is_enabled() {
        return Ok(None);
    }
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build classifier HTTP client")?;

    let classifier: Arc<dyn RiskClassifier> = match config {
        ClassifierConfig::Disabled => return Ok(None),
        ClassifierConfig::Gemini { api_key, model } => Arc::new(GeminiClassifier {
            client,
            api_key: api_key.clone(),
            model: model.clone(),
        }),
        ClassifierConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => Arc::new(OpenAiClassifier {
            client,
            api_key: api_key.clone(),
            model: model.clone(),
            base_url: base_url.clone(),
        }),
    };
    Ok(Some(classifier))
}

// ── Gemini ──

pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiCandidate {
    content: GeminiReplyContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiReplyContent {
    parts: Vec<GeminiPartIn>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiPartIn {
    text: String,
}

impl GeminiResponse {
    /// Text parts of the first candidate, newline-joined.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl RiskClassifier for GeminiClassifier {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPartOut { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Gemini returned HTTP {}: {}", status, error_text);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .context("Gemini response was not JSON")?;
        Ok(parsed.into_text())
    }
}

// ── OpenAI-compatible chat completions ──

pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl RiskClassifier for OpenAiClassifier {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Chat completion returned HTTP {}: {}", status, error_text);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Chat completion response was not JSON")?;
        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

// ── Tests ──
