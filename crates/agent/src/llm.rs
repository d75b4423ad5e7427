use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;

use tripchat_core::config::{LlmConfig, LlmProvider};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response was not understood: {0}")]
    Response(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model client is not configured: {0}")]
    Config(String),
}

/// Image bytes already encoded as base64, sent next to the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl InlineImage {
    pub fn jpeg(data_base64: impl Into<String>) -> Self {
        Self { mime_type: "image/jpeg".to_string(), data_base64: data_base64.into() }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
    async fn complete_with_image(
        &self,
        prompt: &str,
        image: &InlineImage,
    ) -> Result<String, LlmError>;
}

/// Builds the client named by `llm.provider`.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider {
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Config("llm.api_key is required for gemini".into()))?;
            Ok(Arc::new(GeminiClient::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                timeout,
            )?))
        }
        LlmProvider::OpenAi => Ok(Arc::new(OpenAiClient::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            timeout,
        )?)),
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_string());
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model, api_key })
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, parts: Vec<Value>) -> Result<String, LlmError> {
        let body = json!({ "contents": [{ "role": "user", "parts": parts }] });
        tracing::debug!(
            event_name = "llm.request",
            provider = "gemini",
            model = %self.model,
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let value = read_json(response).await?;
        gemini_text(&value)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(vec![json!({ "text": prompt })]).await
    }

    async fn complete_with_image(
        &self,
        prompt: &str,
        image: &InlineImage,
    ) -> Result<String, LlmError> {
        self.generate(vec![
            json!({ "text": prompt }),
            json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.data_base64 }
            }),
        ])
        .await
    }
}

/// Any endpoint speaking the OpenAI chat-completions protocol. The key is
/// optional so local gateways without auth work.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiClient {
    pub fn new(
        api_key: Option<SecretString>,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model, api_key })
    }

    async fn chat(&self, content: Value) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
        });
        tracing::debug!(
            event_name = "llm.request",
            provider = "openai",
            model = %self.model,
            "sending chat completion request"
        );

        let mut request = self.client.post(format!("{}/chat/completions", self.base_url));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request.json(&body).send().await?;
        let value = read_json(response).await?;
        openai_text(&value)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(Value::String(prompt.to_string())).await
    }

    async fn complete_with_image(
        &self,
        prompt: &str,
        image: &InlineImage,
    ) -> Result<String, LlmError> {
        let data_url = format!("data:{};base64,{}", image.mime_type, image.data_base64);
        self.chat(json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": data_url } },
        ]))
        .await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, LlmError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let body: String = text.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(LlmError::Status { status: status.as_u16(), body });
    }
    serde_json::from_str(&text).map_err(|error| LlmError::Response(error.to_string()))
}

/// Joins the text parts of the first candidate.
pub fn gemini_text(value: &Value) -> Result<String, LlmError> {
    let parts = value
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.pointer("/content/parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Response("no candidates in response".into()))?;

    let text: String =
        parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
    if text.is_empty() {
        return Err(LlmError::Response("candidate carried no text".into()));
    }
    Ok(text)
}

pub fn openai_text(value: &Value) -> Result<String, LlmError> {
    value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::Response("no choices in response".into()))
}

/// Replays canned replies in order and records every prompt it was given.
/// Used by tests and local dry runs.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client whose next call fails with a provider error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.into())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    async fn next(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().await.push(prompt.to_string());
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Status { status: 503, body: message }),
            None => Err(LlmError::Response("script exhausted".into())),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.next(prompt).await
    }

    async fn complete_with_image(
        &self,
        prompt: &str,
        _image: &InlineImage,
    ) -> Result<String, LlmError> {
        self.next(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{gemini_text, openai_text, LlmClient, LlmError, ScriptedLlmClient};

    #[test]
    fn gemini_text_joins_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"message\":" }, { "text": "\"hi\"}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });

        assert_eq!(gemini_text(&body).expect("text"), "{\"message\":\"hi\"}");
    }

    #[test]
    fn gemini_without_candidates_is_a_response_error() {
        let error = gemini_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
            .expect_err("blocked prompt has no candidates");
        assert!(matches!(error, LlmError::Response(_)));
    }

    #[test]
    fn openai_text_reads_first_choice() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "ok" } }] });
        assert_eq!(openai_text(&body).expect("text"), "ok");
        assert!(openai_text(&json!({ "choices": [] })).is_err());
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_and_records_prompts() {
        let client = ScriptedLlmClient::new(["first", "second"]);

        assert_eq!(client.complete("p1").await.expect("first"), "first");
        assert_eq!(client.complete("p2").await.expect("second"), "second");
        assert!(client.complete("p3").await.is_err());
        assert_eq!(client.prompts().await, vec!["p1", "p2", "p3"]);
    }
}
