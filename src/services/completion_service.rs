use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub user_message: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text-completion backend. Implementations classify failures into
/// `QuotaExceeded`, `AuthenticationFailure` or `Completion`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

#[derive(serde::Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(serde::Deserialize)]
struct RespChoiceMsg {
    content: Option<String>,
}

#[derive(serde::Deserialize)]
struct RespChoice {
    message: RespChoiceMsg,
}

#[derive(serde::Deserialize)]
struct ChatResp {
    choices: Vec<RespChoice>,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            Duration::from_secs(config.ai_timeout_secs),
            client,
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatReq {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![
                Msg {
                    role: "system",
                    content: &request.system_instruction,
                },
                Msg {
                    role: "user",
                    content: &request.user_message,
                },
            ],
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let parsed: ChatResp = res
            .json()
            .await
            .map_err(|e| Error::Completion(format!("invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Completion("response carried no message content".to_string()))
    }
}

/// Maps a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::QuotaExceeded(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthenticationFailure(body),
        other => Error::Completion(format!("status {}: {}", other.as_u16(), body)),
    }
}
