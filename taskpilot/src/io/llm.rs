//! LLM query primitive over an OpenAI-compatible chat completions API.
//!
//! The [`LlmClient`] trait decouples the classifier, the generation loop and
//! the handlers from the HTTP transport. [`query`] is the single entry point
//! they use: one request, one response, no retry, no streaming.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::config::LlmConfig;

/// System message used when a caller has no policy text of its own.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an AI assistant performing automated tasks.";

/// Errors from the LLM backend. Any of these is an upstream failure.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One completion request: a system policy message and a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// Abstraction over completion backends.
pub trait LlmClient {
    /// Send one request and return the raw response text.
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Send `system` + `user` to the backend and return the trimmed response.
#[instrument(skip_all, fields(max_tokens, user_bytes = user.len()))]
pub fn query<L: LlmClient + ?Sized>(
    llm: &L,
    system: &str,
    user: &str,
    max_tokens: u32,
) -> Result<String, LlmError> {
    let request = ChatRequest {
        system: system.to_string(),
        user: user.to_string(),
        max_tokens,
    };
    let text = llm.complete(&request).inspect_err(|err| {
        warn!(err = %err, "llm query failed");
    })?;
    let trimmed = text.trim().to_string();
    debug!(response_bytes = trimmed.len(), "llm query returned");
    Ok(trimmed)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Blocking HTTP client for `{base_url}/chat/completions`.
#[derive(Debug)]
pub struct ChatCompletionsClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    /// Build a client from config, reading the API key from `cfg.api_key_env`.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(format!("{} not set", cfg.api_key_env)))?;
        Self::new(
            api_key,
            cfg.base_url.clone(),
            cfg.model.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LlmClient for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = %self.model))]
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoLlm {
        seen: Mutex<Vec<ChatRequest>>,
        reply: &'static str,
    }

    impl LlmClient for EchoLlm {
        fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.seen.lock().expect("lock").push(request.clone());
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn query_trims_response_and_forwards_messages() {
        let llm = EchoLlm {
            seen: Mutex::new(Vec::new()),
            reply: "\n  print('hi')  \n",
        };
        let text = query(&llm, "policy", "task", 42).expect("query");
        assert_eq!(text, "print('hi')");

        let seen = llm.seen.lock().expect("lock");
        assert_eq!(
            seen[0],
            ChatRequest {
                system: "policy".to_string(),
                user: "task".to_string(),
                max_tokens: 42,
            }
        );
    }

    #[test]
    fn request_body_serializes_as_chat_completion() {
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            max_tokens: 200,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn response_parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"a3"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("a3"));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = ChatCompletionsClient::new(
            "key".to_string(),
            "http://localhost:8080/v1/".to_string(),
            "m".to_string(),
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn from_config_requires_api_key() {
        let cfg = LlmConfig {
            api_key_env: "TASKPILOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = ChatCompletionsClient::from_config(&cfg).unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
        assert!(err.to_string().contains("TASKPILOT_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn error_display() {
        let err = LlmError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }
}
