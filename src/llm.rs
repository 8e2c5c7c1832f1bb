//! LLM client: provider abstraction shared by the conversational-trend estimator
//! and the synthesis step. Both use the same chat-completions endpoint and key.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::TrendsConfig;
use crate::error::LlmError;

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// One chat completion: system + user prompt in, raw assistant text out.
pub trait ChatClient: Send + Sync {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> ChatFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
    /// False when no credential is available (callers pick their fallback early).
    fn is_configured(&self) -> bool {
        true
    }
}

pub type DynChatClient = Arc<dyn ChatClient>;

/// Factory: OpenAI when a key is configured, otherwise a disabled client.
pub fn build_chat_client(cfg: &TrendsConfig, http: reqwest::Client) -> DynChatClient {
    match cfg.keys.openai.as_deref() {
        Some(key) => Arc::new(OpenAiClient::new(
            http,
            key.to_string(),
            cfg.openai_model.clone(),
            cfg.endpoints.openai.clone(),
        )),
        None => Arc::new(DisabledClient),
    }
}

/// OpenAI Chat Completions with JSON-object response format.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String, url: String) -> Self {
        Self {
            http,
            api_key,
            model,
            url,
        }
    }
}

impl ChatClient for OpenAiClient {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> ChatFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct ResponseFormat {
                #[serde(rename = "type")]
                kind: &'static str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
                response_format: ResponseFormat,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                #[serde(default)]
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: 0.3,
                max_tokens: 900,
                response_format: ResponseFormat {
                    kind: "json_object",
                },
            };

            let resp = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| LlmError::Transport(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(LlmError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| LlmError::Transport(e.to_string()))?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(LlmError::Empty)
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails with `NotConfigured`; used when no key is set.
pub struct DisabledClient;

impl ChatClient for DisabledClient {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> ChatFuture<'a> {
        Box::pin(async { Err(LlmError::NotConfigured) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Scripted client for tests.
#[cfg(test)]
pub enum MockClient {
    /// Returns the text verbatim.
    Reply(String),
    /// Fails like a dropped connection.
    NetworkError,
    /// Never answers within any sane timeout.
    Hang,
}

#[cfg(test)]
impl ChatClient for MockClient {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> ChatFuture<'a> {
        Box::pin(async move {
            match self {
                MockClient::Reply(s) => Ok(s.clone()),
                MockClient::NetworkError => {
                    Err(LlmError::Transport("connection reset by peer".to_string()))
                }
                MockClient::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(LlmError::Empty)
                }
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Run a completion bounded by `timeout`.
pub async fn complete_with_timeout(
    client: &dyn ChatClient,
    system: &str,
    user: &str,
    timeout: Duration,
) -> Result<String, LlmError> {
    match tokio::time::timeout(timeout, client.complete(system, user)).await {
        Ok(r) => r,
        Err(_) => Err(LlmError::Timeout(timeout)),
    }
}

/// Slice out the outermost JSON object, tolerating code fences and chatter
/// around it. Returns `None` when no `{...}` span exists.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Single line, collapsed whitespace, control characters removed, capped at `max` chars.
pub fn sanitize_line(input: &str, max: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max));
    let mut prev_space = false;
    let mut count = 0usize;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                count += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
            count += 1;
        }
        if count >= max {
            break;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_fenced_reply() {
        let raw = "Sure! ```json\n{\"a\": {\"b\": 1}}\n``` hope that helps";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn sanitize_collapses_and_caps() {
        assert_eq!(sanitize_line("  a\n\tb   c  ", 160), "a b c");
        assert_eq!(sanitize_line("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn disabled_client_reports_not_configured() {
        let c = DisabledClient;
        assert!(!c.is_configured());
        assert!(matches!(c.complete("s", "u").await, Err(LlmError::NotConfigured)));
    }

    #[tokio::test]
    async fn timeout_wraps_hanging_client() {
        let r = complete_with_timeout(&MockClient::Hang, "s", "u", Duration::from_millis(20)).await;
        assert!(matches!(r, Err(LlmError::Timeout(_))));
    }

    #[test]
    fn factory_without_key_is_disabled() {
        let c = build_chat_client(&TrendsConfig::default(), reqwest::Client::new());
        assert_eq!(c.provider_name(), "disabled");
    }
}
