use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use lucy_core::config::{LlmConfig, LlmProvider};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Opaque "send prompt, receive text" collaborator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Talks to OpenAI-compatible chat endpoints (OpenAI, Ollama) or the Anthropic messages API.
#[derive(Clone, Debug)]
pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let endpoint = endpoint_for(config.provider, config.base_url.as_deref())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            provider: config.provider,
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete_chat(&self, prompt: &str) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&chat_request(&self.model, prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.context("chat completion request failed")?;
        if !response.status().is_success() {
            bail!("chat completion endpoint returned {}", response.status());
        }
        let body: ChatResponse =
            response.json().await.context("failed to decode chat completion response")?;
        chat_text(body)
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("anthropic provider requires llm.api_key"))?;

        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&messages_request(&self.model, prompt))
            .send()
            .await
            .context("messages request failed")?;
        if !response.status().is_success() {
            bail!("messages endpoint returned {}", response.status());
        }
        let body: MessagesResponse =
            response.json().await.context("failed to decode messages response")?;
        messages_text(body)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await,
            LlmProvider::OpenAi | LlmProvider::Ollama => self.complete_chat(prompt).await,
            LlmProvider::Template => bail!("template provider does not call a language model"),
        }
    }
}

fn endpoint_for(provider: LlmProvider, base_url: Option<&str>) -> Result<String> {
    if let Some(url) = base_url.map(str::trim).filter(|url| !url.is_empty()) {
        return Ok(url.trim_end_matches('/').to_owned());
    }
    let default = match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama => "http://localhost:11434/v1",
        LlmProvider::Template => bail!("template provider has no endpoint"),
    };
    Ok(default.to_owned())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn chat_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest { model, messages: vec![Message { role: "user", content: prompt }] }
}

fn messages_request<'a>(model: &'a str, prompt: &'a str) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens: MAX_TOKENS,
        messages: vec![Message { role: "user", content: prompt }],
    }
}

fn chat_text(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| anyhow!("chat completion response had no text"))
}

fn messages_text(body: MessagesResponse) -> Result<String> {
    let text = body
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        bail!("messages response had no text");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use lucy_core::config::LlmProvider;

    use super::{
        chat_request, chat_text, endpoint_for, messages_request, messages_text, ChatResponse,
        MessagesResponse,
    };

    #[test]
    fn endpoints_default_per_provider_and_honour_base_url() {
        assert_eq!(
            endpoint_for(LlmProvider::OpenAi, None).expect("openai"),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            endpoint_for(LlmProvider::Ollama, Some("http://gpu-box:11434/v1/")).expect("ollama"),
            "http://gpu-box:11434/v1"
        );
        assert!(endpoint_for(LlmProvider::Template, None).is_err());
    }

    #[test]
    fn request_bodies_carry_model_and_prompt() {
        let chat = serde_json::to_value(chat_request("gpt-4o-mini", "hello")).expect("chat");
        assert_eq!(
            chat,
            json!({"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "hello"}]})
        );

        let messages = serde_json::to_value(messages_request("claude", "hello")).expect("msgs");
        assert_eq!(messages["max_tokens"], 1024);
        assert_eq!(messages["messages"][0]["content"], "hello");
    }

    #[test]
    fn chat_text_takes_first_non_empty_choice() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Karibu!"}}]
        }))
        .expect("decode");
        assert_eq!(chat_text(body).expect("text"), "Karibu!");

        let empty: ChatResponse = serde_json::from_value(json!({"choices": []})).expect("decode");
        assert!(chat_text(empty).is_err());
    }

    #[test]
    fn messages_text_joins_text_blocks_only() {
        let body: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "there"}
            ]
        }))
        .expect("decode");
        assert_eq!(messages_text(body).expect("text"), "Hello there");
    }
}
