use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use courtside_core::error::ProviderError;
use courtside_core::traits::CompletionModel;

use crate::client::HttpClient;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `/chat/completions` with the whole prompt as a single user message.
pub struct ChatCompletionModel {
    client: HttpClient,
    model: String,
    temperature: f32,
}

impl ChatCompletionModel {
    pub fn new(client: HttpClient, model: impl Into<String>, temperature: f32) -> Self {
        Self { client, model: model.into(), temperature }
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionModel {
    fn name(&self) -> &str { &self.model }

    async fn complete(&self, prompt: &str, deterministic: bool) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: if deterministic { 0.0 } else { self.temperature },
            stream: false,
        };
        let resp: ChatResponse = self.client.post_json(&self.model, "chat/completions", &body).await?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::rejected(&self.model, "response has no message content"))
    }
}
