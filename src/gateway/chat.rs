//! OpenAI-compatible Chat Completions API (`/chat/completions`)
//!
//! Works with OpenAI, LM Studio, llama.cpp server and Ollama's `/v1` route.
//! The whole prompt is sent as a single user message.

use super::{
    build_client, check_response_status, map_reqwest_error, non_empty, GatewaySettings,
    GenerationGateway,
};
use crate::{Result, StoryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Gateway for any Chat Completions endpoint
pub struct ChatCompletionsGateway {
    client: Client,
    settings: GatewaySettings,
    name: String,
}

impl ChatCompletionsGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let client = build_client(&settings)?;
        let name = format!("chat:{}", settings.model);
        Ok(Self {
            client,
            settings,
            name,
        })
    }
}

#[async_trait]
impl GenerationGateway for ChatCompletionsGateway {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.settings.endpoint("chat/completions");
        debug!("POST {} (prompt {} bytes)", url, prompt.len());

        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.settings.temperature,
            stream: false,
        };

        let mut req_builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.settings.api_key {
            req_builder = req_builder.bearer_auth(key);
        }

        let response = req_builder
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_response_status(response).await?;

        let chat_response: ChatResponse = response.json().await.map_err(map_reqwest_error)?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                StoryError::GenerationUnavailable("response contained no choices".to_string())
            })?;
        non_empty(content)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::stub_server::serve_once;
    use std::time::Duration;

    fn settings(base_url: String, api_key: Option<&str>) -> GatewaySettings {
        GatewaySettings {
            base_url: format!("{}/v1", base_url),
            model: "local-model".to_string(),
            temperature: 0.7,
            request_timeout: Duration::from_secs(5),
            api_key: api_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let (base_url, request_rx) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Choose: bow or blade?"}}]}"#,
        )
        .await;
        let gateway = ChatCompletionsGateway::new(settings(base_url, Some("sk-test"))).unwrap();

        let text = gateway.complete("PROMPT").await.unwrap();
        assert_eq!(text, "Choose: bow or blade?");

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""role":"user""#));
    }

    #[tokio::test]
    async fn test_no_choices_is_unavailable() {
        let (base_url, _rx) = serve_once(200, r#"{"choices":[]}"#).await;
        let gateway = ChatCompletionsGateway::new(settings(base_url, None)).unwrap();

        match gateway.complete("PROMPT").await {
            Err(StoryError::GenerationUnavailable(msg)) => assert!(msg.contains("no choices")),
            other => panic!("Expected GenerationUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_message_is_extracted() {
        let (base_url, _rx) =
            serve_once(401, r#"{"error":{"message":"Incorrect API key provided"}}"#).await;
        let gateway = ChatCompletionsGateway::new(settings(base_url, None)).unwrap();

        let err = gateway.complete("PROMPT").await.unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }
}
